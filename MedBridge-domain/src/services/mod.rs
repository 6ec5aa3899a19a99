//! Domain services.
//!
//! Each service wraps the repositories it needs behind trait objects so the
//! API layer can share one [`Services`] value across requests.

use std::sync::Arc;

use thiserror::Error;
use validator::ValidationErrors;

use medbridge_data::database::DatabasePool;
use medbridge_data::repository::{
    AccessRepository, AdherenceRepository, HospitalRepository, IntakeRepository,
    NotificationRepository, PatientRepository, PrescriptionRepository, RepositoryError,
};

use crate::config::ServiceConfig;
use crate::extraction::MedicationExtractor;

pub mod access;
pub mod adherence;
pub mod hospital;
pub mod intake;
pub mod notification;
pub mod prescription;

pub use access::{AccessService, TokenPolicy};
pub use adherence::AdherenceService;
pub use hospital::HospitalService;
pub use intake::IntakeService;
pub use notification::NotificationService;
pub use prescription::PrescriptionService;

/// Errors returned by domain services
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Input failed validation; one message per problem
    #[error("Validation error: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// The requested record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The requested resource existed but can no longer be used
    #[error("Gone: {0}")]
    Gone(String),

    /// An upload exceeded the size limit
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// A stored value could not be read back
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    /// Storage failure
    #[error("Repository error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(msg) => ServiceError::NotFound(msg),
            RepositoryError::Validation(msg) => ServiceError::Validation(vec![msg]),
            other => ServiceError::Repository(other),
        }
    }
}

impl ServiceError {
    /// Validation error with a single message
    pub fn invalid(message: impl Into<String>) -> Self {
        ServiceError::Validation(vec![message.into()])
    }
}

/// Flatten validator output into readable messages, sorted for stable output
pub fn validation_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |err| match &err.message {
                Some(msg) => msg.to_string(),
                None => format!("Invalid {}", field),
            })
        })
        .collect();
    messages.sort();
    messages
}

/// All services wired to one database pool
#[derive(Clone)]
pub struct Services {
    pub hospitals: HospitalService,
    pub intakes: IntakeService,
    pub access: AccessService,
    pub prescriptions: PrescriptionService,
    pub notifications: NotificationService,
    pub adherence: AdherenceService,
}

impl Services {
    /// Build every service on top of SQLite repositories
    pub fn new(pool: DatabasePool, extractor: Arc<dyn MedicationExtractor>, config: ServiceConfig) -> Self {
        let patients = Arc::new(PatientRepository::new(pool.clone()));
        let intake_repo = Arc::new(IntakeRepository::new(pool.clone()));
        let access_repo = Arc::new(AccessRepository::new(pool.clone()));
        let prescription_repo = Arc::new(PrescriptionRepository::new(pool.clone()));
        let notification_repo = Arc::new(NotificationRepository::new(pool.clone()));
        let adherence_repo = Arc::new(AdherenceRepository::new(pool.clone()));

        let hospitals = HospitalService::new(Arc::new(HospitalRepository::new(pool)));
        let notifications = NotificationService::new(patients.clone(), notification_repo);
        let adherence = AdherenceService::new(patients.clone(), adherence_repo);
        let prescriptions = PrescriptionService::new(patients.clone(), prescription_repo.clone());
        let access = AccessService::new(
            intake_repo.clone(),
            access_repo,
            adherence.clone(),
            notifications.clone(),
            TokenPolicy::from_minutes(config.token_ttl_minutes),
            config.public_base_url.clone(),
        );
        let intakes = IntakeService::new(
            patients,
            intake_repo,
            prescription_repo,
            extractor,
            access.clone(),
            config,
        );

        Self {
            hospitals,
            intakes,
            access,
            prescriptions,
            notifications,
            adherence,
        }
    }
}
