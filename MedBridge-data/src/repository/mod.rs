// Repository module structure
pub mod errors;
mod access;
mod adherence;
mod hospital;
mod intake;
mod notification;
mod patient;
mod prescription;

// Re-export commonly used types
pub use errors::RepositoryError;
pub use access::{AccessRepository, AccessRepositoryTrait};
pub use adherence::{AdherenceRepository, AdherenceRepositoryTrait};
pub use hospital::{HospitalRepository, HospitalRepositoryTrait};
pub use intake::{IntakeRepository, IntakeRepositoryTrait};
pub use notification::{NotificationRepository, NotificationRepositoryTrait};
pub use patient::{PatientRepository, PatientRepositoryTrait};
pub use prescription::{PrescriptionRepository, PrescriptionRepositoryTrait};
