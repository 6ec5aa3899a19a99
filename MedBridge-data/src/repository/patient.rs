use async_trait::async_trait;
use rusqlite::{OptionalExtension, Row};
use tracing::info;
use uuid::Uuid;

use super::errors::RepositoryError;
use crate::database::DatabasePool;
use crate::models::patient::Patient;
use crate::models::timestamp_now;

/// Repository trait for patients
#[async_trait]
pub trait PatientRepositoryTrait: Send + Sync {
    /// Find a patient by the client device id
    async fn get_by_device_id(&self, device_id: &str) -> Result<Option<Patient>, RepositoryError>;

    /// Find the patient for a device id, creating one on first sight
    async fn get_or_create(&self, device_id: &str) -> Result<Patient, RepositoryError>;
}

/// SQLite-backed patient repository
#[derive(Debug, Clone)]
pub struct PatientRepository {
    pool: DatabasePool,
}

impl PatientRepository {
    /// Create a new repository
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        device_id: row.get(1)?,
        created_at: row.get(2)?,
    })
}

#[async_trait]
impl PatientRepositoryTrait for PatientRepository {
    async fn get_by_device_id(&self, device_id: &str) -> Result<Option<Patient>, RepositoryError> {
        let conn = self.pool.connection()?;
        let patient = conn
            .query_row(
                "SELECT id, device_id, created_at FROM patients WHERE device_id = ?1",
                [device_id],
                map_row,
            )
            .optional()?;
        Ok(patient)
    }

    async fn get_or_create(&self, device_id: &str) -> Result<Patient, RepositoryError> {
        let conn = self.pool.connection()?;
        let candidate = Patient {
            id: Uuid::new_v4().to_string(),
            device_id: device_id.to_string(),
            created_at: timestamp_now(),
        };

        let inserted = conn.execute(
            "INSERT OR IGNORE INTO patients (id, device_id, created_at) VALUES (?1, ?2, ?3)",
            (&candidate.id, &candidate.device_id, &candidate.created_at),
        )?;
        if inserted > 0 {
            info!("Registered new patient {}", candidate.id);
            return Ok(candidate);
        }

        let patient = conn.query_row(
            "SELECT id, device_id, created_at FROM patients WHERE device_id = ?1",
            [device_id],
            map_row,
        )?;
        Ok(patient)
    }
}
