use async_trait::async_trait;
use rusqlite::Row;
use tracing::debug;
use uuid::Uuid;

use super::errors::RepositoryError;
use crate::database::DatabasePool;
use crate::models::hospital::{Hospital, NewHospital};

/// Repository trait for hospitals
#[async_trait]
pub trait HospitalRepositoryTrait: Send + Sync {
    /// List every hospital ordered by name
    async fn list(&self) -> Result<Vec<Hospital>, RepositoryError>;

    /// Get a hospital by ID
    async fn get_by_id(&self, id: &str) -> Result<Option<Hospital>, RepositoryError>;

    /// Insert a hospital
    async fn create(&self, hospital: NewHospital) -> Result<Hospital, RepositoryError>;
}

/// SQLite-backed hospital repository
#[derive(Debug, Clone)]
pub struct HospitalRepository {
    pool: DatabasePool,
}

impl HospitalRepository {
    /// Create a new repository
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

const COLUMNS: &str = "id, name, address, type";

fn map_row(row: &Row<'_>) -> rusqlite::Result<Hospital> {
    Ok(Hospital {
        id: row.get(0)?,
        name: row.get(1)?,
        address: row.get(2)?,
        hospital_type: row.get(3)?,
    })
}

#[async_trait]
impl HospitalRepositoryTrait for HospitalRepository {
    async fn list(&self) -> Result<Vec<Hospital>, RepositoryError> {
        debug!("Listing hospitals");
        let conn = self.pool.connection()?;
        let mut stmt = conn.prepare(&format!("SELECT {} FROM hospitals ORDER BY name", COLUMNS))?;
        let rows = stmt.query_map([], map_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Hospital>, RepositoryError> {
        let conn = self.pool.connection()?;
        let mut stmt = conn.prepare(&format!("SELECT {} FROM hospitals WHERE id = ?1", COLUMNS))?;
        let mut rows = stmt.query_map([id], map_row)?;
        Ok(rows.next().transpose()?)
    }

    async fn create(&self, hospital: NewHospital) -> Result<Hospital, RepositoryError> {
        let created = Hospital {
            id: Uuid::new_v4().to_string(),
            name: hospital.name,
            address: hospital.address,
            hospital_type: hospital.hospital_type,
        };

        let conn = self.pool.connection()?;
        conn.execute(
            "INSERT INTO hospitals (id, name, address, type) VALUES (?1, ?2, ?3, ?4)",
            (&created.id, &created.name, &created.address, &created.hospital_type),
        )?;

        Ok(created)
    }
}
