use async_trait::async_trait;
use rusqlite::Row;
use uuid::Uuid;

use super::errors::RepositoryError;
use crate::database::DatabasePool;
use crate::models::adherence::{AdherenceLog, NewAdherenceLog};
use crate::models::timestamp_now;

/// Repository trait for medication adherence logs
#[async_trait]
pub trait AdherenceRepositoryTrait: Send + Sync {
    /// Insert an adherence log
    async fn create(&self, log: NewAdherenceLog) -> Result<AdherenceLog, RepositoryError>;

    /// Logs of a patient, latest scheduled dose first
    async fn list_by_patient(&self, patient_id: &str) -> Result<Vec<AdherenceLog>, RepositoryError>;

    /// Logs for one medication, latest scheduled dose first
    async fn list_by_medication(&self, medication_id: &str) -> Result<Vec<AdherenceLog>, RepositoryError>;
}

/// SQLite-backed adherence repository
#[derive(Debug, Clone)]
pub struct AdherenceRepository {
    pool: DatabasePool,
}

impl AdherenceRepository {
    /// Create a new repository
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    fn query(&self, filter: &str, value: &str) -> Result<Vec<AdherenceLog>, RepositoryError> {
        let conn = self.pool.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM adherence_logs WHERE {} = ?1 ORDER BY scheduled_time DESC, rowid DESC",
            COLUMNS, filter
        ))?;
        let rows = stmt.query_map([value], map_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

const COLUMNS: &str = "id, patient_id, medication_id, scheduled_time, taken_at, status, notes, created_at";

fn map_row(row: &Row<'_>) -> rusqlite::Result<AdherenceLog> {
    Ok(AdherenceLog {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        medication_id: row.get(2)?,
        scheduled_time: row.get(3)?,
        taken_at: row.get(4)?,
        status: row.get(5)?,
        notes: row.get(6)?,
        created_at: row.get(7)?,
    })
}

#[async_trait]
impl AdherenceRepositoryTrait for AdherenceRepository {
    async fn create(&self, log: NewAdherenceLog) -> Result<AdherenceLog, RepositoryError> {
        let created = AdherenceLog {
            id: Uuid::new_v4().to_string(),
            patient_id: log.patient_id,
            medication_id: log.medication_id,
            scheduled_time: log.scheduled_time,
            taken_at: log.taken_at,
            status: log.status,
            notes: log.notes,
            created_at: timestamp_now(),
        };

        let conn = self.pool.connection()?;
        conn.execute(
            &format!("INSERT INTO adherence_logs ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)", COLUMNS),
            (
                &created.id,
                &created.patient_id,
                &created.medication_id,
                &created.scheduled_time,
                &created.taken_at,
                &created.status,
                &created.notes,
                &created.created_at,
            ),
        )?;
        Ok(created)
    }

    async fn list_by_patient(&self, patient_id: &str) -> Result<Vec<AdherenceLog>, RepositoryError> {
        self.query("patient_id", patient_id)
    }

    async fn list_by_medication(&self, medication_id: &str) -> Result<Vec<AdherenceLog>, RepositoryError> {
        self.query("medication_id", medication_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(medication_id: &str, scheduled_time: &str, status: &str) -> NewAdherenceLog {
        NewAdherenceLog {
            patient_id: "patient-1".to_string(),
            medication_id: medication_id.to_string(),
            scheduled_time: scheduled_time.to_string(),
            status: status.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_logs_are_ordered_by_schedule() {
        let repo = AdherenceRepository::new(DatabasePool::in_memory().unwrap());
        repo.create(log("med-1", "2024-03-01T08:00:00.000Z", "taken")).await.unwrap();
        repo.create(log("med-1", "2024-03-02T08:00:00.000Z", "missed")).await.unwrap();
        repo.create(log("med-2", "2024-03-01T20:00:00.000Z", "skipped")).await.unwrap();

        let by_patient = repo.list_by_patient("patient-1").await.unwrap();
        let statuses: Vec<&str> = by_patient.iter().map(|l| l.status.as_str()).collect();
        assert_eq!(statuses, vec!["missed", "skipped", "taken"]);

        assert_eq!(repo.list_by_medication("med-1").await.unwrap().len(), 2);
        assert!(repo.list_by_patient("patient-2").await.unwrap().is_empty());
    }
}
