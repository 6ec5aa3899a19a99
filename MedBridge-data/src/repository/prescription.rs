use async_trait::async_trait;
use rusqlite::{OptionalExtension, Row};
use uuid::Uuid;

use super::errors::RepositoryError;
use crate::database::DatabasePool;
use crate::models::prescription::{
    NewPrescription, NewPrescriptionMedication, Prescription, PrescriptionMedication,
};
use crate::models::timestamp_now;

/// Repository trait for prescriptions and their medications
#[async_trait]
pub trait PrescriptionRepositoryTrait: Send + Sync {
    /// Insert a prescription
    async fn create(&self, prescription: NewPrescription) -> Result<Prescription, RepositoryError>;

    /// Get a prescription by ID
    async fn get_by_id(&self, id: &str) -> Result<Option<Prescription>, RepositoryError>;

    /// Prescriptions of a patient, newest first
    async fn list_by_patient(&self, patient_id: &str) -> Result<Vec<Prescription>, RepositoryError>;

    /// Prescriptions of a patient for one chief complaint, newest first
    async fn list_by_patient_and_complaint(
        &self,
        patient_id: &str,
        chief_complaint: &str,
    ) -> Result<Vec<Prescription>, RepositoryError>;

    /// Insert a prescription medication
    async fn create_medication(
        &self,
        medication: NewPrescriptionMedication,
    ) -> Result<PrescriptionMedication, RepositoryError>;

    /// Medications of a prescription in insertion order
    async fn medications_for_prescription(
        &self,
        prescription_id: &str,
    ) -> Result<Vec<PrescriptionMedication>, RepositoryError>;
}

/// SQLite-backed prescription repository
#[derive(Debug, Clone)]
pub struct PrescriptionRepository {
    pool: DatabasePool,
}

impl PrescriptionRepository {
    /// Create a new repository
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

const PRESCRIPTION_COLUMNS: &str =
    "id, patient_id, intake_id, hospital_name, chief_complaint, prescription_date, patient_condition, created_at";

const MEDICATION_COLUMNS: &str = "id, prescription_id, medication_name, dose, frequency, duration, \
    ingredients, indication, doses_per_day, total_doses, confidence";

fn map_prescription(row: &Row<'_>) -> rusqlite::Result<Prescription> {
    Ok(Prescription {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        intake_id: row.get(2)?,
        hospital_name: row.get(3)?,
        chief_complaint: row.get(4)?,
        prescription_date: row.get(5)?,
        patient_condition: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn map_medication(row: &Row<'_>) -> rusqlite::Result<PrescriptionMedication> {
    Ok(PrescriptionMedication {
        id: row.get(0)?,
        prescription_id: row.get(1)?,
        medication_name: row.get(2)?,
        dose: row.get(3)?,
        frequency: row.get(4)?,
        duration: row.get(5)?,
        ingredients: row.get(6)?,
        indication: row.get(7)?,
        doses_per_day: row.get(8)?,
        total_doses: row.get(9)?,
        confidence: row.get(10)?,
    })
}

#[async_trait]
impl PrescriptionRepositoryTrait for PrescriptionRepository {
    async fn create(&self, prescription: NewPrescription) -> Result<Prescription, RepositoryError> {
        let created = Prescription {
            id: Uuid::new_v4().to_string(),
            patient_id: prescription.patient_id,
            intake_id: prescription.intake_id,
            hospital_name: prescription.hospital_name,
            chief_complaint: prescription.chief_complaint,
            prescription_date: prescription.prescription_date,
            patient_condition: prescription.patient_condition,
            created_at: timestamp_now(),
        };

        let conn = self.pool.connection()?;
        conn.execute(
            &format!("INSERT INTO prescriptions ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)", PRESCRIPTION_COLUMNS),
            (
                &created.id,
                &created.patient_id,
                &created.intake_id,
                &created.hospital_name,
                &created.chief_complaint,
                &created.prescription_date,
                &created.patient_condition,
                &created.created_at,
            ),
        )?;
        Ok(created)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Prescription>, RepositoryError> {
        let conn = self.pool.connection()?;
        let found = conn
            .query_row(
                &format!("SELECT {} FROM prescriptions WHERE id = ?1", PRESCRIPTION_COLUMNS),
                [id],
                map_prescription,
            )
            .optional()?;
        Ok(found)
    }

    async fn list_by_patient(&self, patient_id: &str) -> Result<Vec<Prescription>, RepositoryError> {
        let conn = self.pool.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM prescriptions WHERE patient_id = ?1 ORDER BY created_at DESC, rowid DESC",
            PRESCRIPTION_COLUMNS
        ))?;
        let rows = stmt.query_map([patient_id], map_prescription)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    async fn list_by_patient_and_complaint(
        &self,
        patient_id: &str,
        chief_complaint: &str,
    ) -> Result<Vec<Prescription>, RepositoryError> {
        let conn = self.pool.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM prescriptions WHERE patient_id = ?1 AND chief_complaint = ?2 \
             ORDER BY created_at DESC, rowid DESC",
            PRESCRIPTION_COLUMNS
        ))?;
        let rows = stmt.query_map([patient_id, chief_complaint], map_prescription)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    async fn create_medication(
        &self,
        medication: NewPrescriptionMedication,
    ) -> Result<PrescriptionMedication, RepositoryError> {
        let created = PrescriptionMedication {
            id: Uuid::new_v4().to_string(),
            prescription_id: medication.prescription_id,
            medication_name: medication.medication_name,
            dose: medication.dose,
            frequency: medication.frequency,
            duration: medication.duration,
            ingredients: medication.ingredients,
            indication: medication.indication,
            doses_per_day: medication.doses_per_day,
            total_doses: medication.total_doses,
            confidence: medication.confidence,
        };

        let conn = self.pool.connection()?;
        conn.execute(
            &format!(
                "INSERT INTO prescription_medications ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                MEDICATION_COLUMNS
            ),
            rusqlite::params![
                created.id,
                created.prescription_id,
                created.medication_name,
                created.dose,
                created.frequency,
                created.duration,
                created.ingredients,
                created.indication,
                created.doses_per_day,
                created.total_doses,
                created.confidence,
            ],
        )?;
        Ok(created)
    }

    async fn medications_for_prescription(
        &self,
        prescription_id: &str,
    ) -> Result<Vec<PrescriptionMedication>, RepositoryError> {
        let conn = self.pool.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM prescription_medications WHERE prescription_id = ?1 ORDER BY rowid",
            MEDICATION_COLUMNS
        ))?;
        let rows = stmt.query_map([prescription_id], map_medication)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_prescriptions_by_patient_and_complaint() {
        let repo = PrescriptionRepository::new(DatabasePool::in_memory().unwrap());
        let fever = repo
            .create(NewPrescription {
                patient_id: "patient-1".to_string(),
                chief_complaint: Some("fever".to_string()),
                prescription_date: Some("2024-02-01".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        repo.create(NewPrescription {
            patient_id: "patient-1".to_string(),
            chief_complaint: Some("cough".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
        repo.create(NewPrescription {
            patient_id: "patient-2".to_string(),
            chief_complaint: Some("fever".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

        assert_eq!(repo.list_by_patient("patient-1").await.unwrap().len(), 2);

        let matching = repo.list_by_patient_and_complaint("patient-1", "fever").await.unwrap();
        assert_eq!(matching, vec![fever.clone()]);
        assert_eq!(repo.get_by_id(&fever.id).await.unwrap(), Some(fever));
    }

    #[tokio::test]
    async fn test_prescription_medications() {
        let repo = PrescriptionRepository::new(DatabasePool::in_memory().unwrap());
        let prescription = repo
            .create(NewPrescription {
                patient_id: "patient-1".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let med = repo
            .create_medication(NewPrescriptionMedication {
                prescription_id: prescription.id.clone(),
                medication_name: "Tylenol".to_string(),
                ingredients: Some("acetaminophen".to_string()),
                doses_per_day: Some(3),
                total_doses: Some(21),
                confidence: 92,
                ..Default::default()
            })
            .await
            .unwrap();

        let meds = repo.medications_for_prescription(&prescription.id).await.unwrap();
        assert_eq!(meds, vec![med]);
        assert!(repo.medications_for_prescription("other").await.unwrap().is_empty());
    }
}
