use async_trait::async_trait;
use rusqlite::{OptionalExtension, Row};
use tracing::{debug, info};
use uuid::Uuid;

use super::errors::RepositoryError;
use crate::database::DatabasePool;
use crate::models::intake::{Intake, NewIntake};
use crate::models::medication::{Medication, NewMedication, NewVerificationFlag, VerificationFlag};
use crate::models::timestamp_now;

/// Repository trait for intakes and the records hanging off them
#[async_trait]
pub trait IntakeRepositoryTrait: Send + Sync {
    /// List non-deleted intakes, newest first
    async fn list(&self) -> Result<Vec<Intake>, RepositoryError>;

    /// List non-deleted intakes of one patient, newest first
    async fn list_by_patient(&self, patient_id: &str) -> Result<Vec<Intake>, RepositoryError>;

    /// Get a non-deleted intake by ID
    async fn get_by_id(&self, id: &str) -> Result<Option<Intake>, RepositoryError>;

    /// Insert an intake
    async fn create(&self, intake: NewIntake) -> Result<Intake, RepositoryError>;

    /// Mark an intake deleted. Returns false when it was missing or already deleted.
    async fn soft_delete(&self, id: &str) -> Result<bool, RepositoryError>;

    /// Insert a medication
    async fn create_medication(&self, medication: NewMedication) -> Result<Medication, RepositoryError>;

    /// Medications of an intake in insertion order
    async fn medications_for_intake(&self, intake_id: &str) -> Result<Vec<Medication>, RepositoryError>;

    /// Insert a verification flag
    async fn create_flag(&self, flag: NewVerificationFlag) -> Result<VerificationFlag, RepositoryError>;

    /// Verification flags of an intake in insertion order
    async fn flags_for_intake(&self, intake_id: &str) -> Result<Vec<VerificationFlag>, RepositoryError>;
}

/// SQLite-backed intake repository
#[derive(Debug, Clone)]
pub struct IntakeRepository {
    pool: DatabasePool,
}

impl IntakeRepository {
    /// Create a new repository
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

const INTAKE_COLUMNS: &str = "id, patient_id, hospital_id, hospital_name, created_at, chief_complaint, \
    chief_complaint_detail, onset_date, course_status, course_detail, adherence, adherence_reason, \
    has_adverse_events, adverse_events_detail, has_allergies, allergies_detail, doctor_note, is_deleted";

const MEDICATION_COLUMNS: &str = "id, intake_id, medication_name, dose, frequency, duration, \
    prescription_date, dispensing_date, confidence, needs_verification, raw_ocr_text, source_type";

fn map_intake(row: &Row<'_>) -> rusqlite::Result<Intake> {
    Ok(Intake {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        hospital_id: row.get(2)?,
        hospital_name: row.get(3)?,
        created_at: row.get(4)?,
        chief_complaint: row.get(5)?,
        chief_complaint_detail: row.get(6)?,
        onset_date: row.get(7)?,
        course_status: row.get(8)?,
        course_detail: row.get(9)?,
        adherence: row.get(10)?,
        adherence_reason: row.get(11)?,
        has_adverse_events: row.get(12)?,
        adverse_events_detail: row.get(13)?,
        has_allergies: row.get(14)?,
        allergies_detail: row.get(15)?,
        doctor_note: row.get(16)?,
        is_deleted: row.get(17)?,
    })
}

fn map_medication(row: &Row<'_>) -> rusqlite::Result<Medication> {
    Ok(Medication {
        id: row.get(0)?,
        intake_id: row.get(1)?,
        medication_name: row.get(2)?,
        dose: row.get(3)?,
        frequency: row.get(4)?,
        duration: row.get(5)?,
        prescription_date: row.get(6)?,
        dispensing_date: row.get(7)?,
        confidence: row.get(8)?,
        needs_verification: row.get(9)?,
        raw_ocr_text: row.get(10)?,
        source_type: row.get(11)?,
    })
}

/// Flag rows keep `related_medication_ids` as JSON text; decoding happens after the query.
type FlagRow = (String, String, String, String, Option<String>);

fn map_flag(row: &Row<'_>) -> rusqlite::Result<FlagRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn decode_flag(row: FlagRow) -> Result<VerificationFlag, RepositoryError> {
    let (id, intake_id, flag_type, description, related) = row;
    let related_medication_ids = related
        .map(|json| serde_json::from_str::<Vec<String>>(&json))
        .transpose()?;

    Ok(VerificationFlag {
        id,
        intake_id,
        flag_type,
        description,
        related_medication_ids,
    })
}

#[async_trait]
impl IntakeRepositoryTrait for IntakeRepository {
    async fn list(&self) -> Result<Vec<Intake>, RepositoryError> {
        debug!("Listing intakes");
        let conn = self.pool.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM intakes WHERE is_deleted = 0 ORDER BY created_at DESC, rowid DESC",
            INTAKE_COLUMNS
        ))?;
        let rows = stmt.query_map([], map_intake)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    async fn list_by_patient(&self, patient_id: &str) -> Result<Vec<Intake>, RepositoryError> {
        let conn = self.pool.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM intakes WHERE is_deleted = 0 AND patient_id = ?1 \
             ORDER BY created_at DESC, rowid DESC",
            INTAKE_COLUMNS
        ))?;
        let rows = stmt.query_map([patient_id], map_intake)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Intake>, RepositoryError> {
        let conn = self.pool.connection()?;
        let intake = conn
            .query_row(
                &format!("SELECT {} FROM intakes WHERE id = ?1 AND is_deleted = 0", INTAKE_COLUMNS),
                [id],
                map_intake,
            )
            .optional()?;
        Ok(intake)
    }

    async fn create(&self, intake: NewIntake) -> Result<Intake, RepositoryError> {
        let created = Intake {
            id: Uuid::new_v4().to_string(),
            patient_id: intake.patient_id,
            hospital_id: intake.hospital_id,
            hospital_name: intake.hospital_name,
            created_at: timestamp_now(),
            chief_complaint: intake.chief_complaint,
            chief_complaint_detail: intake.chief_complaint_detail,
            onset_date: intake.onset_date,
            course_status: intake.course_status,
            course_detail: intake.course_detail,
            adherence: intake.adherence,
            adherence_reason: intake.adherence_reason,
            has_adverse_events: intake.has_adverse_events,
            adverse_events_detail: intake.adverse_events_detail,
            has_allergies: intake.has_allergies,
            allergies_detail: intake.allergies_detail,
            doctor_note: intake.doctor_note,
            is_deleted: false,
        };

        let conn = self.pool.connection()?;
        conn.execute(
            &format!(
                "INSERT INTO intakes ({}) VALUES \
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
                INTAKE_COLUMNS
            ),
            rusqlite::params![
                created.id,
                created.patient_id,
                created.hospital_id,
                created.hospital_name,
                created.created_at,
                created.chief_complaint,
                created.chief_complaint_detail,
                created.onset_date,
                created.course_status,
                created.course_detail,
                created.adherence,
                created.adherence_reason,
                created.has_adverse_events,
                created.adverse_events_detail,
                created.has_allergies,
                created.allergies_detail,
                created.doctor_note,
                created.is_deleted,
            ],
        )?;

        info!("Stored intake {}", created.id);
        Ok(created)
    }

    async fn soft_delete(&self, id: &str) -> Result<bool, RepositoryError> {
        let conn = self.pool.connection()?;
        let updated = conn.execute(
            "UPDATE intakes SET is_deleted = 1 WHERE id = ?1 AND is_deleted = 0",
            [id],
        )?;
        Ok(updated > 0)
    }

    async fn create_medication(&self, medication: NewMedication) -> Result<Medication, RepositoryError> {
        let created = Medication {
            id: Uuid::new_v4().to_string(),
            intake_id: medication.intake_id,
            medication_name: medication.medication_name,
            dose: medication.dose,
            frequency: medication.frequency,
            duration: medication.duration,
            prescription_date: medication.prescription_date,
            dispensing_date: medication.dispensing_date,
            confidence: medication.confidence,
            needs_verification: medication.needs_verification,
            raw_ocr_text: medication.raw_ocr_text,
            source_type: medication.source_type,
        };

        let conn = self.pool.connection()?;
        conn.execute(
            &format!(
                "INSERT INTO medications ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                MEDICATION_COLUMNS
            ),
            rusqlite::params![
                created.id,
                created.intake_id,
                created.medication_name,
                created.dose,
                created.frequency,
                created.duration,
                created.prescription_date,
                created.dispensing_date,
                created.confidence,
                created.needs_verification,
                created.raw_ocr_text,
                created.source_type,
            ],
        )?;

        Ok(created)
    }

    async fn medications_for_intake(&self, intake_id: &str) -> Result<Vec<Medication>, RepositoryError> {
        let conn = self.pool.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM medications WHERE intake_id = ?1 ORDER BY rowid",
            MEDICATION_COLUMNS
        ))?;
        let rows = stmt.query_map([intake_id], map_medication)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    async fn create_flag(&self, flag: NewVerificationFlag) -> Result<VerificationFlag, RepositoryError> {
        let related_json = flag
            .related_medication_ids
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let created = VerificationFlag {
            id: Uuid::new_v4().to_string(),
            intake_id: flag.intake_id,
            flag_type: flag.flag_type,
            description: flag.description,
            related_medication_ids: flag.related_medication_ids,
        };

        let conn = self.pool.connection()?;
        conn.execute(
            "INSERT INTO verification_flags (id, intake_id, flag_type, description, related_medication_ids) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            (&created.id, &created.intake_id, &created.flag_type, &created.description, &related_json),
        )?;

        Ok(created)
    }

    async fn flags_for_intake(&self, intake_id: &str) -> Result<Vec<VerificationFlag>, RepositoryError> {
        let conn = self.pool.connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, intake_id, flag_type, description, related_medication_ids \
             FROM verification_flags WHERE intake_id = ?1 ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map([intake_id], map_flag)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(decode_flag).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_intake(patient_id: Option<&str>) -> NewIntake {
        NewIntake {
            patient_id: patient_id.map(String::from),
            hospital_id: "hospital-1".to_string(),
            hospital_name: "Harbor Clinic".to_string(),
            chief_complaint: "fever".to_string(),
            onset_date: "2024-03-01".to_string(),
            course_status: "stable".to_string(),
            adherence: "yes".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_hides_deleted() {
        let repo = IntakeRepository::new(DatabasePool::in_memory().unwrap());
        let first = repo.create(new_intake(None)).await.unwrap();
        let second = repo.create(new_intake(Some("patient-1"))).await.unwrap();
        let third = repo.create(new_intake(Some("patient-1"))).await.unwrap();

        let listed: Vec<String> = repo.list().await.unwrap().into_iter().map(|i| i.id).collect();
        assert_eq!(listed, vec![third.id.clone(), second.id.clone(), first.id.clone()]);

        assert!(repo.soft_delete(&second.id).await.unwrap());
        assert!(!repo.soft_delete(&second.id).await.unwrap());
        assert!(repo.get_by_id(&second.id).await.unwrap().is_none());

        let by_patient = repo.list_by_patient("patient-1").await.unwrap();
        assert_eq!(by_patient.len(), 1);
        assert_eq!(by_patient[0].id, third.id);
    }

    #[tokio::test]
    async fn test_medications_and_flags_round_trip() {
        let repo = IntakeRepository::new(DatabasePool::in_memory().unwrap());
        let intake = repo.create(new_intake(None)).await.unwrap();

        let med = repo
            .create_medication(NewMedication {
                intake_id: intake.id.clone(),
                medication_name: "Amoxicillin".to_string(),
                dose: Some("500mg".to_string()),
                confidence: 65,
                needs_verification: true,
                source_type: "prescription".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        repo.create_flag(NewVerificationFlag {
            intake_id: intake.id.clone(),
            flag_type: "low_confidence".to_string(),
            description: "check dose".to_string(),
            related_medication_ids: Some(vec![med.id.clone()]),
        })
        .await
        .unwrap();
        repo.create_flag(NewVerificationFlag {
            intake_id: intake.id.clone(),
            flag_type: "duplicate".to_string(),
            description: "two antibiotics".to_string(),
            related_medication_ids: None,
        })
        .await
        .unwrap();

        let meds = repo.medications_for_intake(&intake.id).await.unwrap();
        assert_eq!(meds, vec![med.clone()]);

        let flags = repo.flags_for_intake(&intake.id).await.unwrap();
        assert_eq!(flags.len(), 2);
        assert_eq!(flags[0].related_medication_ids, Some(vec![med.id]));
        assert_eq!(flags[1].related_medication_ids, None);
    }
}
