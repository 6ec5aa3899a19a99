//! Conversion functions between data models and domain entities.
//!
//! Storage keeps enumerated values as text; converting to the domain parses
//! them and reports a row that holds an unknown value.

use std::str::FromStr;

use medbridge_data::models as data;

use super::access::AccessLog;
use super::adherence::AdherenceLog;
use super::intake::{CreateIntakeRequest, Intake};
use super::medication::{Medication, VerificationFlag};
use super::notification::Notification;

fn parse_column<T: FromStr<Err = String>>(value: &str, table: &str, id: &str) -> Result<T, String> {
    value
        .parse::<T>()
        .map_err(|e| format!("{} row {}: {}", table, id, e))
}

/// Convert a stored intake to the domain entity
pub fn convert_to_domain_intake(row: data::intake::Intake) -> Result<Intake, String> {
    Ok(Intake {
        chief_complaint: parse_column(&row.chief_complaint, "intakes", &row.id)?,
        course_status: parse_column(&row.course_status, "intakes", &row.id)?,
        adherence: parse_column(&row.adherence, "intakes", &row.id)?,
        id: row.id,
        patient_id: row.patient_id,
        hospital_id: row.hospital_id,
        hospital_name: row.hospital_name,
        created_at: row.created_at,
        chief_complaint_detail: row.chief_complaint_detail,
        onset_date: row.onset_date,
        course_detail: row.course_detail,
        adherence_reason: row.adherence_reason,
        has_adverse_events: row.has_adverse_events,
        adverse_events_detail: row.adverse_events_detail,
        has_allergies: row.has_allergies,
        allergies_detail: row.allergies_detail,
        doctor_note: row.doctor_note,
    })
}

/// Convert a validated request into the storage input.
///
/// Optional text answers that are blank are stored as NULL.
pub fn convert_to_data_new_intake(
    request: &CreateIntakeRequest,
    patient_id: Option<String>,
) -> data::intake::NewIntake {
    data::intake::NewIntake {
        patient_id,
        hospital_id: request.hospital_id.trim().to_string(),
        hospital_name: request.hospital_name.trim().to_string(),
        chief_complaint: request.chief_complaint.clone(),
        chief_complaint_detail: non_blank(&request.chief_complaint_detail),
        onset_date: request.onset_date.trim().to_string(),
        course_status: request.course_status.clone(),
        course_detail: non_blank(&request.course_detail),
        adherence: request.adherence.clone(),
        adherence_reason: non_blank(&request.adherence_reason),
        has_adverse_events: request.has_adverse_events,
        adverse_events_detail: non_blank(&request.adverse_events_detail),
        has_allergies: request.has_allergies,
        allergies_detail: non_blank(&request.allergies_detail),
        doctor_note: non_blank(&request.doctor_note),
    }
}

/// Convert a stored medication to the domain entity
pub fn convert_to_domain_medication(row: data::medication::Medication) -> Result<Medication, String> {
    Ok(Medication {
        source_type: parse_column(&row.source_type, "medications", &row.id)?,
        id: row.id,
        intake_id: row.intake_id,
        medication_name: row.medication_name,
        dose: row.dose,
        frequency: row.frequency,
        duration: row.duration,
        prescription_date: row.prescription_date,
        dispensing_date: row.dispensing_date,
        confidence: row.confidence,
        needs_verification: row.needs_verification,
        raw_ocr_text: row.raw_ocr_text,
    })
}

/// Convert a stored verification flag to the domain entity
pub fn convert_to_domain_flag(row: data::medication::VerificationFlag) -> Result<VerificationFlag, String> {
    Ok(VerificationFlag {
        flag_type: parse_column(&row.flag_type, "verification_flags", &row.id)?,
        id: row.id,
        intake_id: row.intake_id,
        description: row.description,
        related_medication_ids: row.related_medication_ids,
    })
}

/// Convert a stored access-log entry to the domain entity
pub fn convert_to_domain_access_log(row: data::access::AccessLog) -> Result<AccessLog, String> {
    Ok(AccessLog {
        action: parse_column(&row.action, "access_logs", &row.id)?,
        id: row.id,
        intake_id: row.intake_id,
        token_id: row.token_id,
        accessed_at: row.accessed_at,
    })
}

/// Convert a stored notification to the domain entity
pub fn convert_to_domain_notification(row: data::notification::Notification) -> Result<Notification, String> {
    Ok(Notification {
        notification_type: parse_column(&row.notification_type, "notifications", &row.id)?,
        id: row.id,
        patient_id: row.patient_id,
        title: row.title,
        message: row.message,
        related_intake_id: row.related_intake_id,
        is_read: row.is_read,
        created_at: row.created_at,
    })
}

/// Convert a stored adherence log to the domain entity
pub fn convert_to_domain_adherence_log(row: data::adherence::AdherenceLog) -> Result<AdherenceLog, String> {
    Ok(AdherenceLog {
        status: parse_column(&row.status, "adherence_logs", &row.id)?,
        id: row.id,
        patient_id: row.patient_id,
        medication_id: row.medication_id,
        scheduled_time: row.scheduled_time,
        taken_at: row.taken_at,
        notes: row.notes,
        created_at: row.created_at,
    })
}

/// Convert every row, stopping at the first that fails
pub fn convert_all<T, U>(rows: Vec<T>, convert: fn(T) -> Result<U, String>) -> Result<Vec<U>, String> {
    rows.into_iter().map(convert).collect()
}

/// Trimmed copy of an optional answer, `None` when blank
pub fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ChiefComplaint, MedicationSource};

    fn stored_intake(chief_complaint: &str) -> data::intake::Intake {
        data::intake::Intake {
            id: "intake-1".to_string(),
            patient_id: None,
            hospital_id: "hospital-1".to_string(),
            hospital_name: "Harbor Clinic".to_string(),
            created_at: "2024-03-01T00:00:00.000Z".to_string(),
            chief_complaint: chief_complaint.to_string(),
            chief_complaint_detail: None,
            onset_date: "2024-02-28".to_string(),
            course_status: "stable".to_string(),
            course_detail: None,
            adherence: "yes".to_string(),
            adherence_reason: None,
            has_adverse_events: false,
            adverse_events_detail: None,
            has_allergies: true,
            allergies_detail: Some("penicillin".to_string()),
            doctor_note: None,
            is_deleted: false,
        }
    }

    #[test]
    fn test_convert_intake_parses_enums() {
        let intake = convert_to_domain_intake(stored_intake("cough")).unwrap();
        assert_eq!(intake.chief_complaint, ChiefComplaint::Cough);
        assert_eq!(intake.allergies_detail.as_deref(), Some("penicillin"));
    }

    #[test]
    fn test_convert_intake_reports_unknown_value() {
        let err = convert_to_domain_intake(stored_intake("sneezing")).unwrap_err();
        assert!(err.contains("intakes row intake-1"));
    }

    #[test]
    fn test_convert_medication() {
        let medication = convert_to_domain_medication(data::medication::Medication {
            id: "med-1".to_string(),
            intake_id: "intake-1".to_string(),
            medication_name: "Ibuprofen".to_string(),
            dose: None,
            frequency: None,
            duration: None,
            prescription_date: None,
            dispensing_date: None,
            confidence: 80,
            needs_verification: false,
            raw_ocr_text: None,
            source_type: "existing_prescription".to_string(),
        })
        .unwrap();
        assert_eq!(medication.source_type, MedicationSource::ExistingPrescription);
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(&Some("  note ".to_string())), Some("note".to_string()));
        assert_eq!(non_blank(&Some("   ".to_string())), None);
        assert_eq!(non_blank(&None), None);
    }
}
