use std::collections::HashMap;

use serde::Deserialize;
use utoipa::ToSchema;

use medbridge_domain::entities::CreateIntakeRequest;

use super::common::ErrorResponse;

/// Multipart field carrying prescription photos
pub const DOCUMENTS_FIELD: &str = "documents";

/// Multipart form accepted by `POST /api/intakes`.
///
/// Only used for the API documentation; the handler reads the parts directly.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IntakeForm {
    pub device_id: Option<String>,
    pub hospital_id: String,
    pub hospital_name: String,
    /// One of pain, fever, cough, headache, fatigue, dizziness, nausea, digestive, skin, respiratory, other
    pub chief_complaint: String,
    pub chief_complaint_detail: Option<String>,
    pub onset_date: String,
    /// One of improving, worsening, stable
    pub course_status: String,
    pub course_detail: Option<String>,
    /// One of yes, partial, no
    pub adherence: String,
    pub adherence_reason: Option<String>,
    /// "true" when the patient had adverse events
    pub has_adverse_events: Option<String>,
    pub adverse_events_detail: Option<String>,
    /// "true" when the patient has allergies
    pub has_allergies: Option<String>,
    pub allergies_detail: Option<String>,
    pub doctor_note: Option<String>,
    /// JSON array of prescription ids to carry over
    pub existing_prescription_ids: Option<String>,
    /// Prescription or dispensing record photos
    #[schema(value_type = Option<Vec<String>>)]
    pub documents: Option<Vec<Vec<u8>>>,
}

/// Build the intake request from the text parts of the form.
///
/// Booleans are true only for the literal "true". Missing answers are left
/// empty so validation reports them.
pub fn intake_request_from_fields(mut fields: HashMap<String, String>) -> Result<CreateIntakeRequest, ErrorResponse> {
    let mut take = |name: &str| fields.remove(name);

    let existing_prescription_ids = match take("existingPrescriptionIds") {
        Some(raw) if !raw.trim().is_empty() => serde_json::from_str::<Vec<String>>(&raw)
            .map_err(|_| ErrorResponse::bad_request("existingPrescriptionIds must be a JSON array of strings"))?,
        _ => Vec::new(),
    };

    Ok(CreateIntakeRequest {
        device_id: take("deviceId"),
        hospital_id: take("hospitalId").unwrap_or_default(),
        hospital_name: take("hospitalName").unwrap_or_default(),
        chief_complaint: take("chiefComplaint").unwrap_or_default(),
        chief_complaint_detail: take("chiefComplaintDetail"),
        onset_date: take("onsetDate").unwrap_or_default(),
        course_status: take("courseStatus").unwrap_or_default(),
        course_detail: take("courseDetail"),
        adherence: take("adherence").unwrap_or_default(),
        adherence_reason: take("adherenceReason"),
        has_adverse_events: take("hasAdverseEvents").as_deref() == Some("true"),
        adverse_events_detail: take("adverseEventsDetail"),
        has_allergies: take("hasAllergies").as_deref() == Some("true"),
        allergies_detail: take("allergiesDetail"),
        doctor_note: take("doctorNote"),
        existing_prescription_ids,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_text_fields_are_mapped() {
        let request = intake_request_from_fields(fields(&[
            ("deviceId", "device-1"),
            ("hospitalId", "h-1"),
            ("hospitalName", "Harbor Clinic"),
            ("chiefComplaint", "cough"),
            ("onsetDate", "2024-03-01"),
            ("courseStatus", "stable"),
            ("adherence", "yes"),
            ("hasAllergies", "true"),
            ("hasAdverseEvents", "yes"),
            ("allergiesDetail", "penicillin"),
            ("existingPrescriptionIds", r#"["p-1","p-2"]"#),
        ]))
        .unwrap();

        assert_eq!(request.device_id.as_deref(), Some("device-1"));
        assert_eq!(request.chief_complaint, "cough");
        assert!(request.has_allergies);
        assert!(!request.has_adverse_events);
        assert_eq!(request.allergies_detail.as_deref(), Some("penicillin"));
        assert_eq!(request.existing_prescription_ids, vec!["p-1", "p-2"]);
    }

    #[test]
    fn test_missing_fields_are_left_for_validation() {
        let request = intake_request_from_fields(HashMap::new()).unwrap();
        assert!(request.hospital_id.is_empty());
        assert!(request.existing_prescription_ids.is_empty());
        assert!(!request.has_allergies);
    }

    #[test]
    fn test_malformed_prescription_ids_are_rejected() {
        let err = intake_request_from_fields(fields(&[("existingPrescriptionIds", "p-1,p-2")])).unwrap_err();
        assert_eq!(err.error, "bad_request");
    }
}
