use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::access::{AccessLog, AccessToken};
use super::adherence::AdherenceSummary;
use super::medication::{Medication, VerificationFlag};

string_enum! {
    /// Main reason for the visit
    ChiefComplaint("chief complaint") {
        Pain => "pain",
        Fever => "fever",
        Cough => "cough",
        Headache => "headache",
        Fatigue => "fatigue",
        Dizziness => "dizziness",
        Nausea => "nausea",
        Digestive => "digestive",
        Skin => "skin",
        Respiratory => "respiratory",
        Other => "other",
    }
}

string_enum! {
    /// How symptoms developed since onset
    CourseStatus("course status") {
        Improving => "improving",
        Worsening => "worsening",
        Stable => "stable",
    }
}

string_enum! {
    /// Whether the patient took previous medication as prescribed
    AdherenceAnswer("adherence answer") {
        Yes => "yes",
        Partial => "partial",
        No => "no",
    }
}

/// A completed intake questionnaire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Intake {
    pub id: String,
    pub patient_id: Option<String>,
    pub hospital_id: String,
    pub hospital_name: String,
    pub created_at: String,
    pub chief_complaint: ChiefComplaint,
    pub chief_complaint_detail: Option<String>,
    pub onset_date: String,
    pub course_status: CourseStatus,
    pub course_detail: Option<String>,
    pub adherence: AdherenceAnswer,
    pub adherence_reason: Option<String>,
    pub has_adverse_events: bool,
    pub adverse_events_detail: Option<String>,
    pub has_allergies: bool,
    pub allergies_detail: Option<String>,
    pub doctor_note: Option<String>,
}

/// Questionnaire answers submitted with an intake.
///
/// Enumerated answers arrive as free text from the multipart form and are
/// checked against their allowed values here.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntakeRequest {
    /// Opaque id of the submitting device, links the intake to a patient
    pub device_id: Option<String>,

    #[validate(length(min = 1, message = "hospitalId is required"))]
    pub hospital_id: String,

    #[validate(length(min = 1, message = "hospitalName is required"))]
    pub hospital_name: String,

    #[validate(custom = "validate_chief_complaint")]
    pub chief_complaint: String,

    pub chief_complaint_detail: Option<String>,

    #[validate(length(min = 1, message = "onsetDate is required"))]
    pub onset_date: String,

    #[validate(custom = "validate_course_status")]
    pub course_status: String,

    pub course_detail: Option<String>,

    #[validate(custom = "validate_adherence")]
    pub adherence: String,

    pub adherence_reason: Option<String>,

    #[serde(default)]
    pub has_adverse_events: bool,

    pub adverse_events_detail: Option<String>,

    #[serde(default)]
    pub has_allergies: bool,

    pub allergies_detail: Option<String>,

    pub doctor_note: Option<String>,

    /// Previously stored prescriptions to carry over into this intake
    #[serde(default)]
    pub existing_prescription_ids: Vec<String>,
}

fn choice_error(message: String) -> ValidationError {
    let mut error = ValidationError::new("invalid_choice");
    error.message = Some(Cow::from(message));
    error
}

fn validate_chief_complaint(value: &str) -> Result<(), ValidationError> {
    value.parse::<ChiefComplaint>().map(|_| ()).map_err(choice_error)
}

fn validate_course_status(value: &str) -> Result<(), ValidationError> {
    value.parse::<CourseStatus>().map(|_| ()).map_err(choice_error)
}

fn validate_adherence(value: &str) -> Result<(), ValidationError> {
    value.parse::<AdherenceAnswer>().map(|_| ()).map_err(choice_error)
}

/// A file uploaded with an intake
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedDocument {
    /// Whether the content type is one the extractor accepts
    pub fn is_supported_type(&self) -> bool {
        self.content_type.starts_with("image/") || self.content_type == "application/pdf"
    }

    /// Name used in messages
    pub fn display_name(&self) -> &str {
        self.file_name.as_deref().unwrap_or("document")
    }
}

/// Result of submitting an intake
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "with-api", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct IntakeCreated {
    pub intake: Intake,
    pub token: AccessToken,
    pub share_url: String,
    pub medications: Vec<Medication>,
    pub verification_flags: Vec<VerificationFlag>,
    /// Per-document extraction problems; the intake is stored regardless
    pub extraction_errors: Vec<String>,
}

/// Everything a clinician sees for one intake
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "with-api", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct IntakeSummary {
    pub intake: Intake,
    pub medications: Vec<Medication>,
    pub verification_flags: Vec<VerificationFlag>,
    pub access_logs: Vec<AccessLog>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adherence_summary: Option<AdherenceSummary>,
}
