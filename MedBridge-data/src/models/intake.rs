use serde::{Deserialize, Serialize};

/// Storage model for an intake questionnaire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intake {
    pub id: String,
    pub patient_id: Option<String>,
    pub hospital_id: String,
    pub hospital_name: String,
    pub created_at: String,
    pub chief_complaint: String,
    pub chief_complaint_detail: Option<String>,
    pub onset_date: String,
    pub course_status: String,
    pub course_detail: Option<String>,
    pub adherence: String,
    pub adherence_reason: Option<String>,
    pub has_adverse_events: bool,
    pub adverse_events_detail: Option<String>,
    pub has_allergies: bool,
    pub allergies_detail: Option<String>,
    pub doctor_note: Option<String>,
    pub is_deleted: bool,
}

/// Input for inserting an intake
#[derive(Debug, Clone, Default)]
pub struct NewIntake {
    pub patient_id: Option<String>,
    pub hospital_id: String,
    pub hospital_name: String,
    pub chief_complaint: String,
    pub chief_complaint_detail: Option<String>,
    pub onset_date: String,
    pub course_status: String,
    pub course_detail: Option<String>,
    pub adherence: String,
    pub adherence_reason: Option<String>,
    pub has_adverse_events: bool,
    pub adverse_events_detail: Option<String>,
    pub has_allergies: bool,
    pub allergies_detail: Option<String>,
    pub doctor_note: Option<String>,
}
