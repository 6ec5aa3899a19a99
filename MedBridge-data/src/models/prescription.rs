use serde::{Deserialize, Serialize};

/// Storage model for a prescription read from one uploaded document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub id: String,
    pub patient_id: String,
    pub intake_id: Option<String>,
    pub hospital_name: Option<String>,
    pub chief_complaint: Option<String>,
    pub prescription_date: Option<String>,
    /// Diagnosis printed on the document, if any
    pub patient_condition: Option<String>,
    pub created_at: String,
}

/// Input for inserting a prescription
#[derive(Debug, Clone, Default)]
pub struct NewPrescription {
    pub patient_id: String,
    pub intake_id: Option<String>,
    pub hospital_name: Option<String>,
    pub chief_complaint: Option<String>,
    pub prescription_date: Option<String>,
    pub patient_condition: Option<String>,
}

/// Storage model for a medication listed on a prescription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionMedication {
    pub id: String,
    pub prescription_id: String,
    pub medication_name: String,
    pub dose: Option<String>,
    pub frequency: Option<String>,
    pub duration: Option<String>,
    pub ingredients: Option<String>,
    pub indication: Option<String>,
    pub doses_per_day: Option<i64>,
    pub total_doses: Option<i64>,
    pub confidence: i64,
}

/// Input for inserting a prescription medication
#[derive(Debug, Clone, Default)]
pub struct NewPrescriptionMedication {
    pub prescription_id: String,
    pub medication_name: String,
    pub dose: Option<String>,
    pub frequency: Option<String>,
    pub duration: Option<String>,
    pub ingredients: Option<String>,
    pub indication: Option<String>,
    pub doses_per_day: Option<i64>,
    pub total_doses: Option<i64>,
    pub confidence: i64,
}
