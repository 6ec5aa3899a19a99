use serde::{Deserialize, Serialize};

/// Storage model for a medication attached to an intake
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub id: String,
    pub intake_id: String,
    pub medication_name: String,
    pub dose: Option<String>,
    pub frequency: Option<String>,
    pub duration: Option<String>,
    pub prescription_date: Option<String>,
    pub dispensing_date: Option<String>,
    pub confidence: i64,
    pub needs_verification: bool,
    pub raw_ocr_text: Option<String>,
    pub source_type: String,
}

/// Input for inserting a medication
#[derive(Debug, Clone, Default)]
pub struct NewMedication {
    pub intake_id: String,
    pub medication_name: String,
    pub dose: Option<String>,
    pub frequency: Option<String>,
    pub duration: Option<String>,
    pub prescription_date: Option<String>,
    pub dispensing_date: Option<String>,
    pub confidence: i64,
    pub needs_verification: bool,
    pub raw_ocr_text: Option<String>,
    pub source_type: String,
}

/// Storage model for a verification flag raised on an intake
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationFlag {
    pub id: String,
    pub intake_id: String,
    pub flag_type: String,
    pub description: String,
    /// Stored as a JSON array
    pub related_medication_ids: Option<Vec<String>>,
}

/// Input for inserting a verification flag
#[derive(Debug, Clone, Default)]
pub struct NewVerificationFlag {
    pub intake_id: String,
    pub flag_type: String,
    pub description: String,
    pub related_medication_ids: Option<Vec<String>>,
}
