use serde::{Deserialize, Serialize};

string_enum! {
    /// Where a medication record came from
    MedicationSource("medication source") {
        Prescription => "prescription",
        DispensingRecord => "dispensing_record",
        ExistingPrescription => "existing_prescription",
    }
}

string_enum! {
    /// Kind of issue a clinician should double-check
    FlagType("flag type") {
        Duplicate => "duplicate",
        DateOverlap => "date_overlap",
        AllergyConflict => "allergy_conflict",
        LowConfidence => "low_confidence",
    }
}

/// A medication attached to an intake
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(utoipa::ToSchema))]
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
    /// Extraction confidence, 0 to 100
    pub confidence: i64,
    pub needs_verification: bool,
    pub raw_ocr_text: Option<String>,
    pub source_type: MedicationSource,
}

/// An issue raised on an intake for manual review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct VerificationFlag {
    pub id: String,
    pub intake_id: String,
    pub flag_type: FlagType,
    pub description: String,
    pub related_medication_ids: Option<Vec<String>>,
}

/// One medication as read from a document by the extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedMedication {
    pub medication_name: String,
    pub dose: Option<String>,
    pub frequency: Option<String>,
    pub duration: Option<String>,
    pub prescription_date: Option<String>,
    pub dispensing_date: Option<String>,
    pub confidence: i64,
    /// Full text of the document the medication was read from
    pub raw_ocr_text: String,
    pub ingredients: Option<String>,
    pub indication: Option<String>,
    pub doses_per_day: Option<i64>,
    pub total_doses: Option<i64>,
}

/// Outcome of reading one document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrResult {
    pub medications: Vec<ExtractedMedication>,
    pub raw_text: String,
    pub hospital_name: Option<String>,
    pub patient_condition: Option<String>,
    /// Problems met while reading; empty on a clean read
    pub errors: Vec<String>,
}

impl OcrResult {
    /// Empty result carrying a single error
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            errors: vec![error.into()],
            ..Default::default()
        }
    }

    /// Prescription date of the first medication that has one
    pub fn prescription_date(&self) -> Option<String> {
        self.medications
            .iter()
            .find_map(|m| m.prescription_date.clone())
    }
}

/// A potential problem across the medications of an intake
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedConflict {
    #[serde(rename = "type")]
    pub flag_type: FlagType,
    pub description: String,
}
