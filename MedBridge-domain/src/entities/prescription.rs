use serde::Serialize;

pub use medbridge_data::models::prescription::{Prescription, PrescriptionMedication};

/// A stored prescription with its medications
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "with-api", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionWithMedications {
    #[serde(flatten)]
    pub prescription: Prescription,
    pub medications: Vec<PrescriptionMedication>,
}

/// Aggregate of one medication across a patient's prescriptions
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "with-api", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct MedicationStats {
    pub medication_name: String,
    pub total_count: usize,
    pub avg_confidence: i64,
    pub last_prescribed_date: Option<String>,
    pub doses: Vec<String>,
    pub frequencies: Vec<String>,
}

/// Visit history of a patient for one chief complaint
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "with-api", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct SymptomHistory {
    pub chief_complaint: String,
    pub total_visits: usize,
    pub first_visit_date: Option<String>,
    pub last_visit_date: Option<String>,
    pub prescriptions: Vec<PrescriptionWithMedications>,
    pub medication_stats: Vec<MedicationStats>,
}
