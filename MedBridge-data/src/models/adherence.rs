use serde::{Deserialize, Serialize};

/// Storage model for one scheduled dose and what happened to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdherenceLog {
    pub id: String,
    pub patient_id: String,
    pub medication_id: String,
    pub scheduled_time: String,
    pub taken_at: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: String,
}

/// Input for inserting an adherence log
#[derive(Debug, Clone, Default)]
pub struct NewAdherenceLog {
    pub patient_id: String,
    pub medication_id: String,
    pub scheduled_time: String,
    pub taken_at: Option<String>,
    pub status: String,
    pub notes: Option<String>,
}
