use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

string_enum! {
    /// What happened to a scheduled dose
    AdherenceStatus("adherence status") {
        Taken => "taken",
        Missed => "missed",
        Skipped => "skipped",
    }
}

/// One scheduled dose and its outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct AdherenceLog {
    pub id: String,
    pub patient_id: String,
    pub medication_id: String,
    pub scheduled_time: String,
    pub taken_at: Option<String>,
    pub status: AdherenceStatus,
    pub notes: Option<String>,
    pub created_at: String,
}

/// Request to record a dose outcome
#[derive(Debug, Clone, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct RecordAdherenceRequest {
    #[validate(length(min = 1, message = "deviceId is required"))]
    pub device_id: String,

    #[validate(length(min = 1, message = "medicationId is required"))]
    pub medication_id: String,

    #[validate(length(min = 1, message = "scheduledTime is required"))]
    pub scheduled_time: String,

    pub taken_at: Option<String>,

    #[validate(custom = "validate_status")]
    pub status: String,

    pub notes: Option<String>,
}

fn validate_status(value: &str) -> Result<(), ValidationError> {
    value.parse::<AdherenceStatus>().map(|_| ()).map_err(|message| {
        let mut error = ValidationError::new("invalid_choice");
        error.message = Some(Cow::from(message));
        error
    })
}

/// Adherence figures for a patient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct AdherenceSummary {
    pub total_scheduled: usize,
    pub taken_count: usize,
    pub missed_count: usize,
    pub skipped_count: usize,
    /// Percentage of scheduled doses taken, 100 when nothing was scheduled
    pub adherence_rate: u32,
    pub recent_logs: Vec<AdherenceLog>,
}
