use serde::{Deserialize, Serialize};

/// Storage model for a patient notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub patient_id: String,
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub related_intake_id: Option<String>,
    pub is_read: bool,
    pub created_at: String,
}

/// Input for inserting a notification
#[derive(Debug, Clone, Default)]
pub struct NewNotification {
    pub patient_id: String,
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub related_intake_id: Option<String>,
}

/// Per-patient notification preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    pub patient_id: String,
    pub intake_viewed_enabled: bool,
    pub medication_reminder_enabled: bool,
    pub follow_up_enabled: bool,
    pub updated_at: String,
}

impl NotificationSettings {
    /// Settings used for a patient who never saved any: everything enabled
    pub fn defaults_for(patient_id: &str) -> Self {
        Self {
            patient_id: patient_id.to_string(),
            intake_viewed_enabled: true,
            medication_reminder_enabled: true,
            follow_up_enabled: true,
            updated_at: super::timestamp_now(),
        }
    }
}
