use serde::{Deserialize, Serialize};

pub use medbridge_data::models::notification::NotificationSettings;

string_enum! {
    /// Reason a notification was sent
    NotificationType("notification type") {
        IntakeViewed => "intake_viewed",
        MedicationReminder => "medication_reminder",
        FollowUp => "follow_up",
    }
}

/// A message shown in the patient's inbox
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub patient_id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub related_intake_id: Option<String>,
    pub is_read: bool,
    pub created_at: String,
}

/// Inbox contents
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "with-api", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct NotificationList {
    pub notifications: Vec<Notification>,
    pub unread_count: usize,
}

/// Partial settings update; absent fields keep their value
#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "with-api", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct UpdateNotificationSettings {
    pub intake_viewed_enabled: Option<bool>,
    pub medication_reminder_enabled: Option<bool>,
    pub follow_up_enabled: Option<bool>,
}

impl UpdateNotificationSettings {
    /// Apply the update on top of existing settings
    pub fn apply_to(&self, settings: &mut NotificationSettings) {
        if let Some(enabled) = self.intake_viewed_enabled {
            settings.intake_viewed_enabled = enabled;
        }
        if let Some(enabled) = self.medication_reminder_enabled {
            settings.medication_reminder_enabled = enabled;
        }
        if let Some(enabled) = self.follow_up_enabled {
            settings.follow_up_enabled = enabled;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_update_keeps_other_fields() {
        let mut settings = NotificationSettings::defaults_for("patient-1");
        UpdateNotificationSettings {
            follow_up_enabled: Some(false),
            ..Default::default()
        }
        .apply_to(&mut settings);

        assert!(settings.intake_viewed_enabled);
        assert!(settings.medication_reminder_enabled);
        assert!(!settings.follow_up_enabled);
    }
}
