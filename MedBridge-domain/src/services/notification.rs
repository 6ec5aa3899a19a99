use std::sync::Arc;

use tracing::{info, instrument, warn};

use medbridge_data::models::notification::NewNotification;
use medbridge_data::models::timestamp_now;
use medbridge_data::repository::{NotificationRepositoryTrait, PatientRepositoryTrait};

use super::ServiceError;
use crate::entities::conversions::{convert_all, convert_to_domain_notification};
use crate::entities::{Intake, NotificationList, NotificationSettings, NotificationType, UpdateNotificationSettings};

/// Patient inbox and notification preferences
#[derive(Clone)]
pub struct NotificationService {
    patients: Arc<dyn PatientRepositoryTrait>,
    notifications: Arc<dyn NotificationRepositoryTrait>,
}

impl NotificationService {
    pub fn new(
        patients: Arc<dyn PatientRepositoryTrait>,
        notifications: Arc<dyn NotificationRepositoryTrait>,
    ) -> Self {
        Self { patients, notifications }
    }

    /// Notifications of a device's patient, newest first. Unknown devices
    /// have an empty inbox.
    #[instrument(skip(self))]
    pub async fn list(&self, device_id: &str) -> Result<NotificationList, ServiceError> {
        let patient = match self.patients.get_by_device_id(device_id).await? {
            Some(patient) => patient,
            None => {
                return Ok(NotificationList {
                    notifications: Vec::new(),
                    unread_count: 0,
                })
            }
        };

        let rows = self.notifications.list_by_patient(&patient.id).await?;
        let notifications =
            convert_all(rows, convert_to_domain_notification).map_err(ServiceError::DataIntegrity)?;
        let unread_count = self.notifications.unread_count(&patient.id).await?;

        Ok(NotificationList {
            notifications,
            unread_count,
        })
    }

    /// Mark one notification as read
    #[instrument(skip(self))]
    pub async fn mark_read(&self, notification_id: &str) -> Result<(), ServiceError> {
        if self.notifications.mark_read(notification_id).await? {
            Ok(())
        } else {
            Err(ServiceError::NotFound(format!("Notification {} not found", notification_id)))
        }
    }

    /// Mark every notification of a device's patient as read.
    /// Returns the number of notifications changed.
    #[instrument(skip(self))]
    pub async fn mark_all_read(&self, device_id: &str) -> Result<usize, ServiceError> {
        match self.patients.get_by_device_id(device_id).await? {
            Some(patient) => Ok(self.notifications.mark_all_read(&patient.id).await?),
            None => Ok(0),
        }
    }

    /// Settings of a device's patient, defaults when never saved
    #[instrument(skip(self))]
    pub async fn settings(&self, device_id: &str) -> Result<NotificationSettings, ServiceError> {
        let patient = self.patients.get_or_create(device_id).await?;
        self.settings_for_patient(&patient.id).await
    }

    /// Apply a partial settings update
    #[instrument(skip(self))]
    pub async fn update_settings(
        &self,
        device_id: &str,
        update: UpdateNotificationSettings,
    ) -> Result<NotificationSettings, ServiceError> {
        let patient = self.patients.get_or_create(device_id).await?;
        let mut settings = self.settings_for_patient(&patient.id).await?;
        update.apply_to(&mut settings);
        settings.updated_at = timestamp_now();

        let saved = self.notifications.upsert_settings(settings).await?;
        info!("Updated notification settings for patient {}", patient.id);
        Ok(saved)
    }

    async fn settings_for_patient(&self, patient_id: &str) -> Result<NotificationSettings, ServiceError> {
        Ok(self
            .notifications
            .get_settings(patient_id)
            .await?
            .unwrap_or_else(|| NotificationSettings::defaults_for(patient_id)))
    }

    /// Tell the patient a clinician opened their intake.
    ///
    /// Failures are logged; viewing a summary never fails because of them.
    pub async fn notify_intake_viewed(&self, intake: &Intake) {
        let patient_id = match &intake.patient_id {
            Some(id) => id.clone(),
            None => return,
        };

        let result = self.send_intake_viewed(intake, &patient_id).await;

        match result {
            Ok(true) => info!("Sent intake_viewed notification for intake {}", intake.id),
            Ok(false) => {}
            Err(e) => warn!("Failed to send intake_viewed notification for intake {}: {}", intake.id, e),
        }
    }

    async fn send_intake_viewed(&self, intake: &Intake, patient_id: &str) -> Result<bool, ServiceError> {
        let settings = self.settings_for_patient(patient_id).await?;
        if !settings.intake_viewed_enabled {
            return Ok(false);
        }

        self.notifications
            .create(NewNotification {
                patient_id: patient_id.to_string(),
                notification_type: NotificationType::IntakeViewed.to_string(),
                title: "Your intake was viewed".to_string(),
                message: format!("A clinician at {} opened the intake you shared.", intake.hospital_name),
                related_intake_id: Some(intake.id.clone()),
            })
            .await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{AdherenceAnswer, ChiefComplaint, CourseStatus};
    use medbridge_data::database::DatabasePool;
    use medbridge_data::repository::{NotificationRepository, PatientRepository};

    fn service() -> (NotificationService, Arc<PatientRepository>) {
        let pool = DatabasePool::in_memory().unwrap();
        let patients = Arc::new(PatientRepository::new(pool.clone()));
        let service = NotificationService::new(patients.clone(), Arc::new(NotificationRepository::new(pool)));
        (service, patients)
    }

    fn intake(patient_id: Option<String>) -> Intake {
        Intake {
            id: "intake-1".to_string(),
            patient_id,
            hospital_id: "hospital-1".to_string(),
            hospital_name: "Harbor Clinic".to_string(),
            created_at: timestamp_now(),
            chief_complaint: ChiefComplaint::Cough,
            chief_complaint_detail: None,
            onset_date: "2024-03-01".to_string(),
            course_status: CourseStatus::Stable,
            course_detail: None,
            adherence: AdherenceAnswer::Yes,
            adherence_reason: None,
            has_adverse_events: false,
            adverse_events_detail: None,
            has_allergies: false,
            allergies_detail: None,
            doctor_note: None,
        }
    }

    #[tokio::test]
    async fn test_unknown_device_has_empty_inbox() {
        let (service, _) = service();
        let list = service.list("unknown-device").await.unwrap();
        assert!(list.notifications.is_empty());
        assert_eq!(list.unread_count, 0);
        assert_eq!(service.mark_all_read("unknown-device").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_intake_viewed_notification_lifecycle() {
        let (service, patients) = service();
        let patient = patients.get_or_create("device-1").await.unwrap();

        service.notify_intake_viewed(&intake(Some(patient.id.clone()))).await;
        service.notify_intake_viewed(&intake(None)).await;

        let list = service.list("device-1").await.unwrap();
        assert_eq!(list.notifications.len(), 1);
        assert_eq!(list.unread_count, 1);
        assert_eq!(list.notifications[0].notification_type, NotificationType::IntakeViewed);
        assert_eq!(list.notifications[0].related_intake_id.as_deref(), Some("intake-1"));

        service.mark_read(&list.notifications[0].id).await.unwrap();
        assert_eq!(service.list("device-1").await.unwrap().unread_count, 0);

        assert!(matches!(service.mark_read("missing").await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_disabled_setting_suppresses_notification() {
        let (service, patients) = service();
        let patient = patients.get_or_create("device-2").await.unwrap();

        let settings = service
            .update_settings(
                "device-2",
                UpdateNotificationSettings {
                    intake_viewed_enabled: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!settings.intake_viewed_enabled);
        assert!(settings.follow_up_enabled);

        service.notify_intake_viewed(&intake(Some(patient.id))).await;
        assert!(service.list("device-2").await.unwrap().notifications.is_empty());

        let reread = service.settings("device-2").await.unwrap();
        assert!(!reread.intake_viewed_enabled);
    }

    #[tokio::test]
    async fn test_settings_default_to_enabled() {
        let (service, _) = service();
        let settings = service.settings("fresh-device").await.unwrap();
        assert!(settings.intake_viewed_enabled);
        assert!(settings.medication_reminder_enabled);
        assert!(settings.follow_up_enabled);
    }
}
