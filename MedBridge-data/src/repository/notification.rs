use async_trait::async_trait;
use rusqlite::{OptionalExtension, Row};
use uuid::Uuid;

use super::errors::RepositoryError;
use crate::database::DatabasePool;
use crate::models::notification::{NewNotification, Notification, NotificationSettings};
use crate::models::timestamp_now;

/// Repository trait for patient notifications and their settings
#[async_trait]
pub trait NotificationRepositoryTrait: Send + Sync {
    /// Notifications of a patient, newest first
    async fn list_by_patient(&self, patient_id: &str) -> Result<Vec<Notification>, RepositoryError>;

    /// Number of unread notifications of a patient
    async fn unread_count(&self, patient_id: &str) -> Result<usize, RepositoryError>;

    /// Insert a notification
    async fn create(&self, notification: NewNotification) -> Result<Notification, RepositoryError>;

    /// Mark one notification read. Returns false when it does not exist.
    async fn mark_read(&self, id: &str) -> Result<bool, RepositoryError>;

    /// Mark every notification of a patient read. Returns how many changed.
    async fn mark_all_read(&self, patient_id: &str) -> Result<usize, RepositoryError>;

    /// Stored settings of a patient, if any were saved
    async fn get_settings(&self, patient_id: &str) -> Result<Option<NotificationSettings>, RepositoryError>;

    /// Insert or replace the settings of a patient
    async fn upsert_settings(&self, settings: NotificationSettings) -> Result<NotificationSettings, RepositoryError>;
}

/// SQLite-backed notification repository
#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: DatabasePool,
}

impl NotificationRepository {
    /// Create a new repository
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn map_notification(row: &Row<'_>) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        notification_type: row.get(2)?,
        title: row.get(3)?,
        message: row.get(4)?,
        related_intake_id: row.get(5)?,
        is_read: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn map_settings(row: &Row<'_>) -> rusqlite::Result<NotificationSettings> {
    Ok(NotificationSettings {
        patient_id: row.get(0)?,
        intake_viewed_enabled: row.get(1)?,
        medication_reminder_enabled: row.get(2)?,
        follow_up_enabled: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

#[async_trait]
impl NotificationRepositoryTrait for NotificationRepository {
    async fn list_by_patient(&self, patient_id: &str) -> Result<Vec<Notification>, RepositoryError> {
        let conn = self.pool.connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, patient_id, type, title, message, related_intake_id, is_read, created_at \
             FROM notifications WHERE patient_id = ?1 ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt.query_map([patient_id], map_notification)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    async fn unread_count(&self, patient_id: &str) -> Result<usize, RepositoryError> {
        let conn = self.pool.connection()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE patient_id = ?1 AND is_read = 0",
            [patient_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    async fn create(&self, notification: NewNotification) -> Result<Notification, RepositoryError> {
        let created = Notification {
            id: Uuid::new_v4().to_string(),
            patient_id: notification.patient_id,
            notification_type: notification.notification_type,
            title: notification.title,
            message: notification.message,
            related_intake_id: notification.related_intake_id,
            is_read: false,
            created_at: timestamp_now(),
        };

        let conn = self.pool.connection()?;
        conn.execute(
            "INSERT INTO notifications (id, patient_id, type, title, message, related_intake_id, is_read, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            (
                &created.id,
                &created.patient_id,
                &created.notification_type,
                &created.title,
                &created.message,
                &created.related_intake_id,
                created.is_read,
                &created.created_at,
            ),
        )?;
        Ok(created)
    }

    async fn mark_read(&self, id: &str) -> Result<bool, RepositoryError> {
        let conn = self.pool.connection()?;
        let updated = conn.execute("UPDATE notifications SET is_read = 1 WHERE id = ?1", [id])?;
        Ok(updated > 0)
    }

    async fn mark_all_read(&self, patient_id: &str) -> Result<usize, RepositoryError> {
        let conn = self.pool.connection()?;
        let updated = conn.execute(
            "UPDATE notifications SET is_read = 1 WHERE patient_id = ?1 AND is_read = 0",
            [patient_id],
        )?;
        Ok(updated)
    }

    async fn get_settings(&self, patient_id: &str) -> Result<Option<NotificationSettings>, RepositoryError> {
        let conn = self.pool.connection()?;
        let settings = conn
            .query_row(
                "SELECT patient_id, intake_viewed_enabled, medication_reminder_enabled, follow_up_enabled, updated_at \
                 FROM notification_settings WHERE patient_id = ?1",
                [patient_id],
                map_settings,
            )
            .optional()?;
        Ok(settings)
    }

    async fn upsert_settings(&self, settings: NotificationSettings) -> Result<NotificationSettings, RepositoryError> {
        let conn = self.pool.connection()?;
        conn.execute(
            "INSERT INTO notification_settings \
             (patient_id, intake_viewed_enabled, medication_reminder_enabled, follow_up_enabled, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(patient_id) DO UPDATE SET \
             intake_viewed_enabled = excluded.intake_viewed_enabled, \
             medication_reminder_enabled = excluded.medication_reminder_enabled, \
             follow_up_enabled = excluded.follow_up_enabled, \
             updated_at = excluded.updated_at",
            (
                &settings.patient_id,
                settings.intake_viewed_enabled,
                settings.medication_reminder_enabled,
                settings.follow_up_enabled,
                &settings.updated_at,
            ),
        )?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(patient_id: &str, title: &str) -> NewNotification {
        NewNotification {
            patient_id: patient_id.to_string(),
            notification_type: "intake_viewed".to_string(),
            title: title.to_string(),
            message: "viewed".to_string(),
            related_intake_id: None,
        }
    }

    #[tokio::test]
    async fn test_unread_counts_and_mark_read() {
        let repo = NotificationRepository::new(DatabasePool::in_memory().unwrap());
        let first = repo.create(notification("patient-1", "first")).await.unwrap();
        repo.create(notification("patient-1", "second")).await.unwrap();
        repo.create(notification("patient-2", "other")).await.unwrap();

        assert_eq!(repo.unread_count("patient-1").await.unwrap(), 2);
        assert!(repo.mark_read(&first.id).await.unwrap());
        assert!(!repo.mark_read("missing").await.unwrap());
        assert_eq!(repo.unread_count("patient-1").await.unwrap(), 1);

        assert_eq!(repo.mark_all_read("patient-1").await.unwrap(), 1);
        assert_eq!(repo.unread_count("patient-1").await.unwrap(), 0);
        assert_eq!(repo.unread_count("patient-2").await.unwrap(), 1);

        let listed = repo.list_by_patient("patient-1").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].title, "second");
    }

    #[tokio::test]
    async fn test_settings_upsert() {
        let repo = NotificationRepository::new(DatabasePool::in_memory().unwrap());
        assert!(repo.get_settings("patient-1").await.unwrap().is_none());

        let mut settings = NotificationSettings::defaults_for("patient-1");
        repo.upsert_settings(settings.clone()).await.unwrap();

        settings.follow_up_enabled = false;
        repo.upsert_settings(settings.clone()).await.unwrap();

        assert_eq!(repo.get_settings("patient-1").await.unwrap(), Some(settings));
    }
}
