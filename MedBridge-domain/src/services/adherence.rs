use std::sync::Arc;

use tracing::{info, instrument};
use validator::Validate;

use medbridge_data::models::adherence::NewAdherenceLog;
use medbridge_data::repository::{AdherenceRepositoryTrait, PatientRepositoryTrait};

use super::{validation_messages, ServiceError};
use crate::entities::conversions::{convert_all, convert_to_domain_adherence_log, non_blank};
use crate::entities::{AdherenceLog, AdherenceStatus, AdherenceSummary, RecordAdherenceRequest};

/// Logs shown in a summary
const RECENT_LOG_COUNT: usize = 10;

/// Medication adherence tracking
#[derive(Clone)]
pub struct AdherenceService {
    patients: Arc<dyn PatientRepositoryTrait>,
    logs: Arc<dyn AdherenceRepositoryTrait>,
}

impl AdherenceService {
    pub fn new(patients: Arc<dyn PatientRepositoryTrait>, logs: Arc<dyn AdherenceRepositoryTrait>) -> Self {
        Self { patients, logs }
    }

    /// Record what happened to a scheduled dose
    #[instrument(skip(self, request), fields(medication_id = %request.medication_id))]
    pub async fn record(&self, request: RecordAdherenceRequest) -> Result<AdherenceLog, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::Validation(validation_messages(&e)))?;

        let patient = self.patients.get_or_create(&request.device_id).await?;
        let row = self
            .logs
            .create(NewAdherenceLog {
                patient_id: patient.id,
                medication_id: request.medication_id,
                scheduled_time: request.scheduled_time,
                taken_at: non_blank(&request.taken_at),
                status: request.status,
                notes: non_blank(&request.notes),
            })
            .await?;

        info!("Recorded adherence log {} ({})", row.id, row.status);
        convert_to_domain_adherence_log(row).map_err(ServiceError::DataIntegrity)
    }

    /// Adherence summary of a device's patient
    #[instrument(skip(self))]
    pub async fn summary(&self, device_id: &str) -> Result<AdherenceSummary, ServiceError> {
        match self.patients.get_by_device_id(device_id).await? {
            Some(patient) => self.summary_for_patient(&patient.id).await,
            None => Ok(summarize(Vec::new())),
        }
    }

    /// Adherence summary of a patient
    pub async fn summary_for_patient(&self, patient_id: &str) -> Result<AdherenceSummary, ServiceError> {
        let rows = self.logs.list_by_patient(patient_id).await?;
        let logs = convert_all(rows, convert_to_domain_adherence_log).map_err(ServiceError::DataIntegrity)?;
        Ok(summarize(logs))
    }
}

/// Count outcomes of logs ordered newest first
pub fn summarize(logs: Vec<AdherenceLog>) -> AdherenceSummary {
    let count = |status: AdherenceStatus| logs.iter().filter(|log| log.status == status).count();

    let total_scheduled = logs.len();
    let taken_count = count(AdherenceStatus::Taken);
    let missed_count = count(AdherenceStatus::Missed);
    let skipped_count = count(AdherenceStatus::Skipped);

    let adherence_rate = if total_scheduled == 0 {
        100
    } else {
        (taken_count as f64 / total_scheduled as f64 * 100.0).round() as u32
    };

    AdherenceSummary {
        total_scheduled,
        taken_count,
        missed_count,
        skipped_count,
        adherence_rate,
        recent_logs: logs.into_iter().take(RECENT_LOG_COUNT).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medbridge_data::database::DatabasePool;
    use medbridge_data::repository::{AdherenceRepository, PatientRepository};

    fn log(index: usize, status: AdherenceStatus) -> AdherenceLog {
        AdherenceLog {
            id: format!("log-{}", index),
            patient_id: "patient-1".to_string(),
            medication_id: "med-1".to_string(),
            scheduled_time: format!("2024-03-{:02}T08:00:00.000Z", 28 - index),
            taken_at: None,
            status,
            notes: None,
            created_at: "2024-03-28T08:00:00.000Z".to_string(),
        }
    }

    fn request(status: &str) -> RecordAdherenceRequest {
        RecordAdherenceRequest {
            device_id: "device-1".to_string(),
            medication_id: "med-1".to_string(),
            scheduled_time: "2024-03-01T08:00:00.000Z".to_string(),
            taken_at: Some(String::new()),
            status: status.to_string(),
            notes: None,
        }
    }

    #[test]
    fn test_empty_history_counts_as_full_adherence() {
        let summary = summarize(Vec::new());
        assert_eq!(summary.total_scheduled, 0);
        assert_eq!(summary.adherence_rate, 100);
        assert!(summary.recent_logs.is_empty());
    }

    #[test]
    fn test_rate_is_rounded_and_recent_logs_capped() {
        let mut logs = Vec::new();
        for i in 0..12 {
            let status = match i % 3 {
                0 => AdherenceStatus::Taken,
                1 => AdherenceStatus::Missed,
                _ => AdherenceStatus::Skipped,
            };
            logs.push(log(i, status));
        }

        let summary = summarize(logs);
        assert_eq!(summary.total_scheduled, 12);
        assert_eq!(summary.taken_count, 4);
        assert_eq!(summary.missed_count, 4);
        assert_eq!(summary.skipped_count, 4);
        assert_eq!(summary.adherence_rate, 33);
        assert_eq!(summary.recent_logs.len(), 10);
        assert_eq!(summary.recent_logs[0].id, "log-0");

        let two_of_three = summarize(vec![
            log(0, AdherenceStatus::Taken),
            log(1, AdherenceStatus::Taken),
            log(2, AdherenceStatus::Missed),
        ]);
        assert_eq!(two_of_three.adherence_rate, 67);
    }

    #[tokio::test]
    async fn test_record_and_summarize() {
        let pool = DatabasePool::in_memory().unwrap();
        let service = AdherenceService::new(
            Arc::new(PatientRepository::new(pool.clone())),
            Arc::new(AdherenceRepository::new(pool)),
        );

        let recorded = service.record(request("taken")).await.unwrap();
        assert_eq!(recorded.status, AdherenceStatus::Taken);
        assert_eq!(recorded.taken_at, None);
        service.record(request("missed")).await.unwrap();

        let summary = service.summary("device-1").await.unwrap();
        assert_eq!(summary.total_scheduled, 2);
        assert_eq!(summary.adherence_rate, 50);

        let unknown = service.summary("device-unknown").await.unwrap();
        assert_eq!(unknown.total_scheduled, 0);
    }

    #[tokio::test]
    async fn test_invalid_status_is_rejected() {
        let pool = DatabasePool::in_memory().unwrap();
        let service = AdherenceService::new(
            Arc::new(PatientRepository::new(pool.clone())),
            Arc::new(AdherenceRepository::new(pool)),
        );

        let err = service.record(request("forgot")).await.unwrap_err();
        match err {
            ServiceError::Validation(messages) => {
                assert_eq!(messages.len(), 1);
                assert!(messages[0].contains("adherence status"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
