use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, instrument};

use medbridge_data::repository::{PatientRepositoryTrait, PrescriptionRepositoryTrait};

use super::ServiceError;
use crate::entities::{MedicationStats, Prescription, PrescriptionWithMedications, SymptomHistory};

/// Prescription history of a patient
#[derive(Clone)]
pub struct PrescriptionService {
    patients: Arc<dyn PatientRepositoryTrait>,
    prescriptions: Arc<dyn PrescriptionRepositoryTrait>,
}

impl PrescriptionService {
    pub fn new(
        patients: Arc<dyn PatientRepositoryTrait>,
        prescriptions: Arc<dyn PrescriptionRepositoryTrait>,
    ) -> Self {
        Self {
            patients,
            prescriptions,
        }
    }

    /// Prescriptions of a device's patient with their medications, newest first
    #[instrument(skip(self))]
    pub async fn prescriptions_with_medications(
        &self,
        device_id: &str,
    ) -> Result<Vec<PrescriptionWithMedications>, ServiceError> {
        let patient = match self.patients.get_by_device_id(device_id).await? {
            Some(patient) => patient,
            None => return Ok(Vec::new()),
        };

        let prescriptions = self.prescriptions.list_by_patient(&patient.id).await?;
        self.attach_medications(prescriptions).await
    }

    /// Visit history for one chief complaint, `None` when there is none
    #[instrument(skip(self))]
    pub async fn symptom_history(
        &self,
        device_id: &str,
        chief_complaint: &str,
    ) -> Result<Option<SymptomHistory>, ServiceError> {
        let patient = match self.patients.get_by_device_id(device_id).await? {
            Some(patient) => patient,
            None => return Ok(None),
        };

        let prescriptions = self
            .prescriptions
            .list_by_patient_and_complaint(&patient.id, chief_complaint)
            .await?;
        if prescriptions.is_empty() {
            return Ok(None);
        }

        let prescriptions = self.attach_medications(prescriptions).await?;
        debug!("{} visits for complaint {}", prescriptions.len(), chief_complaint);
        Ok(Some(build_history(chief_complaint, prescriptions)))
    }

    async fn attach_medications(
        &self,
        prescriptions: Vec<Prescription>,
    ) -> Result<Vec<PrescriptionWithMedications>, ServiceError> {
        let mut result = Vec::with_capacity(prescriptions.len());
        for prescription in prescriptions {
            let medications = self.prescriptions.medications_for_prescription(&prescription.id).await?;
            result.push(PrescriptionWithMedications {
                prescription,
                medications,
            });
        }
        Ok(result)
    }
}

/// Date a prescription counts for: the printed date, else the day it was stored
fn visit_date(prescription: &Prescription) -> String {
    prescription
        .prescription_date
        .clone()
        .unwrap_or_else(|| prescription.created_at.chars().take(10).collect())
}

/// Assemble the history of a non-empty prescription list
pub fn build_history(chief_complaint: &str, prescriptions: Vec<PrescriptionWithMedications>) -> SymptomHistory {
    let mut dates: Vec<String> = prescriptions
        .iter()
        .map(|p| visit_date(&p.prescription))
        .filter(|d| !d.is_empty())
        .collect();
    dates.sort();

    SymptomHistory {
        chief_complaint: chief_complaint.to_string(),
        total_visits: prescriptions.len(),
        first_visit_date: dates.first().cloned(),
        last_visit_date: dates.last().cloned(),
        medication_stats: medication_stats(&prescriptions),
        prescriptions,
    }
}

#[derive(Default)]
struct StatsAccumulator {
    total_count: usize,
    confidence_sum: i64,
    last_date: Option<String>,
    doses: Vec<String>,
    frequencies: Vec<String>,
}

fn push_distinct(values: &mut Vec<String>, value: &Option<String>) {
    if let Some(value) = value.as_ref().filter(|v| !v.is_empty()) {
        if !values.contains(value) {
            values.push(value.clone());
        }
    }
}

/// Per-medication statistics, most frequently prescribed first.
///
/// Medications are grouped by exact name; ties keep first-seen order.
pub fn medication_stats(prescriptions: &[PrescriptionWithMedications]) -> Vec<MedicationStats> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, StatsAccumulator> = HashMap::new();

    for entry in prescriptions {
        let date = visit_date(&entry.prescription);
        for med in &entry.medications {
            let acc = groups.entry(med.medication_name.clone()).or_insert_with(|| {
                order.push(med.medication_name.clone());
                StatsAccumulator::default()
            });

            acc.total_count += 1;
            acc.confidence_sum += med.confidence;
            if acc.last_date.as_deref().map_or(true, |last| date.as_str() > last) {
                acc.last_date = Some(date.clone());
            }
            push_distinct(&mut acc.doses, &med.dose);
            push_distinct(&mut acc.frequencies, &med.frequency);
        }
    }

    let mut stats: Vec<MedicationStats> = order
        .into_iter()
        .filter_map(|name| {
            let acc = groups.remove(&name)?;
            Some(MedicationStats {
                avg_confidence: (acc.confidence_sum as f64 / acc.total_count as f64).round() as i64,
                medication_name: name,
                total_count: acc.total_count,
                last_prescribed_date: acc.last_date,
                doses: acc.doses,
                frequencies: acc.frequencies,
            })
        })
        .collect();

    stats.sort_by(|a, b| b.total_count.cmp(&a.total_count));
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::PrescriptionMedication;
    use medbridge_data::database::DatabasePool;
    use medbridge_data::models::prescription::{NewPrescription, NewPrescriptionMedication};
    use medbridge_data::repository::{PatientRepository, PrescriptionRepository};

    fn prescription(id: &str, date: Option<&str>, created_at: &str) -> Prescription {
        Prescription {
            id: id.to_string(),
            patient_id: "patient-1".to_string(),
            intake_id: None,
            hospital_name: None,
            chief_complaint: Some("cough".to_string()),
            prescription_date: date.map(str::to_string),
            patient_condition: None,
            created_at: created_at.to_string(),
        }
    }

    fn med(name: &str, dose: Option<&str>, confidence: i64) -> PrescriptionMedication {
        PrescriptionMedication {
            id: format!("{}-{}", name, confidence),
            prescription_id: "p".to_string(),
            medication_name: name.to_string(),
            dose: dose.map(str::to_string),
            frequency: Some("3 times a day".to_string()),
            duration: None,
            ingredients: None,
            indication: None,
            doses_per_day: Some(3),
            total_doses: None,
            confidence,
        }
    }

    fn history_fixture() -> Vec<PrescriptionWithMedications> {
        vec![
            PrescriptionWithMedications {
                prescription: prescription("p2", None, "2024-04-02T09:00:00.000Z"),
                medications: vec![med("Codeine", Some("10mg"), 90), med("Ambroxol", Some("30mg"), 75)],
            },
            PrescriptionWithMedications {
                prescription: prescription("p1", Some("2024-03-10"), "2024-03-11T09:00:00.000Z"),
                medications: vec![med("Ambroxol", Some("15mg"), 80), med("Ambroxol", Some("30mg"), 86)],
            },
        ]
    }

    #[test]
    fn test_medication_stats_group_and_sort() {
        let stats = medication_stats(&history_fixture());
        assert_eq!(stats.len(), 2);

        let ambroxol = &stats[0];
        assert_eq!(ambroxol.medication_name, "Ambroxol");
        assert_eq!(ambroxol.total_count, 3);
        assert_eq!(ambroxol.avg_confidence, 80);
        assert_eq!(ambroxol.last_prescribed_date.as_deref(), Some("2024-04-02"));
        assert_eq!(ambroxol.doses, vec!["30mg".to_string(), "15mg".to_string()]);
        assert_eq!(ambroxol.frequencies, vec!["3 times a day".to_string()]);

        assert_eq!(stats[1].medication_name, "Codeine");
        assert_eq!(stats[1].total_count, 1);
    }

    #[test]
    fn test_history_dates_fall_back_to_creation_day() {
        let history = build_history("cough", history_fixture());
        assert_eq!(history.total_visits, 2);
        assert_eq!(history.first_visit_date.as_deref(), Some("2024-03-10"));
        assert_eq!(history.last_visit_date.as_deref(), Some("2024-04-02"));
    }

    #[tokio::test]
    async fn test_symptom_history_from_storage() {
        let pool = DatabasePool::in_memory().unwrap();
        let patients = Arc::new(PatientRepository::new(pool.clone()));
        let repo = Arc::new(PrescriptionRepository::new(pool));
        let service = PrescriptionService::new(patients.clone(), repo.clone());

        assert!(service.symptom_history("device-1", "cough").await.unwrap().is_none());

        let patient = patients.get_or_create("device-1").await.unwrap();
        let stored = repo
            .create(NewPrescription {
                patient_id: patient.id.clone(),
                chief_complaint: Some("cough".to_string()),
                prescription_date: Some("2024-03-10".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        repo.create_medication(NewPrescriptionMedication {
            prescription_id: stored.id.clone(),
            medication_name: "Ambroxol".to_string(),
            confidence: 88,
            ..Default::default()
        })
        .await
        .unwrap();

        let history = service.symptom_history("device-1", "cough").await.unwrap().unwrap();
        assert_eq!(history.total_visits, 1);
        assert_eq!(history.medication_stats[0].avg_confidence, 88);
        assert!(service.symptom_history("device-1", "fever").await.unwrap().is_none());

        let all = service.prescriptions_with_medications("device-1").await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].medications.len(), 1);
        assert!(service.prescriptions_with_medications("other").await.unwrap().is_empty());
    }
}
