//! Intake submission and management.
//!
//! Submitting an intake stores the questionnaire, reads every uploaded
//! document through the extractor, raises verification flags and issues the
//! first share token. A document that cannot be read does not stop the
//! submission; its problems are returned alongside the stored intake.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, instrument, warn};
use validator::Validate;

use medbridge_data::models::medication::{NewMedication, NewVerificationFlag};
use medbridge_data::models::patient::Patient;
use medbridge_data::models::prescription::{NewPrescription, NewPrescriptionMedication};
use medbridge_data::repository::{IntakeRepositoryTrait, PatientRepositoryTrait, PrescriptionRepositoryTrait};

use super::{validation_messages, AccessService, ServiceError};
use crate::audit::{log_access_event, AccessEvent, AccessEventType};
use crate::config::ServiceConfig;
use crate::entities::conversions::{
    convert_all, convert_to_data_new_intake, convert_to_domain_flag, convert_to_domain_intake,
    convert_to_domain_medication, non_blank,
};
use crate::entities::{
    CreateIntakeRequest, DetectedConflict, FlagType, Intake, IntakeCreated, IntakeSummary, Medication,
    MedicationSource, OcrResult, PrescriptionMedication, UploadedDocument, VerificationFlag,
};
use crate::extraction::MedicationExtractor;

/// Intake workflow
#[derive(Clone)]
pub struct IntakeService {
    patients: Arc<dyn PatientRepositoryTrait>,
    intakes: Arc<dyn IntakeRepositoryTrait>,
    prescriptions: Arc<dyn PrescriptionRepositoryTrait>,
    extractor: Arc<dyn MedicationExtractor>,
    access: AccessService,
    config: ServiceConfig,
}

impl IntakeService {
    pub fn new(
        patients: Arc<dyn PatientRepositoryTrait>,
        intakes: Arc<dyn IntakeRepositoryTrait>,
        prescriptions: Arc<dyn PrescriptionRepositoryTrait>,
        extractor: Arc<dyn MedicationExtractor>,
        access: AccessService,
        config: ServiceConfig,
    ) -> Self {
        Self {
            patients,
            intakes,
            prescriptions,
            extractor,
            access,
            config,
        }
    }

    /// Check the questionnaire and the uploads before anything is stored
    pub fn validate_submission(
        &self,
        request: &CreateIntakeRequest,
        documents: &[UploadedDocument],
    ) -> Result<(), ServiceError> {
        let mut messages = match request.validate() {
            Ok(()) => Vec::new(),
            Err(e) => validation_messages(&e),
        };

        if documents.len() > self.config.max_documents {
            messages.push(format!(
                "At most {} documents can be uploaded, got {}",
                self.config.max_documents,
                documents.len()
            ));
        }
        for document in documents {
            if !document.is_supported_type() {
                messages.push(format!(
                    "{} has unsupported type {}; upload an image or a PDF",
                    document.display_name(),
                    document.content_type
                ));
            }
        }
        if !messages.is_empty() {
            return Err(ServiceError::Validation(messages));
        }

        if let Some(document) = documents
            .iter()
            .find(|d| d.bytes.len() > self.config.max_document_bytes)
        {
            return Err(ServiceError::PayloadTooLarge(format!(
                "{} is {} bytes; the limit is {} bytes per document",
                document.display_name(),
                document.bytes.len(),
                self.config.max_document_bytes
            )));
        }

        Ok(())
    }

    /// Submit an intake with its documents
    #[instrument(skip(self, request, documents), fields(documents = documents.len()))]
    pub async fn create_intake(
        &self,
        request: CreateIntakeRequest,
        documents: Vec<UploadedDocument>,
    ) -> Result<IntakeCreated, ServiceError> {
        self.validate_submission(&request, &documents)?;

        let patient = match non_blank(&request.device_id) {
            Some(device_id) => Some(self.patients.get_or_create(&device_id).await?),
            None => None,
        };
        let carried_over = self.load_existing_prescriptions(&request, patient.as_ref()).await?;

        let row = self
            .intakes
            .create(convert_to_data_new_intake(&request, patient.as_ref().map(|p| p.id.clone())))
            .await?;
        let intake = convert_to_domain_intake(row).map_err(ServiceError::DataIntegrity)?;
        info!("Created intake {} for {}", intake.id, intake.hospital_name);

        let mut medications = Vec::new();
        let mut extraction_errors = Vec::new();

        // documents are read concurrently and stored in upload order
        let results = join_all(
            documents
                .iter()
                .map(|document| self.extractor.extract_medications(&document.bytes, &document.content_type)),
        )
        .await;

        for (document, result) in documents.iter().zip(results) {
            extraction_errors.extend(
                result
                    .errors
                    .iter()
                    .map(|e| format!("{}: {}", document.display_name(), e)),
            );

            medications.extend(self.store_extracted(&intake, &result).await?);

            if let Some(patient) = &patient {
                self.store_prescription(patient, &intake, &result).await?;
            }
        }

        for medication in carried_over {
            medications.push(self.store_carried_over(&intake, medication).await?);
        }

        let mut verification_flags = self.flag_low_confidence(&intake, &medications).await?;
        verification_flags.extend(self.flag_conflicts(&intake, &medications).await?);

        let token = self.access.issue_token(&intake.id).await?;
        let share_url = self.access.share_url(&token.token);

        log_access_event(
            AccessEvent::new(AccessEventType::IntakeCreated, true)
                .with_intake(intake.id.clone())
                .with_details(format!(
                    "{} documents, {} medications, {} flags",
                    documents.len(),
                    medications.len(),
                    verification_flags.len()
                )),
        );

        Ok(IntakeCreated {
            intake,
            token,
            share_url,
            medications,
            verification_flags,
            extraction_errors,
        })
    }

    /// Medications of the prescriptions the patient chose to carry over.
    /// Every id must name a prescription of the same patient.
    async fn load_existing_prescriptions(
        &self,
        request: &CreateIntakeRequest,
        patient: Option<&Patient>,
    ) -> Result<Vec<PrescriptionMedication>, ServiceError> {
        if request.existing_prescription_ids.is_empty() {
            return Ok(Vec::new());
        }

        let patient = patient
            .ok_or_else(|| ServiceError::invalid("existingPrescriptionIds requires a deviceId"))?;

        let mut medications = Vec::new();
        for id in &request.existing_prescription_ids {
            match self.prescriptions.get_by_id(id).await? {
                Some(prescription) if prescription.patient_id == patient.id => {
                    medications.extend(self.prescriptions.medications_for_prescription(id).await?);
                }
                _ => {
                    return Err(ServiceError::invalid(format!(
                        "Prescription {} was not found for this patient",
                        id
                    )))
                }
            }
        }
        Ok(medications)
    }

    async fn store_extracted(&self, intake: &Intake, result: &OcrResult) -> Result<Vec<Medication>, ServiceError> {
        let mut stored = Vec::with_capacity(result.medications.len());
        for med in &result.medications {
            let row = self
                .intakes
                .create_medication(NewMedication {
                    intake_id: intake.id.clone(),
                    medication_name: med.medication_name.clone(),
                    dose: med.dose.clone(),
                    frequency: med.frequency.clone(),
                    duration: med.duration.clone(),
                    prescription_date: med.prescription_date.clone(),
                    dispensing_date: med.dispensing_date.clone(),
                    confidence: med.confidence,
                    needs_verification: self.needs_verification(med.confidence),
                    raw_ocr_text: Some(med.raw_ocr_text.clone()).filter(|t| !t.is_empty()),
                    source_type: MedicationSource::Prescription.to_string(),
                })
                .await?;
            stored.push(convert_to_domain_medication(row).map_err(ServiceError::DataIntegrity)?);
        }
        Ok(stored)
    }

    /// Keep a copy of a read document in the patient's prescription history
    async fn store_prescription(
        &self,
        patient: &Patient,
        intake: &Intake,
        result: &OcrResult,
    ) -> Result<(), ServiceError> {
        if result.medications.is_empty() {
            return Ok(());
        }

        let prescription = self
            .prescriptions
            .create(NewPrescription {
                patient_id: patient.id.clone(),
                intake_id: Some(intake.id.clone()),
                hospital_name: result
                    .hospital_name
                    .clone()
                    .or_else(|| Some(intake.hospital_name.clone())),
                chief_complaint: Some(intake.chief_complaint.to_string()),
                prescription_date: result.prescription_date(),
                patient_condition: result.patient_condition.clone(),
            })
            .await?;

        for med in &result.medications {
            self.prescriptions
                .create_medication(NewPrescriptionMedication {
                    prescription_id: prescription.id.clone(),
                    medication_name: med.medication_name.clone(),
                    dose: med.dose.clone(),
                    frequency: med.frequency.clone(),
                    duration: med.duration.clone(),
                    ingredients: med.ingredients.clone(),
                    indication: med.indication.clone(),
                    doses_per_day: med.doses_per_day,
                    total_doses: med.total_doses,
                    confidence: med.confidence,
                })
                .await?;
        }
        Ok(())
    }

    async fn store_carried_over(
        &self,
        intake: &Intake,
        medication: PrescriptionMedication,
    ) -> Result<Medication, ServiceError> {
        let row = self
            .intakes
            .create_medication(NewMedication {
                intake_id: intake.id.clone(),
                needs_verification: self.needs_verification(medication.confidence),
                medication_name: medication.medication_name,
                dose: medication.dose,
                frequency: medication.frequency,
                duration: medication.duration,
                prescription_date: None,
                dispensing_date: None,
                confidence: medication.confidence,
                raw_ocr_text: None,
                source_type: MedicationSource::ExistingPrescription.to_string(),
            })
            .await?;
        convert_to_domain_medication(row).map_err(ServiceError::DataIntegrity)
    }

    fn needs_verification(&self, confidence: i64) -> bool {
        confidence < self.config.low_confidence_threshold
    }

    async fn flag_low_confidence(
        &self,
        intake: &Intake,
        medications: &[Medication],
    ) -> Result<Vec<VerificationFlag>, ServiceError> {
        let mut flags = Vec::new();
        for med in medications.iter().filter(|m| self.needs_verification(m.confidence)) {
            let flag = self
                .store_flag(
                    intake,
                    FlagType::LowConfidence,
                    format!(
                        "\"{}\" was read with low confidence ({}%) and needs to be checked",
                        med.medication_name, med.confidence
                    ),
                    Some(vec![med.id.clone()]),
                )
                .await?;
            flags.push(flag);
        }
        Ok(flags)
    }

    /// Ask the extractor for conflicts across the intake's medications.
    /// A failed check is logged and raises no flags.
    async fn flag_conflicts(
        &self,
        intake: &Intake,
        medications: &[Medication],
    ) -> Result<Vec<VerificationFlag>, ServiceError> {
        if medications.is_empty() {
            return Ok(Vec::new());
        }

        let conflicts = match self
            .extractor
            .detect_conflicts(
                medications,
                intake.allergies_detail.as_deref(),
                intake.adverse_events_detail.as_deref(),
            )
            .await
        {
            Ok(conflicts) => conflicts,
            Err(e) => {
                warn!("Conflict detection failed for intake {}: {}", intake.id, e);
                return Ok(Vec::new());
            }
        };

        let mut flags = Vec::new();
        for DetectedConflict { flag_type, description } in conflicts {
            // low-confidence flags are derived from stored confidences only
            if flag_type == FlagType::LowConfidence {
                continue;
            }
            flags.push(self.store_flag(intake, flag_type, description, None).await?);
        }
        Ok(flags)
    }

    async fn store_flag(
        &self,
        intake: &Intake,
        flag_type: FlagType,
        description: String,
        related_medication_ids: Option<Vec<String>>,
    ) -> Result<VerificationFlag, ServiceError> {
        let row = self
            .intakes
            .create_flag(NewVerificationFlag {
                intake_id: intake.id.clone(),
                flag_type: flag_type.to_string(),
                description,
                related_medication_ids,
            })
            .await?;
        convert_to_domain_flag(row).map_err(ServiceError::DataIntegrity)
    }

    /// Intakes, newest first. With a device id only that patient's intakes
    /// are listed.
    #[instrument(skip(self))]
    pub async fn list_intakes(&self, device_id: Option<&str>) -> Result<Vec<Intake>, ServiceError> {
        let rows = match device_id.map(str::trim).filter(|d| !d.is_empty()) {
            Some(device_id) => match self.patients.get_by_device_id(device_id).await? {
                Some(patient) => self.intakes.list_by_patient(&patient.id).await?,
                None => Vec::new(),
            },
            None => self.intakes.list().await?,
        };
        convert_all(rows, convert_to_domain_intake).map_err(ServiceError::DataIntegrity)
    }

    #[instrument(skip(self))]
    pub async fn get_intake(&self, id: &str) -> Result<Intake, ServiceError> {
        let row = self
            .intakes
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Intake {} not found", id)))?;
        convert_to_domain_intake(row).map_err(ServiceError::DataIntegrity)
    }

    /// Summary of an intake for its owner; unlike a token view nothing is logged
    pub async fn get_summary(&self, id: &str) -> Result<IntakeSummary, ServiceError> {
        self.access.summary_for(id).await
    }

    /// Soft-delete an intake and invalidate its tokens. Deleting an intake
    /// that is already gone succeeds.
    #[instrument(skip(self))]
    pub async fn delete_intake(&self, id: &str) -> Result<(), ServiceError> {
        let deleted = self.intakes.soft_delete(id).await?;
        let invalidated = self.access.invalidate_all(id).await?;

        if deleted {
            log_access_event(
                AccessEvent::new(AccessEventType::IntakeDeleted, true)
                    .with_intake(id)
                    .with_details(format!("{} tokens invalidated", invalidated)),
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::Services;
    use crate::testing::{extracted, ocr_result, ScriptedExtractor};
    use medbridge_data::database::DatabasePool;

    fn request() -> CreateIntakeRequest {
        CreateIntakeRequest {
            device_id: Some("device-1".to_string()),
            hospital_id: "hospital-1".to_string(),
            hospital_name: "Harbor Clinic".to_string(),
            chief_complaint: "cough".to_string(),
            onset_date: "2024-03-01".to_string(),
            course_status: "worsening".to_string(),
            adherence: "yes".to_string(),
            has_allergies: true,
            allergies_detail: Some("penicillin".to_string()),
            ..Default::default()
        }
    }

    fn document(size: usize) -> UploadedDocument {
        UploadedDocument {
            file_name: Some("scan.jpg".to_string()),
            content_type: "image/jpeg".to_string(),
            bytes: vec![0u8; size],
        }
    }

    fn services(extractor: ScriptedExtractor) -> (Services, Arc<ScriptedExtractor>) {
        let extractor = Arc::new(extractor);
        let pool = DatabasePool::in_memory().unwrap();
        (Services::new(pool, extractor.clone(), ServiceConfig::default()), extractor)
    }

    #[tokio::test]
    async fn test_create_intake_reads_documents_and_flags() {
        let (services, extractor) = services(
            ScriptedExtractor::new()
                .with_result(ocr_result(vec![extracted("Amoxicillin", 69), extracted("Ambroxol", 70)]))
                .with_conflicts(vec![
                    DetectedConflict {
                        flag_type: FlagType::AllergyConflict,
                        description: "Amoxicillin is a penicillin".to_string(),
                    },
                    DetectedConflict {
                        flag_type: FlagType::LowConfidence,
                        description: "duplicate of stored flag".to_string(),
                    },
                ]),
        );

        let created = services.intakes.create_intake(request(), vec![document(16)]).await.unwrap();

        assert_eq!(created.medications.len(), 2);
        assert!(created.medications[0].needs_verification);
        assert!(!created.medications[1].needs_verification);
        assert_eq!(created.medications[0].source_type, MedicationSource::Prescription);

        let kinds: Vec<FlagType> = created.verification_flags.iter().map(|f| f.flag_type).collect();
        assert_eq!(kinds, vec![FlagType::LowConfidence, FlagType::AllergyConflict]);
        assert_eq!(
            created.verification_flags[0].related_medication_ids,
            Some(vec![created.medications[0].id.clone()])
        );

        assert!(created.extraction_errors.is_empty());
        assert!(created.share_url.ends_with(&created.token.token));
        assert_eq!(extractor.extraction_calls(), 1);
        assert_eq!(extractor.conflict_calls(), 1);

        let history = services
            .prescriptions
            .prescriptions_with_medications("device-1")
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].medications.len(), 2);
        assert_eq!(history[0].prescription.chief_complaint.as_deref(), Some("cough"));
        assert_eq!(history[0].prescription.prescription_date.as_deref(), Some("2024-03-01"));
    }

    #[tokio::test]
    async fn test_failed_reads_do_not_fail_submission() {
        let (services, extractor) = services(
            ScriptedExtractor::new()
                .with_result(OcrResult::failed("timeout"))
                .failing_conflicts(),
        );

        let created = services.intakes.create_intake(request(), vec![document(8)]).await.unwrap();
        assert!(created.medications.is_empty());
        assert_eq!(created.extraction_errors, vec!["scan.jpg: timeout".to_string()]);
        assert_eq!(extractor.conflict_calls(), 0);
        assert!(services.intakes.get_intake(&created.intake.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_conflict_failure_raises_no_flags() {
        let (services, _) = services(
            ScriptedExtractor::new()
                .with_result(ocr_result(vec![extracted("Ambroxol", 95)]))
                .failing_conflicts(),
        );

        let created = services.intakes.create_intake(request(), vec![document(8)]).await.unwrap();
        assert_eq!(created.medications.len(), 1);
        assert!(created.verification_flags.is_empty());
    }

    #[tokio::test]
    async fn test_submission_validation() {
        let (services, extractor) = services(ScriptedExtractor::new());

        let too_many = vec![document(1); 6];
        match services.intakes.create_intake(request(), too_many).await {
            Err(ServiceError::Validation(messages)) => assert!(messages[0].contains("At most 5")),
            other => panic!("unexpected result: {:?}", other.map(|c| c.intake.id)),
        }

        let mut text = document(1);
        text.content_type = "text/plain".to_string();
        assert!(matches!(
            services.intakes.create_intake(request(), vec![text]).await,
            Err(ServiceError::Validation(_))
        ));

        let oversized = document(10 * 1024 * 1024 + 1);
        assert!(matches!(
            services.intakes.create_intake(request(), vec![oversized]).await,
            Err(ServiceError::PayloadTooLarge(_))
        ));

        let incomplete = CreateIntakeRequest {
            onset_date: String::new(),
            ..request()
        };
        assert!(matches!(
            services.intakes.create_intake(incomplete, Vec::new()).await,
            Err(ServiceError::Validation(_))
        ));

        assert_eq!(extractor.extraction_calls(), 0);
        assert!(services.intakes.list_intakes(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_existing_prescriptions_are_carried_over() {
        let (services, _) = services(ScriptedExtractor::new().with_result(ocr_result(vec![extracted("Codeine", 88)])));

        services.intakes.create_intake(request(), vec![document(8)]).await.unwrap();
        let previous = services
            .prescriptions
            .prescriptions_with_medications("device-1")
            .await
            .unwrap();
        let prescription_id = previous[0].prescription.id.clone();

        let follow_up = CreateIntakeRequest {
            existing_prescription_ids: vec![prescription_id.clone()],
            ..request()
        };
        let created = services.intakes.create_intake(follow_up, Vec::new()).await.unwrap();
        assert_eq!(created.medications.len(), 1);
        assert_eq!(created.medications[0].medication_name, "Codeine");
        assert_eq!(created.medications[0].source_type, MedicationSource::ExistingPrescription);

        let stranger = CreateIntakeRequest {
            device_id: Some("device-2".to_string()),
            existing_prescription_ids: vec![prescription_id],
            ..request()
        };
        assert!(matches!(
            services.intakes.create_intake(stranger, Vec::new()).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_hides_intake_and_kills_tokens() {
        let (services, _) = services(ScriptedExtractor::new());
        let created = services.intakes.create_intake(request(), Vec::new()).await.unwrap();
        let id = created.intake.id.clone();

        assert_eq!(services.intakes.list_intakes(Some("device-1")).await.unwrap().len(), 1);
        assert!(services.intakes.list_intakes(Some("device-2")).await.unwrap().is_empty());

        services.intakes.delete_intake(&id).await.unwrap();
        services.intakes.delete_intake(&id).await.unwrap();

        assert!(matches!(services.intakes.get_intake(&id).await, Err(ServiceError::NotFound(_))));
        assert!(services.intakes.list_intakes(None).await.unwrap().is_empty());
        assert!(matches!(
            services.access.view_summary(&created.token.token).await,
            Err(ServiceError::Gone(_))
        ));
    }

    #[tokio::test]
    async fn test_summary_includes_adherence_for_known_patient() {
        let (services, _) = services(ScriptedExtractor::new());
        let created = services.intakes.create_intake(request(), Vec::new()).await.unwrap();

        let summary = services.intakes.get_summary(&created.intake.id).await.unwrap();
        let adherence = summary.adherence_summary.unwrap();
        assert_eq!(adherence.total_scheduled, 0);
        assert_eq!(adherence.adherence_rate, 100);
    }
}
