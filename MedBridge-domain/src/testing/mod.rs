// Test doubles for the domain layer.
// Available to this crate's own tests and, with the "mock" feature, to dependants.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::entities::{DetectedConflict, ExtractedMedication, Medication, OcrResult};
use crate::extraction::{ExtractionError, MedicationExtractor};
use crate::health::{ComponentStatus, HealthComponent, HealthServiceTrait, SystemHealth, SystemStatus};

/// Extractor that replays canned results instead of calling a model.
///
/// Each extraction call takes the next queued result; once the queue is
/// empty it returns an empty read.
pub struct ScriptedExtractor {
    results: Mutex<VecDeque<OcrResult>>,
    conflicts: Vec<DetectedConflict>,
    fail_conflicts: bool,
    configured: bool,
    extraction_calls: AtomicUsize,
    conflict_calls: AtomicUsize,
}

impl Default for ScriptedExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self {
            results: Mutex::new(VecDeque::new()),
            conflicts: Vec::new(),
            fail_conflicts: false,
            configured: true,
            extraction_calls: AtomicUsize::new(0),
            conflict_calls: AtomicUsize::new(0),
        }
    }

    /// Queue the result of the next extraction call
    pub fn with_result(self, result: OcrResult) -> Self {
        self.results.lock().unwrap().push_back(result);
        self
    }

    /// Conflicts returned by every conflict check
    pub fn with_conflicts(mut self, conflicts: Vec<DetectedConflict>) -> Self {
        self.conflicts = conflicts;
        self
    }

    /// Make conflict checks fail
    pub fn failing_conflicts(mut self) -> Self {
        self.fail_conflicts = true;
        self
    }

    /// Report no API key
    pub fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }

    pub fn extraction_calls(&self) -> usize {
        self.extraction_calls.load(Ordering::SeqCst)
    }

    pub fn conflict_calls(&self) -> usize {
        self.conflict_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MedicationExtractor for ScriptedExtractor {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn extract_medications(&self, _image: &[u8], _mime_type: &str) -> OcrResult {
        self.extraction_calls.fetch_add(1, Ordering::SeqCst);
        self.results.lock().unwrap().pop_front().unwrap_or_default()
    }

    async fn detect_conflicts(
        &self,
        _medications: &[Medication],
        _allergies: Option<&str>,
        _adverse_events: Option<&str>,
    ) -> Result<Vec<DetectedConflict>, ExtractionError> {
        self.conflict_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_conflicts {
            return Err(ExtractionError::InvalidResponse("scripted failure".to_string()));
        }
        Ok(self.conflicts.clone())
    }
}

/// Extracted medication with the given name and confidence
pub fn extracted(name: &str, confidence: i64) -> ExtractedMedication {
    ExtractedMedication {
        medication_name: name.to_string(),
        dose: Some("1 tablet".to_string()),
        frequency: Some("twice a day".to_string()),
        duration: Some("5 days".to_string()),
        prescription_date: Some("2024-03-01".to_string()),
        dispensing_date: None,
        confidence,
        raw_ocr_text: format!("{} 1 tablet twice a day", name),
        ingredients: None,
        indication: None,
        doses_per_day: Some(2),
        total_doses: Some(10),
    }
}

/// Read of one document listing the given medications
pub fn ocr_result(medications: Vec<ExtractedMedication>) -> OcrResult {
    OcrResult {
        raw_text: medications
            .iter()
            .map(|m| m.raw_ocr_text.clone())
            .collect::<Vec<_>>()
            .join("\n"),
        medications,
        ..Default::default()
    }
}

/// Mock health service with configurable component states
#[derive(Debug)]
pub struct MockHealthService {
    database_status: ComponentStatus,
    components: HashMap<String, HealthComponent>,
}

impl Default for MockHealthService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHealthService {
    /// All components healthy
    pub fn new() -> Self {
        Self {
            database_status: ComponentStatus::Healthy,
            components: HashMap::new(),
        }
    }

    /// Configure the mock with a degraded database
    pub fn with_degraded_database(mut self) -> Self {
        self.database_status = ComponentStatus::Degraded;
        self
    }

    /// Configure the mock with an unhealthy database
    pub fn with_unhealthy_database(mut self) -> Self {
        self.database_status = ComponentStatus::Unhealthy;
        self
    }

    /// Add another component
    pub fn with_component(mut self, name: &str, status: ComponentStatus, details: Option<String>) -> Self {
        self.components
            .insert(name.to_string(), HealthComponent { status, details });
        self
    }
}

#[async_trait]
impl HealthServiceTrait for MockHealthService {
    async fn get_system_health(&self) -> SystemHealth {
        let mut components = self.components.clone();
        components.insert(
            "database".to_string(),
            HealthComponent {
                status: self.database_status.clone(),
                details: None,
            },
        );
        SystemHealth::from_components(components)
    }

    async fn check_database_status(&self) -> Result<bool, String> {
        match self.database_status {
            ComponentStatus::Healthy => Ok(true),
            ComponentStatus::Degraded => Ok(false),
            ComponentStatus::Unhealthy => Err("Database is unavailable".to_string()),
        }
    }
}
