//! Client for the Gemini `generateContent` API

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::validation::{parse_conflicts, parse_ocr_response};
use super::{ExtractionError, MedicationExtractor};
use crate::config::ExtractorConfig;
use crate::entities::{DetectedConflict, Medication, OcrResult};

const EXTRACTION_PROMPT: &str = "You are reading a photo of a Korean medical prescription or pharmacy dispensing record.
Extract every medication listed on the document.

For each medication return:
- medicationName: the product name as printed
- dose: amount per dose, e.g. \"500mg\" or \"1 tablet\"
- frequency: how often it is taken, e.g. \"3 times a day\"
- duration: how long it is taken, e.g. \"7 days\"
- prescriptionDate and dispensingDate in YYYY-MM-DD format
- confidence: an integer from 0 to 100 describing how legible the entry was; use 60-70 when unsure
- ingredients: active ingredients, inferred from the product name when not printed
- indication: what the medication is usually prescribed for
- dosesPerDay: number of doses per day derived from the frequency
- totalDoses: total number of doses for the whole course

Also return rawText with the full text you can read on the document, hospitalName when the
issuing institution is printed and patientCondition when a diagnosis is printed.
Use null for any value you cannot read. Do not invent medications.";

const CONFLICT_PROMPT: &str = "You are reviewing the medications a patient brought to a clinic visit.
Report potential problems a clinician should double-check:
- duplicate: the same active ingredient or therapeutic class appears more than once
- date_overlap: treatment periods of similar medications overlap
- allergy_conflict: a medication conflicts with the reported allergies or past adverse events

Return a JSON array of objects with \"type\" (one of duplicate, date_overlap, allergy_conflict)
and \"description\" (one short sentence). Return an empty array when nothing needs attention.";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// Extractor backed by a Gemini model
pub struct GeminiExtractor {
    client: Client,
    config: ExtractorConfig,
}

impl GeminiExtractor {
    /// Create a new client
    pub fn new(config: ExtractorConfig) -> Result<Self, ExtractionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        if config.api_key.is_none() {
            warn!("No Gemini API key configured, documents will not be read");
        } else {
            info!("Gemini extractor using model {} at {}", config.model, config.base_url);
        }

        Ok(Self { client, config })
    }

    async fn generate(&self, parts: Vec<Part>, response_schema: Value) -> Result<String, ExtractionError> {
        let api_key = self.config.api_key.as_deref().ok_or(ExtractionError::NotConfigured)?;
        let url = format!("{}/models/{}:generateContent", self.config.base_url, self.config.model);

        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema,
            },
        };

        debug!("Sending generateContent request: model={}", self.config.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let result: GenerateContentResponse = response.json().await?;
        let text: String = result
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect())
            .unwrap_or_default();

        Ok(text)
    }
}

#[async_trait]
impl MedicationExtractor for GeminiExtractor {
    fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    async fn extract_medications(&self, image: &[u8], mime_type: &str) -> OcrResult {
        let parts = vec![
            Part {
                text: Some(EXTRACTION_PROMPT.to_string()),
                inline_data: None,
            },
            Part {
                text: None,
                inline_data: Some(InlineData {
                    mime_type: mime_type.to_string(),
                    data: STANDARD.encode(image),
                }),
            },
        ];

        match self.generate(parts, ocr_schema()).await {
            Ok(text) => {
                let result = parse_ocr_response(&text);
                info!(
                    "Extracted {} medications ({} problems)",
                    result.medications.len(),
                    result.errors.len()
                );
                result
            }
            Err(e) => {
                warn!("Medication extraction failed: {}", e);
                OcrResult::failed(format!("Medication extraction failed: {}", e))
            }
        }
    }

    async fn detect_conflicts(
        &self,
        medications: &[Medication],
        allergies: Option<&str>,
        adverse_events: Option<&str>,
    ) -> Result<Vec<DetectedConflict>, ExtractionError> {
        let prompt = conflict_prompt(medications, allergies, adverse_events);
        let parts = vec![Part {
            text: Some(prompt),
            inline_data: None,
        }];

        let text = self.generate(parts, conflict_schema()).await?;
        parse_conflicts(&text)
    }
}

fn conflict_prompt(medications: &[Medication], allergies: Option<&str>, adverse_events: Option<&str>) -> String {
    let listing: Vec<String> = medications
        .iter()
        .map(|med| {
            format!(
                "- {} | dose: {} | frequency: {} | duration: {} | prescribed: {}",
                med.medication_name,
                med.dose.as_deref().unwrap_or("unknown"),
                med.frequency.as_deref().unwrap_or("unknown"),
                med.duration.as_deref().unwrap_or("unknown"),
                med.prescription_date.as_deref().unwrap_or("unknown"),
            )
        })
        .collect();

    format!(
        "{}\n\nMedications:\n{}\n\nReported allergies: {}\nPast adverse events: {}",
        CONFLICT_PROMPT,
        listing.join("\n"),
        allergies.unwrap_or("none"),
        adverse_events.unwrap_or("none"),
    )
}

fn ocr_schema() -> Value {
    let text = json!({ "type": "STRING", "nullable": true });
    let count = json!({ "type": "INTEGER", "nullable": true });
    json!({
        "type": "OBJECT",
        "properties": {
            "medications": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "medicationName": { "type": "STRING" },
                        "dose": text,
                        "frequency": text,
                        "duration": text,
                        "prescriptionDate": text,
                        "dispensingDate": text,
                        "confidence": { "type": "INTEGER" },
                        "ingredients": text,
                        "indication": text,
                        "dosesPerDay": count,
                        "totalDoses": count
                    },
                    "required": ["medicationName", "confidence"]
                }
            },
            "rawText": { "type": "STRING" },
            "hospitalName": text,
            "patientCondition": text
        },
        "required": ["medications", "rawText"]
    })
}

fn conflict_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "type": {
                    "type": "STRING",
                    "enum": ["duplicate", "date_overlap", "allergy_conflict"]
                },
                "description": { "type": "STRING" }
            },
            "required": ["type", "description"]
        }
    })
}
