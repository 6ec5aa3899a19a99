//! Validation of extraction responses.
//!
//! The model is asked for a fixed JSON shape but does not always honour it.
//! A strict pass accepts only well-formed responses; when that fails a
//! lenient pass salvages every medication that at least has a name.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

use super::ExtractionError;
use crate::entities::{DetectedConflict, ExtractedMedication, FlagType, OcrResult};

/// Confidence assumed when the model gives none usable
pub const FALLBACK_CONFIDENCE: i64 = 50;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StrictMedication {
    medication_name: String,
    dose: Option<String>,
    frequency: Option<String>,
    duration: Option<String>,
    prescription_date: Option<String>,
    dispensing_date: Option<String>,
    confidence: i64,
    ingredients: Option<String>,
    indication: Option<String>,
    doses_per_day: Option<i64>,
    total_doses: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StrictResponse {
    medications: Vec<StrictMedication>,
    raw_text: String,
    hospital_name: Option<String>,
    patient_condition: Option<String>,
}

/// Parse the text returned for an extraction request
pub fn parse_ocr_response(text: &str) -> OcrResult {
    let text = if text.trim().is_empty() { "{}" } else { text };

    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => return OcrResult::failed(format!("Extraction response is not valid JSON: {}", e)),
    };

    match parse_strict(&value) {
        Ok(result) => result,
        Err(errors) => {
            warn!("Extraction response failed validation: {}", errors.join("; "));
            parse_lenient(&value, errors)
        }
    }
}

fn parse_strict(value: &Value) -> Result<OcrResult, Vec<String>> {
    let response = StrictResponse::deserialize(value).map_err(|e| vec![e.to_string()])?;

    let mut errors = Vec::new();
    for (index, med) in response.medications.iter().enumerate() {
        if med.medication_name.is_empty() {
            errors.push(format!("medications[{}].medicationName must not be empty", index));
        }
        if !(0..=100).contains(&med.confidence) {
            errors.push(format!("medications[{}].confidence must be between 0 and 100", index));
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    let raw_text = response.raw_text;
    let medications = response
        .medications
        .into_iter()
        .map(|med| ExtractedMedication {
            medication_name: med.medication_name,
            dose: blank_to_none(med.dose),
            frequency: blank_to_none(med.frequency),
            duration: blank_to_none(med.duration),
            prescription_date: blank_to_none(med.prescription_date),
            dispensing_date: blank_to_none(med.dispensing_date),
            confidence: med.confidence,
            raw_ocr_text: raw_text.clone(),
            ingredients: blank_to_none(med.ingredients),
            indication: blank_to_none(med.indication),
            doses_per_day: med.doses_per_day.filter(|n| *n != 0),
            total_doses: med.total_doses.filter(|n| *n != 0),
        })
        .collect();

    Ok(OcrResult {
        medications,
        raw_text,
        hospital_name: blank_to_none(response.hospital_name),
        patient_condition: blank_to_none(response.patient_condition),
        errors: Vec::new(),
    })
}

fn parse_lenient(value: &Value, errors: Vec<String>) -> OcrResult {
    let empty = Map::new();
    let root = value.as_object().unwrap_or(&empty);
    let raw_text = root.get("rawText").and_then(truthy_string).unwrap_or_default();

    let medications = root
        .get("medications")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_object)
                .filter_map(|med| lenient_medication(med, &raw_text))
                .collect()
        })
        .unwrap_or_default();

    OcrResult {
        medications,
        hospital_name: root.get("hospitalName").and_then(truthy_string),
        patient_condition: root.get("patientCondition").and_then(truthy_string),
        raw_text,
        errors,
    }
}

fn lenient_medication(med: &Map<String, Value>, raw_text: &str) -> Option<ExtractedMedication> {
    let name = med
        .get("medicationName")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())?;

    let text = |key: &str| med.get(key).and_then(truthy_string);
    let count = |key: &str| med.get(key).and_then(Value::as_f64).map(|n| n.round() as i64);

    Some(ExtractedMedication {
        medication_name: name.to_string(),
        dose: text("dose"),
        frequency: text("frequency"),
        duration: text("duration"),
        prescription_date: text("prescriptionDate"),
        dispensing_date: text("dispensingDate"),
        confidence: med
            .get("confidence")
            .and_then(Value::as_f64)
            .map(|c| c.round().clamp(0.0, 100.0) as i64)
            .unwrap_or(FALLBACK_CONFIDENCE),
        raw_ocr_text: raw_text.to_string(),
        ingredients: text("ingredients"),
        indication: text("indication"),
        doses_per_day: count("dosesPerDay"),
        total_doses: count("totalDoses"),
    })
}

/// Render a scalar as text when it carries a value; empty strings, zero,
/// false and null count as absent
fn truthy_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Parse the text returned for a conflict-detection request.
///
/// Entries with an unknown type or without a description are dropped.
pub fn parse_conflicts(text: &str) -> Result<Vec<DetectedConflict>, ExtractionError> {
    let text = if text.trim().is_empty() { "[]" } else { text };
    let value: Value = serde_json::from_str(text)
        .map_err(|e| ExtractionError::InvalidResponse(format!("conflicts are not valid JSON: {}", e)))?;

    let items = value
        .as_array()
        .ok_or_else(|| ExtractionError::InvalidResponse("conflicts must be a JSON array".to_string()))?;

    let conflicts = items
        .iter()
        .filter_map(|item| {
            let flag_type = item.get("type")?.as_str()?.parse::<FlagType>().ok()?;
            let description = item.get("description")?.as_str()?.trim();
            if description.is_empty() {
                return None;
            }
            Some(DetectedConflict {
                flag_type,
                description: description.to_string(),
            })
        })
        .collect();

    Ok(conflicts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strict_response_normalises_empty_values() {
        let text = json!({
            "medications": [{
                "medicationName": "Tylenol",
                "dose": "500mg",
                "frequency": "",
                "confidence": 88,
                "dosesPerDay": 3,
                "totalDoses": 0
            }],
            "rawText": "Tylenol 500mg tid",
            "hospitalName": ""
        })
        .to_string();

        let result = parse_ocr_response(&text);
        assert!(result.errors.is_empty());
        assert_eq!(result.medications.len(), 1);

        let med = &result.medications[0];
        assert_eq!(med.dose.as_deref(), Some("500mg"));
        assert_eq!(med.frequency, None);
        assert_eq!(med.confidence, 88);
        assert_eq!(med.doses_per_day, Some(3));
        assert_eq!(med.total_doses, None);
        assert_eq!(med.raw_ocr_text, "Tylenol 500mg tid");
        assert_eq!(result.hospital_name, None);
    }

    #[test]
    fn test_lenient_fallback_salvages_named_medications() {
        let text = json!({
            "medications": [
                { "medicationName": "Amoxicillin", "confidence": 140.6, "dose": 500, "dosesPerDay": 2.4 },
                { "medicationName": "", "confidence": 90 },
                { "dose": "1 tab" },
                { "medicationName": "Loratadine", "confidence": "high", "duration": false }
            ],
            "rawText": "scan"
        })
        .to_string();

        let result = parse_ocr_response(&text);
        assert!(!result.errors.is_empty());
        assert_eq!(result.medications.len(), 2);

        let amoxicillin = &result.medications[0];
        assert_eq!(amoxicillin.confidence, 100);
        assert_eq!(amoxicillin.dose.as_deref(), Some("500"));
        assert_eq!(amoxicillin.doses_per_day, Some(2));
        assert_eq!(amoxicillin.raw_ocr_text, "scan");

        let loratadine = &result.medications[1];
        assert_eq!(loratadine.confidence, FALLBACK_CONFIDENCE);
        assert_eq!(loratadine.duration, None);
    }

    #[test]
    fn test_out_of_range_confidence_is_clamped_low() {
        let text = json!({
            "medications": [{ "medicationName": "Aspirin", "confidence": -12 }],
            "rawText": ""
        })
        .to_string();

        let result = parse_ocr_response(&text);
        assert_eq!(result.medications[0].confidence, 0);
        assert!(result.errors.iter().any(|e| e.contains("confidence")));
    }

    #[test]
    fn test_missing_raw_text_falls_back_to_empty() {
        let result = parse_ocr_response(r#"{"medications": [{"medicationName": "Aspirin", "confidence": 70}]}"#);
        assert_eq!(result.raw_text, "");
        assert_eq!(result.medications.len(), 1);
        assert!(!result.errors.is_empty());
    }

    #[test]
    fn test_non_json_yields_empty_result_with_error() {
        let result = parse_ocr_response("I could not read this image");
        assert!(result.medications.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("not valid JSON"));
    }

    #[test]
    fn test_empty_text_is_treated_as_empty_object() {
        let result = parse_ocr_response("");
        assert!(result.medications.is_empty());
        assert!(!result.errors.is_empty());
    }

    #[test]
    fn test_parse_conflicts_filters_unknown_entries() {
        let text = json!([
            { "type": "duplicate", "description": "Two acetaminophen products" },
            { "type": "interaction", "description": "unsupported kind" },
            { "type": "allergy_conflict", "description": "  " },
            { "description": "missing type" }
        ])
        .to_string();

        let conflicts = parse_conflicts(&text).unwrap();
        assert_eq!(
            conflicts,
            vec![DetectedConflict {
                flag_type: FlagType::Duplicate,
                description: "Two acetaminophen products".to_string(),
            }]
        );
    }

    #[test]
    fn test_parse_conflicts_rejects_non_array() {
        assert!(parse_conflicts(r#"{"type": "duplicate"}"#).is_err());
        assert!(parse_conflicts("").unwrap().is_empty());
    }
}
