//! Medication extraction through a hosted vision model.
//!
//! The model does all the reading; this module builds the requests, checks
//! the loosely-typed JSON that comes back and turns it into entities.

use async_trait::async_trait;
use thiserror::Error;

use crate::entities::{DetectedConflict, Medication, OcrResult};

mod gemini;
pub mod validation;

pub use gemini::GeminiExtractor;

/// Errors raised while talking to the extraction service
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// No API key configured
    #[error("Extraction service is not configured")]
    NotConfigured,

    /// Transport failure
    #[error("Extraction request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status
    #[error("Extraction service returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The service answered with something we cannot use
    #[error("Invalid extraction response: {0}")]
    InvalidResponse(String),
}

/// Reads medications from document images
#[async_trait]
pub trait MedicationExtractor: Send + Sync {
    /// Whether the extractor can reach a model at all
    fn is_configured(&self) -> bool;

    /// Read the medications printed on one document.
    ///
    /// Never fails: problems are reported in [`OcrResult::errors`] alongside
    /// whatever could be read.
    async fn extract_medications(&self, image: &[u8], mime_type: &str) -> OcrResult;

    /// Look for duplicates, overlapping courses and allergy conflicts across
    /// the medications of one intake
    async fn detect_conflicts(
        &self,
        medications: &[Medication],
        allergies: Option<&str>,
        adverse_events: Option<&str>,
    ) -> Result<Vec<DetectedConflict>, ExtractionError>;
}
