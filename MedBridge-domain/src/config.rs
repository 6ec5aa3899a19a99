//! Runtime configuration read from the environment

use std::env;
use std::str::FromStr;

use tracing::info;

/// Default lifetime of a share token
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 10;
/// Medications read below this confidence need manual verification
pub const DEFAULT_LOW_CONFIDENCE_THRESHOLD: i64 = 70;
/// Documents accepted per intake
pub const DEFAULT_MAX_DOCUMENTS: usize = 5;
/// Size cap per uploaded document
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Settings of the intake workflow
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// Lifetime of a share token in minutes
    pub token_ttl_minutes: i64,
    /// Medications below this confidence are flagged
    pub low_confidence_threshold: i64,
    /// Maximum number of documents per intake
    pub max_documents: usize,
    /// Maximum size of a single document in bytes
    pub max_document_bytes: usize,
    /// Origin used to build share URLs
    pub public_base_url: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            token_ttl_minutes: DEFAULT_TOKEN_TTL_MINUTES,
            low_confidence_threshold: DEFAULT_LOW_CONFIDENCE_THRESHOLD,
            max_documents: DEFAULT_MAX_DOCUMENTS,
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            public_base_url: "http://localhost:3000".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Read the configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let config = Self {
            token_ttl_minutes: parse_var("ACCESS_TOKEN_TTL_MINUTES")
                .filter(|m: &i64| *m > 0)
                .unwrap_or(defaults.token_ttl_minutes),
            low_confidence_threshold: parse_var("LOW_CONFIDENCE_THRESHOLD")
                .filter(|t: &i64| (0..=100).contains(t))
                .unwrap_or(defaults.low_confidence_threshold),
            max_documents: parse_var("MAX_DOCUMENTS").unwrap_or(defaults.max_documents),
            max_document_bytes: parse_var("MAX_DOCUMENT_BYTES").unwrap_or(defaults.max_document_bytes),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.public_base_url),
        };

        info!(
            "Service configuration: token_ttl={}m, low_confidence<{}, max_documents={}, max_document_bytes={}",
            config.token_ttl_minutes,
            config.low_confidence_threshold,
            config.max_documents,
            config.max_document_bytes
        );
        config
    }

    /// Total request body the API has to accept for a full upload
    pub fn max_upload_bytes(&self) -> usize {
        self.max_documents
            .saturating_mul(self.max_document_bytes)
            .saturating_add(1024 * 1024)
    }
}

/// Settings of the Gemini extraction client
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractorConfig {
    /// API key; extraction is disabled without one
    pub api_key: Option<String>,
    /// Base URL of the `generateContent` API
    pub base_url: String,
    /// Model name
    pub model: String,
    /// HTTP timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            timeout_seconds: 60,
        }
    }
}

impl ExtractorConfig {
    /// Read the configuration from environment variables.
    ///
    /// The `AI_INTEGRATIONS_*` names are accepted as fallbacks for hosted deployments.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: first_var(&["GEMINI_API_KEY", "AI_INTEGRATIONS_GEMINI_API_KEY"])
                .filter(|key| !key.trim().is_empty()),
            base_url: first_var(&["GEMINI_BASE_URL", "AI_INTEGRATIONS_GEMINI_BASE_URL"])
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            model: env::var("GEMINI_MODEL").unwrap_or(defaults.model),
            timeout_seconds: parse_var("GEMINI_TIMEOUT_SECONDS").unwrap_or(defaults.timeout_seconds),
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|value| value.trim().parse::<T>().ok())
}

fn first_var(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| env::var(name).ok())
}
