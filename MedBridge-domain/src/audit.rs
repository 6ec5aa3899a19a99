//! Audit trail of share-token activity.
//!
//! Events go to the tracing output as `ACCESS-LOG` lines. They carry the
//! intake and token ids only; token values are never written.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

/// Kinds of audited events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AccessEventType {
    /// A share token was created
    TokenIssued,
    /// Tokens were invalidated and a new one created
    TokenRegenerated,
    /// A view was attempted with an unusable token
    TokenRejected,
    /// A clinician opened a summary
    SummaryViewed,
    /// An intake was submitted
    IntakeCreated,
    /// An intake was deleted
    IntakeDeleted,
}

impl std::fmt::Display for AccessEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessEventType::TokenIssued => write!(f, "TOKEN_ISSUED"),
            AccessEventType::TokenRegenerated => write!(f, "TOKEN_REGENERATED"),
            AccessEventType::TokenRejected => write!(f, "TOKEN_REJECTED"),
            AccessEventType::SummaryViewed => write!(f, "SUMMARY_VIEWED"),
            AccessEventType::IntakeCreated => write!(f, "INTAKE_CREATED"),
            AccessEventType::IntakeDeleted => write!(f, "INTAKE_DELETED"),
        }
    }
}

/// One audited event
#[derive(Debug, Clone, Serialize)]
pub struct AccessEvent {
    pub event_type: AccessEventType,
    pub intake_id: Option<String>,
    pub token_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub details: Option<String>,
}

impl AccessEvent {
    pub fn new(event_type: AccessEventType, success: bool) -> Self {
        Self {
            event_type,
            intake_id: None,
            token_id: None,
            timestamp: Utc::now(),
            success,
            details: None,
        }
    }

    /// Set the intake
    pub fn with_intake(mut self, intake_id: impl Into<String>) -> Self {
        self.intake_id = Some(intake_id.into());
        self
    }

    /// Set the token id
    pub fn with_token(mut self, token_id: impl Into<String>) -> Self {
        self.token_id = Some(token_id.into());
        self
    }

    /// Set the details
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    fn line(&self) -> String {
        format!(
            "ACCESS-LOG [{}] [{}] [{}] [{}] [{}] {}",
            self.event_type,
            self.intake_id.as_deref().unwrap_or("-"),
            self.token_id.as_deref().unwrap_or("-"),
            if self.success { "SUCCESS" } else { "FAILURE" },
            self.timestamp.to_rfc3339(),
            self.details.as_deref().unwrap_or("")
        )
    }
}

/// Write an event to the log
pub fn log_access_event(event: AccessEvent) {
    if event.success {
        info!("{}", event.line());
    } else {
        warn!("{}", event.line());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_line_format() {
        let event = AccessEvent::new(AccessEventType::SummaryViewed, true)
            .with_intake("intake-1")
            .with_token("token-id-1")
            .with_details("view");

        let line = event.line();
        assert!(line.starts_with("ACCESS-LOG [SUMMARY_VIEWED] [intake-1] [token-id-1] [SUCCESS]"));
        assert!(line.ends_with(" view"));
    }

    #[test]
    fn test_missing_fields_render_as_dash() {
        let line = AccessEvent::new(AccessEventType::TokenRejected, false).line();
        assert!(line.starts_with("ACCESS-LOG [TOKEN_REJECTED] [-] [-] [FAILURE]"));
    }
}
