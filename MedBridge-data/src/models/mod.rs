//! Storage models
//!
//! Rows as they live in SQLite. Enumerated values are kept as their string
//! form here and parsed in the domain layer.

use chrono::{DateTime, SecondsFormat, Utc};

pub mod access;
pub mod adherence;
pub mod hospital;
pub mod intake;
pub mod medication;
pub mod notification;
pub mod patient;
pub mod prescription;

/// Format a timestamp the way every `*_at` column stores it.
///
/// Fixed-width RFC 3339 with milliseconds, so lexical order matches
/// chronological order.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time in storage format
pub fn timestamp_now() -> String {
    format_timestamp(Utc::now())
}
