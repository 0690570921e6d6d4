//! Helper functions and utilities
//!
//! This module contains common helper functions used throughout the application.

use std::sync::OnceLock;
use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use uuid::Uuid;

/// Prefix for generated external ids of manually authored events
pub const MANUAL_ID_PREFIX: &str = "manual-";

/// Generate an external id for a manual event
pub fn generate_manual_external_id() -> String {
    format!("{}{}", MANUAL_ID_PREFIX, Uuid::new_v4().simple())
}

/// Namespace an author-supplied external id so it cannot name a provider event
pub fn namespace_manual_id(id: &str) -> String {
    if id.starts_with(MANUAL_ID_PREFIX) {
        id.to_string()
    } else {
        format!("{}{}", MANUAL_ID_PREFIX, id)
    }
}

/// Format a timestamp the way Ticketmaster expects it (no fractional seconds)
pub fn format_provider_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Format a timestamp as RFC 3339 for Google Calendar
pub fn format_rfc3339(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Check that an email address has a plausible shape
pub fn is_valid_email(email: &str) -> bool {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(email))
}

/// Normalize an email address for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
