//! RFC-3339 timestamps as they are persisted in the store.
//!
//! Every stored value is UTC with second precision and a `Z` suffix, so the
//! strings also sort chronologically.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a timestamp for storage.
pub fn format(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a stored timestamp; `None` when the value is not valid RFC-3339.
pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|at| at.with_timezone(&Utc))
}
