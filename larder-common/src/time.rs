//! Timestamp utilities
//!
//! Timestamps are persisted as fixed-width RFC 3339 text (microsecond precision,
//! `Z` suffix) so that lexical ordering in SQLite matches chronological ordering.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::{Error, Result};

/// Format a timestamp for storage
pub fn to_db(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp
pub fn from_db(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse timestamp '{}': {}", value, e)))
}

/// Parse an optional stored timestamp
pub fn from_db_opt(value: Option<String>) -> Result<Option<DateTime<Utc>>> {
    value.as_deref().map(from_db).transpose()
}
