//! # UTC Timestamps
//!
//! A UTC-only, second-precision timestamp. Registry records carry their
//! issuance instant, and those records flow into canonical digests, so
//! timestamps must render identically everywhere: `YYYY-MM-DDTHH:MM:SSZ`,
//! no sub-seconds, no numeric offsets.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A UTC timestamp truncated to whole seconds.
///
/// # Construction
///
/// - [`Timestamp::now`] for the current instant.
/// - [`Timestamp::from_utc`] from a `DateTime<Utc>`, truncating.
/// - [`Timestamp::parse`] from an ISO 8601 string with a `Z` suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Parse an ISO 8601 timestamp.
    ///
    /// Only the `Z` suffix is accepted. Numeric offsets are rejected even
    /// when they denote UTC, because `+00:00` and `Z` canonicalize to
    /// different byte sequences for the same instant.
    pub fn parse(s: &str) -> Result<Self, TimestampParseError> {
        if !s.ends_with('Z') {
            return Err(TimestampParseError::NotUtc(s.to_string()));
        }
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| TimestampParseError::Invalid(format!("{s:?}: {e}")))?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

/// Error parsing a [`Timestamp`].
#[derive(Error, Debug)]
pub enum TimestampParseError {
    #[error("timestamp must use the Z suffix, got {0:?}")]
    NotUtc(String),
    #[error("invalid ISO 8601 timestamp {0}")]
    Invalid(String),
}

fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}
