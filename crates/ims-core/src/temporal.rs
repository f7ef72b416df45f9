//! # Temporal Types
//!
//! UTC-only timestamp type. All timestamps are stored in UTC with
//! microsecond precision, the resolution PostgreSQL `TIMESTAMPTZ` keeps,
//! so a timestamp survives a database roundtrip bit-for-bit. That matters
//! for the audit hash chain, which hashes the serialized timestamp.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// A UTC timestamp truncated to microseconds.
///
/// Serializes to RFC 3339 with a `Z` suffix (e.g. `2026-01-15T12:00:00.123456Z`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp representing the current UTC time.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Create a timestamp from a `chrono::DateTime<Utc>`, truncating to microseconds.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.trunc_subsecs(6))
    }

    /// Access the underlying `chrono::DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Consume into the underlying `chrono::DateTime<Utc>`.
    pub fn into_datetime(self) -> DateTime<Utc> {
        self.0
    }

    /// RFC 3339 representation with microseconds and `Z` suffix.
    pub fn to_canonical_string(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// Return `self`, or `floor` if `self` is earlier.
    ///
    /// Used to keep per-entity event timestamps non-decreasing when the
    /// wall clock steps backwards.
    pub fn not_before(self, floor: Timestamp) -> Timestamp {
        self.max(floor)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_canonical_string())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_datetime(dt)
    }
}
