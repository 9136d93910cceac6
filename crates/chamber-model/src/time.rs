// crates/chamber-model/src/time.rs
// ============================================================================
// Module: Chamber Timestamps
// Description: Wall-clock timestamp newtype with RFC3339 wire form.
// Purpose: Give every event and state record a single, unambiguous notion of
//          "now" that round-trips through JSON and SQLite identically.
// Dependencies: time, serde
// ============================================================================

//! ## Overview
//! `Timestamp` wraps [`time::OffsetDateTime`] and is the only wall-clock type
//! that crosses a Chamber component boundary. Durations use
//! [`std::time::Duration`] directly, since Chamber never needs calendar
//! arithmetic on them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Wall-clock timestamp, always UTC on the wire.
///
/// # Invariants
/// - Serializes as an RFC3339 string.
/// - Two timestamps compare by instant, not by calendar representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(OffsetDateTime);

impl Timestamp {
    /// Wraps an existing `OffsetDateTime`.
    #[must_use]
    pub const fn new(at: OffsetDateTime) -> Self {
        Self(at)
    }

    /// Returns the current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    /// Returns the underlying `OffsetDateTime`.
    #[must_use]
    pub const fn as_offset_date_time(self) -> OffsetDateTime {
        self.0
    }

    /// Returns the duration elapsed since `earlier`, or `None` if `earlier`
    /// is in the future relative to `self`.
    #[must_use]
    pub fn saturating_since(self, earlier: Self) -> std::time::Duration {
        let delta = self.0 - earlier.0;
        delta.try_into().unwrap_or(std::time::Duration::ZERO)
    }

    /// Returns this timestamp advanced by `duration`, used by the scheduler
    /// and graph runtime to compute timer and loop-tick fire times.
    #[must_use]
    pub fn plus(self, duration: std::time::Duration) -> Self {
        Self(self.0 + duration)
    }

    /// Parses an RFC3339 string, as produced by [`Timestamp`]'s `Display`
    /// and `Serialize` implementations.
    ///
    /// # Errors
    ///
    /// Returns a [`time::error::Parse`] if `value` is not a valid RFC3339
    /// timestamp.
    pub fn parse_rfc3339(value: &str) -> Result<Self, time::error::Parse> {
        OffsetDateTime::parse(value, &Rfc3339).map(Self)
    }
}

impl std::str::FromStr for Timestamp {
    type Err = time::error::Parse;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse_rfc3339(value)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.format(&Rfc3339) {
            Ok(formatted) => f.write_str(&formatted),
            Err(_) => write!(f, "<unformattable timestamp>"),
        }
    }
}

impl Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let formatted = self
            .0
            .format(&Rfc3339)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        let parsed = OffsetDateTime::parse(&raw, &Rfc3339).map_err(serde::de::Error::custom)?;
        Ok(Self(parsed))
    }
}
