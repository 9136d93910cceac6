// crates/chamber-model/src/event.rs
// ============================================================================
// Module: Chamber Event
// Description: The immutable event record and its pre-offset draft form.
// Purpose: Give every component in Chamber a single wire-stable event shape.
// Dependencies: crate::identifiers, crate::time, serde
// ============================================================================

//! ## Overview
//! An [`Event`] is the unit of record in Chamber: every device input, timer
//! firing, operator command, and graph-runtime derivation is represented as
//! one. Events are immutable once constructed. A [`NewEvent`] is the
//! pre-offset draft a producer builds; the [`chamber-log`] event log assigns
//! the offset that turns it into an [`Event`].
//!
//! Security posture: event `name` and `fields` originate from devices and
//! operators and are treated as untrusted until validated against the event
//! registry (`chamber-registry`) and, for conditions, the expression sandbox
//! (`chamber-expr`).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::RoomId;
use crate::identifiers::RoomSessionId;
use crate::time::Timestamp;

// ============================================================================
// SECTION: Event Name
// ============================================================================

/// A dotted event name, e.g. `node.completed` or `device.input`.
///
/// # Invariants
/// - Carries no validation itself; membership in the closed vocabulary is
///   enforced by `chamber-registry::EventRegistry::validate`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventName(String);

impl EventName {
    /// Creates a new event name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the domain prefix of the name (the segment before the first
    /// `.`), or the whole name if it contains no `.`.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.split('.').next().unwrap_or(self.0.as_str())
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for EventName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Severity
// ============================================================================

/// Severity level of an event.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Routine, informational.
    Info,
    /// Recoverable anomaly worth operator attention.
    Warning,
    /// A validation, persistence, scheduler, broker, or graph error.
    Error,
}

// ============================================================================
// SECTION: Field Values
// ============================================================================

/// A structured field value attached to an event.
///
/// # Invariants
/// - Recursion is bounded by construction: lists and maps of `FieldValue`
///   are built from already-bounded JSON, never user-supplied recursion
///   depth beyond what `serde_json` itself permits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// A string scalar.
    Text(String),
    /// A signed integer scalar.
    Int(i64),
    /// A floating point scalar.
    Float(f64),
    /// A boolean scalar.
    Bool(bool),
    /// An ordered list of field values.
    List(Vec<FieldValue>),
    /// An unordered string-keyed map of field values.
    Map(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    /// Returns the value as a boolean, if it is one.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the value as a string slice, if it is text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Returns the value as an `f64`, if it is a numeric scalar.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }
}

/// An unordered mapping of structured fields attached to an event.
pub type FieldMap = BTreeMap<String, FieldValue>;

// ============================================================================
// SECTION: Event
// ============================================================================

/// A pre-offset event draft, as constructed by a producer before the event
/// log assigns it a durable position.
///
/// # Invariants
/// - `name` must pass `EventRegistry::validate` before being appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    /// Room this event belongs to.
    pub room_id: RoomId,
    /// Optional operator session this event belongs to.
    pub session_id: Option<RoomSessionId>,
    /// Wall-clock time at emission.
    pub timestamp: Timestamp,
    /// Event name; must be in the closed registry vocabulary.
    pub name: EventName,
    /// Severity of the event.
    pub level: Severity,
    /// Optional human-readable message.
    pub message: Option<String>,
    /// Structured fields carried by the event.
    pub fields: FieldMap,
}

impl NewEvent {
    /// Creates a new draft event with no message and no fields.
    #[must_use]
    pub fn new(room_id: RoomId, name: impl Into<EventName>, level: Severity) -> Self {
        Self {
            room_id,
            session_id: None,
            timestamp: Timestamp::now(),
            name: name.into(),
            level,
            message: None,
            fields: FieldMap::new(),
        }
    }

    /// Sets the human-readable message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Inserts a structured field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Attaches the event to an operator session.
    #[must_use]
    pub fn with_session(mut self, session_id: RoomSessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Assigns the offset this event was durably appended at, producing the
    /// immutable [`Event`] record.
    #[must_use]
    pub fn into_event(self, offset: u64) -> Event {
        Event {
            offset,
            room_id: self.room_id,
            session_id: self.session_id,
            timestamp: self.timestamp,
            name: self.name,
            level: self.level,
            message: self.message,
            fields: self.fields,
        }
    }
}

/// An immutable, durably appended event.
///
/// # Invariants
/// - `name` is always a member of the event registry at the time of append.
/// - `offset` is dense and strictly increasing per room.
/// - `timestamp` is non-decreasing across events with increasing offsets
///   from the same producer clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic offset assigned by the event log.
    pub offset: u64,
    /// Room this event belongs to.
    pub room_id: RoomId,
    /// Optional operator session this event belongs to.
    pub session_id: Option<RoomSessionId>,
    /// Wall-clock time at emission.
    pub timestamp: Timestamp,
    /// Event name.
    pub name: EventName,
    /// Severity of the event.
    pub level: Severity,
    /// Optional human-readable message.
    pub message: Option<String>,
    /// Structured fields carried by the event.
    pub fields: FieldMap,
}

impl Event {
    /// Returns the value of a structured field, if present.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }
}
