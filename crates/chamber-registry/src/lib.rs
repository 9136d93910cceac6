// crates/chamber-registry/src/lib.rs
// ============================================================================
// Module: Chamber Event Registry
// Description: A closed vocabulary of permitted event names grouped by
//              domain, with a single `validate` operation.
// Purpose: Reject unknown event names at the boundary, before they ever
//          reach the event log.
// Dependencies: chamber-model
// ============================================================================

//! ## Overview
//! Every event published or appended in Chamber is checked against this
//! registry. Adding a name here is a schema change: do it deliberately, in
//! its own change, not as a side effect of wiring up a new feature.
//!
//! The registry is closed by construction — there is no `register` method.
//! If a room needs a new event kind, extend [`KNOWN_EVENTS`] in source and
//! ship it as a new revision; nothing in Chamber loads event names from
//! configuration.

// ============================================================================
// SECTION: Imports
// ============================================================================

use chamber_model::EventName;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Validation error for an event name outside the closed vocabulary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown event name: {0}")]
pub struct UnknownEvent(pub String);

// ============================================================================
// SECTION: Domains
// ============================================================================

/// The domain grouping of an event name (the segment before its first
/// `.`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventDomain {
    /// Node lifecycle events.
    Node,
    /// Puzzle subgraph resolution events.
    Puzzle,
    /// Scene lifecycle events.
    Scene,
    /// Loop node tick/stop events.
    Loop,
    /// Timer node firing events.
    Timer,
    /// Operator command events.
    Operator,
    /// Device registration/input/error events.
    Device,
    /// System lifecycle and error events.
    System,
}

impl EventDomain {
    /// Returns the wire prefix for this domain.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Puzzle => "puzzle",
            Self::Scene => "scene",
            Self::Loop => "loop",
            Self::Timer => "timer",
            Self::Operator => "operator",
            Self::Device => "device",
            Self::System => "system",
        }
    }
}

// ============================================================================
// SECTION: Closed Vocabulary
// ============================================================================

/// The full closed vocabulary of permitted event names, grouped by domain.
///
/// This is the single source of truth: `chamber-registry` has no other
/// place an event name is considered valid or invalid.
pub const KNOWN_EVENTS: &[(EventDomain, &str)] = &[
    (EventDomain::Node, "node.started"),
    (EventDomain::Node, "node.completed"),
    (EventDomain::Node, "node.failed"),
    (EventDomain::Node, "node.overridden"),
    (EventDomain::Node, "node.reset"),
    (EventDomain::Puzzle, "puzzle.activated"),
    (EventDomain::Puzzle, "puzzle.solved"),
    (EventDomain::Puzzle, "puzzle.failed"),
    (EventDomain::Puzzle, "puzzle.overridden"),
    (EventDomain::Scene, "scene.started"),
    (EventDomain::Scene, "scene.completed"),
    (EventDomain::Scene, "scene.failed"),
    (EventDomain::Loop, "loop.tick"),
    (EventDomain::Loop, "loop.stopped"),
    (EventDomain::Timer, "timer.expired"),
    (EventDomain::Operator, "operator.start_game"),
    (EventDomain::Operator, "operator.stop_game"),
    (EventDomain::Operator, "operator.pause"),
    (EventDomain::Operator, "operator.resume"),
    (EventDomain::Operator, "operator.override"),
    (EventDomain::Operator, "operator.reset"),
    (EventDomain::Operator, "operator.jump"),
    (EventDomain::Device, "device.connected"),
    (EventDomain::Device, "device.disconnected"),
    (EventDomain::Device, "device.input"),
    (EventDomain::Device, "device.error"),
    (EventDomain::System, "system.startup"),
    (EventDomain::System, "system.shutdown"),
    (EventDomain::System, "system.error"),
];

// ============================================================================
// SECTION: Registry
// ============================================================================

/// The event registry: a single `validate` operation over the closed
/// vocabulary.
///
/// # Invariants
/// - Zero-sized; all state lives in the static [`KNOWN_EVENTS`] table.
#[derive(Debug, Default, Clone, Copy)]
pub struct EventRegistry;

impl EventRegistry {
    /// Validates that `name` is a member of the closed vocabulary.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownEvent`] when `name` is not registered. Callers at
    /// the ingestion boundary report this as `device.error` or
    /// `system.error` depending on origin and must never append the event.
    pub fn validate(&self, name: &EventName) -> Result<(), UnknownEvent> {
        if KNOWN_EVENTS.iter().any(|(_, known)| *known == name.as_str()) {
            Ok(())
        } else {
            Err(UnknownEvent(name.as_str().to_owned()))
        }
    }

    /// Returns every known event name in the given domain.
    #[must_use]
    pub fn names_in_domain(&self, domain: EventDomain) -> Vec<&'static str> {
        KNOWN_EVENTS
            .iter()
            .filter(|(event_domain, _)| *event_domain == domain)
            .map(|(_, name)| *name)
            .collect()
    }

    /// Returns every known event name.
    #[must_use]
    pub fn all_names(&self) -> Vec<&'static str> {
        KNOWN_EVENTS.iter().map(|(_, name)| *name).collect()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::missing_docs_in_private_items,
        reason = "test assertions favor unwrap/expect and skip doc comments"
    )]

    use super::*;

    #[test]
    fn accepts_known_name() {
        let registry = EventRegistry;
        assert!(registry.validate(&EventName::new("node.completed")).is_ok());
    }

    #[test]
    fn rejects_unknown_name() {
        let registry = EventRegistry;
        let err = registry.validate(&EventName::new("node.teleported")).unwrap_err();
        assert_eq!(err, UnknownEvent("node.teleported".to_owned()));
    }

    #[test]
    fn rejects_whitespace_variant_of_timer_expired() {
        // The spec notes a source ambiguity where a leading-whitespace typo
        // of `timer.expired` appeared in one registry entry; Chamber has a
        // single canonical form and never accepts the variant.
        let registry = EventRegistry;
        assert!(registry.validate(&EventName::new(" timer.expired")).is_err());
        assert!(registry.validate(&EventName::new("timer.expired")).is_ok());
    }

    #[test]
    fn domain_filter_only_returns_matching_names() {
        let registry = EventRegistry;
        let names = registry.names_in_domain(EventDomain::Loop);
        assert_eq!(names, vec!["loop.tick", "loop.stopped"]);
    }

    #[test]
    fn every_known_name_round_trips_through_domain_prefix() {
        for (domain, name) in KNOWN_EVENTS {
            assert!(name.starts_with(domain.prefix()));
        }
    }
}
