// crates/chamber-broker/src/topic.rs
// ============================================================================
// Module: Topic table
// Description: Recognizes the room's inbound topic shapes and tracks which
//              topics are currently subscribed, keyed by the devices that
//              own them.
// Purpose: Give the ingress adapter subscribe-idempotence (re-subscribing a
//          topic already subscribed is a no-op) while still rebuilding a
//          controller's topic set cleanly when it reconnects.
// Dependencies: chamber-model
// ============================================================================

//! ## Overview
//! Two topic shapes are fixed by the room protocol: the registration
//! topic, `sentient/registration/<controller_id>`, and the operator command
//! topic, a single well-known string. Every other inbound topic is a
//! device's own `event_topic`, a string advertised by the controller at
//! registration time and otherwise opaque — the table's only job there is
//! to map it back to the `LogicalDeviceId` that owns it.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use chamber_model::ControllerId;
use chamber_model::LogicalDeviceId;

/// Fixed prefix for per-controller registration topics.
pub const REGISTRATION_PREFIX: &str = "sentient/registration/";

/// The single well-known topic operator commands arrive on.
pub const OPERATOR_COMMAND_TOPIC: &str = "sentient/operator/command";

/// Extracts the controller id from a registration topic, if `topic`
/// matches the `sentient/registration/<controller_id>` shape.
#[must_use]
pub fn parse_registration_topic(topic: &str) -> Option<ControllerId> {
    let suffix = topic.strip_prefix(REGISTRATION_PREFIX)?;
    if suffix.is_empty() { None } else { Some(ControllerId::new(suffix)) }
}

/// Tracks which broker topics are currently subscribed and resolves a
/// device event topic back to its owning logical device.
#[derive(Debug, Default)]
pub struct TopicTable {
    subscribed: BTreeSet<String>,
    event_topics: BTreeMap<String, LogicalDeviceId>,
    by_controller: BTreeMap<ControllerId, Vec<String>>,
}

impl TopicTable {
    /// Creates an empty table with the two fixed topics already marked
    /// subscribed.
    #[must_use]
    pub fn new() -> Self {
        let mut table = Self::default();
        table.subscribed.insert(REGISTRATION_PREFIX.trim_end_matches('/').to_owned());
        table.subscribed.insert(OPERATOR_COMMAND_TOPIC.to_owned());
        table
    }

    /// Marks `topic` subscribed. Returns `true` if this is a new
    /// subscription; a repeat call for an already-subscribed topic is a
    /// no-op and returns `false`.
    pub fn subscribe(&mut self, topic: impl Into<String>) -> bool {
        self.subscribed.insert(topic.into())
    }

    /// Returns `true` if `topic` is currently subscribed.
    #[must_use]
    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.subscribed.contains(topic)
    }

    /// Rebuilds the topic set owned by `controller_id`: every previously
    /// subscribed topic for this controller is dropped, then `topics` are
    /// subscribed fresh. Used on both first registration and reconnect, so
    /// a controller that drops and re-advertises a different topic for the
    /// same device never leaves the stale topic subscribed.
    pub fn rebuild_for_controller(
        &mut self,
        controller_id: ControllerId,
        topics: Vec<(LogicalDeviceId, String)>,
    ) {
        if let Some(previous) = self.by_controller.remove(&controller_id) {
            for topic in previous {
                self.subscribed.remove(&topic);
                self.event_topics.remove(&topic);
            }
        }
        let mut owned = Vec::with_capacity(topics.len());
        for (logical_id, topic) in topics {
            self.subscribed.insert(topic.clone());
            self.event_topics.insert(topic.clone(), logical_id);
            owned.push(topic);
        }
        self.by_controller.insert(controller_id, owned);
    }

    /// Resolves a device event topic back to the logical device that
    /// advertised it, if any controller currently owns it.
    #[must_use]
    pub fn resolve_event_topic(&self, topic: &str) -> Option<&LogicalDeviceId> {
        self.event_topics.get(topic)
    }

    /// Returns every currently subscribed device event topic, for a
    /// broker client's subscribe-on-connect bootstrap.
    #[must_use]
    pub fn event_topics_snapshot(&self) -> Vec<String> {
        self.event_topics.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "test assertions favor unwrap")]

    use super::TopicTable;
    use super::parse_registration_topic;
    use chamber_model::ControllerId;
    use chamber_model::LogicalDeviceId;

    #[test]
    fn parses_a_well_formed_registration_topic() {
        let id = parse_registration_topic("sentient/registration/controller-01").unwrap();
        assert_eq!(id, ControllerId::new("controller-01"));
    }

    #[test]
    fn rejects_a_registration_topic_with_no_controller_id() {
        assert!(parse_registration_topic("sentient/registration/").is_none());
    }

    #[test]
    fn resubscribing_the_same_topic_is_a_no_op() {
        let mut table = TopicTable::new();
        assert!(table.subscribe("sentient/event/lock.main-door"));
        assert!(!table.subscribe("sentient/event/lock.main-door"));
    }

    #[test]
    fn reconnect_drops_stale_topics_before_rebuilding() {
        let mut table = TopicTable::new();
        let controller = ControllerId::new("controller-01");
        table.rebuild_for_controller(
            controller.clone(),
            vec![(LogicalDeviceId::new("lock.main-door"), "sentient/event/old".to_owned())],
        );
        assert!(table.is_subscribed("sentient/event/old"));

        table.rebuild_for_controller(
            controller,
            vec![(LogicalDeviceId::new("lock.main-door"), "sentient/event/new".to_owned())],
        );
        assert!(!table.is_subscribed("sentient/event/old"));
        assert!(table.is_subscribed("sentient/event/new"));
        assert_eq!(
            table.resolve_event_topic("sentient/event/new"),
            Some(&LogicalDeviceId::new("lock.main-door")),
        );
    }
}
