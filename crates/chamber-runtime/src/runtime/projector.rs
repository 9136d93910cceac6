// crates/chamber-runtime/src/runtime/projector.rs
// ============================================================================
// Module: Projector
// Description: Maintains a read-model snapshot of the running room and fans
//              out deltas to any number of subscribers.
// Purpose: Give operator UIs and dashboards a cheap way to mirror room state
//          without replaying the event log themselves.
// Dependencies: chamber-broadcast, chamber-devices, chamber-model
// ============================================================================

//! ## Overview
//! The [`Projector`] is the coordinator's sixth step: after an event is
//! applied and its derived events are logged, the coordinator folds each one
//! into a [`CurrentState`] snapshot and publishes it over a
//! [`chamber_broadcast::Broadcaster`]. A new subscriber receives the
//! broadcaster's replay window immediately, so it can reconstruct recent
//! history without a separate log read.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use chamber_broadcast::Broadcaster;
use chamber_broadcast::Subscription;
use chamber_model::ControllerId;
use chamber_model::Event;
use chamber_model::FieldValue;
use chamber_model::NodeId;
use chamber_model::NodeLifecycle;
use chamber_model::RoomReadiness;
use chamber_model::SceneId;

/// A point-in-time read-model snapshot of one room.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentState {
    /// The active scene, if the room has been started.
    pub active_scene: Option<SceneId>,
    /// Lifecycle of every node the projector has observed activity for.
    pub node_lifecycles: BTreeMap<NodeId, NodeLifecycle>,
    /// Puzzle nodes currently activated and unresolved.
    pub active_puzzles: BTreeSet<NodeId>,
    /// Controllers the device registry has seen register.
    pub connected_controllers: BTreeSet<ControllerId>,
    /// The most recently observed device readiness summary.
    pub readiness: Option<RoomReadiness>,
    /// Whether the room is currently paused.
    pub paused: bool,
    /// Whether the active scene has halted (completed or failed).
    pub halted: bool,
    /// Whether the durable log most recently rejected an append. Set while
    /// the coordinator is running the room purely in memory and cleared the
    /// next time a durable append succeeds.
    pub durability_degraded: bool,
}

/// Folds applied events into a [`CurrentState`] and republishes the result.
pub struct Projector {
    broadcaster: Broadcaster<CurrentState>,
    state: CurrentState,
}

impl Projector {
    /// Creates a projector whose subscribers replay up to `replay_capacity`
    /// of the most recent snapshots on subscribe.
    #[must_use]
    pub fn new(replay_capacity: usize) -> Self {
        Self { broadcaster: Broadcaster::new(replay_capacity), state: CurrentState::default() }
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> CurrentState {
        self.state.clone()
    }

    /// Subscribes to the projector's feed, receiving the replay window
    /// immediately followed by live deltas.
    #[must_use]
    pub fn subscribe(&self) -> Subscription<CurrentState> {
        self.broadcaster.subscribe()
    }

    /// Folds `event` into the snapshot and publishes the updated state to
    /// every subscriber.
    pub fn project(&mut self, event: &Event) {
        match event.name.as_str() {
            "scene.started" => {
                if let Some(FieldValue::Text(scene)) = event.field("scene_id") {
                    self.state.active_scene = Some(SceneId::new(scene.clone()));
                }
                self.state.halted = false;
                self.state.node_lifecycles.clear();
                self.state.active_puzzles.clear();
            }
            "scene.completed" | "scene.failed" => self.state.halted = true,
            "node.started" => self.set_node_lifecycle(event, NodeLifecycle::Active),
            "node.completed" => self.set_node_lifecycle(event, NodeLifecycle::Completed),
            "node.failed" => self.set_node_lifecycle(event, NodeLifecycle::Failed),
            "node.overridden" => self.set_node_lifecycle(event, NodeLifecycle::Overridden),
            "node.reset" => self.set_node_lifecycle(event, NodeLifecycle::Reset),
            "puzzle.activated" => {
                if let Some(puzzle_id) = puzzle_id(event) {
                    self.state.active_puzzles.insert(puzzle_id);
                }
            }
            "puzzle.solved" | "puzzle.failed" | "puzzle.overridden" => {
                if let Some(puzzle_id) = puzzle_id(event) {
                    self.state.active_puzzles.remove(&puzzle_id);
                }
            }
            "device.registered" | "device.connected" => {
                if let Some(FieldValue::Text(controller)) = event.field("controller_id") {
                    self.state.connected_controllers.insert(ControllerId::new(controller.clone()));
                }
            }
            "operator.pause" => self.state.paused = true,
            "operator.resume" => self.state.paused = false,
            _ => {}
        }
        self.broadcaster.publish(self.state.clone());
    }

    /// Replaces the last observed device readiness summary, published
    /// separately from the log-driven event stream since readiness can
    /// change from a heartbeat liveness sweep with no event of its own.
    pub fn set_readiness(&mut self, readiness: RoomReadiness) {
        self.state.readiness = Some(readiness);
        self.broadcaster.publish(self.state.clone());
    }

    /// Records whether the durable log is currently rejecting appends,
    /// published separately from the log-driven event stream for the same
    /// reason as [`Self::set_readiness`]: a failed append is exactly the
    /// moment the coordinator cannot rely on the normal log-then-project
    /// path to carry the news.
    pub fn set_durability_degraded(&mut self, degraded: bool) {
        self.state.durability_degraded = degraded;
        self.broadcaster.publish(self.state.clone());
    }

    fn set_node_lifecycle(&mut self, event: &Event, lifecycle: NodeLifecycle) {
        if let Some(FieldValue::Text(node)) = event.field("node_id") {
            self.state.node_lifecycles.insert(NodeId::new(node.clone()), lifecycle);
        }
    }
}

fn puzzle_id(event: &Event) -> Option<NodeId> {
    match event.field("puzzle_id") {
        Some(FieldValue::Text(id)) => Some(NodeId::new(id.clone())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "test assertions favor unwrap")]

    use chamber_model::EventName;
    use chamber_model::RoomId;
    use chamber_model::Severity;
    use chamber_model::Timestamp;
    use time::macros::datetime;

    use super::CurrentState;
    use super::Projector;
    use chamber_model::Event;

    fn event(name: &str, fields: Vec<(&str, FieldValue)>) -> Event {
        Event {
            offset: 0,
            room_id: RoomId::new("room-1"),
            session_id: None,
            timestamp: Timestamp::new(datetime!(2026-08-01 12:00:00 UTC)),
            name: EventName::new(name),
            level: Severity::Info,
            message: None,
            fields: fields.into_iter().map(|(k, v)| (k.to_owned(), v)).collect(),
        }
    }

    use chamber_model::FieldValue;

    #[test]
    fn node_lifecycle_tracks_through_started_and_completed() {
        let mut projector = Projector::new(8);
        projector.project(&event(
            "scene.started",
            vec![("scene_id", FieldValue::Text("scene-1".to_owned()))],
        ));
        projector.project(&event(
            "node.started",
            vec![("node_id", FieldValue::Text("entry".to_owned()))],
        ));
        let snapshot: CurrentState = projector.snapshot();
        assert_eq!(snapshot.node_lifecycles.len(), 1);
        assert!(!snapshot.halted);
    }

    #[test]
    fn scene_completed_marks_halted() {
        let mut projector = Projector::new(8);
        projector.project(&event(
            "scene.completed",
            vec![("scene_id", FieldValue::Text("scene-1".to_owned()))],
        ));
        assert!(projector.snapshot().halted);
    }
}
