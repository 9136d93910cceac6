// crates/chamber-runtime/src/runtime/coordinator.rs
// ============================================================================
// Module: Coordinator
// Description: The single-threaded main loop: drains one external or
//              scheduler-fired event at a time, applies it to the graph
//              runtime, and durably logs and projects every event the
//              application produces before looking at the next one.
// Purpose: Own the six-step event algorithm end to end (validate, append,
//          apply, advance, derive, project) so every other crate can stay
//          a pure function over its own slice of state.
// Dependencies: chamber-log, chamber-model, chamber-registry, chamber-scheduler,
//               tokio (sync, time)
// ============================================================================

//! ## Overview
//! [`Coordinator`] owns one [`GraphRuntime`], one [`Projector`], one
//! [`chamber_scheduler::Scheduler`], and a handle to the durable
//! [`chamber_log::EventLog`]. Its `run` loop does exactly one thing at a
//! time: wait for either the next externally-ingested [`NewEvent`] or the
//! scheduler's next due fire, whichever comes first, then process that one
//! event to completion (including every derived event it produces) before
//! looking at the queue again.
//!
//! "Processing to completion" never re-enters [`GraphRuntime`]'s public
//! apply-family methods recursively: a single call already returns the full
//! ordered burst of derived events for that one external trigger. The
//! coordinator's job with that burst is purely mechanical — assign each
//! derived event a durable offset via the log and publish it through the
//! projector, in order, before accepting the next event from the queue.
//! This keeps the total event order single and well-defined: one queue,
//! one FIFO, one in-flight event at a time.
//!
//! A durable append can fail (disk full, database locked). When it does the
//! coordinator does not stop: it assigns the event a locally-tracked offset
//! instead, keeps applying it to the graph runtime and projector in memory,
//! and publishes a one-shot `system.error` directly onto a dedicated
//! [`chamber_broadcast::Broadcaster`] rather than through `self.log`, since
//! that is the component that is failing. Repeat failures are suppressed
//! until an append succeeds again, at which point the room's durability is
//! reported as recovered through the projector.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use chamber_broadcast::Broadcaster;
use chamber_log::EventLog;
use chamber_log::PersistenceError;
use chamber_model::Event;
use chamber_model::FieldValue;
use chamber_model::NewEvent;
use chamber_model::NodeId;
use chamber_model::RoomId;
use chamber_model::SceneId;
use chamber_model::Timestamp;
use chamber_registry::EventRegistry;
use chamber_scheduler::Fire;
use chamber_scheduler::Scheduler;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::ApplyOutcome;
use super::GraphRuntime;
use super::Projector;
use super::SchedulingRequest;
use crate::error::GraphError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failure in the coordinator's main loop. Every variant is recoverable:
/// the coordinator logs it, emits a `system.error` event of its own, and
/// continues to the next queued event rather than exiting the process.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// An event failed the closed-vocabulary check and was dropped.
    #[error("event name outside the closed vocabulary: {0}")]
    UnknownEventName(#[from] chamber_registry::UnknownEvent),
    /// The durable log rejected an append.
    #[error("event log append failed: {0}")]
    Persistence(#[from] PersistenceError),
    /// Applying the event to the graph runtime failed.
    #[error("graph runtime rejected event: {0}")]
    Graph(#[from] GraphError),
}

// ============================================================================
// SECTION: Coordinator
// ============================================================================

/// Replay window for the bypass `system.error` broadcaster. Only one
/// degraded notice is ever live at a time before suppression kicks in, so
/// this stays small.
const DEGRADED_ERROR_REPLAY_CAPACITY: usize = 8;

/// Drains [`NewEvent`] drafts from a bounded queue and scheduler fires from
/// a [`Scheduler`], applying each to a [`GraphRuntime`] and durably
/// recording the result.
pub struct Coordinator {
    room_id: RoomId,
    graph_runtime: GraphRuntime,
    projector: Projector,
    scheduler: Scheduler,
    log: Arc<dyn EventLog>,
    registry: EventRegistry,
    inbox: mpsc::Receiver<NewEvent>,
    /// Bypass ring buffer for `system.error` events reporting a durability
    /// failure, published independently of `log` so a broken log can never
    /// prevent the room from hearing about its own breakage.
    error_broadcaster: Broadcaster<Event>,
    /// Set once a durable append fails, cleared the next time one succeeds.
    /// Suppresses repeat bypass notices while `true`.
    degraded: bool,
    /// Descends from `u64::MAX` to hand out offsets for events applied in
    /// memory while `degraded`, kept well clear of the log's own
    /// monotonically increasing offsets.
    next_local_offset: u64,
}

impl Coordinator {
    /// Creates a coordinator for `room_id`, wired to `log` for durability.
    /// `inbox` is the receiving half of the channel every
    /// [`crate::ingress::IngressAdapter`] publishes onto.
    #[must_use]
    pub fn new(
        room_id: RoomId,
        graph_runtime: GraphRuntime,
        log: Arc<dyn EventLog>,
        inbox: mpsc::Receiver<NewEvent>,
        projector_replay_capacity: usize,
    ) -> Self {
        Self {
            room_id,
            graph_runtime,
            projector: Projector::new(projector_replay_capacity),
            scheduler: Scheduler::new(),
            log,
            registry: EventRegistry,
            inbox,
            error_broadcaster: Broadcaster::new(DEGRADED_ERROR_REPLAY_CAPACITY),
            degraded: false,
            next_local_offset: u64::MAX,
        }
    }

    /// Returns a read-only view of the graph runtime, for diagnostics.
    #[must_use]
    pub const fn graph_runtime(&self) -> &GraphRuntime {
        &self.graph_runtime
    }

    /// Subscribes to the projector's live read-model feed.
    #[must_use]
    pub fn subscribe_projection(&self) -> chamber_broadcast::Subscription<super::CurrentState> {
        self.projector.subscribe()
    }

    /// Subscribes to the bypass feed of `system.error` events reporting
    /// durability failures, independent of the normal log and projection
    /// path.
    #[must_use]
    pub fn subscribe_durability_errors(&self) -> chamber_broadcast::Subscription<Event> {
        self.error_broadcaster.subscribe()
    }

    /// Whether the durable log most recently rejected an append.
    #[must_use]
    pub const fn is_durability_degraded(&self) -> bool {
        self.degraded
    }

    /// Runs the main loop until the inbox is closed (every ingress adapter
    /// and sender handle has been dropped).
    pub async fn run(&mut self) {
        loop {
            let wakeup = self.scheduler.next_wakeup();
            tokio::select! {
                biased;
                maybe_event = self.inbox.recv() => {
                    let Some(draft) = maybe_event else { return };
                    if let Err(error) = self.handle_external(draft) {
                        self.emit_system_error(&error.to_string());
                    }
                }
                () = sleep_until(wakeup), if wakeup.is_some() => {
                    self.drain_due_fires();
                }
            }
        }
    }

    /// Processes a single externally-ingested event synchronously. Exposed
    /// directly so tests and `chamber-cli`'s `replay` path can drive the
    /// coordinator without going through the async queue.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError`] if the event name is not registered, the
    /// durable append fails, or the graph runtime rejects the event (e.g.
    /// the room is paused or halted).
    pub fn handle_external(&mut self, draft: NewEvent) -> Result<(), CoordinatorError> {
        self.registry.validate(&draft.name)?;
        let name = draft.name.as_str().to_owned();
        let applied = self.append_or_continue_in_memory(draft);
        let now = applied.timestamp;

        let outcome = self.dispatch(&name, &applied, now)?;
        self.apply_scheduling(&outcome.scheduling);
        self.projector.project(&applied);
        self.drain_derived(outcome.derived);
        Ok(())
    }

    fn dispatch(&mut self, name: &str, event: &Event, now: Timestamp) -> Result<ApplyOutcome, GraphError> {
        let room_id = self.room_id.clone();
        match name {
            "operator.start_game" => {
                let scene_id = text_field(event, "scene_id").map(SceneId::new);
                self.graph_runtime.start_game(&room_id, scene_id, now)
            }
            "operator.stop_game" => self.graph_runtime.stop_game(),
            "operator.pause" => self.graph_runtime.pause(),
            "operator.resume" => self.graph_runtime.resume(),
            "operator.override" => {
                let node_id = required_node_id(event)?;
                self.graph_runtime.override_node(&room_id, &node_id, now)
            }
            "operator.reset" => {
                let node_id = required_node_id(event)?;
                self.graph_runtime.reset_node(&room_id, &node_id, now)
            }
            "operator.jump" => {
                let node_id = required_node_id(event)?;
                self.graph_runtime.jump_node(&room_id, &node_id, now)
            }
            "device.input" => self.graph_runtime.handle_device_input(&room_id, event, now),
            _ => Ok(ApplyOutcome::default()),
        }
    }

    fn drain_derived(&mut self, derived: Vec<NewEvent>) {
        for draft in derived {
            let applied = self.append_or_continue_in_memory(draft);
            self.projector.project(&applied);
        }
    }

    /// Appends `draft` durably if the log accepts it; otherwise marks the
    /// room durability-degraded and falls back to a locally-assigned offset
    /// so the caller can keep applying the event in memory. Clears the
    /// degraded flag on the next successful append.
    fn append_or_continue_in_memory(&mut self, draft: NewEvent) -> Event {
        match self.log.append(draft.clone()) {
            Ok(applied) => {
                self.clear_degraded();
                applied
            }
            Err(error) => {
                self.mark_degraded(&error.to_string());
                let offset = self.next_local_offset;
                self.next_local_offset -= 1;
                draft.into_event(offset)
            }
        }
    }

    /// Records a durability failure. Emits a one-shot `system.error` to the
    /// bypass ring buffer the first time this happens; subsequent calls
    /// while already degraded are suppressed.
    fn mark_degraded(&mut self, message: &str) {
        tracing::error!(message, "durable append failed, continuing in memory");
        if self.degraded {
            return;
        }
        self.degraded = true;
        self.projector.set_durability_degraded(true);
        let draft = NewEvent::new(self.room_id.clone(), "system.error", chamber_model::Severity::Error)
            .with_message(format!("durable log append failed, room is running in memory only: {message}"));
        let offset = self.next_local_offset;
        self.next_local_offset -= 1;
        self.error_broadcaster.publish(draft.into_event(offset));
    }

    /// Clears the durability-degraded flag if it was set, reporting
    /// recovery through the projector.
    fn clear_degraded(&mut self) {
        if self.degraded {
            self.degraded = false;
            self.projector.set_durability_degraded(false);
        }
    }

    fn apply_scheduling(&mut self, requests: &[SchedulingRequest]) {
        for request in requests {
            match request {
                SchedulingRequest::ScheduleTimer { node_id, fire_at } => {
                    self.scheduler.schedule_timer(node_id.clone(), *fire_at);
                }
                SchedulingRequest::CancelTimer { node_id } => {
                    self.scheduler.cancel_timer(node_id);
                }
                SchedulingRequest::ScheduleLoopTick { node_id, fire_at } => {
                    self.scheduler.schedule_loop_tick(node_id.clone(), *fire_at);
                }
                SchedulingRequest::CancelLoop { node_id } => {
                    self.scheduler.cancel_loop(node_id);
                }
            }
        }
    }

    fn drain_due_fires(&mut self) {
        let now = Timestamp::now();
        let room_id = self.room_id.clone();
        for fire in self.scheduler.pop_due(now) {
            let result = match fire {
                Fire::TimerExpired { node_id } => self.fire_timer(&room_id, &node_id, now),
                Fire::LoopTick { node_id } => self.fire_loop_tick(&room_id, &node_id, now),
            };
            if let Err(error) = result {
                self.emit_system_error(&error.to_string());
            }
        }
    }

    fn fire_timer(&mut self, room_id: &RoomId, node_id: &NodeId, now: Timestamp) -> Result<(), CoordinatorError> {
        let draft = NewEvent::new(room_id.clone(), "timer.expired", chamber_model::Severity::Info)
            .with_field("node_id", FieldValue::Text(node_id.as_str().to_owned()));
        self.registry.validate(&draft.name)?;
        let applied = self.append_or_continue_in_memory(draft);
        let outcome = self.graph_runtime.handle_timer_expired(room_id, node_id, now)?;
        self.apply_scheduling(&outcome.scheduling);
        self.projector.project(&applied);
        self.drain_derived(outcome.derived);
        Ok(())
    }

    fn fire_loop_tick(&mut self, room_id: &RoomId, node_id: &NodeId, now: Timestamp) -> Result<(), CoordinatorError> {
        let outcome = self.graph_runtime.handle_loop_tick(room_id, node_id, now)?;
        self.apply_scheduling(&outcome.scheduling);
        self.drain_derived(outcome.derived);
        Ok(())
    }

    fn emit_system_error(&mut self, message: &str) {
        let draft = NewEvent::new(self.room_id.clone(), "system.error", chamber_model::Severity::Error)
            .with_message(message.to_owned());
        let applied = self.append_or_continue_in_memory(draft);
        self.projector.project(&applied);
    }
}

fn required_node_id(event: &Event) -> Result<NodeId, GraphError> {
    text_field(event, "node_id").map(NodeId::new).ok_or(GraphError::MissingField("node_id"))
}

fn text_field(event: &Event, key: &str) -> Option<String> {
    match event.field(key) {
        Some(FieldValue::Text(value)) => Some(value.clone()),
        _ => None,
    }
}

async fn sleep_until(wakeup: Option<Timestamp>) {
    match wakeup {
        Some(wakeup) => {
            let now = Timestamp::now();
            let delay = wakeup.saturating_since(now);
            tokio::time::sleep_until(Instant::now() + delay).await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "test assertions favor unwrap")]

    use std::sync::atomic::AtomicBool;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use chamber_log::EventLog;
    use chamber_log::InMemoryEventLog;
    use chamber_log::PersistenceError;
    use chamber_model::Event;
    use chamber_model::RoomGraph;
    use chamber_model::Scene;
    use chamber_model::SceneGraph;
    use chamber_model::SceneId;
    use chamber_model::Severity;
    use std::collections::BTreeMap;

    use super::Coordinator;
    use super::GraphRuntime;
    use super::NewEvent;
    use super::RoomId;

    /// Wraps an [`InMemoryEventLog`] but fails every append while `failing`
    /// is set, to exercise the coordinator's degraded-mode fallback.
    #[allow(
        clippy::missing_docs_in_private_items,
        reason = "internal test double, documented by the struct-level comment"
    )]
    struct FailingLog {
        inner: InMemoryEventLog,
        failing: AtomicBool,
    }

    impl FailingLog {
        fn new() -> Self {
            Self { inner: InMemoryEventLog::new(), failing: AtomicBool::new(false) }
        }

        fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }
    }

    impl EventLog for FailingLog {
        fn append(&self, draft: NewEvent) -> Result<Event, PersistenceError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(PersistenceError::OffsetConflict { room_id: draft.room_id.as_str().to_owned() });
            }
            self.inner.append(draft)
        }

        fn read(&self, room_id: &RoomId, from_offset: u64, limit: usize) -> Result<Vec<Event>, PersistenceError> {
            self.inner.read(room_id, from_offset, limit)
        }

        fn tail(&self, room_id: &RoomId) -> chamber_broadcast::Subscription<Event> {
            self.inner.tail(room_id)
        }
    }

    fn trivial_graph() -> RoomGraph {
        let entry = chamber_model::Node { id: chamber_model::NodeId::new("entry"), kind: chamber_model::NodeKind::Checkpoint };
        let graph = SceneGraph { entry: entry.id.clone(), nodes: BTreeMap::from([(entry.id.clone(), entry)]), edges: vec![] };
        RoomGraph { scenes: vec![Scene { id: SceneId::new("scene-1"), graph }] }
    }

    #[tokio::test]
    async fn start_game_appends_and_projects_scene_started() {
        let room_id = RoomId::new("room-1");
        let log = Arc::new(InMemoryEventLog::new());
        let (_tx, rx) = tokio::sync::mpsc::channel(8);
        let runtime = GraphRuntime::new(trivial_graph(), 1);
        let mut coordinator = Coordinator::new(room_id.clone(), runtime, log.clone(), rx, 16);

        let draft = NewEvent::new(room_id.clone(), "operator.start_game", Severity::Info);
        coordinator.handle_external(draft).unwrap();

        let events = log.read(&room_id, 0, 10).unwrap();
        let names: Vec<_> = events.iter().map(|event| event.name.as_str().to_owned()).collect();
        assert!(names.contains(&"scene.started".to_owned()));
        assert!(names.contains(&"scene.completed".to_owned()));
    }

    #[tokio::test]
    async fn unknown_event_name_is_rejected_without_appending() {
        let room_id = RoomId::new("room-1");
        let log = Arc::new(InMemoryEventLog::new());
        let (_tx, rx) = tokio::sync::mpsc::channel(8);
        let runtime = GraphRuntime::new(trivial_graph(), 1);
        let mut coordinator = Coordinator::new(room_id.clone(), runtime, log.clone(), rx, 16);

        let draft = NewEvent::new(room_id.clone(), "not.a.real.event", Severity::Info);
        assert!(coordinator.handle_external(draft).is_err());
        assert!(log.read(&room_id, 0, 10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn append_failure_continues_in_memory_with_one_shot_bypass_error() {
        let room_id = RoomId::new("room-1");
        let log = Arc::new(FailingLog::new());
        let (_tx, rx) = tokio::sync::mpsc::channel(8);
        let runtime = GraphRuntime::new(trivial_graph(), 1);
        let mut coordinator = Coordinator::new(room_id.clone(), runtime, log.clone(), rx, 16);

        log.set_failing(true);
        let draft = NewEvent::new(room_id.clone(), "operator.start_game", Severity::Info);
        coordinator.handle_external(draft).unwrap();

        assert!(coordinator.is_durability_degraded());
        assert!(log.inner.read(&room_id, 0, 10).unwrap().is_empty());

        let bypass = coordinator.subscribe_durability_errors();
        assert_eq!(bypass.snapshot.len(), 1);
        assert_eq!(bypass.snapshot[0].name.as_str(), "system.error");

        // A second failure while already degraded must not emit a second
        // bypass notice. `system.startup` is registered but not dispatched
        // to the graph runtime, so it exercises the append path alone.
        let draft = NewEvent::new(room_id.clone(), "system.startup", Severity::Info);
        coordinator.handle_external(draft).unwrap();
        let bypass = coordinator.subscribe_durability_errors();
        assert_eq!(bypass.snapshot.len(), 1);

        log.set_failing(false);
        let draft = NewEvent::new(room_id.clone(), "system.startup", Severity::Info);
        coordinator.handle_external(draft).unwrap();
        assert!(!coordinator.is_durability_degraded());
    }
}
