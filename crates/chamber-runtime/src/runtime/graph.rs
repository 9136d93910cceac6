// crates/chamber-runtime/src/runtime/graph.rs
// ============================================================================
// Module: Graph runtime
// Description: Applies one event at a time to a loaded scene graph, walking
//              every automatic (non-externally-triggered) continuation that
//              follows from it, and reporting the resulting derived events
//              plus any scheduler bookkeeping the coordinator must perform.
// Purpose: Own the "what happens to the graph" half of the six-step event
//          algorithm (apply, advance, derive); validation, durable append,
//          and projection live in the coordinator and log crates instead.
// Dependencies: chamber-model, chamber-expr, rand
// ============================================================================

//! ## Overview
//! [`GraphRuntime`] holds exactly one loaded [`RoomGraph`] and the lifecycle
//! state of whichever scene is active, plus every currently-activated puzzle
//! subgraph. Each public method here corresponds to one externally- or
//! scheduler-triggered event kind (`start-game`, `operator.override`,
//! `device.input`, `timer.expired`, `loop.tick`, ...). A call processes that
//! one event's direct effect and then walks forward through every node that
//! resolves automatically — a `scene-entry`, `decision`, `checkpoint`, or
//! `random` node never waits on anything external — until it reaches a node
//! that must wait for a future event. That whole walk is returned as one
//! ordered [`ApplyOutcome`]; nothing here re-enters its own public API to
//! process a derived event, so there is no risk of unbounded recursion
//! through the event queue itself (the walk's depth is bounded by the
//! graph's own size, an ordinary finite function-call chain).
//!
//! AND-join for `parallel` nodes, puzzle-subgraph delegation, and loop/timer
//! scheduling all happen inside this walk. Condition expressions (edge
//! conditions and loop stop-conditions) are evaluated through
//! [`chamber_expr::evaluate`] against an internal adapter implementing
//! [`chamber_expr::ExprContext`] over this runtime's own state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::HashSet;

use chamber_model::Edge;
use chamber_model::Event;
use chamber_model::FieldMap;
use chamber_model::FieldValue;
use chamber_model::LoopInterval;
use chamber_model::LoopState;
use chamber_model::NewEvent;
use chamber_model::NodeId;
use chamber_model::NodeKind;
use chamber_model::NodeLifecycle;
use chamber_model::PuzzleOutcome;
use chamber_model::PuzzleState;
use chamber_model::RoomGraph;
use chamber_model::RoomId;
use chamber_model::SceneGraph;
use chamber_model::SceneId;
use chamber_model::Severity;
use chamber_model::SubgraphRuntimeState;
use chamber_model::Timestamp;
use chamber_model::TimerState;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::error::GraphError;

// ============================================================================
// SECTION: Room State
// ============================================================================

/// The lifecycle of the room as a whole, independent of any single node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomState {
    /// No scene has ever been started.
    NotStarted,
    /// A scene is active and accepting progress-driving events.
    Running {
        /// The active scene.
        scene_id: SceneId,
    },
    /// A scene is active but paused: operator commands are still accepted,
    /// device input, timer fires, and loop ticks are not.
    Paused {
        /// The active (paused) scene.
        scene_id: SceneId,
    },
    /// The active scene reached a terminal node. Per the room's
    /// scene-to-scene transition policy, this halts the room permanently
    /// rather than advancing to another scene; only `stop-game` is accepted
    /// from this state.
    Halted {
        /// The scene that halted.
        scene_id: SceneId,
    },
}

// ============================================================================
// SECTION: Scheduling Requests
// ============================================================================

/// A scheduler action the coordinator must apply alongside a state
/// transition, so the scheduler's priority queues stay in sync with the
/// graph runtime's timer/loop state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulingRequest {
    /// Arm a timer for `node_id` to fire at `fire_at`.
    ScheduleTimer {
        /// The timer node.
        node_id: NodeId,
        /// When it should fire.
        fire_at: Timestamp,
    },
    /// Cancel any pending timer for `node_id`.
    CancelTimer {
        /// The timer node.
        node_id: NodeId,
    },
    /// Arm the next tick for loop node `node_id`.
    ScheduleLoopTick {
        /// The loop node.
        node_id: NodeId,
        /// When the tick should fire.
        fire_at: Timestamp,
    },
    /// Cancel any pending tick for loop node `node_id`.
    CancelLoop {
        /// The loop node.
        node_id: NodeId,
    },
}

// ============================================================================
// SECTION: Apply Outcome
// ============================================================================

/// The result of applying one event to the graph runtime.
#[derive(Debug, Default)]
pub struct ApplyOutcome {
    /// Derived events, in the order they occurred.
    pub derived: Vec<NewEvent>,
    /// Scheduler actions the coordinator must apply to keep the scheduler's
    /// priority queues consistent with this transition.
    pub scheduling: Vec<SchedulingRequest>,
}

impl ApplyOutcome {
    fn merge(&mut self, mut other: Self) {
        self.derived.append(&mut other.derived);
        self.scheduling.append(&mut other.scheduling);
    }
}

// ============================================================================
// SECTION: Internal Scope / Resolution
// ============================================================================

/// The graph a lifecycle transition is evaluated against: the active
/// scene's top-level graph, or one puzzle node's subgraph.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Scope {
    Scene,
    Puzzle(NodeId),
}

/// The two internal-resolution outcomes a node can reach on its own,
/// without an operator forcing it. Kept distinct from [`NodeLifecycle`] so
/// call sites can't accidentally resolve a node to `idle`/`active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    Completed,
    Failed,
}

impl Resolution {
    const fn lifecycle(self) -> NodeLifecycle {
        match self {
            Self::Completed => NodeLifecycle::Completed,
            Self::Failed => NodeLifecycle::Failed,
        }
    }
}

// ============================================================================
// SECTION: Expression Context Adapter
// ============================================================================

struct NodeExprContext<'a> {
    runtime: &'a GraphRuntime,
    scope: &'a Scope,
    event_fields: Option<&'a FieldMap>,
}

impl chamber_expr::ExprContext for NodeExprContext<'_> {
    fn node_state(&self, node_id: &str) -> Option<&str> {
        let state = self.runtime.state(self.scope)?;
        let lifecycle = state.nodes.get(&NodeId::new(node_id))?;
        Some(lifecycle_label(*lifecycle))
    }

    fn puzzle_outcome(&self, puzzle_id: &str) -> Option<&str> {
        let puzzle = self.runtime.puzzles.get(&NodeId::new(puzzle_id))?;
        outcome_label(puzzle.outcome?)
    }

    fn event_field(&self, key: &str) -> Option<&FieldValue> {
        self.event_fields?.get(key)
    }
}

const fn lifecycle_label(lifecycle: NodeLifecycle) -> &'static str {
    match lifecycle {
        NodeLifecycle::Idle => "idle",
        NodeLifecycle::Active => "active",
        NodeLifecycle::Completed => "completed",
        NodeLifecycle::Failed => "failed",
        NodeLifecycle::Overridden => "overridden",
        NodeLifecycle::Reset => "reset",
    }
}

const fn outcome_label(outcome: PuzzleOutcome) -> Option<&'static str> {
    match outcome {
        PuzzleOutcome::Solved => Some("solved"),
        PuzzleOutcome::Failed => Some("failed"),
        PuzzleOutcome::Overridden => Some("overridden"),
    }
}

// ============================================================================
// SECTION: Event Constructors
// ============================================================================

fn node_event(room_id: &RoomId, name: &str, node_id: &NodeId) -> NewEvent {
    NewEvent::new(room_id.clone(), name, Severity::Info)
        .with_field("node_id", FieldValue::Text(node_id.as_str().to_owned()))
}

fn puzzle_event(room_id: &RoomId, name: &str, node_id: &NodeId) -> NewEvent {
    NewEvent::new(room_id.clone(), name, Severity::Info)
        .with_field("puzzle_id", FieldValue::Text(node_id.as_str().to_owned()))
}

fn scene_event(room_id: &RoomId, name: &str, scene_id: &SceneId, level: Severity) -> NewEvent {
    NewEvent::new(room_id.clone(), name, level)
        .with_field("scene_id", FieldValue::Text(scene_id.as_str().to_owned()))
}

fn loop_tick_event(room_id: &RoomId, node_id: &NodeId, action: &str) -> NewEvent {
    NewEvent::new(room_id.clone(), "loop.tick", Severity::Info)
        .with_field("node_id", FieldValue::Text(node_id.as_str().to_owned()))
        .with_field("action", FieldValue::Text(action.to_owned()))
}

fn unknown_reference_event(room_id: &RoomId, reference: &str) -> NewEvent {
    NewEvent::new(room_id.clone(), "system.error", Severity::Error)
        .with_message(format!("condition expression referenced unresolved state: {reference}"))
        .with_field("reference", FieldValue::Text(reference.to_owned()))
}

// ============================================================================
// SECTION: Graph Runtime
// ============================================================================

/// Holds one loaded room graph and the live state of whichever scene (and
/// puzzle subgraphs within it) is currently active.
pub struct GraphRuntime {
    graph: RoomGraph,
    room_state: RoomState,
    scene_nodes: SubgraphRuntimeState,
    puzzles: BTreeMap<NodeId, PuzzleState>,
    loops: BTreeMap<NodeId, LoopState>,
    timers: BTreeMap<NodeId, TimerState>,
    loop_seed_rng: StdRng,
    /// References a condition expression has reported unresolved, already
    /// reported via a `system.error`. Keyed by the reference text itself
    /// (e.g. `node.door.state`) so the same unresolved reference is only
    /// reported once per room session, not once per evaluation.
    reported_unknown_refs: HashSet<String>,
}

impl GraphRuntime {
    /// Creates a runtime over `graph`, not yet started. `rng_seed` seeds the
    /// generator used to assign loop nodes their activation seed
    /// (`random` nodes carry their own authored seed and need none of
    /// this); reusing the same seed and replaying the same event sequence
    /// reproduces the same loop tick intervals.
    #[must_use]
    pub fn new(graph: RoomGraph, rng_seed: u64) -> Self {
        Self {
            graph,
            room_state: RoomState::NotStarted,
            scene_nodes: SubgraphRuntimeState::default(),
            puzzles: BTreeMap::new(),
            loops: BTreeMap::new(),
            timers: BTreeMap::new(),
            loop_seed_rng: StdRng::seed_from_u64(rng_seed),
            reported_unknown_refs: HashSet::new(),
        }
    }

    /// Returns the room's current lifecycle state.
    #[must_use]
    pub const fn room_state(&self) -> &RoomState {
        &self.room_state
    }

    /// Returns the loaded room graph.
    #[must_use]
    pub const fn graph(&self) -> &RoomGraph {
        &self.graph
    }

    /// Returns the lifecycle of `node_id` in the active scene's top-level
    /// graph. Nodes inside a puzzle subgraph are not visible here; see
    /// [`GraphRuntime::puzzle_state`].
    #[must_use]
    pub fn node_lifecycle(&self, node_id: &NodeId) -> NodeLifecycle {
        self.scene_nodes.lifecycle_of(node_id)
    }

    /// Returns the runtime state of puzzle node `node_id`, if it has ever
    /// activated.
    #[must_use]
    pub fn puzzle_state(&self, node_id: &NodeId) -> Option<&PuzzleState> {
        self.puzzles.get(node_id)
    }

    // ------------------------------------------------------------------
    // Operator commands
    // ------------------------------------------------------------------

    /// Starts the room, activating `scene_id` (or the room's default
    /// scene), and walks forward through every automatically-resolving
    /// node from the scene's entry.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::AlreadyRunning`] if a scene is already active,
    /// [`GraphError::UnknownScene`] if `scene_id` does not exist, or
    /// [`GraphError::NoScenesDeclared`] if the room graph has no scenes and
    /// none was named.
    pub fn start_game(
        &mut self,
        room_id: &RoomId,
        scene_id: Option<SceneId>,
        now: Timestamp,
    ) -> Result<ApplyOutcome, GraphError> {
        if let RoomState::Running { scene_id } | RoomState::Paused { scene_id } = &self.room_state {
            return Err(GraphError::AlreadyRunning(scene_id.clone()));
        }

        let scene = match scene_id {
            Some(id) => self.graph.scene(&id).ok_or(GraphError::UnknownScene(id))?,
            None => self.graph.default_scene().ok_or(GraphError::NoScenesDeclared)?,
        };
        let scene_id = scene.id.clone();
        let entry = scene.graph.entry.clone();

        self.scene_nodes = SubgraphRuntimeState::default();
        self.puzzles.clear();
        self.loops.clear();
        self.timers.clear();
        self.room_state = RoomState::Running { scene_id: scene_id.clone() };

        let mut out = ApplyOutcome::default();
        out.derived.push(scene_event(room_id, "scene.started", &scene_id, Severity::Info));
        out.merge(self.activate(&Scope::Scene, &entry, room_id, now, None)?);
        Ok(out)
    }

    /// Stops the room unconditionally, from any state but `NotStarted`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::NotRunning`] if the room was never started.
    pub fn stop_game(&mut self) -> Result<ApplyOutcome, GraphError> {
        match &self.room_state {
            RoomState::Running { .. } | RoomState::Paused { .. } | RoomState::Halted { .. } => {
                self.room_state = RoomState::NotStarted;
                Ok(ApplyOutcome::default())
            }
            RoomState::NotStarted => Err(GraphError::NotRunning),
        }
    }

    /// Pauses the room: operator commands remain accepted, but device
    /// input, timer fires, and loop ticks are rejected until
    /// [`GraphRuntime::resume`].
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::NotRunning`] or [`GraphError::SceneHalted`].
    pub fn pause(&mut self) -> Result<ApplyOutcome, GraphError> {
        match &self.room_state {
            RoomState::Running { scene_id } => {
                self.room_state = RoomState::Paused { scene_id: scene_id.clone() };
                Ok(ApplyOutcome::default())
            }
            RoomState::Paused { .. } => Ok(ApplyOutcome::default()),
            RoomState::Halted { scene_id } => Err(GraphError::SceneHalted(scene_id.clone())),
            RoomState::NotStarted => Err(GraphError::NotRunning),
        }
    }

    /// Resumes a paused room.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::NotRunning`] or [`GraphError::SceneHalted`].
    pub fn resume(&mut self) -> Result<ApplyOutcome, GraphError> {
        match &self.room_state {
            RoomState::Paused { scene_id } => {
                self.room_state = RoomState::Running { scene_id: scene_id.clone() };
                Ok(ApplyOutcome::default())
            }
            RoomState::Running { .. } => Ok(ApplyOutcome::default()),
            RoomState::Halted { scene_id } => Err(GraphError::SceneHalted(scene_id.clone())),
            RoomState::NotStarted => Err(GraphError::NotRunning),
        }
    }

    /// Forces `node_id` to `overridden`, regardless of its current
    /// lifecycle, and walks forward from there. Overriding a puzzle node
    /// itself also resolves its puzzle outcome to `overridden`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::SceneHalted`]/[`GraphError::NotRunning`] if the
    /// room cannot accept node-level commands, or [`GraphError::UnknownNode`]
    /// if `node_id` is not reachable in any currently active scope.
    pub fn override_node(
        &mut self,
        room_id: &RoomId,
        node_id: &NodeId,
        now: Timestamp,
    ) -> Result<ApplyOutcome, GraphError> {
        self.ensure_operable()?;
        let scope = self.locate_node(node_id)?;
        self.state_mut(&scope).set_lifecycle(node_id.clone(), NodeLifecycle::Overridden);

        let mut out = ApplyOutcome::default();
        out.derived.push(node_event(room_id, "node.overridden", node_id));

        if matches!(scope, Scope::Scene) {
            if let Some(puzzle) = self.puzzles.get_mut(node_id) {
                puzzle.resolved = true;
                puzzle.outcome = Some(PuzzleOutcome::Overridden);
                out.derived.push(puzzle_event(room_id, "puzzle.overridden", node_id));
            }
        }

        out.merge(self.advance(&scope, node_id, room_id, now, None)?);
        Ok(out)
    }

    /// Resets `node_id`: tears down any timer/loop/puzzle state it owned
    /// and re-activates it from scratch.
    ///
    /// # Errors
    ///
    /// See [`GraphRuntime::override_node`].
    pub fn reset_node(
        &mut self,
        room_id: &RoomId,
        node_id: &NodeId,
        now: Timestamp,
    ) -> Result<ApplyOutcome, GraphError> {
        self.ensure_operable()?;
        let scope = self.locate_node(node_id)?;
        self.state_mut(&scope).set_lifecycle(node_id.clone(), NodeLifecycle::Reset);

        let mut out = ApplyOutcome::default();
        out.derived.push(node_event(room_id, "node.reset", node_id));

        if self.timers.remove(node_id).is_some() {
            out.scheduling.push(SchedulingRequest::CancelTimer { node_id: node_id.clone() });
        }
        if self.loops.remove(node_id).is_some() {
            out.scheduling.push(SchedulingRequest::CancelLoop { node_id: node_id.clone() });
        }
        if let Some(puzzle) = self.puzzles.get_mut(node_id) {
            *puzzle = PuzzleState::default();
        }

        out.merge(self.activate(&scope, node_id, room_id, now, None)?);
        Ok(out)
    }

    /// Forcibly (re-)activates `node_id`, bypassing normal edge-driven
    /// flow. Scenes are never valid jump targets.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::SceneIsNotAValidTarget`] if `node_id` names a
    /// scene rather than a node, or the errors listed on
    /// [`GraphRuntime::override_node`].
    pub fn jump_node(
        &mut self,
        room_id: &RoomId,
        node_id: &NodeId,
        now: Timestamp,
    ) -> Result<ApplyOutcome, GraphError> {
        self.ensure_operable()?;
        let scope = self.locate_node(node_id)?;
        self.activate(&scope, node_id, room_id, now, None)
    }

    // ------------------------------------------------------------------
    // Externally- and scheduler-triggered events
    // ------------------------------------------------------------------

    /// Routes a `device.input` event to every currently-active `gate` node
    /// (which releases on any input) and every active `action` node whose
    /// `awaits_device` matches the event's `logical_id` field.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::NotRunning`], [`GraphError::Paused`], or
    /// [`GraphError::SceneHalted`] if the room cannot accept progress right
    /// now.
    pub fn handle_device_input(
        &mut self,
        room_id: &RoomId,
        triggering: &Event,
        now: Timestamp,
    ) -> Result<ApplyOutcome, GraphError> {
        self.ensure_progressable()?;
        let logical_id = triggering.field("logical_id").and_then(FieldValue::as_str).map(str::to_owned);
        let fields = triggering.fields.clone();
        let mut out = ApplyOutcome::default();

        for scope in self.live_scopes() {
            let graph = self.graph_for_scope(&scope)?;
            let candidates: Vec<NodeId> = graph
                .nodes
                .values()
                .filter(|node| {
                    self.state(&scope).map(|state| state.lifecycle_of(&node.id)) == Some(NodeLifecycle::Active)
                })
                .filter(|node| match &node.kind {
                    NodeKind::Gate => true,
                    NodeKind::Action { awaits_device: Some(device) } => {
                        logical_id.as_deref() == Some(device.as_str())
                    }
                    _ => false,
                })
                .map(|node| node.id.clone())
                .collect();

            for node_id in candidates {
                out.merge(self.resolve(&scope, &node_id, room_id, now, Resolution::Completed, Some(&fields))?);
            }
        }
        Ok(out)
    }

    /// Resolves a `timer.expired` fire for `node_id`, a no-op if the timer
    /// was already cancelled (a reset racing a fire already popped off the
    /// scheduler).
    ///
    /// # Errors
    ///
    /// See [`GraphRuntime::handle_device_input`].
    pub fn handle_timer_expired(
        &mut self,
        room_id: &RoomId,
        node_id: &NodeId,
        now: Timestamp,
    ) -> Result<ApplyOutcome, GraphError> {
        self.ensure_progressable()?;
        if self.timers.remove(node_id).is_none() {
            return Ok(ApplyOutcome::default());
        }
        let scope = self.locate_node(node_id)?;
        self.resolve(&scope, node_id, room_id, now, Resolution::Completed, None)
    }

    /// Resolves a `loop.tick` fire for `node_id`: emits `loop.tick`,
    /// re-evaluates the stop condition, and either stops the loop
    /// (resolving the node) or arms the next tick.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidCondition`] if the loop's stop
    /// condition fails to parse, or the errors listed on
    /// [`GraphRuntime::handle_device_input`].
    pub fn handle_loop_tick(
        &mut self,
        room_id: &RoomId,
        node_id: &NodeId,
        now: Timestamp,
    ) -> Result<ApplyOutcome, GraphError> {
        self.ensure_progressable()?;
        let Some((action, stop_condition, interval)) = self.loop_node_config(node_id)? else {
            return Err(GraphError::UnknownNode(node_id.clone()));
        };
        let Some(loop_state) = self.loops.get_mut(node_id) else {
            return Ok(ApplyOutcome::default());
        };
        if !loop_state.active {
            return Ok(ApplyOutcome::default());
        }
        loop_state.tick_count += 1;
        let seed = loop_state.rng_seed;
        let tick_index = loop_state.tick_count;

        let mut out = ApplyOutcome::default();
        out.derived.push(loop_tick_event(room_id, node_id, &action));

        let expr = chamber_expr::parse(&stop_condition)?;
        let ctx = NodeExprContext { runtime: self, scope: &Scope::Scene, event_fields: None };
        let stop_outcome = chamber_expr::evaluate(&expr, &ctx);
        self.report_unknown_refs(room_id, &stop_outcome.unknown_refs, &mut out);
        let should_stop = stop_outcome.value;

        if should_stop {
            if let Some(loop_state) = self.loops.get_mut(node_id) {
                loop_state.active = false;
                loop_state.next_tick_time = None;
            }
            out.derived.push(
                NewEvent::new(room_id.clone(), "loop.stopped", Severity::Info)
                    .with_field("node_id", FieldValue::Text(node_id.as_str().to_owned())),
            );
            out.scheduling.push(SchedulingRequest::CancelLoop { node_id: node_id.clone() });
            out.merge(self.resolve(&Scope::Scene, node_id, room_id, now, Resolution::Completed, None)?);
        } else {
            let wait = Self::sample_interval(&interval, seed, tick_index);
            let fire_at = now.plus(wait);
            if let Some(loop_state) = self.loops.get_mut(node_id) {
                loop_state.next_tick_time = Some(fire_at);
            }
            out.scheduling.push(SchedulingRequest::ScheduleLoopTick { node_id: node_id.clone(), fire_at });
        }
        Ok(out)
    }

    // ------------------------------------------------------------------
    // Internal: scope resolution
    // ------------------------------------------------------------------

    fn active_scene_id(&self) -> Result<&SceneId, GraphError> {
        match &self.room_state {
            RoomState::Running { scene_id } | RoomState::Paused { scene_id } | RoomState::Halted { scene_id } => {
                Ok(scene_id)
            }
            RoomState::NotStarted => Err(GraphError::NoActiveScene),
        }
    }

    fn scene_graph(&self) -> Result<&SceneGraph, GraphError> {
        let scene_id = self.active_scene_id()?;
        self.graph.scene(scene_id).map(|scene| &scene.graph).ok_or_else(|| GraphError::UnknownScene(scene_id.clone()))
    }

    fn graph_for_scope(&self, scope: &Scope) -> Result<&SceneGraph, GraphError> {
        match scope {
            Scope::Scene => self.scene_graph(),
            Scope::Puzzle(node_id) => {
                let scene_graph = self.scene_graph()?;
                let node = scene_graph.node(node_id).ok_or_else(|| GraphError::UnknownNode(node_id.clone()))?;
                match &node.kind {
                    NodeKind::Puzzle { subgraph } | NodeKind::SubgraphRef { subgraph } => Ok(subgraph),
                    _ => Err(GraphError::UnknownNode(node_id.clone())),
                }
            }
        }
    }

    fn state(&self, scope: &Scope) -> Option<&SubgraphRuntimeState> {
        match scope {
            Scope::Scene => Some(&self.scene_nodes),
            Scope::Puzzle(node_id) => self.puzzles.get(node_id).map(|puzzle| &puzzle.subgraph),
        }
    }

    fn state_mut(&mut self, scope: &Scope) -> &mut SubgraphRuntimeState {
        match scope {
            Scope::Scene => &mut self.scene_nodes,
            Scope::Puzzle(node_id) => &mut self.puzzles.entry(node_id.clone()).or_default().subgraph,
        }
    }

    fn live_scopes(&self) -> Vec<Scope> {
        let mut scopes = vec![Scope::Scene];
        for (node_id, puzzle) in &self.puzzles {
            if puzzle.activated && !puzzle.resolved {
                scopes.push(Scope::Puzzle(node_id.clone()));
            }
        }
        scopes
    }

    fn locate_node(&self, node_id: &NodeId) -> Result<Scope, GraphError> {
        if self.scene_graph()?.node(node_id).is_some() {
            return Ok(Scope::Scene);
        }
        for scope in self.live_scopes() {
            if let Scope::Puzzle(puzzle_id) = &scope {
                if self.graph_for_scope(&scope)?.node(node_id).is_some() {
                    return Ok(Scope::Puzzle(puzzle_id.clone()));
                }
            }
        }
        if self.graph.scenes.iter().any(|scene| scene.id.as_str() == node_id.as_str()) {
            return Err(GraphError::SceneIsNotAValidTarget(SceneId::new(node_id.as_str())));
        }
        Err(GraphError::UnknownNode(node_id.clone()))
    }

    fn ensure_operable(&self) -> Result<(), GraphError> {
        match &self.room_state {
            RoomState::Running { .. } | RoomState::Paused { .. } => Ok(()),
            RoomState::Halted { scene_id } => Err(GraphError::SceneHalted(scene_id.clone())),
            RoomState::NotStarted => Err(GraphError::NotRunning),
        }
    }

    fn ensure_progressable(&self) -> Result<(), GraphError> {
        match &self.room_state {
            RoomState::Running { .. } => Ok(()),
            RoomState::Paused { .. } => Err(GraphError::Paused),
            RoomState::Halted { scene_id } => Err(GraphError::SceneHalted(scene_id.clone())),
            RoomState::NotStarted => Err(GraphError::NotRunning),
        }
    }

    fn loop_node_config(&self, node_id: &NodeId) -> Result<Option<(String, String, LoopInterval)>, GraphError> {
        let Some(node) = self.scene_graph()?.node(node_id) else {
            return Ok(None);
        };
        let NodeKind::Loop { action, stop_condition, interval } = &node.kind else {
            return Ok(None);
        };
        Ok(Some((action.clone(), stop_condition.clone(), *interval)))
    }

    // ------------------------------------------------------------------
    // Internal: activation / resolution / advancement
    // ------------------------------------------------------------------

    fn activate(
        &mut self,
        scope: &Scope,
        node_id: &NodeId,
        room_id: &RoomId,
        now: Timestamp,
        fields: Option<&FieldMap>,
    ) -> Result<ApplyOutcome, GraphError> {
        let kind = self
            .graph_for_scope(scope)?
            .node(node_id)
            .ok_or_else(|| GraphError::UnknownNode(node_id.clone()))?
            .kind
            .clone();

        self.state_mut(scope).set_lifecycle(node_id.clone(), NodeLifecycle::Active);
        let mut out = ApplyOutcome::default();
        out.derived.push(node_event(room_id, "node.started", node_id));

        match kind {
            NodeKind::SceneEntry | NodeKind::Decision | NodeKind::Checkpoint | NodeKind::Random { .. } => {
                out.merge(self.resolve(scope, node_id, room_id, now, Resolution::Completed, fields)?);
            }
            NodeKind::Action { awaits_device } => {
                if awaits_device.is_none() {
                    out.merge(self.resolve(scope, node_id, room_id, now, Resolution::Completed, fields)?);
                }
            }
            NodeKind::Gate | NodeKind::Operator => {}
            NodeKind::Timer { duration } => {
                let fire_at = now.plus(duration);
                self.timers.insert(node_id.clone(), TimerState { started_at: now, duration, fire_at, cancelled: false });
                out.scheduling.push(SchedulingRequest::ScheduleTimer { node_id: node_id.clone(), fire_at });
            }
            NodeKind::Parallel { children } => {
                for child in &children {
                    out.merge(self.activate(scope, child, room_id, now, fields)?);
                }
            }
            NodeKind::Loop { interval, .. } => {
                let seed = self.loop_seed_rng.r#gen();
                let fire_at = now.plus(Self::sample_interval(&interval, seed, 0));
                self.loops.insert(
                    node_id.clone(),
                    LoopState { next_tick_time: Some(fire_at), ..LoopState::activated(seed) },
                );
                out.scheduling.push(SchedulingRequest::ScheduleLoopTick { node_id: node_id.clone(), fire_at });
            }
            NodeKind::Puzzle { .. } | NodeKind::SubgraphRef { .. } => {
                let puzzle = self.puzzles.entry(node_id.clone()).or_default();
                puzzle.activated = true;
                out.derived.push(puzzle_event(room_id, "puzzle.activated", node_id));
                let entry = self.graph_for_scope(&Scope::Puzzle(node_id.clone()))?.entry.clone();
                out.merge(self.activate(&Scope::Puzzle(node_id.clone()), &entry, room_id, now, fields)?);
            }
        }
        Ok(out)
    }

    fn resolve(
        &mut self,
        scope: &Scope,
        node_id: &NodeId,
        room_id: &RoomId,
        now: Timestamp,
        resolution: Resolution,
        fields: Option<&FieldMap>,
    ) -> Result<ApplyOutcome, GraphError> {
        self.state_mut(scope).set_lifecycle(node_id.clone(), resolution.lifecycle());
        let mut out = ApplyOutcome::default();
        let name = match resolution {
            Resolution::Completed => "node.completed",
            Resolution::Failed => "node.failed",
        };
        out.derived.push(node_event(room_id, name, node_id));
        out.merge(self.advance(scope, node_id, room_id, now, fields)?);
        Ok(out)
    }

    fn advance(
        &mut self,
        scope: &Scope,
        node_id: &NodeId,
        room_id: &RoomId,
        now: Timestamp,
        fields: Option<&FieldMap>,
    ) -> Result<ApplyOutcome, GraphError> {
        let mut out = ApplyOutcome::default();
        let lifecycle = self.state(scope).map_or(NodeLifecycle::Idle, |state| state.lifecycle_of(node_id));
        if !lifecycle.is_terminal() {
            return Ok(out);
        }

        if let Some(parent_id) = self.parallel_parent_of(scope, node_id)? {
            let parent_lifecycle = self.state(scope).map_or(NodeLifecycle::Idle, |state| state.lifecycle_of(&parent_id));
            if !parent_lifecycle.is_terminal() && self.all_children_terminal(scope, &parent_id)? {
                out.merge(self.resolve(scope, &parent_id, room_id, now, Resolution::Completed, fields)?);
            }
            return Ok(out);
        }

        let node_kind = self.graph_for_scope(scope)?.node(node_id).map(|node| node.kind.clone());
        let edges: Vec<Edge> = self.graph_for_scope(scope)?.outgoing_edges(node_id).into_iter().cloned().collect();

        if edges.is_empty() {
            out.merge(self.finish_scope(scope, room_id, now, lifecycle)?);
            return Ok(out);
        }

        let chosen = if let Some(NodeKind::Random { seed }) = node_kind {
            usize::try_from(seed % edges.len() as u64).ok().and_then(|index| edges.get(index))
        } else {
            self.first_matching_edge(scope, room_id, &edges, fields, &mut out)?
        };

        if let Some(edge) = chosen {
            let target = edge.to.clone();
            out.merge(self.activate(scope, &target, room_id, now, fields)?);
        }
        Ok(out)
    }

    fn finish_scope(
        &mut self,
        scope: &Scope,
        room_id: &RoomId,
        now: Timestamp,
        lifecycle: NodeLifecycle,
    ) -> Result<ApplyOutcome, GraphError> {
        let mut out = ApplyOutcome::default();
        let failed = lifecycle == NodeLifecycle::Failed;
        match scope {
            Scope::Scene => {
                let scene_id = self.active_scene_id()?.clone();
                let name = if failed { "scene.failed" } else { "scene.completed" };
                let level = if failed { Severity::Error } else { Severity::Info };
                out.derived.push(scene_event(room_id, name, &scene_id, level));
                self.room_state = RoomState::Halted { scene_id };
            }
            Scope::Puzzle(node_id) => {
                let outcome = if failed { PuzzleOutcome::Failed } else { PuzzleOutcome::Solved };
                if let Some(puzzle) = self.puzzles.get_mut(node_id) {
                    puzzle.resolved = true;
                    puzzle.outcome = Some(outcome);
                }
                let name = if failed { "puzzle.failed" } else { "puzzle.solved" };
                out.derived.push(puzzle_event(room_id, name, node_id));
                let resolution = if failed { Resolution::Failed } else { Resolution::Completed };
                let node_id = node_id.clone();
                out.merge(self.resolve(&Scope::Scene, &node_id, room_id, now, resolution, None)?);
            }
        }
        Ok(out)
    }

    fn parallel_parent_of(&self, scope: &Scope, node_id: &NodeId) -> Result<Option<NodeId>, GraphError> {
        let graph = self.graph_for_scope(scope)?;
        for node in graph.nodes.values() {
            if let NodeKind::Parallel { children } = &node.kind {
                if children.contains(node_id) {
                    return Ok(Some(node.id.clone()));
                }
            }
        }
        Ok(None)
    }

    fn all_children_terminal(&self, scope: &Scope, parallel_id: &NodeId) -> Result<bool, GraphError> {
        let graph = self.graph_for_scope(scope)?;
        let Some(node) = graph.node(parallel_id) else {
            return Ok(false);
        };
        let NodeKind::Parallel { children } = &node.kind else {
            return Ok(false);
        };
        let state = self.state(scope);
        Ok(children
            .iter()
            .all(|child| state.map_or(NodeLifecycle::Idle, |s| s.lifecycle_of(child)).is_terminal()))
    }

    fn first_matching_edge<'a>(
        &mut self,
        scope: &Scope,
        room_id: &RoomId,
        edges: &'a [Edge],
        fields: Option<&FieldMap>,
        out: &mut ApplyOutcome,
    ) -> Result<Option<&'a Edge>, GraphError> {
        for edge in edges {
            let Some(condition) = &edge.condition else {
                return Ok(Some(edge));
            };
            let expr = chamber_expr::parse(condition)?;
            let ctx = NodeExprContext { runtime: self, scope, event_fields: fields };
            let outcome = chamber_expr::evaluate(&expr, &ctx);
            self.report_unknown_refs(room_id, &outcome.unknown_refs, out);
            if outcome.value {
                return Ok(Some(edge));
            }
        }
        Ok(None)
    }

    /// Logs a one-shot `system.error` for every reference in `unknown_refs`
    /// not already reported this session, per
    /// [`chamber_expr::EvalOutcome::unknown_refs`]'s contract.
    fn report_unknown_refs(&mut self, room_id: &RoomId, unknown_refs: &[String], out: &mut ApplyOutcome) {
        for reference in unknown_refs {
            if self.reported_unknown_refs.insert(reference.clone()) {
                out.derived.push(unknown_reference_event(room_id, reference));
            }
        }
    }

    #[allow(
        clippy::cast_possible_truncation,
        reason = "loop intervals are authored in the seconds-to-minutes range, far under u64::MAX nanoseconds"
    )]
    fn sample_interval(interval: &LoopInterval, seed: u64, tick_index: u64) -> std::time::Duration {
        match interval {
            LoopInterval::Fixed(duration) => *duration,
            LoopInterval::Uniform { min, max } => {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(tick_index));
                let min_nanos = min.as_nanos() as u64;
                let max_nanos = max.as_nanos() as u64;
                let nanos = if max_nanos > min_nanos { rng.gen_range(min_nanos..=max_nanos) } else { min_nanos };
                std::time::Duration::from_nanos(nanos)
            }
        }
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

    use std::collections::BTreeMap;
    use std::time::Duration;

    use chamber_model::Edge;
    use chamber_model::Event;
    use chamber_model::EventName;
    use chamber_model::FieldValue;
    use chamber_model::LogicalDeviceId;
    use chamber_model::LoopInterval;
    use chamber_model::Node;
    use chamber_model::NodeId;
    use chamber_model::NodeKind;
    use chamber_model::NodeLifecycle;
    use chamber_model::RoomGraph;
    use chamber_model::RoomId;
    use chamber_model::Scene;
    use chamber_model::SceneGraph;
    use chamber_model::SceneId;
    use chamber_model::Severity;
    use chamber_model::Timestamp;
    use time::macros::datetime;

    use super::GraphRuntime;
    use super::RoomState;
    use crate::error::GraphError;

    fn now() -> Timestamp {
        Timestamp::new(datetime!(2026-08-01 12:00:00 UTC))
    }

    fn room() -> RoomId {
        RoomId::new("room-1")
    }

    fn node(id: &str, kind: NodeKind) -> Node {
        Node { id: NodeId::new(id), kind }
    }

    fn edge(id: &str, from: &str, to: &str, condition: Option<&str>) -> Edge {
        Edge {
            id: chamber_model::EdgeId::new(id),
            from: NodeId::new(from),
            to: NodeId::new(to),
            condition: condition.map(str::to_owned),
        }
    }

    fn single_scene_graph(nodes: Vec<Node>, edges: Vec<Edge>) -> RoomGraph {
        let graph = SceneGraph {
            entry: nodes[0].id.clone(),
            nodes: nodes.into_iter().map(|n| (n.id.clone(), n)).collect::<BTreeMap<_, _>>(),
            edges,
        };
        RoomGraph { scenes: vec![Scene { id: SceneId::new("scene-1"), graph }] }
    }

    fn fake_event(name: &str, fields: Vec<(&str, FieldValue)>) -> Event {
        Event {
            offset: 0,
            room_id: room(),
            session_id: None,
            timestamp: now(),
            name: EventName::new(name),
            level: Severity::Info,
            message: None,
            fields: fields.into_iter().map(|(k, v)| (k.to_owned(), v)).collect(),
        }
    }

    #[test]
    fn single_action_puzzle_resolves_on_matching_device_input() {
        let puzzle_subgraph = single_scene_graph(
            vec![
                node("p-entry", NodeKind::SceneEntry),
                node("A", NodeKind::Action { awaits_device: Some(LogicalDeviceId::new("crypt_door")) }),
                node("p-end", NodeKind::Checkpoint),
            ],
            vec![edge("e1", "p-entry", "A", None), edge("e2", "A", "p-end", None)],
        );
        let puzzle_graph = puzzle_subgraph.scenes[0].graph.clone();

        let graph = single_scene_graph(
            vec![
                node("entry", NodeKind::SceneEntry),
                node("P", NodeKind::Puzzle { subgraph: puzzle_graph }),
                node("scene-end", NodeKind::Checkpoint),
            ],
            vec![edge("e1", "entry", "P", None), edge("e2", "P", "scene-end", None)],
        );

        let mut runtime = GraphRuntime::new(graph, 1);
        let start = runtime.start_game(&room(), None, now()).expect("start");
        let names: Vec<_> = start.derived.iter().map(|e| e.name.as_str().to_owned()).collect();
        assert_eq!(
            names,
            vec![
                "scene.started",
                "node.started",
                "node.completed",
                "node.started",
                "puzzle.activated",
                "node.started",
                "node.completed",
                "node.started",
            ],
        );

        let input = fake_event(
            "device.input",
            vec![("logical_id", FieldValue::Text("crypt_door".to_owned()))],
        );
        let outcome = runtime.handle_device_input(&room(), &input, now()).expect("device input");
        let names: Vec<_> = outcome.derived.iter().map(|e| e.name.as_str().to_owned()).collect();
        assert_eq!(
            names,
            vec![
                "node.completed",
                "node.started",
                "node.completed",
                "puzzle.solved",
                "node.completed",
                "node.started",
                "node.completed",
                "scene.completed",
            ],
        );
        assert!(matches!(runtime.room_state(), RoomState::Halted { .. }));
    }

    #[test]
    fn override_inside_active_puzzle_resolves_the_puzzle_solved() {
        let puzzle_subgraph = single_scene_graph(
            vec![
                node("p-entry", NodeKind::SceneEntry),
                node("A", NodeKind::Gate),
                node("p-end", NodeKind::Checkpoint),
            ],
            vec![edge("e1", "p-entry", "A", None), edge("e2", "A", "p-end", None)],
        );
        let puzzle_graph = puzzle_subgraph.scenes[0].graph.clone();
        let graph = single_scene_graph(
            vec![node("entry", NodeKind::SceneEntry), node("P", NodeKind::Puzzle { subgraph: puzzle_graph })],
            vec![edge("e1", "entry", "P", None)],
        );

        let mut runtime = GraphRuntime::new(graph, 1);
        runtime.start_game(&room(), None, now()).expect("start");
        let outcome = runtime.override_node(&room(), &NodeId::new("A"), now()).expect("override");
        let names: Vec<_> = outcome.derived.iter().map(|e| e.name.as_str().to_owned()).collect();
        assert_eq!(
            names,
            vec!["node.overridden", "node.started", "node.completed", "puzzle.solved", "node.completed", "scene.completed",],
        );
    }

    #[test]
    fn parallel_completes_only_once_every_child_is_terminal() {
        let graph = single_scene_graph(
            vec![
                node("entry", NodeKind::SceneEntry),
                node(
                    "fork",
                    NodeKind::Parallel { children: vec![NodeId::new("left"), NodeId::new("right")] },
                ),
                node("left", NodeKind::Gate),
                node("right", NodeKind::Gate),
                node("join", NodeKind::Checkpoint),
            ],
            vec![edge("e1", "entry", "fork", None), edge("e2", "fork", "join", None)],
        );
        let mut runtime = GraphRuntime::new(graph, 1);
        runtime.start_game(&room(), None, now()).expect("start");
        assert_eq!(runtime.node_lifecycle(&NodeId::new("fork")), NodeLifecycle::Active);

        runtime.override_node(&room(), &NodeId::new("left"), now()).expect("override left");
        assert_eq!(runtime.node_lifecycle(&NodeId::new("fork")), NodeLifecycle::Active);

        let outcome = runtime.override_node(&room(), &NodeId::new("right"), now()).expect("override right");
        assert_eq!(runtime.node_lifecycle(&NodeId::new("fork")), NodeLifecycle::Completed);
        assert!(matches!(runtime.room_state(), RoomState::Halted { .. }));
        let names: Vec<_> = outcome.derived.iter().map(|e| e.name.as_str().to_owned()).collect();
        assert!(names.contains(&"scene.completed".to_owned()));
    }

    #[test]
    fn loop_stops_once_its_condition_is_met() {
        let graph = single_scene_graph(
            vec![
                node("entry", NodeKind::SceneEntry),
                node(
                    "fog",
                    NodeKind::Loop {
                        action: "fog.pulse".to_owned(),
                        interval: LoopInterval::Fixed(Duration::from_secs(5)),
                        stop_condition: r#"node.entry.state == "completed""#.to_owned(),
                    },
                ),
            ],
            vec![edge("e1", "entry", "fog", None)],
        );
        let mut runtime = GraphRuntime::new(graph, 7);
        runtime.start_game(&room(), None, now()).expect("start");
        let outcome = runtime.handle_loop_tick(&room(), &NodeId::new("fog"), now()).expect("tick");
        let names: Vec<_> = outcome.derived.iter().map(|e| e.name.as_str().to_owned()).collect();
        assert_eq!(names, vec!["loop.tick", "loop.stopped", "node.completed", "scene.completed"]);
    }

    #[test]
    fn decision_edge_referencing_unresolved_state_reports_system_error_once() {
        let graph = single_scene_graph(
            vec![
                node("entry", NodeKind::SceneEntry),
                node("decision", NodeKind::Decision),
                node("never", NodeKind::Checkpoint),
                node("end", NodeKind::Checkpoint),
            ],
            vec![
                edge("e1", "entry", "decision", None),
                edge("e2", "decision", "never", Some(r#"node.ghost.state == "done""#)),
                edge("e3", "decision", "end", None),
            ],
        );
        let mut runtime = GraphRuntime::new(graph, 1);
        let outcome = runtime.start_game(&room(), None, now()).expect("start");
        let names: Vec<_> = outcome.derived.iter().map(|e| e.name.as_str().to_owned()).collect();
        assert_eq!(names.iter().filter(|name| name.as_str() == "system.error").count(), 1);
        assert!(names.contains(&"scene.completed".to_owned()));
    }

    #[test]
    fn loop_stop_condition_referencing_unresolved_state_reports_system_error_once() {
        let graph = single_scene_graph(
            vec![
                node("entry", NodeKind::SceneEntry),
                node(
                    "fog",
                    NodeKind::Loop {
                        action: "fog.pulse".to_owned(),
                        interval: LoopInterval::Fixed(Duration::from_secs(5)),
                        stop_condition: r#"node.ghost.state == "done""#.to_owned(),
                    },
                ),
            ],
            vec![edge("e1", "entry", "fog", None)],
        );
        let mut runtime = GraphRuntime::new(graph, 7);
        runtime.start_game(&room(), None, now()).expect("start");

        let first_tick = runtime.handle_loop_tick(&room(), &NodeId::new("fog"), now()).expect("tick");
        let first_names: Vec<_> = first_tick.derived.iter().map(|e| e.name.as_str().to_owned()).collect();
        assert_eq!(first_names.iter().filter(|name| name.as_str() == "system.error").count(), 1);

        let second_tick = runtime.handle_loop_tick(&room(), &NodeId::new("fog"), now()).expect("tick");
        let second_names: Vec<_> = second_tick.derived.iter().map(|e| e.name.as_str().to_owned()).collect();
        assert!(!second_names.contains(&"system.error".to_owned()));
    }

    #[test]
    fn halted_scene_rejects_further_device_input_but_accepts_stop() {
        let graph = single_scene_graph(
            vec![node("entry", NodeKind::SceneEntry), node("end", NodeKind::Checkpoint)],
            vec![edge("e1", "entry", "end", None)],
        );
        let mut runtime = GraphRuntime::new(graph, 1);
        runtime.start_game(&room(), None, now()).expect("start");
        assert!(matches!(runtime.room_state(), RoomState::Halted { .. }));

        let input = fake_event("device.input", vec![]);
        let err = runtime.handle_device_input(&room(), &input, now()).unwrap_err();
        assert!(matches!(err, GraphError::SceneHalted(_)));

        runtime.stop_game().expect("stop game always allowed once started");
        assert!(matches!(runtime.room_state(), RoomState::NotStarted));
    }

    #[test]
    fn random_node_picks_an_edge_deterministically_for_a_fixed_seed() {
        let graph = single_scene_graph(
            vec![
                node("entry", NodeKind::Random { seed: 3 }),
                node("a", NodeKind::Checkpoint),
                node("b", NodeKind::Checkpoint),
                node("c", NodeKind::Checkpoint),
            ],
            vec![edge("e1", "entry", "a", None), edge("e2", "entry", "b", None), edge("e3", "entry", "c", None)],
        );
        let mut runtime = GraphRuntime::new(graph, 1);
        let outcome = runtime.start_game(&room(), None, now()).expect("start");
        assert_eq!(runtime.node_lifecycle(&NodeId::new("c")), NodeLifecycle::Active);
        let names: Vec<_> = outcome.derived.iter().map(|e| e.name.as_str().to_owned()).collect();
        assert!(names.contains(&"node.started".to_owned()));
    }

    #[test]
    fn jump_rejects_a_scene_id_as_the_target() {
        let graph = single_scene_graph(vec![node("entry", NodeKind::SceneEntry)], vec![]);
        let mut runtime = GraphRuntime::new(graph, 1);
        runtime.start_game(&room(), None, now()).expect("start");
        let err = runtime.jump_node(&room(), &NodeId::new("scene-1"), now()).unwrap_err();
        assert!(matches!(err, GraphError::SceneIsNotAValidTarget(_)));
    }

    #[test]
    fn pause_rejects_progress_but_resume_restores_it() {
        let graph = single_scene_graph(
            vec![node("entry", NodeKind::SceneEntry), node("A", NodeKind::Gate)],
            vec![edge("e1", "entry", "A", None)],
        );
        let mut runtime = GraphRuntime::new(graph, 1);
        runtime.start_game(&room(), None, now()).expect("start");
        runtime.pause().expect("pause");
        let input = fake_event("device.input", vec![]);
        assert!(matches!(runtime.handle_device_input(&room(), &input, now()), Err(GraphError::Paused)));
        runtime.resume().expect("resume");
        assert!(runtime.handle_device_input(&room(), &input, now()).is_ok());
    }
}
