// crates/chamber-model/src/state.rs
// ============================================================================
// Module: Chamber Runtime State
// Description: Node/scene lifecycle, puzzle/loop/timer/controller state, and
//              the derived room-readiness predicate.
// Purpose: Give the graph runtime, device registry, and projector a shared,
//          serializable notion of "what is true right now" independent of
//          how it was derived.
// Dependencies: crate::identifiers, crate::time, serde
// ============================================================================

//! ## Overview
//! State types here are pure data: transitions between them are driven
//! exclusively by the graph runtime (`chamber-runtime`) applying events.
//! Nothing in this module mutates itself.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::ControllerId;
use crate::identifiers::LogicalDeviceId;
use crate::identifiers::NodeId;
use crate::time::Timestamp;

// ============================================================================
// SECTION: Node Lifecycle
// ============================================================================

/// Lifecycle state of a single node.
///
/// # Invariants
/// - Transitions are total and driven only by the graph runtime:
///   `idle -> active` on parent flow reaching the node; `active ->
///   completed|failed` on internal resolution; any state `-> overridden` on
///   `operator.override`; any state `-> reset -> active` on
///   `operator.reset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeLifecycle {
    /// Not yet reached by flow.
    Idle,
    /// Reached by flow, awaiting internal resolution.
    Active,
    /// Resolved successfully.
    Completed,
    /// Resolved unsuccessfully.
    Failed,
    /// Forced to completion by an operator, regardless of prior state.
    Overridden,
    /// Momentarily between an operator reset and re-activation.
    Reset,
}

impl NodeLifecycle {
    /// Returns `true` if this state is terminal for AND-join and edge
    /// evaluation purposes: `completed`, `failed`, or `overridden`.
    ///
    /// `overridden` is treated as completed for flow purposes per the node
    /// lifecycle contract.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Overridden)
    }
}

// ============================================================================
// SECTION: Scene Lifecycle
// ============================================================================

/// Lifecycle state of a scene. Scenes carry no `overridden` or `reset`
/// state: they cannot be overridden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneLifecycle {
    /// The scene is running.
    Active,
    /// A terminal node in the scene reached `completed`.
    Completed,
    /// The scene halted due to an unrecoverable graph error.
    Failed,
}

// ============================================================================
// SECTION: Subgraph Runtime State
// ============================================================================

/// The lifecycle state of every node in a running scene or puzzle subgraph.
/// Identical in shape whether it backs a top-level scene or a nested puzzle
/// subgraph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubgraphRuntimeState {
    /// Lifecycle state of each node reached so far. Nodes not yet reached
    /// are implicitly `Idle` and may be absent from this map.
    pub nodes: BTreeMap<NodeId, NodeLifecycle>,
}

impl SubgraphRuntimeState {
    /// Returns the lifecycle state of `node_id`, defaulting to `Idle` if the
    /// node has not yet been reached.
    #[must_use]
    pub fn lifecycle_of(&self, node_id: &NodeId) -> NodeLifecycle {
        self.nodes.get(node_id).copied().unwrap_or(NodeLifecycle::Idle)
    }

    /// Sets the lifecycle state of `node_id`.
    pub fn set_lifecycle(&mut self, node_id: NodeId, state: NodeLifecycle) {
        self.nodes.insert(node_id, state);
    }
}

// ============================================================================
// SECTION: Puzzle State
// ============================================================================

/// Resolved outcome of a puzzle subgraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PuzzleOutcome {
    /// The subgraph reached its solved terminal.
    Solved,
    /// The subgraph reached its failed terminal.
    Failed,
    /// The parent puzzle node was overridden before the subgraph resolved
    /// on its own.
    Overridden,
}

/// Runtime state of a puzzle node's subgraph.
///
/// # Invariants
/// - `resolved` implies `activated`.
/// - `outcome.is_some()` iff `resolved`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PuzzleState {
    /// Whether the puzzle node has activated its subgraph.
    pub activated: bool,
    /// Whether the subgraph has resolved.
    pub resolved: bool,
    /// The resolved outcome, once `resolved` is true.
    pub outcome: Option<PuzzleOutcome>,
    /// Runtime state of the puzzle's internal subgraph.
    pub subgraph: SubgraphRuntimeState,
}

// ============================================================================
// SECTION: Loop State
// ============================================================================

/// Runtime state of a loop node.
///
/// # Invariants
/// - `rng_seed` is recorded on activation; deterministic replay requires
///   reusing exactly that seed rather than re-sampling one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LoopState {
    /// Whether the loop is still ticking.
    pub active: bool,
    /// The time of the next scheduled tick, if any.
    pub next_tick_time: Option<Timestamp>,
    /// Seed recorded on activation for deterministic replay.
    pub rng_seed: u64,
    /// Number of ticks fired so far.
    pub tick_count: u64,
}

impl LoopState {
    /// Creates the initial state for a loop activated with `seed`.
    #[must_use]
    pub const fn activated(seed: u64) -> Self {
        Self { active: true, next_tick_time: None, rng_seed: seed, tick_count: 0 }
    }
}

// ============================================================================
// SECTION: Timer State
// ============================================================================

/// Runtime state of a timer node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimerState {
    /// Time the timer was started (node activation time).
    pub started_at: Timestamp,
    /// Configured duration.
    pub duration: std::time::Duration,
    /// Computed fire time (`started_at + duration`).
    pub fire_at: Timestamp,
    /// Whether the timer has been cancelled (e.g. by operator reset).
    pub cancelled: bool,
}

// ============================================================================
// SECTION: Controller / Device State
// ============================================================================

/// Liveness and advertisement state of a hardware controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerState {
    /// Controller identifier.
    pub controller_id: ControllerId,
    /// Last time a registration or heartbeat was received.
    pub last_seen: Timestamp,
    /// Heartbeat interval advertised by the controller.
    pub heartbeat_interval: std::time::Duration,
    /// Logical devices this controller currently advertises.
    pub advertised_devices: BTreeSet<LogicalDeviceId>,
    /// Whether the controller is currently considered connected.
    pub connected: bool,
}

/// A logical device's wiring as learned from controller self-registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogicalDevice {
    /// The controller currently advertising this device.
    pub controller_id: ControllerId,
    /// Device type, matched against the device contract.
    pub device_type: String,
    /// Capabilities advertised for this device.
    pub capabilities: BTreeSet<String>,
    /// Input signal names this device can produce.
    pub input_signals: BTreeSet<String>,
    /// Output signal names this device accepts commands for.
    pub output_signals: BTreeSet<String>,
    /// Broker topic commands are published to.
    pub command_topic: String,
    /// Broker topic input events arrive on.
    pub event_topic: String,
}

// ============================================================================
// SECTION: Room Readiness
// ============================================================================

/// Derived room-readiness result.
///
/// # Invariants
/// - `ready` is true iff every required logical device is present in
///   `missing` as... (it is not — `ready` is true iff `missing` is empty).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomReadiness {
    /// Required logical devices not currently satisfied by any connected,
    /// capability-valid controller.
    pub missing: Vec<LogicalDeviceId>,
}

impl RoomReadiness {
    /// Returns `true` iff every required device is present and valid.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.missing.is_empty()
    }
}
