// crates/chamber-model/src/graph.rs
// ============================================================================
// Module: Chamber Scene Graph
// Description: Tree-of-graphs scene model: scenes, nodes, edges, and puzzle
//              subgraphs.
// Purpose: Give the graph runtime an owned, lookup-table-addressed graph with
//          no in-memory back-pointers.
// Dependencies: crate::identifiers, serde
// ============================================================================

//! ## Overview
//! A room's [`RoomGraph`] holds an ordered set of [`Scene`]s; exactly one is
//! active at any time (enforced by the graph runtime, not this module). Each
//! scene is a [`SceneGraph`]: an entry node, a node table, and an edge list.
//! A puzzle node's [`NodeKind::Puzzle`] variant carries its own `SceneGraph`
//! to serve as the puzzle subgraph, which runs exactly like a scene but must
//! resolve to exactly one terminal outcome.
//!
//! All traversal goes through the owning `SceneGraph`'s lookup tables; nodes
//! and edges never hold pointers back to their parent scene or to each
//! other. This keeps cyclic references (node -> parent -> scene ->
//! parent-puzzle-node -> ...) representable as plain, serializable data.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::EdgeId;
use crate::identifiers::LogicalDeviceId;
use crate::identifiers::NodeId;
use crate::identifiers::SceneId;

// ============================================================================
// SECTION: Loop Interval
// ============================================================================

/// The interval between successive ticks of a loop node.
///
/// # Invariants
/// - `Uniform { min, max }` requires `min <= max`; the scene-graph loader
///   rejects graphs that violate this before the runtime ever sees them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopInterval {
    /// A fixed interval between ticks.
    Fixed(Duration),
    /// An interval sampled uniformly from `[min, max]` using the loop's
    /// seeded generator.
    Uniform {
        /// Minimum interval, inclusive.
        min: Duration,
        /// Maximum interval, inclusive.
        max: Duration,
    },
}

// ============================================================================
// SECTION: Node Kind
// ============================================================================

/// The behavior a node performs while active.
///
/// # Invariants
/// - `Loop` only appears in a top-level scene's `SceneGraph`, never inside a
///   puzzle subgraph; the loader rejects graphs that violate this.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    /// The single entry point of a scene or subgraph.
    SceneEntry,
    /// A leaf action; completes on an internal resolution (typically a
    /// matching `device.input`).
    Action {
        /// Logical device this action waits on input from, if any.
        awaits_device: Option<LogicalDeviceId>,
    },
    /// Activates a self-contained puzzle subgraph and blocks progression
    /// until the subgraph resolves to `solved` or `failed`, or the node is
    /// overridden.
    Puzzle {
        /// The puzzle's internal subgraph.
        subgraph: SceneGraph,
    },
    /// Routes flow based on edge conditions alone; carries no internal
    /// behavior of its own.
    Decision,
    /// Completes when its configured duration elapses, via a
    /// `timer.expired` event injected by the scheduler.
    Timer {
        /// Duration after activation at which the timer fires.
        duration: Duration,
    },
    /// Fans out to every child and completes only when all children reach
    /// a terminal lifecycle state (AND-join).
    Parallel {
        /// Child node ids, activated together when the parallel node
        /// activates.
        children: Vec<NodeId>,
    },
    /// A repeating, timer-driven ambiance node. Never appears in a puzzle
    /// subgraph.
    Loop {
        /// Opaque action label run on each tick (interpreted by the
        /// ingress/runtime wiring, e.g. dispatched as a device command).
        action: String,
        /// Interval between ticks.
        interval: LoopInterval,
        /// Condition expression (see `chamber-expr`) evaluated after each
        /// tick; the loop stops once it evaluates true.
        stop_condition: String,
    },
    /// Blocks flow until an explicit external signal releases it; behaves
    /// like `Action` but documents authorial intent distinctly.
    Gate,
    /// A no-op waypoint used purely for scene-graph bookkeeping/resume
    /// points.
    Checkpoint,
    /// A node whose only valid resolution is an operator command
    /// (`operator.override`); has no automatic internal resolution.
    Operator,
    /// Resolves immediately on activation by sampling one outgoing edge
    /// using the node's seeded generator, rather than evaluating
    /// conditions.
    Random {
        /// Random seed recorded for deterministic replay.
        seed: u64,
    },
    /// References another subgraph by id for reuse across puzzles.
    SubgraphRef {
        /// The referenced subgraph.
        subgraph: SceneGraph,
    },
}

impl NodeKind {
    /// Returns a short machine-stable tag for this kind, used in projector
    /// snapshots and log messages.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::SceneEntry => "scene-entry",
            Self::Action { .. } => "action",
            Self::Puzzle { .. } => "puzzle",
            Self::Decision => "decision",
            Self::Timer { .. } => "timer",
            Self::Parallel { .. } => "parallel",
            Self::Loop { .. } => "loop",
            Self::Gate => "gate",
            Self::Checkpoint => "checkpoint",
            Self::Operator => "operator",
            Self::Random { .. } => "random",
            Self::SubgraphRef { .. } => "subgraph-ref",
        }
    }
}

// ============================================================================
// SECTION: Node
// ============================================================================

/// A single node in a scene or subgraph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Identifier, unique within the owning `SceneGraph`.
    pub id: NodeId,
    /// Behavior this node performs while active.
    pub kind: NodeKind,
}

// ============================================================================
// SECTION: Edge
// ============================================================================

/// A directed edge between two nodes in the same scene or subgraph.
///
/// # Invariants
/// - `from` and `to` reference nodes within the same `SceneGraph` that owns
///   this edge; cross-scope edges are rejected by the loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Identifier, unique within the owning `SceneGraph`.
    pub id: EdgeId,
    /// Source node id.
    pub from: NodeId,
    /// Target node id.
    pub to: NodeId,
    /// Optional condition expression source (see `chamber-expr`). A `None`
    /// condition always evaluates true.
    pub condition: Option<String>,
}

// ============================================================================
// SECTION: Scene Graph
// ============================================================================

/// A graph of nodes and edges: either a top-level scene or a puzzle
/// subgraph. Addressed entirely through its own lookup tables; nothing in
/// this struct or its nodes points back to a parent.
///
/// # Invariants
/// - `entry` is a key in `nodes`.
/// - Every edge's `from`/`to` is a key in `nodes`.
/// - A graph used as a puzzle subgraph must resolve to exactly one terminal
///   outcome (solved/failed) — enforced by the graph runtime at run time,
///   not representable as a static invariant here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneGraph {
    /// Entry node id.
    pub entry: NodeId,
    /// Node lookup table.
    pub nodes: BTreeMap<NodeId, Node>,
    /// Declared edges, in declaration order (edge evaluation order matters:
    /// the first matching condition wins).
    pub edges: Vec<Edge>,
}

impl SceneGraph {
    /// Returns the outgoing edges of `node_id`, in declaration order.
    #[must_use]
    pub fn outgoing_edges(&self, node_id: &NodeId) -> Vec<&Edge> {
        self.edges.iter().filter(|edge| &edge.from == node_id).collect()
    }

    /// Returns the node with the given id, if present.
    #[must_use]
    pub fn node(&self, node_id: &NodeId) -> Option<&Node> {
        self.nodes.get(node_id)
    }

    /// Returns `true` if a loop node exists anywhere in this graph,
    /// including nested puzzle subgraphs. Used by the loader to reject loop
    /// nodes inside subgraphs.
    #[must_use]
    pub fn contains_loop_node(&self) -> bool {
        self.nodes.values().any(|node| matches!(node.kind, NodeKind::Loop { .. }))
    }
}

// ============================================================================
// SECTION: Scene
// ============================================================================

/// A single scene: one stage of the room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    /// Scene identifier, unique within the room.
    pub id: SceneId,
    /// The scene's graph.
    pub graph: SceneGraph,
}

// ============================================================================
// SECTION: Room Graph
// ============================================================================

/// The full loaded scene-graph revision for a room: an ordered set of
/// scenes. Exactly one is active at a time, tracked by the graph runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomGraph {
    /// Scenes in authored order. The first scene is the room's starting
    /// scene unless `start-game` names another.
    pub scenes: Vec<Scene>,
}

impl RoomGraph {
    /// Returns the scene with the given id, if present.
    #[must_use]
    pub fn scene(&self, scene_id: &SceneId) -> Option<&Scene> {
        self.scenes.iter().find(|scene| &scene.id == scene_id)
    }

    /// Returns the room's default starting scene, if any scenes are
    /// declared.
    #[must_use]
    pub fn default_scene(&self) -> Option<&Scene> {
        self.scenes.first()
    }
}
