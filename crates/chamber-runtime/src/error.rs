// crates/chamber-runtime/src/error.rs
// ============================================================================
// Module: Graph runtime errors
// Description: The error taxonomy for scene-graph application failures.
// Purpose: Give the coordinator a typed way to distinguish a halted scene
//          from a genuinely corrupt graph reference.
// Dependencies: chamber-model, chamber-expr, thiserror
// ============================================================================

use chamber_model::NodeId;
use chamber_model::SceneId;
use thiserror::Error;

/// Failure applying an event to a [`crate::runtime::graph::GraphRuntime`].
///
/// # Invariants
/// - A reference to an unknown node/edge/subgraph at runtime only halts the
///   scene it occurred in; it never corrupts another scene's state or
///   panics the process. The coordinator turns every variant here into a
///   `system.error` event and, where noted, halts the active scene.
#[derive(Debug, Error)]
pub enum GraphError {
    /// No scene is currently active for an operation that requires one.
    #[error("no scene is currently active")]
    NoActiveScene,

    /// `start-game` was asked to start the room but no scenes are declared.
    #[error("room graph declares no scenes")]
    NoScenesDeclared,

    /// A named scene does not exist in the loaded room graph.
    #[error("unknown scene: {0}")]
    UnknownScene(SceneId),

    /// A node id does not exist in the active scope (scene or puzzle
    /// subgraph).
    #[error("unknown node in the active scope: {0}")]
    UnknownNode(NodeId),

    /// An operator targeted a scene id with an operation that only accepts
    /// node ids (override, reset, jump).
    #[error("{0} is a scene, not a valid override/reset/jump target")]
    SceneIsNotAValidTarget(SceneId),

    /// `start-game` was issued while the room was already running.
    #[error("room is already running scene {0}")]
    AlreadyRunning(SceneId),

    /// An operator command other than `stop-game` arrived for a scene that
    /// has already reached `scene.completed`/`scene.failed`.
    #[error("scene {0} already completed; no further node-level events are accepted")]
    SceneHalted(SceneId),

    /// The room has not been started yet.
    #[error("room has not been started")]
    NotRunning,

    /// The room is paused and does not accept progress-driving events.
    #[error("room is paused")]
    Paused,

    /// An edge or loop stop condition failed to parse.
    #[error("condition expression is invalid: {0}")]
    InvalidCondition(#[from] chamber_expr::ParseError),

    /// An operator command that requires a `node_id` field arrived without
    /// one.
    #[error("event is missing required field: {0}")]
    MissingField(&'static str),
}
