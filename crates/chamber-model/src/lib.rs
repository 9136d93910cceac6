// crates/chamber-model/src/lib.rs
// ============================================================================
// Module: Chamber Model Library
// Description: Public API surface for the Chamber data model.
// Purpose: Expose identifiers, events, the scene graph, and runtime state
//          types shared by every other Chamber crate.
// Dependencies: crate::{identifiers, event, graph, state, time}
// ============================================================================

//! ## Overview
//! Chamber Model defines the data shared by every component of a room
//! instance: the event wire format, the scene-graph types an operator
//! authors, and the lifecycle/state types the graph runtime mutates. It has
//! no runtime behavior of its own.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod event;
pub mod graph;
pub mod identifiers;
pub mod state;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use event::Event;
pub use event::EventName;
pub use event::FieldMap;
pub use event::FieldValue;
pub use event::NewEvent;
pub use event::Severity;
pub use graph::Edge;
pub use graph::LoopInterval;
pub use graph::Node;
pub use graph::NodeKind;
pub use graph::RoomGraph;
pub use graph::Scene;
pub use graph::SceneGraph;
pub use identifiers::ControllerId;
pub use identifiers::EdgeId;
pub use identifiers::GraphRevisionId;
pub use identifiers::LogicalDeviceId;
pub use identifiers::NodeId;
pub use identifiers::RoomId;
pub use identifiers::RoomSessionId;
pub use identifiers::SceneId;
pub use identifiers::SchemaVersion;
pub use state::ControllerState;
pub use state::LogicalDevice;
pub use state::LoopState;
pub use state::NodeLifecycle;
pub use state::PuzzleOutcome;
pub use state::PuzzleState;
pub use state::RoomReadiness;
pub use state::SceneLifecycle;
pub use state::SubgraphRuntimeState;
pub use state::TimerState;
pub use time::Timestamp;
