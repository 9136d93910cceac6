// crates/chamber-runtime/src/lib.rs
// ============================================================================
// Module: Chamber Runtime
// Description: Crate root; re-exports the graph runtime, coordinator,
//              projector, and ingress trait that together run one room.
// Purpose: Give `chamber-broker` and `chamber-cli` a single import surface
//          for wiring a room up end to end.
// Dependencies: see Cargo.toml
// ============================================================================

//! ## Overview
//! `chamber-runtime` is the core of a running room: [`GraphRuntime`] holds
//! the scene graph's live state, [`Coordinator`] serializes every event
//! through it and into the durable log, and [`Projector`] mirrors the
//! result for anything watching. `IngressAdapter` is the one trait a new
//! event source (an MQTT broker, an HTTP endpoint, a replay harness) has to
//! implement to feed the coordinator.

/// The error taxonomy for scene-graph application failures.
pub mod error;
pub mod ingress;
mod runtime;

pub use error::GraphError;
pub use ingress::IngressAdapter;
pub use ingress::QueueError;
pub use runtime::ApplyOutcome;
pub use runtime::Coordinator;
pub use runtime::CoordinatorError;
pub use runtime::CurrentState;
pub use runtime::GraphRuntime;
pub use runtime::Projector;
pub use runtime::RoomState;
pub use runtime::SchedulingRequest;
