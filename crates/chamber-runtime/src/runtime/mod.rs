// crates/chamber-runtime/src/runtime/mod.rs
// ============================================================================
// Module: Runtime
// Description: Module tree for the graph runtime, projector, and coordinator.
// Purpose: Group the three collaborators that make up a running room.
// Dependencies: none (re-export only)
// ============================================================================

mod coordinator;
mod graph;
mod projector;

pub use coordinator::Coordinator;
pub use coordinator::CoordinatorError;
pub use graph::ApplyOutcome;
pub use graph::GraphRuntime;
pub use graph::RoomState;
pub use graph::SchedulingRequest;
pub use projector::CurrentState;
pub use projector::Projector;
