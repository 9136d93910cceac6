// crates/chamber-log/src/lib.rs
// ============================================================================
// Module: Chamber Log
// Description: The durable, append-only event log every room's history is
//              recorded to, plus an in-memory stand-in for tests.
// Purpose: Give the graph runtime a single `append` / `read` / `tail`
//          surface, backed by SQLite in production.
// Dependencies: chamber-model, chamber-broadcast, rusqlite
// ============================================================================

//! ## Overview
//! Offsets are per-room and monotonically increasing starting at zero;
//! nothing outside this crate assigns an [`Event`]'s offset. `tail`
//! returns a [`chamber_broadcast::Subscription`] so a caller always gets a
//! consistent snapshot of recent history before live appends start
//! arriving, matching the rest of Chamber's live-view plumbing.
//!
//! Recovery after a restart is replay: read from offset zero and re-apply
//! every event through the graph runtime rather than persisting runtime
//! state directly. The log is the only thing that must survive a crash.

/// The error taxonomy for event log storage.
pub mod error;
/// A non-durable event log backed by plain vectors, used in tests.
pub mod memory;
pub mod sqlite;

pub use error::PersistenceError;
pub use memory::InMemoryEventLog;
pub use sqlite::SqliteEventLog;

use chamber_broadcast::Subscription;
use chamber_model::Event;
use chamber_model::NewEvent;
use chamber_model::RoomId;

/// The default number of recent events a new `tail` subscriber replays
/// before receiving live deltas.
pub const DEFAULT_REPLAY_WINDOW: usize = 256;

/// An append-only, per-room event log.
pub trait EventLog: Send + Sync {
    /// Appends `draft` to the log, assigning it the next offset for its
    /// room, and returns the durable [`Event`].
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] if the write could not be committed.
    fn append(&self, draft: NewEvent) -> Result<Event, PersistenceError>;

    /// Reads up to `limit` events for `room_id` starting at `from_offset`,
    /// in offset order.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] if the read could not be completed.
    fn read(&self, room_id: &RoomId, from_offset: u64, limit: usize) -> Result<Vec<Event>, PersistenceError>;

    /// Subscribes to future appends for `room_id`, seeded with a replay of
    /// recently appended events.
    fn tail(&self, room_id: &RoomId) -> Subscription<Event>;
}
