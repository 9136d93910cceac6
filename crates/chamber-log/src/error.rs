// crates/chamber-log/src/error.rs
// ============================================================================
// Module: Persistence errors
// Description: The error taxonomy for event log storage.
// Purpose: Give callers a closed, matchable set of failure modes rather
//          than a bag of opaque strings.
// Dependencies: rusqlite, serde_json
// ============================================================================

use thiserror::Error;

/// Errors raised while appending to or reading from an event log.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The backing SQLite database rejected the operation.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored field map failed to serialize or deserialize.
    #[error("field serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Two writers raced to claim the same offset for a room. The caller
    /// should retry the append.
    #[error("offset conflict for room {room_id}")]
    OffsetConflict {
        /// The room whose offset sequence was contended.
        room_id: String,
    },
    /// A stored timestamp was not valid RFC3339.
    #[error("invalid stored timestamp: {0}")]
    InvalidTimestamp(String),
}
