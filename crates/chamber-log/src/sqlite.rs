// crates/chamber-log/src/sqlite.rs
// ============================================================================
// Module: SQLite event log
// Description: A durable EventLog backed by a WAL-mode SQLite database,
//              one row per event, indexed by room and by recency.
// Purpose: Survive a process restart: recovery is replaying this table
//          through the graph runtime from offset zero.
// Dependencies: rusqlite, chamber-broadcast, chamber-model, serde_json
// ============================================================================

//! ## Overview
//! Schema:
//!
//! ```text
//! CREATE TABLE events (
//!     room_id    TEXT    NOT NULL,
//!     offset     INTEGER NOT NULL,
//!     session_id TEXT,
//!     ts         TEXT    NOT NULL,
//!     level      TEXT    NOT NULL,
//!     name       TEXT    NOT NULL,
//!     message    TEXT,
//!     fields     TEXT    NOT NULL,
//!     PRIMARY KEY (room_id, offset)
//! );
//! CREATE INDEX idx_events_room_ts ON events (room_id, ts DESC);
//! ```
//!
//! `fields` stores the event's field map as a JSON object. The connection
//! runs in WAL mode so readers (the CLI's `replay` and `tail` commands)
//! never block the writer.

#![allow(
    clippy::missing_docs_in_private_items,
    reason = "row/column mapping helpers are documented by the schema above, not per-field"
)]

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use chamber_broadcast::Broadcaster;
use chamber_broadcast::Subscription;
use chamber_model::Event;
use chamber_model::EventName;
use chamber_model::FieldMap;
use chamber_model::NewEvent;
use chamber_model::RoomId;
use chamber_model::RoomSessionId;
use chamber_model::Severity;
use chamber_model::Timestamp;
use rusqlite::params;
use rusqlite::Connection;

use crate::error::PersistenceError;
use crate::EventLog;
use crate::DEFAULT_REPLAY_WINDOW;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS events (
    room_id    TEXT    NOT NULL,
    offset     INTEGER NOT NULL,
    session_id TEXT,
    ts         TEXT    NOT NULL,
    level      TEXT    NOT NULL,
    name       TEXT    NOT NULL,
    message    TEXT,
    fields     TEXT    NOT NULL,
    PRIMARY KEY (room_id, offset)
);
CREATE INDEX IF NOT EXISTS idx_events_room_ts ON events (room_id, ts DESC);
";

/// A durable, SQLite-backed [`EventLog`].
pub struct SqliteEventLog {
    connection: Mutex<Connection>,
    broadcasters: Mutex<BTreeMap<RoomId, Broadcaster<Event>>>,
}

impl SqliteEventLog {
    /// Opens (creating if absent) a SQLite event log at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] if the database could not be opened or
    /// migrated.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let connection = Connection::open(path)?;
        connection.pragma_update(None, "journal_mode", "WAL")?;
        connection.execute_batch(SCHEMA)?;
        Ok(Self {
            connection: Mutex::new(connection),
            broadcasters: Mutex::new(BTreeMap::new()),
        })
    }

    /// Opens a private in-memory SQLite event log, used in tests that want
    /// the real schema without a filesystem.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] if the schema could not be created.
    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        let connection = Connection::open_in_memory()?;
        connection.execute_batch(SCHEMA)?;
        Ok(Self {
            connection: Mutex::new(connection),
            broadcasters: Mutex::new(BTreeMap::new()),
        })
    }

    fn broadcaster_for(&self, room_id: &RoomId) -> std::sync::MutexGuard<'_, BTreeMap<RoomId, Broadcaster<Event>>> {
        let mut broadcasters = self.broadcasters.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        broadcasters
            .entry(room_id.clone())
            .or_insert_with(|| Broadcaster::new(DEFAULT_REPLAY_WINDOW));
        broadcasters
    }
}

impl EventLog for SqliteEventLog {
    fn append(&self, draft: NewEvent) -> Result<Event, PersistenceError> {
        let connection = self.connection.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let next_offset: i64 = connection
            .query_row(
                "SELECT COALESCE(MAX(offset), -1) + 1 FROM events WHERE room_id = ?1",
                params![draft.room_id.as_str()],
                |row| row.get(0),
            )?;
        #[allow(clippy::cast_sign_loss, reason = "offset is derived from COALESCE(MAX(offset), -1) + 1, always non-negative")]
        let offset = next_offset as u64;
        let event = draft.into_event(offset);
        let fields_json = serde_json::to_string(&event.fields)?;
        connection.execute(
            "INSERT INTO events (room_id, offset, session_id, ts, level, name, message, fields)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                event.room_id.as_str(),
                next_offset,
                event.session_id.as_ref().map(RoomSessionId::as_str),
                event.timestamp.to_string(),
                severity_label(event.level),
                event.name.as_str(),
                event.message,
                fields_json,
            ],
        )?;
        drop(connection);
        let broadcasters = self.broadcaster_for(&event.room_id);
        if let Some(broadcaster) = broadcasters.get(&event.room_id) {
            broadcaster.publish(event.clone());
        }
        drop(broadcasters);
        Ok(event)
    }

    fn read(&self, room_id: &RoomId, from_offset: u64, limit: usize) -> Result<Vec<Event>, PersistenceError> {
        let connection = self.connection.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut statement = connection.prepare(
            "SELECT offset, session_id, ts, level, name, message, fields
             FROM events
             WHERE room_id = ?1 AND offset >= ?2
             ORDER BY offset ASC
             LIMIT ?3",
        )?;
        #[allow(clippy::cast_possible_wrap, reason = "from_offset and limit are small counters far below i64::MAX")]
        let rows = statement.query_map(
            params![room_id.as_str(), from_offset as i64, limit as i64],
            |row| row_to_event(room_id, row),
        )?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row??);
        }
        Ok(events)
    }

    fn tail(&self, room_id: &RoomId) -> Subscription<Event> {
        let broadcasters = self.broadcaster_for(room_id);
        #[allow(
            clippy::expect_used,
            reason = "broadcaster_for guarantees an entry for room_id exists before returning"
        )]
        let subscription = broadcasters.get(room_id).expect("broadcaster just inserted").subscribe();
        subscription
    }
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "info",
        Severity::Warning => "warning",
        Severity::Error => "error",
    }
}

fn severity_from_label(label: &str) -> Severity {
    match label {
        "warning" => Severity::Warning,
        "error" => Severity::Error,
        _ => Severity::Info,
    }
}

fn row_to_event(room_id: &RoomId, row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<Event, PersistenceError>> {
    let offset: i64 = row.get(0)?;
    let session_id: Option<String> = row.get(1)?;
    let ts: String = row.get(2)?;
    let level: String = row.get(3)?;
    let name: String = row.get(4)?;
    let message: Option<String> = row.get(5)?;
    let fields_json: String = row.get(6)?;

    Ok((|| {
        let fields: FieldMap = serde_json::from_str(&fields_json)?;
        let timestamp: Timestamp =
            ts.parse().map_err(|_| PersistenceError::InvalidTimestamp(ts.clone()))?;
        #[allow(clippy::cast_sign_loss, reason = "offsets are only ever stored as non-negative values by append")]
        let unsigned_offset = offset as u64;
        Ok(Event {
            room_id: room_id.clone(),
            session_id: session_id.map(RoomSessionId::new),
            timestamp,
            name: EventName::new(name),
            level: severity_from_label(&level),
            message,
            fields,
            offset: unsigned_offset,
        })
    })())
}
