// crates/chamber-log/src/memory.rs
// ============================================================================
// Module: In-memory event log
// Description: A non-durable EventLog backed by plain vectors, used in
//              unit and integration tests.
// Purpose: Let the rest of Chamber be tested without a filesystem.
// Dependencies: chamber-broadcast, chamber-model
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Mutex;

use chamber_broadcast::Broadcaster;
use chamber_broadcast::Subscription;
use chamber_model::Event;
use chamber_model::NewEvent;
use chamber_model::RoomId;

use crate::error::PersistenceError;
use crate::EventLog;
use crate::DEFAULT_REPLAY_WINDOW;

#[allow(
    clippy::missing_docs_in_private_items,
    reason = "internal per-room storage, documented by the module overview"
)]
struct RoomLog {
    events: Vec<Event>,
    broadcaster: Broadcaster<Event>,
}

impl RoomLog {
    fn new() -> Self {
        Self { events: Vec::new(), broadcaster: Broadcaster::new(DEFAULT_REPLAY_WINDOW) }
    }
}

/// A non-durable [`EventLog`] backed by in-process vectors.
#[derive(Default)]
pub struct InMemoryEventLog {
    rooms: Mutex<BTreeMap<RoomId, RoomLog>>,
}

impl InMemoryEventLog {
    /// Creates an empty in-memory event log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventLog for InMemoryEventLog {
    fn append(&self, draft: NewEvent) -> Result<Event, PersistenceError> {
        let mut rooms = self.rooms.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let room_id = draft.room_id.clone();
        let room_log = rooms.entry(room_id).or_insert_with(RoomLog::new);
        let offset = room_log.events.len() as u64;
        let event = draft.into_event(offset);
        room_log.events.push(event.clone());
        room_log.broadcaster.publish(event.clone());
        Ok(event)
    }

    fn read(&self, room_id: &RoomId, from_offset: u64, limit: usize) -> Result<Vec<Event>, PersistenceError> {
        let rooms = self.rooms.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let Some(room_log) = rooms.get(room_id) else {
            return Ok(Vec::new());
        };
        Ok(room_log
            .events
            .iter()
            .filter(|event| event.offset >= from_offset)
            .take(limit)
            .cloned()
            .collect())
    }

    fn tail(&self, room_id: &RoomId) -> Subscription<Event> {
        let mut rooms = self.rooms.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let room_log = rooms.entry(room_id.clone()).or_insert_with(RoomLog::new);
        room_log.broadcaster.subscribe()
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::missing_docs_in_private_items,
        reason = "test assertions favor unwrap/expect and skip doc comments"
    )]

    use super::InMemoryEventLog;
    use crate::EventLog;
    use chamber_model::EventName;
    use chamber_model::NewEvent;
    use chamber_model::RoomId;
    use chamber_model::Severity;

    fn draft(room: &RoomId, name: &str) -> NewEvent {
        NewEvent::new(room.clone(), EventName::new(name), Severity::Info)
    }

    #[test]
    fn appended_events_get_monotonic_offsets() {
        let log = InMemoryEventLog::new();
        let room = RoomId::new("crypt-room-01");
        let first = log.append(draft(&room, "system.startup")).expect("append");
        let second = log.append(draft(&room, "node.started")).expect("append");
        assert_eq!(first.offset, 0);
        assert_eq!(second.offset, 1);
    }

    #[test]
    fn rooms_have_independent_offset_sequences() {
        let log = InMemoryEventLog::new();
        let room_a = RoomId::new("room-a");
        let room_b = RoomId::new("room-b");
        log.append(draft(&room_a, "system.startup")).expect("append");
        let first_b = log.append(draft(&room_b, "system.startup")).expect("append");
        assert_eq!(first_b.offset, 0);
    }

    #[test]
    fn read_respects_from_offset_and_limit() {
        let log = InMemoryEventLog::new();
        let room = RoomId::new("crypt-room-01");
        for _ in 0..5 {
            log.append(draft(&room, "loop.tick")).expect("append");
        }
        let page = log.read(&room, 2, 2).expect("read");
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].offset, 2);
        assert_eq!(page[1].offset, 3);
    }

    #[tokio::test]
    async fn tail_replays_then_streams_live_appends() {
        let log = InMemoryEventLog::new();
        let room = RoomId::new("crypt-room-01");
        log.append(draft(&room, "system.startup")).expect("append");

        let mut subscription = log.tail(&room);
        assert_eq!(subscription.snapshot.len(), 1);

        log.append(draft(&room, "node.started")).expect("append");
        let next = subscription.recv().await.expect("recv");
        assert_eq!(next.name.as_str(), "node.started");
    }
}
