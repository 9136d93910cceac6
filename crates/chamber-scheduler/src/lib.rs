// crates/chamber-scheduler/src/lib.rs
// ============================================================================
// Module: Chamber Scheduler
// Description: Two binary-heap priority queues, keyed by fire time, for
//              timer expiry and loop ticks.
// Purpose: Let the coordinator's select loop ask "what's due, and when is
//          the next thing due" without caring how timers and loops were
//          originally scheduled.
// Dependencies: chamber-model
// ============================================================================

//! ## Overview
//! [`Scheduler`] holds no thread and sleeps nowhere; it is pure data. The
//! coordinator owns a `tokio::time::sleep_until` armed with
//! [`Scheduler::next_wakeup`] inside its own select loop, and calls
//! [`Scheduler::pop_due`] when that sleep (or anything else) wakes it up.
//!
//! Cancellation is tombstone-based rather than a heap removal: a timer or
//! loop cancelled after being scheduled is not removed from the heap, it is
//! marked stale by bumping a per-node generation counter. A stale entry is
//! silently discarded the next time it would otherwise fire or be peeked,
//! which is cheap and keeps the heap's `Ord` impl simple.

#![allow(
    clippy::missing_docs_in_private_items,
    reason = "the heap/generation bookkeeping is documented by the module overview, not per-field"
)]

use std::cmp::Ordering;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::collections::BinaryHeap;

use chamber_model::NodeId;
use chamber_model::Timestamp;

/// A pending fire, ready to be turned into a `timer.expired` or
/// `loop.tick` event by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fire {
    /// A timer node's duration elapsed.
    TimerExpired {
        /// The node whose timer fired.
        node_id: NodeId,
    },
    /// A loop node's next tick is due.
    LoopTick {
        /// The node whose loop ticked.
        node_id: NodeId,
    },
}

#[derive(Debug, Clone)]
struct Entry {
    fire_at: Timestamp,
    seq: u64,
    node_id: NodeId,
    generation: u64,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.fire_at == other.fire_at && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fire_at.cmp(&other.fire_at).then_with(|| self.seq.cmp(&other.seq))
    }
}

/// One of the two priority queues the scheduler maintains. Kept generic
/// over its own bookkeeping so `timers` and `loops` don't duplicate logic.
#[derive(Debug, Default)]
struct Queue {
    heap: BinaryHeap<Reverse<Entry>>,
    generation: BTreeMap<NodeId, u64>,
}

impl Queue {
    fn schedule(&mut self, node_id: NodeId, fire_at: Timestamp, seq: u64) {
        let generation = self.generation.entry(node_id.clone()).or_insert(0);
        *generation += 1;
        self.heap.push(Reverse(Entry { fire_at, seq, node_id, generation: *generation }));
    }

    /// Tombstones any pending entry for `node_id`. Returns `true` if the
    /// node had an active schedule.
    fn cancel(&mut self, node_id: &NodeId) -> bool {
        match self.generation.get_mut(node_id) {
            Some(generation) => {
                *generation += 1;
                true
            }
            None => false,
        }
    }

    fn is_live(&self, entry: &Entry) -> bool {
        self.generation.get(&entry.node_id).copied() == Some(entry.generation)
    }

    /// Discards stale entries sitting at the top of the heap.
    fn compact(&mut self) {
        while let Some(Reverse(top)) = self.heap.peek() {
            if self.is_live(top) {
                break;
            }
            self.heap.pop();
        }
    }

    fn peek_fire_at(&mut self) -> Option<Timestamp> {
        self.compact();
        self.heap.peek().map(|Reverse(entry)| entry.fire_at)
    }

    fn drain_due(&mut self, now: Timestamp) -> Vec<Entry> {
        let mut due = Vec::new();
        loop {
            self.compact();
            let is_due = matches!(self.heap.peek(), Some(Reverse(entry)) if entry.fire_at <= now);
            if !is_due {
                break;
            }
            if let Some(Reverse(entry)) = self.heap.pop() {
                due.push(entry);
            }
        }
        due
    }
}

/// The timer and loop-tick priority queues for a single room's graph
/// runtime.
#[derive(Debug, Default)]
pub struct Scheduler {
    timers: Queue,
    loops: Queue,
    next_seq: u64,
}

impl Scheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Schedules a timer for `node_id` to fire at `fire_at`. Re-scheduling
    /// a node that already has a pending timer tombstones the old one.
    pub fn schedule_timer(&mut self, node_id: NodeId, fire_at: Timestamp) {
        let seq = self.next_seq();
        self.timers.schedule(node_id, fire_at, seq);
    }

    /// Cancels any pending timer for `node_id`. Returns `true` if one was
    /// active. A cancellation racing a fire that's already been popped by
    /// [`Scheduler::pop_due`] has no effect; the caller is expected to
    /// re-check node state before acting on a fire for exactly this
    /// reason.
    pub fn cancel_timer(&mut self, node_id: &NodeId) -> bool {
        self.timers.cancel(node_id)
    }

    /// Schedules a loop tick for `node_id` to fire at `at`. Re-scheduling
    /// tombstones any previously pending tick for the same node.
    pub fn schedule_loop_tick(&mut self, node_id: NodeId, at: Timestamp) {
        let seq = self.next_seq();
        self.loops.schedule(node_id, at, seq);
    }

    /// Cancels any pending loop tick for `node_id`. Returns `true` if one
    /// was active.
    pub fn cancel_loop(&mut self, node_id: &NodeId) -> bool {
        self.loops.cancel(node_id)
    }

    /// Returns the timestamp of the next thing due to fire, across both
    /// queues, or `None` if nothing is scheduled.
    pub fn next_wakeup(&mut self) -> Option<Timestamp> {
        let timer_wakeup = self.timers.peek_fire_at();
        let loop_wakeup = self.loops.peek_fire_at();
        match (timer_wakeup, loop_wakeup) {
            (Some(timer), Some(loop_tick)) => Some(timer.min(loop_tick)),
            (Some(timer), None) => Some(timer),
            (None, Some(loop_tick)) => Some(loop_tick),
            (None, None) => None,
        }
    }

    /// Pops every entry from both queues whose fire time is at or before
    /// `now`, in `(fire_at, insertion order)` order across both queues
    /// combined.
    pub fn pop_due(&mut self, now: Timestamp) -> Vec<Fire> {
        let mut tagged: Vec<(Entry, Fire)> = Vec::new();
        for entry in self.timers.drain_due(now) {
            let fire = Fire::TimerExpired { node_id: entry.node_id.clone() };
            tagged.push((entry, fire));
        }
        for entry in self.loops.drain_due(now) {
            let fire = Fire::LoopTick { node_id: entry.node_id.clone() };
            tagged.push((entry, fire));
        }

        tagged.sort_by(|(a, _), (b, _)| a.fire_at.cmp(&b.fire_at).then_with(|| a.seq.cmp(&b.seq)));
        tagged.into_iter().map(|(_, fire)| fire).collect()
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

    use chamber_model::NodeId;
    use chamber_model::Timestamp;
    use time::macros::datetime;

    use super::Fire;
    use super::Scheduler;

    fn at(second: u8) -> Timestamp {
        match second {
            0 => Timestamp::new(datetime!(2026-08-01 12:00:00 UTC)),
            5 => Timestamp::new(datetime!(2026-08-01 12:00:05 UTC)),
            10 => Timestamp::new(datetime!(2026-08-01 12:00:10 UTC)),
            _ => Timestamp::new(datetime!(2026-08-01 12:00:20 UTC)),
        }
    }

    #[test]
    fn next_wakeup_is_the_earlier_of_both_queues() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_timer(NodeId::new("timer-a"), at(10));
        scheduler.schedule_loop_tick(NodeId::new("loop-a"), at(5));
        assert_eq!(scheduler.next_wakeup(), Some(at(5)));
    }

    #[test]
    fn pop_due_only_returns_entries_at_or_before_now() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_timer(NodeId::new("timer-a"), at(5));
        scheduler.schedule_timer(NodeId::new("timer-b"), at(10));
        let due = scheduler.pop_due(at(5));
        assert_eq!(due.len(), 1);
        assert!(matches!(&due[0], Fire::TimerExpired { node_id } if node_id.as_str() == "timer-a"));
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut scheduler = Scheduler::new();
        let node = NodeId::new("timer-a");
        scheduler.schedule_timer(node.clone(), at(5));
        assert!(scheduler.cancel_timer(&node));
        let due = scheduler.pop_due(at(10));
        assert!(due.is_empty());
    }

    #[test]
    fn cancel_of_unknown_node_is_a_harmless_no_op() {
        let mut scheduler = Scheduler::new();
        assert!(!scheduler.cancel_timer(&NodeId::new("ghost")));
    }

    #[test]
    fn rescheduling_a_node_tombstones_the_earlier_entry() {
        let mut scheduler = Scheduler::new();
        let node = NodeId::new("loop-a");
        scheduler.schedule_loop_tick(node.clone(), at(5));
        scheduler.schedule_loop_tick(node.clone(), at(10));
        let due_early = scheduler.pop_due(at(5));
        assert!(due_early.is_empty());
        let due_late = scheduler.pop_due(at(10));
        assert_eq!(due_late.len(), 1);
    }

    #[test]
    fn ties_break_by_insertion_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_timer(NodeId::new("first"), at(5));
        scheduler.schedule_timer(NodeId::new("second"), at(5));
        let due = scheduler.pop_due(at(5));
        assert_eq!(due.len(), 2);
        assert!(matches!(&due[0], Fire::TimerExpired { node_id } if node_id.as_str() == "first"));
        assert!(matches!(&due[1], Fire::TimerExpired { node_id } if node_id.as_str() == "second"));
    }
}
