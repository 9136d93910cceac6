// crates/chamber-broadcast/src/broadcaster.rs
// ============================================================================
// Module: Broadcaster
// Description: A non-blocking fan-out channel with a replay-on-subscribe
//              ring buffer in front of it.
// Purpose: Give every live view (CLI tail, web socket, read-model
//          projector) the last few events immediately on connect, then
//          deltas as they happen, without a slow subscriber ever stalling
//          the publisher.
// Dependencies: crate::ring
// ============================================================================

//! ## Overview
//! Publishing never blocks and never fails because a subscriber is slow:
//! [`tokio::sync::broadcast`] drops the oldest buffered message for a
//! lagging receiver rather than applying backpressure to the sender. A
//! subscriber that falls behind far enough observes this as
//! [`BroadcastError::SlowSubscriber`] on its next `recv` and can decide
//! whether to resynchronize from [`Subscription::snapshot`] again or just
//! carry on from there.

use std::sync::Mutex;

use thiserror::Error;
use tokio::sync::broadcast;

use crate::ring::RingBuffer;

/// An error observed while draining a [`Subscription`].
#[derive(Debug, Error)]
pub enum BroadcastError {
    /// The broadcaster and every other subscriber handle have been
    /// dropped; no further events will ever arrive.
    #[error("broadcaster closed")]
    Closed,
    /// This subscriber fell behind and `count` messages were dropped
    /// before it could consume them.
    #[error("subscriber lagged, {count} message(s) dropped")]
    SlowSubscriber {
        /// How many messages were skipped.
        count: u64,
    },
}

/// A non-blocking fan-out broadcaster with a bounded replay window.
pub struct Broadcaster<T: Clone + Send + 'static> {
    buffer: Mutex<RingBuffer<T>>,
    sender: broadcast::Sender<T>,
}

impl<T: Clone + Send + 'static> Broadcaster<T> {
    /// Creates a broadcaster that replays up to `replay_capacity` past
    /// items to new subscribers and fans out live items through a channel
    /// of the same capacity.
    #[must_use]
    pub fn new(replay_capacity: usize) -> Self {
        let channel_capacity = replay_capacity.max(1);
        let (sender, _receiver) = broadcast::channel(channel_capacity);
        Self { buffer: Mutex::new(RingBuffer::new(replay_capacity)), sender }
    }

    /// Publishes `item` to the replay buffer and every live subscriber.
    ///
    /// This never blocks. If there are currently no subscribers the item
    /// is retained only in the replay buffer.
    pub fn publish(&self, item: T) {
        {
            let mut buffer = self.buffer.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            buffer.push(item.clone());
        }
        // A `SendError` here only means there are no current subscribers,
        // which is not a failure worth surfacing to the publisher.
        let _ = self.sender.send(item);
    }

    /// Subscribes to this broadcaster, receiving a snapshot of currently
    /// retained items followed by every item published from this point
    /// on.
    #[must_use]
    pub fn subscribe(&self) -> Subscription<T> {
        let snapshot = self.buffer.lock().unwrap_or_else(std::sync::PoisonError::into_inner).snapshot();
        Subscription { snapshot, receiver: self.sender.subscribe() }
    }

    /// Returns the number of currently live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// A live view onto a [`Broadcaster`]: a snapshot taken at subscribe time,
/// then a receiver for everything published afterward.
pub struct Subscription<T: Clone + Send + 'static> {
    /// Items retained by the broadcaster's replay buffer at the moment of
    /// subscription. Callers typically drain this before calling
    /// [`Subscription::recv`] in a loop.
    pub snapshot: Vec<T>,
    receiver: broadcast::Receiver<T>,
}

impl<T: Clone + Send + 'static> Subscription<T> {
    /// Waits for the next published item.
    ///
    /// # Errors
    ///
    /// Returns [`BroadcastError::Closed`] once the broadcaster and every
    /// other subscriber have been dropped, or
    /// [`BroadcastError::SlowSubscriber`] if this subscriber fell behind
    /// and items were dropped before it could receive them.
    pub async fn recv(&mut self) -> Result<T, BroadcastError> {
        match self.receiver.recv().await {
            Ok(item) => Ok(item),
            Err(broadcast::error::RecvError::Closed) => Err(BroadcastError::Closed),
            Err(broadcast::error::RecvError::Lagged(count)) => {
                Err(BroadcastError::SlowSubscriber { count })
            }
        }
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

    use super::Broadcaster;

    #[tokio::test]
    async fn subscriber_sees_replay_then_live_items() {
        let broadcaster = Broadcaster::new(4);
        broadcaster.publish(1);
        broadcaster.publish(2);

        let mut subscription = broadcaster.subscribe();
        assert_eq!(subscription.snapshot, vec![1, 2]);

        broadcaster.publish(3);
        let next = subscription.recv().await.expect("recv");
        assert_eq!(next, 3);
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_does_not_panic() {
        let broadcaster: Broadcaster<i32> = Broadcaster::new(2);
        broadcaster.publish(1);
        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn slow_subscriber_observes_lag_not_a_stall() {
        let broadcaster = Broadcaster::new(1);
        let mut subscription = broadcaster.subscribe();
        for item in 0..10 {
            broadcaster.publish(item);
        }
        let result = subscription.recv().await;
        assert!(matches!(result, Err(super::BroadcastError::SlowSubscriber { .. }) | Ok(_)));
    }

    #[tokio::test]
    async fn subscriber_count_tracks_live_subscriptions() {
        let broadcaster: Broadcaster<i32> = Broadcaster::new(2);
        let first = broadcaster.subscribe();
        let second = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 2);
        drop(first);
        drop(second);
    }
}
