// crates/chamber-broadcast/src/lib.rs
// ============================================================================
// Module: Chamber Broadcast
// Description: Ring buffer and non-blocking fan-out broadcaster.
// Purpose: Shared plumbing for every "tail this stream" feature in Chamber
//          — the event log, the read-model projector, and any future
//          live view.
// Dependencies: tokio (sync)
// ============================================================================

//! ## Overview
//! Two small pieces meant to be composed, not a framework:
//!
//! - [`RingBuffer`] is plain data, no concurrency.
//! - [`Broadcaster`] wraps one in a [`std::sync::Mutex`] and pairs it with
//!   a [`tokio::sync::broadcast`] channel so publishing is cheap and
//!   subscribing always starts from a consistent recent snapshot.

/// Non-blocking fan-out broadcaster built on a ring buffer snapshot.
pub mod broadcaster;
/// A fixed-capacity circular buffer that drops its oldest element once full.
pub mod ring;

pub use broadcaster::BroadcastError;
pub use broadcaster::Broadcaster;
pub use broadcaster::Subscription;
pub use ring::RingBuffer;
