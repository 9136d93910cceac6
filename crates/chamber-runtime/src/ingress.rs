// crates/chamber-runtime/src/ingress.rs
// ============================================================================
// Module: Ingress adapter trait
// Description: The trait surface any event source (broker, HTTP, CLI) uses
//              to feed the coordinator's queue.
// Purpose: Decouple the coordinator's main loop from the specific transport
//          an adapter uses, matching the way the graph runtime never
//          depends on how a condition-context field arrived either.
// Dependencies: chamber-model, tokio (sync)
// ============================================================================

//! ## Overview
//! An [`IngressAdapter`] is anything that can turn external activity into a
//! [`NewEvent`] draft and hand it to the coordinator. `chamber-broker`
//! implements this trait over an MQTT-shaped topic scheme; a test harness
//! can implement it directly over a channel.
//!
//! Backpressure is the adapter's problem, not the coordinator's: `publish`
//! takes a bounded timeout and the adapter is expected to drop the event
//! and emit its own `device.error` if the queue stays full that long. The
//! scheduler's path into the queue is exempt from this and always succeeds
//! synchronously, since timers and loop ticks must never silently vanish.

use std::time::Duration;

use chamber_model::NewEvent;
use thiserror::Error;
use tokio::sync::mpsc;

/// Failure handing an event to the coordinator's queue.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The queue stayed full for the adapter's entire send timeout; the
    /// event was dropped.
    #[error("event queue full, dropped after waiting")]
    Backpressure,
    /// The coordinator has shut down and is no longer receiving events.
    #[error("coordinator queue is closed")]
    Closed,
}

/// A source of externally-triggered events: device input, operator
/// commands, or anything else arriving from outside the graph runtime
/// itself.
#[async_trait::async_trait]
pub trait IngressAdapter: Send + Sync {
    /// A short, stable label used in logs to identify which adapter
    /// produced an event.
    fn name(&self) -> &str;

    /// Publishes `draft` to the coordinator, waiting up to `timeout` for
    /// queue space.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Backpressure`] if the queue is still full
    /// after `timeout`, or [`QueueError::Closed`] if the coordinator has
    /// shut down.
    async fn publish(
        &self,
        sender: &mpsc::Sender<NewEvent>,
        draft: NewEvent,
        timeout: Duration,
    ) -> Result<(), QueueError> {
        match sender.send_timeout(draft, timeout).await {
            Ok(()) => Ok(()),
            Err(mpsc::error::SendTimeoutError::Timeout(_)) => Err(QueueError::Backpressure),
            Err(mpsc::error::SendTimeoutError::Closed(_)) => Err(QueueError::Closed),
        }
    }
}
