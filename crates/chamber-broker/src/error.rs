// crates/chamber-broker/src/error.rs
// ============================================================================
// Module: Broker errors
// Description: The error taxonomy for decoding broker traffic.
// Purpose: Let the ingress adapter distinguish a malformed payload (emit
//          `device.error` and move on) from a transport failure.
// Dependencies: chamber-devices, serde_json, thiserror
// ============================================================================

use thiserror::Error;

/// Failure decoding or routing a message received from the broker.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// A topic did not match any recognized shape (registration, a known
    /// device's event topic, or the operator command topic).
    #[error("unrecognized topic: {0}")]
    UnknownTopic(String),

    /// A payload failed to parse as the JSON shape expected for its topic.
    #[error("malformed payload on {topic}: {source}")]
    MalformedPayload {
        /// The topic the payload arrived on.
        topic: String,
        /// The underlying decode failure.
        #[source]
        source: serde_json::Error,
    },

    /// An operator command named a field that could not be decoded to its
    /// expected type (e.g. an empty `node_id`).
    #[error("invalid operator command: {0}")]
    InvalidCommand(String),

    /// The device registry rejected a registration payload.
    #[error("registration rejected: {0}")]
    Registration(#[from] chamber_devices::DeviceError),

    /// The coordinator's queue could not accept the decoded event.
    #[error("failed to enqueue decoded event: {0}")]
    Queue(#[from] chamber_runtime::QueueError),
}
