// crates/chamber-broker/src/lib.rs
// ============================================================================
// Module: Chamber Broker
// Description: Crate root; re-exports the topic table, wire payload decode
//              functions, and the `MqttSource` ingress adapter.
// Purpose: Give `chamber-cli` a ready-to-wire `IngressAdapter` without
//          inventing a new transport for this room's broker.
// Dependencies: see Cargo.toml
// ============================================================================

//! ## Overview
//! `chamber-broker` is the reference implementation of
//! `chamber_runtime::IngressAdapter`. It owns nothing a real broker client
//! doesn't already have: a topic string and a payload. Everything else —
//! the actual MQTT (or any other pub/sub) connection — is `chamber-cli`'s
//! job; this crate only decodes and routes.

/// The error taxonomy for decoding broker traffic.
pub mod error;
/// JSON shapes received on the broker's registration, device event, and operator command topics.
pub mod payload;
pub mod source;
pub mod topic;

pub use error::BrokerError;
pub use source::MqttSource;
pub use topic::OPERATOR_COMMAND_TOPIC;
pub use topic::REGISTRATION_PREFIX;
pub use topic::TopicTable;
pub use topic::parse_registration_topic;
