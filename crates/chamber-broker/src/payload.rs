// crates/chamber-broker/src/payload.rs
// ============================================================================
// Module: Wire payloads
// Description: JSON shapes received on the broker's registration, device
//              event, and operator command topics.
// Purpose: Keep the wire format's serde derives in one place, separate from
//          the decode-and-route logic in `source`.
// Dependencies: chamber-devices, chamber-model, serde, serde_json
// ============================================================================

use std::collections::BTreeSet;
use std::time::Duration;

use chamber_devices::AdvertisedDevice;
use chamber_devices::RegistrationPayload;
use chamber_model::ControllerId;
use chamber_model::FieldValue;
use chamber_model::LogicalDeviceId;
use chamber_model::SchemaVersion;
use serde::Deserialize;

use crate::error::BrokerError;

/// Wire shape of a controller registration payload.
#[derive(Debug, Deserialize)]
pub struct RegistrationWire {
    version: String,
    heartbeat_interval_secs: f64,
    #[serde(default)]
    devices: Vec<DeviceWire>,
}

#[derive(Debug, Deserialize)]
struct DeviceWire {
    logical_id: String,
    device_type: String,
    #[serde(default)]
    capabilities: BTreeSet<String>,
    #[serde(default)]
    input_signals: BTreeSet<String>,
    #[serde(default)]
    output_signals: BTreeSet<String>,
    command_topic: String,
    event_topic: String,
}

/// Decodes a registration payload received on
/// `sentient/registration/<controller_id>`. The controller id comes from
/// the topic itself, per the room protocol, not the payload body.
///
/// # Errors
///
/// Returns [`BrokerError::MalformedPayload`] if `bytes` is not valid JSON
/// for this shape.
pub fn decode_registration(
    topic: &str,
    controller_id: ControllerId,
    bytes: &[u8],
) -> Result<RegistrationPayload, BrokerError> {
    let wire: RegistrationWire =
        serde_json::from_slice(bytes).map_err(|source| BrokerError::MalformedPayload { topic: topic.to_owned(), source })?;

    let devices = wire
        .devices
        .into_iter()
        .map(|device| AdvertisedDevice {
            logical_id: LogicalDeviceId::new(device.logical_id),
            device_type: device.device_type,
            capabilities: device.capabilities,
            input_signals: device.input_signals,
            output_signals: device.output_signals,
            command_topic: device.command_topic,
            event_topic: device.event_topic,
        })
        .collect();

    Ok(RegistrationPayload {
        version: SchemaVersion::new(wire.version),
        controller_id,
        heartbeat_interval: Duration::from_secs_f64(wire.heartbeat_interval_secs.max(0.0)),
        devices,
    })
}

/// Wire shape of a device input event body, published on a device's own
/// `event_topic`.
#[derive(Debug, Deserialize)]
pub struct DeviceEventWire {
    /// The input signal name this event reports.
    pub signal: String,
    /// The reported value, any JSON scalar, list, or object.
    #[serde(default)]
    pub value: serde_json::Value,
}

/// Decodes a device event body.
///
/// # Errors
///
/// Returns [`BrokerError::MalformedPayload`] if `bytes` is not valid JSON
/// for this shape.
pub fn decode_device_event(topic: &str, bytes: &[u8]) -> Result<DeviceEventWire, BrokerError> {
    serde_json::from_slice(bytes).map_err(|source| BrokerError::MalformedPayload { topic: topic.to_owned(), source })
}

/// Converts a decoded JSON value into a [`FieldValue`], collapsing `null`
/// to an empty string since `FieldValue` has no null variant.
#[must_use]
pub fn field_value_from_json(value: serde_json::Value) -> FieldValue {
    serde_json::from_value(value).unwrap_or(FieldValue::Text(String::new()))
}

/// Wire shape of an operator command, tagged on its `command` field.
#[derive(Debug, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum OperatorCommandWire {
    /// Start the room, optionally naming a scene other than the default.
    StartGame {
        /// Scene to start, or `None` for the room's default scene.
        #[serde(default)]
        scene_id: Option<String>,
    },
    /// Stop the room unconditionally.
    StopGame,
    /// Pause progress-driving events.
    Pause,
    /// Resume from pause.
    Resume,
    /// Force a node to `overridden`.
    Override {
        /// The node to override.
        node_id: String,
    },
    /// Reset a node and re-activate it.
    Reset {
        /// The node to reset.
        node_id: String,
    },
    /// Teleport activation to a node.
    Jump {
        /// The node to jump to.
        node_id: String,
    },
}

/// Decodes an operator command body.
///
/// # Errors
///
/// Returns [`BrokerError::MalformedPayload`] if `bytes` does not match one
/// of the known command shapes.
pub fn decode_operator_command(bytes: &[u8]) -> Result<OperatorCommandWire, BrokerError> {
    serde_json::from_slice(bytes)
        .map_err(|source| BrokerError::MalformedPayload { topic: crate::topic::OPERATOR_COMMAND_TOPIC.to_owned(), source })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "test assertions favor unwrap")]

    use super::OperatorCommandWire;
    use super::decode_operator_command;
    use super::decode_registration;
    use chamber_model::ControllerId;

    #[test]
    fn decodes_a_registration_payload_with_one_device() {
        let body = br#"{
            "version": "1.0",
            "heartbeat_interval_secs": 5.0,
            "devices": [{
                "logical_id": "lock.main-door",
                "device_type": "magnetic-lock",
                "capabilities": ["latch", "sense"],
                "input_signals": ["latched"],
                "output_signals": ["unlock"],
                "command_topic": "sentient/command/lock.main-door",
                "event_topic": "sentient/event/lock.main-door"
            }]
        }"#;
        let payload =
            decode_registration("sentient/registration/controller-01", ControllerId::new("controller-01"), body)
                .unwrap();
        assert_eq!(payload.devices.len(), 1);
        assert_eq!(payload.devices[0].logical_id.as_str(), "lock.main-door");
    }

    #[test]
    fn decodes_each_operator_command_variant() {
        let start: OperatorCommandWire =
            serde_json::from_str(r#"{"command":"start-game","scene_id":"scene-1"}"#).unwrap();
        assert!(matches!(start, OperatorCommandWire::StartGame { scene_id: Some(_) }));

        let over: OperatorCommandWire = serde_json::from_str(r#"{"command":"override","node_id":"A"}"#).unwrap();
        assert!(matches!(over, OperatorCommandWire::Override { .. }));
    }

    #[test]
    fn malformed_command_payload_is_rejected() {
        let result = decode_operator_command(br#"{"command":"override"}"#);
        assert!(result.is_err());
    }
}
