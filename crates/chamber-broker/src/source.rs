// crates/chamber-broker/src/source.rs
// ============================================================================
// Module: MQTT-shaped ingress source
// Description: The reference `IngressAdapter`: decodes the room's three
//              inbound topic shapes and publishes the resulting events to
//              the coordinator's queue.
// Purpose: Give `chamber-cli` a ready-to-wire adapter without inventing a
//          new transport; any real broker client calls `on_message` for
//          every message it receives.
// Dependencies: chamber-devices, chamber-model, chamber-runtime, tokio
// ============================================================================

//! ## Overview
//! [`MqttSource`] owns the [`chamber_devices::DeviceRegistry`] for its room
//! and the [`TopicTable`] tracking which topics are currently subscribed.
//! It never touches [`chamber_runtime::GraphRuntime`] directly: a
//! registration success becomes a `device.connected` event, a device event
//! becomes a `device.input` event, an operator command becomes the
//! matching `operator.*` event, and all three are handed to the
//! coordinator exactly like any other [`chamber_runtime::IngressAdapter`]
//! would.

use std::time::Duration;

use chamber_devices::DeviceConnected;
use chamber_devices::DeviceRegistry;
use chamber_model::FieldValue;
use chamber_model::NewEvent;
use chamber_model::RoomId;
use chamber_model::Severity;
use chamber_model::Timestamp;
use chamber_runtime::IngressAdapter;
use tokio::sync::Mutex;
use tokio::sync::mpsc;

use crate::error::BrokerError;
use crate::payload;
use crate::topic::OPERATOR_COMMAND_TOPIC;
use crate::topic::TopicTable;
use crate::topic::parse_registration_topic;

/// The reference broker-backed ingress adapter for one room.
pub struct MqttSource {
    room_id: RoomId,
    sender: mpsc::Sender<NewEvent>,
    send_timeout: Duration,
    registry: Mutex<DeviceRegistry>,
    topics: Mutex<TopicTable>,
}

impl MqttSource {
    /// Creates a source for `room_id`, enforcing `registry`'s device
    /// contract, publishing onto `sender` with `send_timeout` as its
    /// backpressure budget.
    #[must_use]
    pub fn new(room_id: RoomId, sender: mpsc::Sender<NewEvent>, send_timeout: Duration, registry: DeviceRegistry) -> Self {
        Self { room_id, sender, send_timeout, registry: Mutex::new(registry), topics: Mutex::new(TopicTable::new()) }
    }

    /// Returns the topics currently subscribed, for a broker client's own
    /// subscribe-on-connect bootstrap.
    pub async fn subscribed_topics(&self) -> Vec<String> {
        let topics = self.topics.lock().await;
        let mut names: Vec<String> = vec![
            crate::topic::REGISTRATION_PREFIX.trim_end_matches('/').to_owned(),
            OPERATOR_COMMAND_TOPIC.to_owned(),
        ];
        names.extend(topics.event_topics_snapshot());
        names
    }

    /// Routes one raw broker message by its topic shape.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError`] if the topic is unrecognized, the payload
    /// fails to decode, or the queue rejects the resulting event; the
    /// caller is expected to log and continue rather than treat this as
    /// fatal.
    pub async fn on_message(&self, topic: &str, bytes: &[u8]) -> Result<(), BrokerError> {
        if let Some(controller_id) = parse_registration_topic(topic) {
            return self.on_registration(topic, controller_id, bytes).await;
        }
        if topic == OPERATOR_COMMAND_TOPIC {
            return self.on_operator_command(bytes).await;
        }
        let logical_id = {
            let topics = self.topics.lock().await;
            topics.resolve_event_topic(topic).cloned()
        };
        match logical_id {
            Some(logical_id) => self.on_device_event(topic, &logical_id, bytes).await,
            None => Err(BrokerError::UnknownTopic(topic.to_owned())),
        }
    }

    async fn on_registration(
        &self,
        topic: &str,
        controller_id: chamber_model::ControllerId,
        bytes: &[u8],
    ) -> Result<(), BrokerError> {
        let payload = payload::decode_registration(topic, controller_id.clone(), bytes)?;
        let owned_topics: Vec<(chamber_model::LogicalDeviceId, String)> =
            payload.devices.iter().map(|device| (device.logical_id.clone(), device.event_topic.clone())).collect();

        let outcome = {
            let mut registry = self.registry.lock().await;
            registry.register(payload, Timestamp::now())
        };

        match outcome {
            Ok(connected) => {
                self.topics.lock().await.rebuild_for_controller(controller_id, owned_topics);
                for device in connected {
                    self.emit(connected_event(&self.room_id, &device)).await?;
                }
                Ok(())
            }
            Err(error) => {
                self.emit(
                    NewEvent::new(self.room_id.clone(), "device.error", Severity::Error)
                        .with_message(error.to_string()),
                )
                .await?;
                Err(BrokerError::from(error))
            }
        }
    }

    async fn on_device_event(
        &self,
        topic: &str,
        logical_id: &chamber_model::LogicalDeviceId,
        bytes: &[u8],
    ) -> Result<(), BrokerError> {
        let wire = payload::decode_device_event(topic, bytes)?;
        let draft = NewEvent::new(self.room_id.clone(), "device.input", Severity::Info)
            .with_field("logical_id", FieldValue::Text(logical_id.as_str().to_owned()))
            .with_field("signal", FieldValue::Text(wire.signal))
            .with_field("value", payload::field_value_from_json(wire.value));
        self.emit(draft).await
    }

    async fn on_operator_command(&self, bytes: &[u8]) -> Result<(), BrokerError> {
        let command = payload::decode_operator_command(bytes)?;
        if matches!(command, payload::OperatorCommandWire::StartGame { .. }) {
            let readiness = self.registry.lock().await.readiness();
            if !readiness.is_ready() {
                return self
                    .emit(
                        NewEvent::new(self.room_id.clone(), "system.error", Severity::Error)
                            .with_message(format!("room not ready: missing devices {:?}", readiness.missing)),
                    )
                    .await;
            }
        }
        self.emit(operator_event(&self.room_id, command)?).await
    }

    /// Ticks the controller heartbeat monitor, emitting `device.disconnected`
    /// for every device owned by a controller that has gone quiet for longer
    /// than `heartbeat_interval * tolerance`. A caller drives this on a fixed
    /// interval; it is not triggered by any inbound message.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Queue`] if the coordinator's queue rejects an
    /// emitted event.
    pub async fn check_liveness(&self, now: Timestamp) -> Result<(), BrokerError> {
        let timed_out = self.registry.lock().await.check_liveness(now);
        for controller in timed_out {
            for logical_id in &controller.devices {
                self.emit(
                    NewEvent::new(self.room_id.clone(), "device.disconnected", Severity::Warning)
                        .with_field("logical_id", FieldValue::Text(logical_id.as_str().to_owned()))
                        .with_field("controller_id", FieldValue::Text(controller.controller_id.as_str().to_owned()))
                        .with_message(format!(
                            "controller {} last seen {:?}, timeout {:?}",
                            controller.controller_id.as_str(),
                            controller.last_seen,
                            controller.timeout
                        )),
                )
                .await?;
            }
        }
        Ok(())
    }

    async fn emit(&self, draft: NewEvent) -> Result<(), BrokerError> {
        self.publish(&self.sender, draft, self.send_timeout).await.map_err(BrokerError::from)
    }
}

#[async_trait::async_trait]
impl IngressAdapter for MqttSource {
    fn name(&self) -> &str {
        "mqtt"
    }
}

fn connected_event(room_id: &RoomId, device: &DeviceConnected) -> NewEvent {
    NewEvent::new(room_id.clone(), "device.connected", Severity::Info)
        .with_field("logical_id", FieldValue::Text(device.logical_id.as_str().to_owned()))
        .with_field("reconnect", FieldValue::Bool(device.reconnect))
}

fn operator_event(room_id: &RoomId, command: payload::OperatorCommandWire) -> Result<NewEvent, BrokerError> {
    use payload::OperatorCommandWire as Wire;
    let event = match command {
        Wire::StartGame { scene_id } => {
            let mut draft = NewEvent::new(room_id.clone(), "operator.start_game", Severity::Info);
            if let Some(scene_id) = scene_id {
                draft = draft.with_field("scene_id", FieldValue::Text(scene_id));
            }
            draft
        }
        Wire::StopGame => NewEvent::new(room_id.clone(), "operator.stop_game", Severity::Info),
        Wire::Pause => NewEvent::new(room_id.clone(), "operator.pause", Severity::Info),
        Wire::Resume => NewEvent::new(room_id.clone(), "operator.resume", Severity::Info),
        Wire::Override { node_id } => non_empty_node_event(room_id, "operator.override", node_id)?,
        Wire::Reset { node_id } => non_empty_node_event(room_id, "operator.reset", node_id)?,
        Wire::Jump { node_id } => non_empty_node_event(room_id, "operator.jump", node_id)?,
    };
    Ok(event)
}

fn non_empty_node_event(room_id: &RoomId, name: &str, node_id: String) -> Result<NewEvent, BrokerError> {
    if node_id.is_empty() {
        return Err(BrokerError::InvalidCommand(format!("{name} requires a non-empty node_id")));
    }
    Ok(NewEvent::new(room_id.clone(), name, Severity::Info).with_field("node_id", FieldValue::Text(node_id)))
}
