// crates/chamber-devices/src/registry.rs
// ============================================================================
// Module: Device registry
// Description: Validates controller registration payloads against a device
//              contract, tracks controller liveness, and answers command
//              dispatch validation queries.
// Purpose: Give the graph runtime a single authority on "what devices exist
//          and are they reachable right now", independent of the broker
//          transport that delivered the registration.
// Dependencies: chamber-model, tracing
// ============================================================================

//! ## Overview
//! [`DeviceRegistry::register`] implements the four-step algorithm a
//! controller registration payload goes through: reject malformed payloads
//! outright, validate every advertised device against the contract
//! accumulating a [`RegistrationReport`] rather than failing on the first
//! mismatch, then either upsert state and report which devices reconnected
//! or leave state untouched entirely. A contract violation never partially
//! applies.
//!
//! [`DeviceRegistry::check_liveness`] is the other half: a caller ticks it
//! on a fixed interval and gets back the controllers that have gone quiet
//! for longer than their heartbeat interval allows.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use chamber_model::ControllerId;
use chamber_model::ControllerState;
use chamber_model::LogicalDevice;
use chamber_model::LogicalDeviceId;
use chamber_model::RoomReadiness;
use chamber_model::SchemaVersion;
use chamber_model::Timestamp;

use crate::contract::DeviceContract;
use crate::error::DeviceError;

/// The minimum heartbeat tolerance multiplier the registry will ever honor,
/// regardless of what a controller or operator requests.
pub const MIN_HEARTBEAT_TOLERANCE: f64 = 2.0;

/// One advertised device inside a registration payload.
#[derive(Debug, Clone)]
pub struct AdvertisedDevice {
    /// Logical device identifier.
    pub logical_id: LogicalDeviceId,
    /// Declared device type.
    pub device_type: String,
    /// Advertised capabilities.
    pub capabilities: BTreeSet<String>,
    /// Advertised input signal names.
    pub input_signals: BTreeSet<String>,
    /// Advertised output signal names.
    pub output_signals: BTreeSet<String>,
    /// Broker topic commands should be published to.
    pub command_topic: String,
    /// Broker topic input events arrive on.
    pub event_topic: String,
}

/// A controller registration payload as decoded off the broker.
#[derive(Debug, Clone)]
pub struct RegistrationPayload {
    /// Schema version the controller was built against.
    pub version: SchemaVersion,
    /// The registering controller's identifier.
    pub controller_id: ControllerId,
    /// Advertised heartbeat interval.
    pub heartbeat_interval: Duration,
    /// Every device this controller advertises.
    pub devices: Vec<AdvertisedDevice>,
}

/// Accumulated validation findings from a single registration attempt.
///
/// Errors make the whole registration fail; warnings (unrecognized, not
/// required, devices) do not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationReport {
    /// Reasons the registration was rejected.
    pub errors: Vec<String>,
    /// Non-fatal observations, e.g. advertised devices the contract does
    /// not require.
    pub warnings: Vec<String>,
}

impl RegistrationReport {
    /// Returns `true` if no errors were accumulated.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for RegistrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.errors.join("; "))
    }
}

/// One device that was connected (freshly or again) by a successful
/// registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConnected {
    /// The device that connected.
    pub logical_id: LogicalDeviceId,
    /// `true` if this device's controller was previously disconnected.
    pub reconnect: bool,
}

/// One controller (and its devices) the liveness check found to have gone
/// quiet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerTimedOut {
    /// The controller that timed out.
    pub controller_id: ControllerId,
    /// Devices advertised by that controller, now considered disconnected.
    pub devices: Vec<LogicalDeviceId>,
    /// The last time this controller was seen.
    pub last_seen: Timestamp,
    /// The timeout that was exceeded (`heartbeat_interval * tolerance`).
    pub timeout: Duration,
}

/// Tracks registered controllers and the logical devices they advertise.
pub struct DeviceRegistry {
    contract: DeviceContract,
    controllers: BTreeMap<ControllerId, ControllerState>,
    devices: BTreeMap<LogicalDeviceId, LogicalDevice>,
    tolerance: f64,
}

impl DeviceRegistry {
    /// Creates a registry enforcing `contract`, with a heartbeat tolerance
    /// multiplier clamped to at least [`MIN_HEARTBEAT_TOLERANCE`].
    #[must_use]
    pub fn new(contract: DeviceContract, tolerance: f64) -> Self {
        Self {
            contract,
            controllers: BTreeMap::new(),
            devices: BTreeMap::new(),
            tolerance: tolerance.max(MIN_HEARTBEAT_TOLERANCE),
        }
    }

    /// Validates and applies a registration payload.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::VersionMismatch`] or
    /// [`DeviceError::EmptyControllerId`] for malformed payloads, or
    /// [`DeviceError::ContractViolation`] if any advertised device fails
    /// contract validation. In every error case, prior registry state is
    /// left unchanged.
    pub fn register(
        &mut self,
        payload: RegistrationPayload,
        now: Timestamp,
    ) -> Result<Vec<DeviceConnected>, DeviceError> {
        if payload.version != self.contract.expected_version {
            return Err(DeviceError::VersionMismatch {
                expected: self.contract.expected_version.clone(),
                found: payload.version,
            });
        }
        if payload.controller_id.as_str().is_empty() {
            return Err(DeviceError::EmptyControllerId);
        }

        let report = self.validate_against_contract(&payload);
        if !report.is_valid() {
            return Err(DeviceError::ContractViolation(report));
        }

        let was_connected = self
            .controllers
            .get(&payload.controller_id)
            .is_some_and(|controller| controller.connected);

        let advertised_ids: BTreeSet<LogicalDeviceId> =
            payload.devices.iter().map(|device| device.logical_id.clone()).collect();

        self.controllers.insert(
            payload.controller_id.clone(),
            ControllerState {
                controller_id: payload.controller_id.clone(),
                last_seen: now,
                heartbeat_interval: payload.heartbeat_interval,
                advertised_devices: advertised_ids,
                connected: true,
            },
        );

        let mut connected = Vec::with_capacity(payload.devices.len());
        for device in payload.devices {
            let reconnect = !was_connected && self.devices.contains_key(&device.logical_id);
            self.devices.insert(
                device.logical_id.clone(),
                LogicalDevice {
                    controller_id: payload.controller_id.clone(),
                    device_type: device.device_type,
                    capabilities: device.capabilities,
                    input_signals: device.input_signals,
                    output_signals: device.output_signals,
                    command_topic: device.command_topic,
                    event_topic: device.event_topic,
                },
            );
            connected.push(DeviceConnected { logical_id: device.logical_id, reconnect });
        }
        Ok(connected)
    }

    fn validate_against_contract(&self, payload: &RegistrationPayload) -> RegistrationReport {
        let mut report = RegistrationReport::default();
        let advertised: BTreeMap<&LogicalDeviceId, &AdvertisedDevice> =
            payload.devices.iter().map(|device| (&device.logical_id, device)).collect();

        for requirement in &self.contract.requirements {
            let Some(device) = advertised.get(&requirement.logical_id) else {
                report.errors.push(format!("required device {} was not advertised", requirement.logical_id));
                continue;
            };
            if device.device_type != requirement.device_type {
                report.errors.push(format!(
                    "device {} declared type {}, contract requires {}",
                    requirement.logical_id, device.device_type, requirement.device_type
                ));
            }
            let missing_capabilities: Vec<&String> =
                requirement.required_capabilities.difference(&device.capabilities).collect();
            if !missing_capabilities.is_empty() {
                report.errors.push(format!(
                    "device {} is missing required capabilities: {:?}",
                    requirement.logical_id, missing_capabilities
                ));
            }
        }

        for device in &payload.devices {
            if self.contract.requirement(&device.logical_id).is_none() {
                report.warnings.push(format!("device {} is not required by the contract", device.logical_id));
            }
        }

        report
    }

    /// Records a heartbeat for `controller_id`, refreshing `last_seen`.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::UnknownController`] if no registration has
    /// ever been accepted for this controller.
    pub fn record_heartbeat(&mut self, controller_id: &ControllerId, now: Timestamp) -> Result<(), DeviceError> {
        let controller = self
            .controllers
            .get_mut(controller_id)
            .ok_or_else(|| DeviceError::UnknownController(controller_id.clone()))?;
        controller.last_seen = now;
        controller.connected = true;
        Ok(())
    }

    /// Marks every controller that has gone quiet for longer than
    /// `heartbeat_interval * tolerance` as disconnected, returning each
    /// timed-out controller and the devices it advertised.
    pub fn check_liveness(&mut self, now: Timestamp) -> Vec<ControllerTimedOut> {
        let mut timed_out = Vec::new();
        for controller in self.controllers.values_mut() {
            if !controller.connected {
                continue;
            }
            let elapsed = now.saturating_since(controller.last_seen);
            let tolerance_secs = controller.heartbeat_interval.as_secs_f64() * self.tolerance;
            #[allow(
                clippy::cast_sign_loss,
                reason = "tolerance is clamped non-negative in `new`, and heartbeat_interval is always non-negative"
            )]
            let timeout = Duration::from_secs_f64(tolerance_secs.max(0.0));
            if elapsed > timeout {
                controller.connected = false;
                timed_out.push(ControllerTimedOut {
                    controller_id: controller.controller_id.clone(),
                    devices: controller.advertised_devices.iter().cloned().collect(),
                    last_seen: controller.last_seen,
                    timeout,
                });
            }
        }
        timed_out
    }

    /// Validates that a command may be dispatched to `logical_id` over
    /// `signal`, returning the device's command topic on success.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::UnknownDevice`] if the device has never
    /// registered, [`DeviceError::NoCommandTopic`] if it has no command
    /// topic configured, or [`DeviceError::UnsupportedOutputSignal`] if
    /// `signal` is not among its advertised outputs.
    pub fn validate_command(&self, logical_id: &LogicalDeviceId, signal: &str) -> Result<&str, DeviceError> {
        let device =
            self.devices.get(logical_id).ok_or_else(|| DeviceError::UnknownDevice(logical_id.clone()))?;
        if device.command_topic.is_empty() {
            return Err(DeviceError::NoCommandTopic(logical_id.clone()));
        }
        if !device.output_signals.contains(signal) {
            return Err(DeviceError::UnsupportedOutputSignal {
                device: logical_id.clone(),
                signal: signal.to_string(),
            });
        }
        Ok(device.command_topic.as_str())
    }

    /// Derives room readiness: every contract-required device must be
    /// present in the registry and belong to a connected controller.
    #[must_use]
    pub fn readiness(&self) -> RoomReadiness {
        let mut missing = Vec::new();
        for requirement in &self.contract.requirements {
            let connected = self.devices.get(&requirement.logical_id).is_some_and(|device| {
                self.controllers.get(&device.controller_id).is_some_and(|controller| controller.connected)
            });
            if !connected {
                missing.push(requirement.logical_id.clone());
            }
        }
        RoomReadiness { missing }
    }

    /// Returns the current state of `logical_id`, if it has ever
    /// registered.
    #[must_use]
    pub fn device(&self, logical_id: &LogicalDeviceId) -> Option<&LogicalDevice> {
        self.devices.get(logical_id)
    }

    /// Returns the current state of `controller_id`, if it has ever
    /// registered.
    #[must_use]
    pub fn controller(&self, controller_id: &ControllerId) -> Option<&ControllerState> {
        self.controllers.get(controller_id)
    }
}
