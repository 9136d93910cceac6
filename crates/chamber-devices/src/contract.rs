// crates/chamber-devices/src/contract.rs
// ============================================================================
// Module: Device contract
// Description: The set of logical devices a room requires, and what each
//              must advertise to satisfy the contract.
// Purpose: Give the registry something to validate controller registration
//          payloads against, independent of how the contract was loaded.
// Dependencies: chamber-model
// ============================================================================

use std::collections::BTreeSet;

use chamber_model::LogicalDeviceId;
use chamber_model::SchemaVersion;

/// One required logical device and the shape its registration must take.
#[derive(Debug, Clone)]
pub struct DeviceRequirement {
    /// Logical device identifier, stable across controller reconnects.
    pub logical_id: LogicalDeviceId,
    /// Device type the advertising controller must declare.
    pub device_type: String,
    /// Capabilities the advertised device must be a superset of.
    pub required_capabilities: BTreeSet<String>,
}

/// The full set of devices a room requires, plus the schema version every
/// registration payload must match.
///
/// # Invariants
/// - `logical_id` is unique across `requirements`.
#[derive(Debug, Clone)]
pub struct DeviceContract {
    /// The payload version this contract was authored against.
    pub expected_version: SchemaVersion,
    /// Required devices, in the order they should be reported missing.
    pub requirements: Vec<DeviceRequirement>,
}

impl DeviceContract {
    /// Returns the requirement for `logical_id`, if any.
    #[must_use]
    pub fn requirement(&self, logical_id: &LogicalDeviceId) -> Option<&DeviceRequirement> {
        self.requirements.iter().find(|requirement| &requirement.logical_id == logical_id)
    }

    /// Returns every logical device id this contract requires.
    #[must_use]
    pub fn required_ids(&self) -> Vec<LogicalDeviceId> {
        self.requirements.iter().map(|requirement| requirement.logical_id.clone()).collect()
    }
}
