// crates/chamber-devices/src/error.rs
// ============================================================================
// Module: Device errors
// Description: Failure modes of registration, heartbeat, and command
//              validation.
// Purpose: Give callers enough structure to emit the right `device.error` /
//          `device.disconnected` event without re-deriving the reason.
// Dependencies: chamber-model, thiserror
// ============================================================================

use chamber_model::ControllerId;
use chamber_model::LogicalDeviceId;
use chamber_model::SchemaVersion;
use thiserror::Error;

use crate::registry::RegistrationReport;

/// A failure observed by the device registry.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The registration payload's schema version does not match the
    /// contract's expected version.
    #[error("registration payload version {found} does not match expected version {expected}")]
    VersionMismatch {
        /// The version the contract expects.
        expected: SchemaVersion,
        /// The version the payload actually carried.
        found: SchemaVersion,
    },
    /// The registration payload carried an empty controller id.
    #[error("registration payload has an empty controller id")]
    EmptyControllerId,
    /// One or more advertised devices failed contract validation; prior
    /// state was left unchanged.
    #[error("device contract violated: {0}")]
    ContractViolation(RegistrationReport),
    /// A command targeted a logical device the registry has never seen.
    #[error("unknown logical device {0}")]
    UnknownDevice(LogicalDeviceId),
    /// A heartbeat or lookup named a controller the registry has never seen.
    #[error("unknown controller {0}")]
    UnknownController(ControllerId),
    /// A command targeted an output signal the device never advertised.
    #[error("device {device} has no output signal {signal}")]
    UnsupportedOutputSignal {
        /// The targeted device.
        device: LogicalDeviceId,
        /// The requested, unsupported signal.
        signal: String,
    },
    /// A command targeted a device with no advertised command topic.
    #[error("device {0} has no command topic")]
    NoCommandTopic(LogicalDeviceId),
}
