// crates/chamber-config/src/device_contract.rs
// ============================================================================
// Module: Device contract config
// Description: The on-disk shape of a room's required device set, and its
//              conversion into `chamber_devices::DeviceContract`.
// Purpose: Keep the wire/TOML shape separate from the registry's runtime
//          type, the same separation `chamber-broker::payload` draws for
//          registration wire bodies.
// Dependencies: chamber-devices, chamber-model, serde
// ============================================================================

use std::collections::BTreeSet;

use chamber_devices::DeviceContract;
use chamber_devices::DeviceRequirement;
use chamber_model::LogicalDeviceId;
use chamber_model::SchemaVersion;
use serde::Deserialize;

use crate::error::FatalError;

/// On-disk shape of one required device entry.
#[derive(Debug, Clone, Deserialize)]
struct DeviceRequirementConfig {
    logical_id: String,
    device_type: String,
    #[serde(default)]
    required_capabilities: BTreeSet<String>,
}

/// On-disk shape of a room's device contract document.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceContractConfig {
    /// Registration payload version this contract was authored against.
    pub expected_version: SchemaVersion,
    /// Required devices.
    requirements: Vec<DeviceRequirementConfig>,
}

impl DeviceContractConfig {
    /// Parses a device contract document from TOML source.
    ///
    /// # Errors
    ///
    /// Returns [`FatalError::Parse`] on malformed TOML or
    /// [`FatalError::DuplicateRequirement`] if two entries name the same
    /// logical device.
    pub fn from_toml_str(source: &str) -> Result<Self, FatalError> {
        let config: Self =
            toml::from_str(source).map_err(|source| FatalError::Parse { path: "<device-contract>".to_owned(), source })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), FatalError> {
        let mut seen = BTreeSet::new();
        for requirement in &self.requirements {
            if !seen.insert(requirement.logical_id.clone()) {
                return Err(FatalError::DuplicateRequirement(requirement.logical_id.clone()));
            }
        }
        Ok(())
    }

    /// Converts this document into the runtime contract type the device
    /// registry validates registrations against.
    #[must_use]
    pub fn into_contract(self) -> DeviceContract {
        let requirements = self
            .requirements
            .into_iter()
            .map(|requirement| DeviceRequirement {
                logical_id: LogicalDeviceId::new(requirement.logical_id),
                device_type: requirement.device_type,
                required_capabilities: requirement.required_capabilities,
            })
            .collect();
        DeviceContract { expected_version: self.expected_version, requirements }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "test assertions favor unwrap")]

    use super::DeviceContractConfig;

    const SOURCE: &str = r#"
        expected_version = "1"

        [[requirements]]
        logical_id = "lock.main-door"
        device_type = "magnetic-lock"
        required_capabilities = ["latch"]
    "#;

    #[test]
    fn converts_into_a_runtime_contract() {
        let config = DeviceContractConfig::from_toml_str(SOURCE).unwrap();
        let contract = config.into_contract();
        assert_eq!(contract.requirements.len(), 1);
        assert_eq!(contract.requirements[0].device_type, "magnetic-lock");
    }

    #[test]
    fn rejects_a_duplicate_logical_id() {
        let duplicated = format!("{SOURCE}\n[[requirements]]\nlogical_id = \"lock.main-door\"\ndevice_type = \"x\"\n");
        let error = DeviceContractConfig::from_toml_str(&duplicated).unwrap_err();
        assert!(matches!(error, super::FatalError::DuplicateRequirement(_)));
    }
}
