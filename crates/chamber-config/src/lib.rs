// crates/chamber-config/src/lib.rs
// ============================================================================
// Module: Chamber Config
// Description: Crate root; re-exports the room manifest, device contract
//              config, and the disk loaders `chamber-cli` uses to read them.
// Purpose: Give every other crate already-parsed, already-validated
//          configuration values without any of them opening a file.
// Dependencies: see Cargo.toml
// ============================================================================

//! ## Overview
//! `chamber-config` defines [`manifest::RoomManifest`] and
//! [`device_contract::DeviceContractConfig`], the two typed documents a room
//! process needs. Both validate their own structural invariants on parse —
//! a bad manifest never reaches `chamber-runtime`. Disk access is confined
//! to [`loader`], used only by `chamber-cli`.

/// The on-disk shape of a room's required device set.
pub mod device_contract;
/// The error taxonomy for loading and validating room config.
pub mod error;
/// File loaders: reads a manifest or device contract document off disk.
pub mod loader;
pub mod manifest;

pub use device_contract::DeviceContractConfig;
pub use error::FatalError;
pub use loader::load_device_contract;
pub use loader::load_manifest;
pub use manifest::RoomManifest;
pub use manifest::SUPPORTED_SCHEMA_VERSION;
