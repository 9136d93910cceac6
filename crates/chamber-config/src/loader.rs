// crates/chamber-config/src/loader.rs
// ============================================================================
// Module: File loaders
// Description: The only file-opening code in this crate: reads a manifest
//              or device contract document off disk.
// Purpose: Keep disk I/O confined to one thin seam, used only by
//          `chamber-cli`; every other crate receives already-parsed values.
// Dependencies: chamber-model, std::fs
// ============================================================================

use std::fs;
use std::path::Path;

use crate::device_contract::DeviceContractConfig;
use crate::error::FatalError;
use crate::manifest::RoomManifest;

/// Reads and validates a room manifest from `path`.
///
/// # Errors
///
/// Returns [`FatalError::Io`] if the file cannot be read, or any error
/// [`RoomManifest::from_toml_str`] returns for a malformed or invalid
/// document.
pub fn load_manifest(path: &Path) -> Result<RoomManifest, FatalError> {
    let source = read_to_string(path)?;
    RoomManifest::from_toml_str(&source).map_err(|error| with_path(error, path))
}

/// Reads and validates a device contract document from `path`.
///
/// # Errors
///
/// Returns [`FatalError::Io`] if the file cannot be read, or any error
/// [`DeviceContractConfig::from_toml_str`] returns for a malformed
/// document.
pub fn load_device_contract(path: &Path) -> Result<DeviceContractConfig, FatalError> {
    let source = read_to_string(path)?;
    DeviceContractConfig::from_toml_str(&source).map_err(|error| with_path(error, path))
}

fn read_to_string(path: &Path) -> Result<String, FatalError> {
    fs::read_to_string(path).map_err(|source| FatalError::Io { path: path.display().to_string(), source })
}

/// Rewrites a `Parse` error's placeholder path to the real file path, so
/// the diagnostic names the document the operator actually pointed at.
fn with_path(error: FatalError, path: &Path) -> FatalError {
    match error {
        FatalError::Parse { source, .. } => FatalError::Parse { path: path.display().to_string(), source },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "test assertions favor unwrap")]

    use std::io::Write as _;

    use tempfile::NamedTempFile;

    use super::load_manifest;

    #[test]
    fn loads_a_manifest_from_disk() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            schema_version = "1"
            room_id = "room-01"

            [graph]
            [[graph.scenes]]
            id = "scene-1"
            [graph.scenes.graph]
            entry = "start"
            edges = []
            [graph.scenes.graph.nodes.start]
            kind = "scene_entry"
            "#
        )
        .unwrap();
        let manifest = load_manifest(file.path()).unwrap();
        assert_eq!(manifest.room_id.as_str(), "room-01");
    }

    #[test]
    fn reports_a_missing_file_as_io_error() {
        let error = load_manifest(std::path::Path::new("/nonexistent/room.toml")).unwrap_err();
        assert!(matches!(error, super::FatalError::Io { .. }));
    }
}
