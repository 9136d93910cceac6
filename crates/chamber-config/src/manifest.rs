// crates/chamber-config/src/manifest.rs
// ============================================================================
// Module: Room manifest
// Description: The typed, already-validated configuration document a room
//              process loads to know which scene graph to run and how.
// Purpose: Carry identity and operational defaults alongside the scene
//          graph itself, and enforce the structural invariants
//          `chamber-model` documents but does not check.
// Dependencies: chamber-model, serde
// ============================================================================

//! ## Overview
//! A [`RoomManifest`] is the single document a room process needs to start:
//! its identity, the schema version it was authored against, the heartbeat
//! tolerance the device registry should use, and the scene graph itself.
//! [`RoomManifest::validate`] enforces the structural invariants
//! `chamber_model::graph` documents as "rejected by the loader" — this is
//! that loader.

use std::collections::BTreeSet;
use std::time::Duration;

use chamber_model::NodeKind;
use chamber_model::RoomGraph;
use chamber_model::RoomId;
use chamber_model::SceneGraph;
use chamber_model::SceneId;
use chamber_model::SchemaVersion;
use serde::Deserialize;

use crate::error::FatalError;

/// The schema version this build understands. A manifest declaring any
/// other version is rejected before its graph is ever inspected.
pub const SUPPORTED_SCHEMA_VERSION: &str = "1";

/// Minimum allowed heartbeat tolerance, matching
/// `chamber_devices::MIN_HEARTBEAT_TOLERANCE`.
const MIN_HEARTBEAT_TOLERANCE: f64 = 2.0;

/// The typed room manifest: identity, operational defaults, and the scene
/// graph the room runs.
#[derive(Debug, Clone, Deserialize)]
pub struct RoomManifest {
    /// Version of the manifest schema this document was authored against.
    pub schema_version: SchemaVersion,
    /// This room's identifier.
    pub room_id: RoomId,
    /// Scene to start when no `scene_id` is named on `start-game`. Defaults
    /// to the graph's first declared scene when absent.
    #[serde(default)]
    pub default_scene: Option<SceneId>,
    /// Multiplier applied to a controller's advertised heartbeat interval
    /// before it is considered timed out. Clamped up to
    /// `MIN_HEARTBEAT_TOLERANCE` if the document asks for less.
    #[serde(default = "default_heartbeat_tolerance")]
    pub heartbeat_tolerance: f64,
    /// Upper bound on how long a single room session may run before the
    /// operator is expected to intervene. Advisory: `chamber-runtime` does
    /// not itself enforce this; `chamber-cli` surfaces it to the operator.
    #[serde(default = "default_max_session", with = "duration_secs")]
    pub max_session_duration: Duration,
    /// The scene graph this room runs.
    pub graph: RoomGraph,
}

const fn default_heartbeat_tolerance() -> f64 {
    MIN_HEARTBEAT_TOLERANCE
}

const fn default_max_session() -> Duration {
    Duration::from_secs(3600)
}

mod duration_secs {
    use std::time::Duration;

    use serde::Deserialize;
    use serde::Deserializer;

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

impl RoomManifest {
    /// Parses and validates a manifest from TOML source.
    ///
    /// # Errors
    ///
    /// Returns [`FatalError::Parse`] on malformed TOML,
    /// [`FatalError::VersionMismatch`] if `schema_version` is not
    /// [`SUPPORTED_SCHEMA_VERSION`], or [`FatalError::InvalidGraph`] if the
    /// scene graph violates a structural invariant.
    pub fn from_toml_str(source: &str) -> Result<Self, FatalError> {
        let manifest: Self =
            toml::from_str(source).map_err(|source| FatalError::Parse { path: "<manifest>".to_owned(), source })?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Checks `schema_version` and every structural invariant
    /// `chamber_model::graph` documents as enforced by the loader.
    ///
    /// # Errors
    ///
    /// Returns [`FatalError::VersionMismatch`] or [`FatalError::InvalidGraph`].
    pub fn validate(&self) -> Result<(), FatalError> {
        if self.schema_version.as_str() != SUPPORTED_SCHEMA_VERSION {
            return Err(FatalError::VersionMismatch {
                found: self.schema_version.as_str().to_owned(),
                expected: SUPPORTED_SCHEMA_VERSION.to_owned(),
            });
        }
        if self.graph.scenes.is_empty() {
            return Err(FatalError::InvalidGraph("room graph declares no scenes".to_owned()));
        }
        let mut seen_scenes = BTreeSet::new();
        for scene in &self.graph.scenes {
            if !seen_scenes.insert(scene.id.clone()) {
                return Err(FatalError::InvalidGraph(format!("duplicate scene id: {}", scene.id.as_str())));
            }
            validate_scene_graph(&scene.graph, false)?;
        }
        if let Some(default_scene) = &self.default_scene {
            if !self.graph.scenes.iter().any(|scene| &scene.id == default_scene) {
                return Err(FatalError::InvalidGraph(format!(
                    "default_scene {} is not a declared scene",
                    default_scene.as_str()
                )));
            }
        }
        Ok(())
    }

    /// Returns the effective heartbeat tolerance, clamped to the device
    /// registry's minimum.
    #[must_use]
    pub fn effective_heartbeat_tolerance(&self) -> f64 {
        self.heartbeat_tolerance.max(MIN_HEARTBEAT_TOLERANCE)
    }
}

/// Validates one `SceneGraph`'s structural invariants, recursing into
/// nested puzzle/subgraph-ref subgraphs. `inside_subgraph` is `true` once
/// recursed past the top-level scene, since loop nodes are only valid at
/// that top level.
fn validate_scene_graph(graph: &SceneGraph, inside_subgraph: bool) -> Result<(), FatalError> {
    if !graph.nodes.contains_key(&graph.entry) {
        return Err(FatalError::InvalidGraph(format!("entry node {} is not declared", graph.entry.as_str())));
    }
    for edge in &graph.edges {
        if !graph.nodes.contains_key(&edge.from) {
            return Err(FatalError::InvalidGraph(format!("edge {} has unknown source {}", edge.id.as_str(), edge.from.as_str())));
        }
        if !graph.nodes.contains_key(&edge.to) {
            return Err(FatalError::InvalidGraph(format!("edge {} has unknown target {}", edge.id.as_str(), edge.to.as_str())));
        }
    }
    for node in graph.nodes.values() {
        match &node.kind {
            NodeKind::Loop { interval, .. } => {
                if inside_subgraph {
                    return Err(FatalError::InvalidGraph(format!("loop node {} is not valid inside a puzzle subgraph", node.id.as_str())));
                }
                if let chamber_model::LoopInterval::Uniform { min, max } = interval {
                    if min > max {
                        return Err(FatalError::InvalidGraph(format!("loop node {} has min > max interval", node.id.as_str())));
                    }
                }
            }
            NodeKind::Parallel { children } => {
                for child in children {
                    if !graph.nodes.contains_key(child) {
                        return Err(FatalError::InvalidGraph(format!(
                            "parallel node {} names unknown child {}",
                            node.id.as_str(),
                            child.as_str()
                        )));
                    }
                }
            }
            NodeKind::Puzzle { subgraph } | NodeKind::SubgraphRef { subgraph } => {
                if subgraph.contains_loop_node() {
                    return Err(FatalError::InvalidGraph(format!("subgraph owned by {} contains a loop node", node.id.as_str())));
                }
                validate_scene_graph(subgraph, true)?;
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "test assertions favor unwrap")]

    use super::RoomManifest;

    const MINIMAL: &str = r#"
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
    "#;

    #[test]
    fn loads_a_minimal_manifest() {
        let manifest = RoomManifest::from_toml_str(MINIMAL).unwrap();
        assert_eq!(manifest.room_id.as_str(), "room-01");
        assert_eq!(manifest.graph.scenes.len(), 1);
    }

    #[test]
    fn rejects_an_unsupported_schema_version() {
        let source = MINIMAL.replace(r#"schema_version = "1""#, r#"schema_version = "9""#);
        let error = RoomManifest::from_toml_str(&source).unwrap_err();
        assert!(matches!(error, super::FatalError::VersionMismatch { .. }));
    }

    #[test]
    fn rejects_a_dangling_entry_node() {
        let source = MINIMAL.replace(r#"entry = "start""#, r#"entry = "missing""#);
        let error = RoomManifest::from_toml_str(&source).unwrap_err();
        assert!(matches!(error, super::FatalError::InvalidGraph(_)));
    }
}
