// crates/chamber-config/src/error.rs
// ============================================================================
// Module: Config errors
// Description: The error taxonomy for loading and validating room config.
// Purpose: Give `chamber-cli` one enum to match on whether a room failed to
//          start because of disk I/O, malformed TOML, or a structurally
//          invalid graph.
// Dependencies: thiserror, toml
// ============================================================================

use thiserror::Error;

/// A room manifest or device contract failed to load or validate. Every
/// variant is fatal: the process that hit it cannot start the room it was
/// loading.
#[derive(Debug, Error)]
pub enum FatalError {
    /// The manifest or contract file could not be read from disk.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The path that could not be read.
        path: String,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The file's contents were not valid TOML for the expected shape.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// The path that failed to parse.
        path: String,
        /// The underlying TOML decode failure.
        #[source]
        source: toml::de::Error,
    },

    /// The document's `schema_version` did not match the version this
    /// build understands.
    #[error("unsupported schema version {found:?}, expected {expected:?}")]
    VersionMismatch {
        /// The version declared by the document.
        found: String,
        /// The version this build understands.
        expected: String,
    },

    /// The graph structure violated one of `chamber-model`'s documented
    /// loader invariants (dangling entry, cross-scope edge, a loop node
    /// nested inside a puzzle subgraph, or an inverted `Uniform` interval).
    #[error("invalid scene graph: {0}")]
    InvalidGraph(String),

    /// Two requirements in a device contract declared the same logical
    /// device id.
    #[error("duplicate device requirement: {0}")]
    DuplicateRequirement(String),
}
