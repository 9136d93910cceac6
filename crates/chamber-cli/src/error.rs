// crates/chamber-cli/src/error.rs
// ============================================================================
// Module: CLI errors
// Description: Wraps every other crate's error taxonomy into one type the
//              entry point can format and turn into a process exit code.
// Purpose: Keep `main` a thin `match` over `Result<(), CliError>`.
// Dependencies: chamber-config, chamber-log, chamber-runtime, thiserror
// ============================================================================

use thiserror::Error;

/// Top-level failure for any `chamber` subcommand.
#[derive(Debug, Error)]
pub enum CliError {
    /// A room manifest or device contract failed to load or validate.
    #[error(transparent)]
    Config(#[from] chamber_config::FatalError),

    /// The durable event log could not be opened or read.
    #[error(transparent)]
    Log(#[from] chamber_log::PersistenceError),

    /// An event was rejected while being replayed through the coordinator.
    #[error(transparent)]
    Coordinator(#[from] chamber_runtime::CoordinatorError),

    /// Reading or parsing a stdin-fed broker frame failed.
    #[error("malformed input frame: {0}")]
    Frame(String),

    /// Standard input or output could not be read or written.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
