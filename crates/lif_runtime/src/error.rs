//! Runtime error types.

use lif_core::CoreError;

/// Runtime error
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The manifest could not be compiled or rendered
    #[error(transparent)]
    Compile(#[from] CoreError),

    /// The manifest file could not be written
    #[error("Failed to write manifest: {0}")]
    Io(#[from] std::io::Error),

    /// The orchestration CLI could not be launched
    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The orchestration CLI exited unsuccessfully
    #[error("`{command}` exited with {status}")]
    CommandFailed { command: String, status: String },

    /// Services could not be started
    #[error("Failed to start services: {reason}")]
    StartupFailed { reason: String },
}
