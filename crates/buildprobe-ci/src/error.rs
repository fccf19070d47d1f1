//! Error types for build steps and command execution

use buildprobe_state::{Outcome, StorageError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Failed to launch {command}: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with code {exit_code}: {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("{command} interrupted after {timeout_secs} seconds")]
    Interrupted { command: String, timeout_secs: u64 },

    #[error("Command is empty")]
    EmptyCommand,

    #[error("Build {build} has no agent assigned for distributed execution")]
    NoAgentAssigned { build: String },

    #[error("Invalid agent address: {0}")]
    InvalidAgent(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ProbeError {
    /// Outcome of a build whose step failed with this error. A timed-out
    /// command aborts the build, anything else fails it.
    pub fn build_outcome(&self) -> Outcome {
        match self {
            ProbeError::Interrupted { .. } => Outcome::Aborted,
            _ => Outcome::Failure,
        }
    }
}

/// Result type for build step operations
pub type Result<T> = std::result::Result<T, ProbeError>;
