//! Error types for buildprobe-state

use thiserror::Error;

/// Errors raised while connecting to or preparing the backing database
#[derive(Error, Debug)]
pub enum StateError {
    /// Database connection error
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Schema setup error
    #[error("Schema setup failed: {0}")]
    SchemaSetup(String),
}

/// Errors returned through the [`crate::BuildStore`] trait
#[derive(Error, Debug)]
pub enum StorageError {
    /// No build with this identity exists
    #[error("Build not found: {build}")]
    BuildNotFound { build: String },

    /// Operation requires a different build status
    #[error("Build {build} is {status}, expected {expected}")]
    InvalidBuildState {
        build: String,
        status: String,
        expected: String,
    },

    /// Stored data could not be decoded
    #[error("Corrupt stored data: {0}")]
    Corrupt(String),

    /// Backend failure
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Corrupt(err.to_string())
    }
}
