//! buildprobe-state: build history and probe record persistence
//!
//! The orchestrator side of the build-step model: build identity, outcomes,
//! and the per-build [`BuildRecord`] action.
//!
//! ## Key Components
//!
//! - `BuildRecord` / `ProbeResult`: ordered probe results of one build
//! - `BuildStore`: keyed store of builds and their records
//! - `MemoryBuildStore`: in-memory fake for tests and ephemeral runs
//! - `SurrealBuildStore`: SurrealDB-backed persistent store

mod error;
pub mod fakes;
mod migrations;
pub mod record;
mod schema;
pub mod storage_traits;
pub mod surreal_store;

pub use error::{StateError, StorageError};
pub use fakes::MemoryBuildStore;
pub use record::{BuildRecord, ProbeResult, MAX_SCORE, MIN_SCORE, UNKNOWN_LABEL};
pub use schema::{BuildRecordRow, BuildRow};
pub use storage_traits::{
    BuildId, BuildInfo, BuildStatus, BuildStore, Outcome, StorageResult,
};
pub use surreal_store::{Credentials, SurrealBuildStore, DEFAULT_DB_PATH};

/// Result type for buildprobe-state operations
pub type Result<T> = std::result::Result<T, StateError>;
