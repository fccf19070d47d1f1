//! Storage trait definitions for buildprobe
//!
//! The orchestrator owns build identity, history and per-build actions.
//! `BuildStore` is that host-owned persistence seen from the pipeline:
//! - builds are numbered per project and move Running → Completed,
//! - each build carries at most one [`BuildRecord`],
//! - completed builds are immutable history.
//!
//! In-memory fakes are provided for testing via the `fakes` module.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::record::BuildRecord;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// Build identity and state
// ---------------------------------------------------------------------------

/// Identity of one build: owning project plus a per-project build number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BuildId {
    pub project: String,
    pub number: u64,
}

impl BuildId {
    pub fn new(project: impl Into<String>, number: u64) -> Self {
        Self {
            project: project.into(),
            number,
        }
    }
}

impl std::fmt::Display for BuildId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.project, self.number)
    }
}

/// Terminal result of a build, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    /// Degraded but not failed.
    Unstable,
    Failure,
    Aborted,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Unstable => "unstable",
            Outcome::Failure => "failure",
            Outcome::Aborted => "aborted",
        }
    }

    /// The worse of two outcomes. Outcomes only ever degrade.
    pub fn combine(self, other: Outcome) -> Outcome {
        self.max(other)
    }

    pub fn is_worse_than(&self, other: Outcome) -> bool {
        *self > other
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Outcome {
    type Err = StorageError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "success" => Ok(Outcome::Success),
            "unstable" => Ok(Outcome::Unstable),
            "failure" => Ok(Outcome::Failure),
            "aborted" => Ok(Outcome::Aborted),
            other => Err(StorageError::Corrupt(format!("unknown outcome: {other}"))),
        }
    }
}

/// Lifecycle state of a build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    Running,
    Completed,
}

impl BuildStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStatus::Running => "running",
            BuildStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored view of a build (without its record)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    pub id: BuildId,
    pub status: BuildStatus,
    pub outcome: Outcome,
    /// Name of the node the build was assigned to, if any.
    pub node: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl BuildInfo {
    pub fn is_completed(&self) -> bool {
        self.status == BuildStatus::Completed
    }
}

// ---------------------------------------------------------------------------
// BuildStore: host-owned build persistence
// ---------------------------------------------------------------------------

/// Build history and per-build record storage.
///
/// Guarantees:
/// - Build numbers start at 1 and increase by one per project.
/// - `list_builds` returns newest first.
/// - Records can only be written while the build is running.
/// - A build transitions Running → Completed exactly once.
#[async_trait]
pub trait BuildStore: Send + Sync {
    /// Allocate the next build of `project` in the Running state.
    async fn create_build(&self, project: &str, node: Option<&str>) -> StorageResult<BuildInfo>;

    /// Mark a running build completed with its final outcome.
    async fn complete_build(&self, id: &BuildId, outcome: Outcome) -> StorageResult<()>;

    /// Fetch a build by identity.
    async fn get_build(&self, id: &BuildId) -> StorageResult<BuildInfo>;

    /// All builds of a project, newest first. Unknown projects yield an empty list.
    async fn list_builds(&self, project: &str) -> StorageResult<Vec<BuildInfo>>;

    /// The record attached to a build, if any.
    async fn get_record(&self, id: &BuildId) -> StorageResult<Option<BuildRecord>>;

    /// Attach or replace the record of a running build.
    async fn put_record(&self, id: &BuildId, record: &BuildRecord) -> StorageResult<()>;
}
