//! Schema definitions for buildprobe SurrealDB tables
//!
//! Tables:
//! - builds: Build history per project (status, outcome, node)
//! - build_records: Probe record attached to a build

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::record::{BuildRecord, ProbeResult};
use crate::storage_traits::{BuildId, BuildInfo, BuildStatus, StorageResult};

/// Module for serializing chrono DateTime to SurrealDB datetime format
mod surreal_datetime {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let sd = SurrealDatetime::from(*date);
        serde::Serialize::serialize(&sd, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = SurrealDatetime::deserialize(deserializer)?;
        Ok(DateTime::from(sd))
    }
}

/// Module for serializing optional chrono DateTime to SurrealDB datetime format
mod surreal_datetime_opt {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => {
                let sd = SurrealDatetime::from(*d);
                serde::Serialize::serialize(&Some(sd), serializer)
            }
            None => serde::Serialize::serialize(&None::<SurrealDatetime>, serializer),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = Option::<SurrealDatetime>::deserialize(deserializer)?;
        Ok(sd.map(DateTime::from))
    }
}

/// Build row - one build of a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildRow {
    /// SurrealDB record ID
    pub id: Option<surrealdb::sql::Thing>,
    /// Owning project
    pub project: String,
    /// Per-project build number (1-indexed)
    pub number: u64,
    /// "running" | "completed"
    pub status: String,
    /// "success" | "unstable" | "failure" | "aborted"
    pub outcome: String,
    /// Assigned node name
    pub node: Option<String>,
    /// Created timestamp
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
    /// Completed timestamp (if terminal)
    #[serde(default, with = "surreal_datetime_opt")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl BuildRow {
    /// Create a new build row in "running" state
    pub fn new(project: String, number: u64, node: Option<String>) -> Self {
        BuildRow {
            id: None,
            project,
            number,
            status: BuildStatus::Running.as_str().to_string(),
            outcome: "success".to_string(),
            node,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Mark build as completed
    pub fn complete(mut self, outcome: &str) -> Self {
        self.status = BuildStatus::Completed.as_str().to_string();
        self.outcome = outcome.to_string();
        self.completed_at = Some(Utc::now());
        self
    }

    /// Convert the row into the trait-level view.
    pub fn into_info(self) -> StorageResult<BuildInfo> {
        let status = match self.status.as_str() {
            "running" => BuildStatus::Running,
            "completed" => BuildStatus::Completed,
            other => {
                return Err(StorageError::Corrupt(format!(
                    "unknown build status: {other}"
                )))
            }
        };

        Ok(BuildInfo {
            id: BuildId::new(self.project, self.number),
            status,
            outcome: self.outcome.parse()?,
            node: self.node,
            created_at: self.created_at,
            completed_at: self.completed_at,
        })
    }
}

/// Build record row - the probe record attached to one build
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildRecordRow {
    /// SurrealDB record ID
    pub id: Option<surrealdb::sql::Thing>,
    /// Owning project
    pub project: String,
    /// Build number within the project
    pub number: u64,
    /// Ordered probe results (JSON array)
    pub entries: serde_json::Value,
}

impl BuildRecordRow {
    pub fn new(id: &BuildId, record: &BuildRecord) -> StorageResult<Self> {
        Ok(BuildRecordRow {
            id: None,
            project: id.project.clone(),
            number: id.number,
            entries: serde_json::to_value(record.entries())?,
        })
    }

    pub fn into_record(self) -> StorageResult<BuildRecord> {
        let entries: Vec<ProbeResult> = serde_json::from_value(self.entries)?;
        Ok(BuildRecord::from_entries(entries))
    }
}
