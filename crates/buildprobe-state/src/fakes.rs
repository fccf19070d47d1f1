//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemoryBuildStore`, which satisfies the `BuildStore` contract
//! without any external dependencies.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::StorageError;
use crate::record::BuildRecord;
use crate::storage_traits::*;

#[derive(Debug)]
struct BuildState {
    info: BuildInfo,
    record: Option<BuildRecord>,
}

/// In-memory build store backed by `HashMap<project, BTreeMap<number, BuildState>>`.
#[derive(Debug, Default)]
pub struct MemoryBuildStore {
    projects: Mutex<HashMap<String, BTreeMap<u64, BuildState>>>,
}

impl MemoryBuildStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(id: &BuildId) -> StorageError {
    StorageError::BuildNotFound {
        build: id.to_string(),
    }
}

fn ensure_running(state: &BuildState) -> StorageResult<()> {
    if state.info.status != BuildStatus::Running {
        return Err(StorageError::InvalidBuildState {
            build: state.info.id.to_string(),
            status: state.info.status.to_string(),
            expected: BuildStatus::Running.to_string(),
        });
    }
    Ok(())
}

#[async_trait]
impl BuildStore for MemoryBuildStore {
    async fn create_build(&self, project: &str, node: Option<&str>) -> StorageResult<BuildInfo> {
        let mut projects = self.projects.lock().unwrap();
        let builds = projects.entry(project.to_string()).or_default();
        let number = builds.keys().next_back().map_or(1, |n| n + 1);
        let info = BuildInfo {
            id: BuildId::new(project, number),
            status: BuildStatus::Running,
            outcome: Outcome::Success,
            node: node.map(str::to_string),
            created_at: Utc::now(),
            completed_at: None,
        };
        builds.insert(
            number,
            BuildState {
                info: info.clone(),
                record: None,
            },
        );
        Ok(info)
    }

    async fn complete_build(&self, id: &BuildId, outcome: Outcome) -> StorageResult<()> {
        let mut projects = self.projects.lock().unwrap();
        let state = projects
            .get_mut(&id.project)
            .and_then(|b| b.get_mut(&id.number))
            .ok_or_else(|| not_found(id))?;
        ensure_running(state)?;
        state.info.status = BuildStatus::Completed;
        state.info.outcome = outcome;
        state.info.completed_at = Some(Utc::now());
        Ok(())
    }

    async fn get_build(&self, id: &BuildId) -> StorageResult<BuildInfo> {
        let projects = self.projects.lock().unwrap();
        projects
            .get(&id.project)
            .and_then(|b| b.get(&id.number))
            .map(|s| s.info.clone())
            .ok_or_else(|| not_found(id))
    }

    async fn list_builds(&self, project: &str) -> StorageResult<Vec<BuildInfo>> {
        let projects = self.projects.lock().unwrap();
        Ok(projects
            .get(project)
            .map(|b| b.values().rev().map(|s| s.info.clone()).collect())
            .unwrap_or_default())
    }

    async fn get_record(&self, id: &BuildId) -> StorageResult<Option<BuildRecord>> {
        let projects = self.projects.lock().unwrap();
        projects
            .get(&id.project)
            .and_then(|b| b.get(&id.number))
            .map(|s| s.record.clone())
            .ok_or_else(|| not_found(id))
    }

    async fn put_record(&self, id: &BuildId, record: &BuildRecord) -> StorageResult<()> {
        let mut projects = self.projects.lock().unwrap();
        let state = projects
            .get_mut(&id.project)
            .and_then(|b| b.get_mut(&id.number))
            .ok_or_else(|| not_found(id))?;
        ensure_running(state)?;
        state.record = Some(record.clone());
        Ok(())
    }
}
