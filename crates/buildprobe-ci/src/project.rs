//! Project-level summary of probe records.

use buildprobe_state::record::ACTION_ICON;
use buildprobe_state::{BuildId, BuildRecord, BuildStore};
use tracing::debug;

use crate::error::Result;

/// Project page action linking to the latest probe record.
///
/// Nothing is cached: every lookup walks the project's history again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectProbeAction {
    project: String,
}

impl ProjectProbeAction {
    pub const DISPLAY_NAME: &'static str = "Probe Project Action";
    pub const URL_NAME: &'static str = "probeprojectaction";

    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn display_name(&self) -> &'static str {
        Self::DISPLAY_NAME
    }

    pub fn icon_file_name(&self) -> &'static str {
        ACTION_ICON
    }

    pub fn url_name(&self) -> &'static str {
        Self::URL_NAME
    }

    /// The record of the most recent completed build that has one.
    ///
    /// Walks completed builds newest to oldest and stops at the first
    /// record found.
    pub async fn last_build_record(
        &self,
        store: &dyn BuildStore,
    ) -> Result<Option<(BuildId, BuildRecord)>> {
        let builds = store.list_builds(&self.project).await?;

        for build in builds.into_iter().filter(|b| b.is_completed()) {
            if let Some(record) = store.get_record(&build.id).await? {
                debug!(build = %build.id, "found latest probe record");
                return Ok(Some((build.id, record)));
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildprobe_state::{MemoryBuildStore, Outcome, ProbeResult};

    async fn completed_build(store: &MemoryBuildStore, record: Option<BuildRecord>) -> BuildId {
        let info = store.create_build("alpha", None).await.unwrap();
        if let Some(record) = record {
            store.put_record(&info.id, &record).await.unwrap();
        }
        store.complete_build(&info.id, Outcome::Success).await.unwrap();
        info.id
    }

    #[test]
    fn test_metadata() {
        let action = ProjectProbeAction::new("alpha");
        assert_eq!(action.display_name(), "Probe Project Action");
        assert_eq!(action.url_name(), "probeprojectaction");
        assert!(action.icon_file_name().starts_with("/plugin/"));
    }

    #[tokio::test]
    async fn test_empty_history() {
        let store = MemoryBuildStore::new();
        let found = ProjectProbeAction::new("alpha")
            .last_build_record(&store)
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_skips_newer_builds_without_record() {
        let store = MemoryBuildStore::new();
        completed_build(&store, None).await;
        let r2 = BuildRecord::from_entries(vec![ProbeResult::with_score("R2", 3)]);
        let b2 = completed_build(&store, Some(r2.clone())).await;
        completed_build(&store, None).await;

        let (id, record) = ProjectProbeAction::new("alpha")
            .last_build_record(&store)
            .await
            .unwrap()
            .expect("record found");

        assert_eq!(id, b2);
        assert_eq!(record, r2);
    }

    #[tokio::test]
    async fn test_running_build_is_ignored() {
        let store = MemoryBuildStore::new();
        let old = BuildRecord::from_entries(vec![ProbeResult::with_score("old", 1)]);
        completed_build(&store, Some(old.clone())).await;

        let running = store.create_build("alpha", None).await.unwrap();
        store
            .put_record(&running.id, &BuildRecord::with_info("new"))
            .await
            .unwrap();

        let (_, record) = ProjectProbeAction::new("alpha")
            .last_build_record(&store)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record, old);
    }

    #[tokio::test]
    async fn test_no_build_has_record() {
        let store = MemoryBuildStore::new();
        for _ in 0..3 {
            completed_build(&store, None).await;
        }
        assert!(ProjectProbeAction::new("alpha")
            .last_build_record(&store)
            .await
            .unwrap()
            .is_none());
    }
}
