//! Trait contract tests for BuildStore.
//!
//! Each contract is written once against `impl BuildStore` and exercised
//! with both the in-memory fake and the SurrealDB store (in-memory engine).

use std::sync::Arc;

use buildprobe_state::storage_traits::*;
use buildprobe_state::{BuildRecord, MemoryBuildStore, ProbeResult, StorageError, SurrealBuildStore};

fn record_with_scores(scores: &[u8]) -> BuildRecord {
    BuildRecord::from_entries(
        scores
            .iter()
            .map(|s| ProbeResult::with_score("1.8.0_331", *s))
            .collect(),
    )
}

// ===========================================================================
// Contracts
// ===========================================================================

async fn build_numbers_increase_per_project(store: impl BuildStore) {
    let a1 = store.create_build("alpha", None).await.unwrap();
    let a2 = store.create_build("alpha", None).await.unwrap();
    let b1 = store.create_build("beta", Some("agent-1")).await.unwrap();

    assert_eq!(a1.id.number, 1);
    assert_eq!(a2.id.number, 2);
    assert_eq!(b1.id.number, 1);
    assert_eq!(b1.node.as_deref(), Some("agent-1"));
}

async fn new_build_is_running_and_successful(store: impl BuildStore) {
    let info = store.create_build("alpha", None).await.unwrap();
    let fetched = store.get_build(&info.id).await.unwrap();

    assert_eq!(fetched.status, BuildStatus::Running);
    assert_eq!(fetched.outcome, Outcome::Success);
    assert!(fetched.completed_at.is_none());
}

async fn complete_build_sets_outcome(store: impl BuildStore) {
    let info = store.create_build("alpha", None).await.unwrap();
    store.complete_build(&info.id, Outcome::Unstable).await.unwrap();

    let fetched = store.get_build(&info.id).await.unwrap();
    assert!(fetched.is_completed());
    assert_eq!(fetched.outcome, Outcome::Unstable);
    assert!(fetched.completed_at.is_some());
}

async fn complete_twice_is_rejected(store: impl BuildStore) {
    let info = store.create_build("alpha", None).await.unwrap();
    store.complete_build(&info.id, Outcome::Success).await.unwrap();
    let err = store
        .complete_build(&info.id, Outcome::Failure)
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::InvalidBuildState { .. }));
}

async fn unknown_build_not_found(store: impl BuildStore) {
    let missing = BuildId::new("ghost", 9);

    assert!(matches!(
        store.get_build(&missing).await.unwrap_err(),
        StorageError::BuildNotFound { .. }
    ));
    assert!(matches!(
        store.get_record(&missing).await.unwrap_err(),
        StorageError::BuildNotFound { .. }
    ));
}

async fn list_builds_newest_first(store: impl BuildStore) {
    for _ in 0..3 {
        store.create_build("alpha", None).await.unwrap();
    }
    store.create_build("beta", None).await.unwrap();

    let numbers: Vec<u64> = store
        .list_builds("alpha")
        .await
        .unwrap()
        .into_iter()
        .map(|b| b.id.number)
        .collect();
    assert_eq!(numbers, vec![3, 2, 1]);
    assert!(store.list_builds("nobody").await.unwrap().is_empty());
}

async fn record_absent_until_put(store: impl BuildStore) {
    let info = store.create_build("alpha", None).await.unwrap();
    assert!(store.get_record(&info.id).await.unwrap().is_none());

    let record = record_with_scores(&[3, 5]);
    store.put_record(&info.id, &record).await.unwrap();

    let fetched = store.get_record(&info.id).await.unwrap().unwrap();
    assert_eq!(fetched, record);
}

async fn put_record_replaces_previous(store: impl BuildStore) {
    let info = store.create_build("alpha", None).await.unwrap();
    let mut record = record_with_scores(&[3]);
    store.put_record(&info.id, &record).await.unwrap();

    record.push(ProbeResult::with_score("11.0.2", 4));
    store.put_record(&info.id, &record).await.unwrap();

    let fetched = store.get_record(&info.id).await.unwrap().unwrap();
    assert_eq!(fetched.len(), 2);
    assert_eq!(fetched.entries()[0].score, 3);
    assert_eq!(fetched.entries()[1].label, "11.0.2");
}

async fn completed_build_record_is_immutable(store: impl BuildStore) {
    let info = store.create_build("alpha", None).await.unwrap();
    store.put_record(&info.id, &record_with_scores(&[1])).await.unwrap();
    store.complete_build(&info.id, Outcome::Success).await.unwrap();

    let err = store
        .put_record(&info.id, &record_with_scores(&[2]))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidBuildState { .. }));

    let kept = store.get_record(&info.id).await.unwrap().unwrap();
    assert_eq!(kept.entries()[0].score, 1);
}

async fn concurrent_creates_get_distinct_numbers<S: BuildStore + 'static>(store: S) {
    let store = Arc::new(store);
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.create_build("alpha", None).await })
        })
        .collect();

    let mut numbers = Vec::new();
    for handle in handles {
        numbers.push(handle.await.unwrap().unwrap().id.number);
    }
    numbers.sort_unstable();
    assert_eq!(numbers, (1..=8).collect::<Vec<u64>>());
}

// ===========================================================================
// MemoryBuildStore
// ===========================================================================

mod memory_store_tests {
    use super::*;

    #[tokio::test]
    async fn numbers_increase_per_project() {
        build_numbers_increase_per_project(MemoryBuildStore::new()).await;
    }

    #[tokio::test]
    async fn new_build_running() {
        new_build_is_running_and_successful(MemoryBuildStore::new()).await;
    }

    #[tokio::test]
    async fn complete_sets_outcome() {
        complete_build_sets_outcome(MemoryBuildStore::new()).await;
    }

    #[tokio::test]
    async fn complete_twice_rejected() {
        complete_twice_is_rejected(MemoryBuildStore::new()).await;
    }

    #[tokio::test]
    async fn unknown_build() {
        unknown_build_not_found(MemoryBuildStore::new()).await;
    }

    #[tokio::test]
    async fn list_newest_first() {
        list_builds_newest_first(MemoryBuildStore::new()).await;
    }

    #[tokio::test]
    async fn record_absent_then_present() {
        record_absent_until_put(MemoryBuildStore::new()).await;
    }

    #[tokio::test]
    async fn record_replaced() {
        put_record_replaces_previous(MemoryBuildStore::new()).await;
    }

    #[tokio::test]
    async fn completed_record_immutable() {
        completed_build_record_is_immutable(MemoryBuildStore::new()).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates() {
        concurrent_creates_get_distinct_numbers(MemoryBuildStore::new()).await;
    }
}

// ===========================================================================
// SurrealBuildStore (mirrors MemoryBuildStore tests above)
// ===========================================================================

mod surreal_store_tests {
    use super::*;

    async fn store() -> SurrealBuildStore {
        SurrealBuildStore::in_memory()
            .await
            .expect("in_memory() failed")
    }

    #[tokio::test]
    async fn numbers_increase_per_project() {
        build_numbers_increase_per_project(store().await).await;
    }

    #[tokio::test]
    async fn new_build_running() {
        new_build_is_running_and_successful(store().await).await;
    }

    #[tokio::test]
    async fn complete_sets_outcome() {
        complete_build_sets_outcome(store().await).await;
    }

    #[tokio::test]
    async fn complete_twice_rejected() {
        complete_twice_is_rejected(store().await).await;
    }

    #[tokio::test]
    async fn unknown_build() {
        unknown_build_not_found(store().await).await;
    }

    #[tokio::test]
    async fn list_newest_first() {
        list_builds_newest_first(store().await).await;
    }

    #[tokio::test]
    async fn record_absent_then_present() {
        record_absent_until_put(store().await).await;
    }

    #[tokio::test]
    async fn record_replaced() {
        put_record_replaces_previous(store().await).await;
    }

    #[tokio::test]
    async fn completed_record_immutable() {
        completed_build_record_is_immutable(store().await).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates() {
        concurrent_creates_get_distinct_numbers(store().await).await;
    }
}
