//! SurrealDB-backed BuildStore implementation
//!
//! Uses `schema::BuildRow` and `schema::BuildRecordRow` for persistence,
//! converting to/from `storage_traits` types at the boundary.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::{Database, Root};
use surrealdb::Surreal;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::error::{StateError, StorageError};
use crate::migrations;
use crate::record::BuildRecord;
use crate::schema::{BuildRecordRow, BuildRow};
use crate::storage_traits::{BuildId, BuildInfo, BuildStatus, BuildStore, Outcome, StorageResult};

const NAMESPACE: &str = "buildprobe";
const DATABASE: &str = "main";

/// Default on-disk location used when `SURREALDB_URL` is not set.
pub const DEFAULT_DB_PATH: &str = ".buildprobe/db";

fn backend(e: surrealdb::Error) -> StorageError {
    StorageError::Backend(e.to_string())
}

/// Sign-in for endpoints that require authentication.
///
/// Read from `SURREALDB_USER` and `SURREALDB_PASS`. `SURREALDB_ROOT=true`
/// signs in as a root user instead of a database user of `buildprobe/main`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub is_root: bool,
}

impl Credentials {
    /// `None` unless both user and password are set.
    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let username = lookup("SURREALDB_USER")?;
        let password = lookup("SURREALDB_PASS")?;
        let is_root = lookup("SURREALDB_ROOT")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        Some(Self {
            username,
            password,
            is_root,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("is_root", &self.is_root)
            .finish()
    }
}

/// SurrealDB-backed implementation of [`BuildStore`].
pub struct SurrealBuildStore {
    db: Surreal<Any>,
    // Held across number allocation and insert in `create_build`.
    create_lock: Mutex<()>,
}

impl SurrealBuildStore {
    /// Create an in-memory instance for testing.
    pub async fn in_memory() -> crate::Result<Self> {
        Self::connect("mem://").await
    }

    /// Connect to any SurrealDB endpoint (`mem://`, `surrealkv://path`, `ws://host`).
    pub async fn connect(url: &str) -> crate::Result<Self> {
        Self::connect_with(url, None).await
    }

    /// Connect, signing in first when `credentials` are given.
    #[instrument(skip(credentials), fields(auth = credentials.is_some()))]
    pub async fn connect_with(url: &str, credentials: Option<&Credentials>) -> crate::Result<Self> {
        let db = surrealdb::engine::any::connect(url)
            .await
            .map_err(|e| StateError::Connection(format!("Failed to connect to {}: {}", url, e)))?;

        if let Some(creds) = credentials {
            if creds.is_root {
                db.signin(Root {
                    username: &creds.username,
                    password: &creds.password,
                })
                .await
                .map_err(|e| StateError::Connection(format!("Root auth failed: {e}")))?;
            } else {
                db.signin(Database {
                    namespace: NAMESPACE,
                    database: DATABASE,
                    username: &creds.username,
                    password: &creds.password,
                })
                .await
                .map_err(|e| StateError::Connection(format!("DB auth failed: {e}")))?;
            }
        }

        db.use_ns(NAMESPACE)
            .use_db(DATABASE)
            .await
            .map_err(|e| StateError::Connection(e.to_string()))?;

        migrations::init_schema(&db).await?;
        info!("SurrealBuildStore connected ({})", url);
        Ok(Self {
            db,
            create_lock: Mutex::new(()),
        })
    }

    /// Create from environment.
    ///
    /// `SURREALDB_URL` wins when set, signing in with [`Credentials`] when
    /// those are present too. Otherwise a local SurrealKV database is opened
    /// under `default_path`.
    pub async fn from_env(default_path: &Path) -> crate::Result<Self> {
        if let Ok(url) = std::env::var("SURREALDB_URL") {
            let credentials = Credentials::from_lookup(|key| std::env::var(key).ok());
            return Self::connect_with(&url, credentials.as_ref()).await;
        }

        std::fs::create_dir_all(default_path).map_err(|e| {
            StateError::Connection(format!(
                "Failed to create database directory {}: {}",
                default_path.display(),
                e
            ))
        })?;
        let url = format!("surrealkv://{}", default_path.display());
        info!("No SURREALDB_URL found, using local persistence: {}", url);
        Self::connect(&url).await
    }

    // -- private helpers -----------------------------------------------------

    async fn fetch_build(&self, id: &BuildId) -> StorageResult<BuildRow> {
        let mut res = self
            .db
            .query("SELECT * FROM builds WHERE project = $project AND number = $number")
            .bind(("project", id.project.clone()))
            .bind(("number", id.number))
            .await
            .map_err(backend)?;

        let rows: Vec<BuildRow> = res.take(0).map_err(backend)?;

        rows.into_iter()
            .next()
            .ok_or_else(|| StorageError::BuildNotFound {
                build: id.to_string(),
            })
    }

    async fn fetch_running(&self, id: &BuildId) -> StorageResult<BuildRow> {
        let row = self.fetch_build(id).await?;
        if row.status != BuildStatus::Running.as_str() {
            return Err(StorageError::InvalidBuildState {
                build: id.to_string(),
                status: row.status,
                expected: BuildStatus::Running.to_string(),
            });
        }
        Ok(row)
    }

    async fn fetch_record(&self, id: &BuildId) -> StorageResult<Option<BuildRecordRow>> {
        let mut res = self
            .db
            .query("SELECT * FROM build_records WHERE project = $project AND number = $number")
            .bind(("project", id.project.clone()))
            .bind(("number", id.number))
            .await
            .map_err(backend)?;

        let rows: Vec<BuildRecordRow> = res.take(0).map_err(backend)?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl BuildStore for SurrealBuildStore {
    async fn create_build(&self, project: &str, node: Option<&str>) -> StorageResult<BuildInfo> {
        let _guard = self.create_lock.lock().await;

        let mut res = self
            .db
            .query("SELECT * FROM builds WHERE project = $project ORDER BY number DESC LIMIT 1")
            .bind(("project", project.to_string()))
            .await
            .map_err(backend)?;
        let latest: Vec<BuildRow> = res.take(0).map_err(backend)?;
        let number = latest.first().map_or(1, |row| row.number + 1);

        let row = BuildRow::new(project.to_string(), number, node.map(str::to_string));
        debug!(project, number, "creating build");

        let created: Option<BuildRow> = self
            .db
            .create("builds")
            .content(row)
            .await
            .map_err(backend)?;

        created
            .ok_or_else(|| StorageError::Backend(format!("build {project}#{number} was not created")))?
            .into_info()
    }

    async fn complete_build(&self, id: &BuildId, outcome: Outcome) -> StorageResult<()> {
        let row = self.fetch_running(id).await?;
        let updated = row.complete(outcome.as_str());

        self.db
            .query("UPDATE builds CONTENT $row WHERE project = $project AND number = $number")
            .bind(("row", updated))
            .bind(("project", id.project.clone()))
            .bind(("number", id.number))
            .await
            .map_err(backend)?;

        Ok(())
    }

    async fn get_build(&self, id: &BuildId) -> StorageResult<BuildInfo> {
        self.fetch_build(id).await?.into_info()
    }

    async fn list_builds(&self, project: &str) -> StorageResult<Vec<BuildInfo>> {
        let mut res = self
            .db
            .query("SELECT * FROM builds WHERE project = $project ORDER BY number DESC")
            .bind(("project", project.to_string()))
            .await
            .map_err(backend)?;
        let rows: Vec<BuildRow> = res.take(0).map_err(backend)?;

        rows.into_iter().map(BuildRow::into_info).collect()
    }

    async fn get_record(&self, id: &BuildId) -> StorageResult<Option<BuildRecord>> {
        self.fetch_build(id).await?;
        self.fetch_record(id)
            .await?
            .map(BuildRecordRow::into_record)
            .transpose()
    }

    async fn put_record(&self, id: &BuildId, record: &BuildRecord) -> StorageResult<()> {
        self.fetch_running(id).await?;
        let row = BuildRecordRow::new(id, record)?;

        if self.fetch_record(id).await?.is_some() {
            self.db
                .query(
                    "UPDATE build_records SET entries = $entries WHERE project = $project AND number = $number",
                )
                .bind(("entries", row.entries))
                .bind(("project", id.project.clone()))
                .bind(("number", id.number))
                .await
                .map_err(backend)?;
        } else {
            let _created: Option<BuildRecordRow> = self
                .db
                .create("build_records")
                .content(row)
                .await
                .map_err(backend)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_credentials_need_user_and_password() {
        assert!(Credentials::from_lookup(env(&[])).is_none());
        assert!(Credentials::from_lookup(env(&[("SURREALDB_USER", "ci")])).is_none());
        assert!(Credentials::from_lookup(env(&[("SURREALDB_PASS", "secret")])).is_none());
    }

    #[test]
    fn test_credentials_database_user() {
        let creds =
            Credentials::from_lookup(env(&[("SURREALDB_USER", "ci"), ("SURREALDB_PASS", "secret")]))
                .unwrap();
        assert_eq!(creds.username, "ci");
        assert_eq!(creds.password, "secret");
        assert!(!creds.is_root);
    }

    #[test]
    fn test_credentials_root_user() {
        let creds = Credentials::from_lookup(env(&[
            ("SURREALDB_USER", "root"),
            ("SURREALDB_PASS", "root"),
            ("SURREALDB_ROOT", "TRUE"),
        ]))
        .unwrap();
        assert!(creds.is_root);
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials {
            username: "ci".to_string(),
            password: "hunter2".to_string(),
            is_root: false,
        };
        let shown = format!("{:?}", creds);
        assert!(shown.contains("ci"));
        assert!(!shown.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_connect_without_credentials() {
        let store = SurrealBuildStore::connect_with("mem://", None).await.unwrap();
        let info = store.create_build("alpha", None).await.unwrap();
        assert_eq!(info.id.number, 1);
    }
}
