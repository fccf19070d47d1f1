//! SurrealDB schema migrations and initialization
//!
//! Sets up the `builds` and `build_records` tables with the uniqueness
//! constraints the store relies on.

use crate::error::StateError;
use crate::Result;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

/// Initialize all buildprobe tables in SurrealDB
///
/// Safe to call multiple times (idempotent).
pub async fn init_schema(db: &Surreal<Any>) -> Result<()> {
    info!("Initializing buildprobe SurrealDB schema");

    init_builds_table(db).await?;
    init_build_records_table(db).await?;

    info!("buildprobe schema initialization complete");
    Ok(())
}

/// Initialize `builds` table
///
/// Schema:
/// ```text
/// TABLE builds {
///   project:       STRING (indexed)
///   number:        INT
///   status:        STRING (enum: running | completed)
///   outcome:       STRING (enum: success | unstable | failure | aborted)
///   node:          STRING?
///   created_at:    DATETIME
///   completed_at:  DATETIME?
/// }
/// ```
///
/// Constraints:
/// - `(project, number)` is unique
/// - Completed builds are immutable (enforced via app logic)
async fn init_builds_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing builds table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS builds SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS idx_project_number ON TABLE builds COLUMNS project, number UNIQUE;
        DEFINE INDEX IF NOT EXISTS idx_project ON TABLE builds COLUMNS project;
    "#;

    run_ddl(db, "builds", sql).await?;
    debug!("builds table initialized");
    Ok(())
}

/// Initialize `build_records` table
///
/// Schema:
/// ```text
/// TABLE build_records {
///   project:  STRING
///   number:   INT
///   entries:  ARRAY<OBJECT>
/// }
/// ```
///
/// At most one record per build: `(project, number)` is unique.
async fn init_build_records_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing build_records table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS build_records SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS idx_record_build ON TABLE build_records COLUMNS project, number UNIQUE;
    "#;

    run_ddl(db, "build_records", sql).await?;
    debug!("build_records table initialized");
    Ok(())
}

/// Run DDL statements, surfacing per-statement errors too.
async fn run_ddl(db: &Surreal<Any>, table: &str, sql: &str) -> Result<()> {
    db.query(sql)
        .await
        .and_then(|response| response.check())
        .map_err(|e| StateError::SchemaSetup(format!("{table}: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn mem_db() -> Surreal<Any> {
        let db = surrealdb::engine::any::connect("mem://").await.unwrap();
        db.use_ns("test").use_db("test").await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_init_schema_is_idempotent() {
        let db = mem_db().await;
        init_schema(&db).await.unwrap();
        init_schema(&db).await.unwrap();
    }

    #[tokio::test]
    async fn test_bad_ddl_is_schema_error() {
        let db = mem_db().await;
        let err = run_ddl(&db, "builds", "DEFINE TABLEX builds;").await.unwrap_err();
        assert!(matches!(err, StateError::SchemaSetup(ref msg) if msg.starts_with("builds:")));
    }
}
