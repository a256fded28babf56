//! Database access for mlx-indexer
//!
//! SQLite persistence for indexing jobs, their warnings and album records.

pub mod jobs;

pub use jobs::{cleanup_stale_jobs, SqliteJobStore};

use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
///
/// Creates the file (and parent directory) if needed and the indexer tables.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Private in-memory database (single connection, so all queries see the same data)
pub async fn init_memory_pool() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    init_tables(&pool).await?;
    Ok(pool)
}

/// Create indexing_jobs, indexing_warnings and indexed_albums if they don't exist
async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS indexing_jobs (
            job_id TEXT PRIMARY KEY,
            library_root TEXT NOT NULL,
            status TEXT NOT NULL,
            progress INTEGER NOT NULL DEFAULT 0,
            error TEXT,
            created_at TEXT NOT NULL,
            started_at TEXT,
            completed_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // seq preserves discovery order
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS indexing_warnings (
            job_id TEXT NOT NULL REFERENCES indexing_jobs(job_id) ON DELETE CASCADE,
            seq INTEGER NOT NULL,
            payload TEXT NOT NULL,
            PRIMARY KEY (job_id, seq)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS indexed_albums (
            job_id TEXT NOT NULL REFERENCES indexing_jobs(job_id) ON DELETE CASCADE,
            seq INTEGER NOT NULL,
            folder_path TEXT NOT NULL,
            payload TEXT NOT NULL,
            PRIMARY KEY (job_id, seq)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_indexing_jobs_status ON indexing_jobs(status)")
        .execute(pool)
        .await?;

    tracing::info!("Database tables initialized (indexing_jobs, indexing_warnings, indexed_albums)");

    Ok(())
}
