/// Database layer for the noteboard backend
///
/// Manages the SQLite connection pool and migrations, and provides typed
/// access to the pdfs, drawings and notes tables.

pub mod drawings;
pub mod notes;
pub mod pdfs;

pub use drawings::DrawingStore;
pub use notes::{Note, NoteStore};
pub use pdfs::{NewPdf, PdfRecord, PdfStore};

use crate::error::{NoteboardError, NoteboardResult};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;

/// Database connection options
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    pub max_connections: u32,
    pub enable_wal: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            enable_wal: true,
        }
    }
}

/// Create a SQLite connection pool
pub async fn create_pool(path: &Path, options: DatabaseOptions) -> NoteboardResult<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(options.max_connections)
        .connect_with(
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(if options.enable_wal {
                    SqliteJournalMode::Wal
                } else {
                    SqliteJournalMode::Delete
                })
                .busy_timeout(std::time::Duration::from_secs(5)),
        )
        .await?;

    Ok(pool)
}

/// Run migrations for a database
/// Migrations are embedded at compile time from ./migrations directory
pub async fn run_migrations(pool: &SqlitePool) -> NoteboardResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;

    Ok(())
}

/// Test database connection
pub async fn test_connection(pool: &SqlitePool) -> NoteboardResult<()> {
    sqlx::query("SELECT 1").execute(pool).await?;

    Ok(())
}

/// Parse a timestamp stored as RFC 3339 text
pub(crate) fn parse_timestamp(value: &str) -> NoteboardResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| NoteboardError::Internal(format!("Invalid timestamp {:?}: {}", value, e)))
}

#[cfg(test)]
pub(crate) async fn create_test_pool() -> (tempfile::TempDir, SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let pool = create_pool(&dir.path().join("test.sqlite"), DatabaseOptions::default())
        .await
        .unwrap();
    run_migrations(&pool).await.unwrap();
    (dir, pool)
}
