/// Drawing metadata records
use crate::{db::parse_timestamp, error::NoteboardResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Stored drawing metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drawing {
    pub id: String,
    /// Public path, `/drawings/<name>`; unique across drawings
    pub file_path: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Drawing metadata store
#[derive(Clone)]
pub struct DrawingStore {
    db: SqlitePool,
}

impl DrawingStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Insert a drawing record for a freshly stored blob
    pub async fn insert(&self, file_path: &str) -> NoteboardResult<Drawing> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO drawings (id, file_path, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(file_path)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.db)
        .await?;

        Ok(Drawing {
            id,
            file_path: file_path.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Record a drawing at `file_path`, or refresh `updated_at` if one exists.
    ///
    /// Safe to race: concurrent callers for the same path all succeed and
    /// end up sharing one record.
    pub async fn upsert(&self, file_path: &str) -> NoteboardResult<Drawing> {
        let now = Utc::now().to_rfc3339();

        let row = sqlx::query(
            r#"
            INSERT INTO drawings (id, file_path, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(file_path) DO UPDATE SET updated_at = excluded.updated_at
            RETURNING id, file_path, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(file_path)
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.db)
        .await?;

        parse_drawing(row)
    }

    /// File paths of all drawings in insertion order
    pub async fn list_file_paths(&self) -> NoteboardResult<Vec<String>> {
        let paths = sqlx::query_scalar::<_, String>("SELECT file_path FROM drawings ORDER BY rowid")
            .fetch_all(&self.db)
            .await?;

        Ok(paths)
    }

    /// Look up a drawing by its exact file path
    pub async fn find_by_file_path(&self, file_path: &str) -> NoteboardResult<Option<Drawing>> {
        let row = sqlx::query(
            r#"
            SELECT id, file_path, created_at, updated_at
            FROM drawings
            WHERE file_path = ?
            "#,
        )
        .bind(file_path)
        .fetch_optional(&self.db)
        .await?;

        row.map(parse_drawing).transpose()
    }

    /// Replace a drawing's file path and refresh `updated_at`.
    ///
    /// Returns the number of rows touched; no match is not an error.
    pub async fn update_file_path(&self, old_path: &str, new_path: &str) -> NoteboardResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE drawings
            SET file_path = ?, updated_at = ?
            WHERE file_path = ?
            "#,
        )
        .bind(new_path)
        .bind(Utc::now().to_rfc3339())
        .bind(old_path)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }

    /// Delete the drawing with this exact file path
    pub async fn delete_by_file_path(&self, file_path: &str) -> NoteboardResult<u64> {
        let result = sqlx::query("DELETE FROM drawings WHERE file_path = ?")
            .bind(file_path)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }
}

fn parse_drawing(row: sqlx::sqlite::SqliteRow) -> NoteboardResult<Drawing> {
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Drawing {
        id: row.get("id"),
        file_path: row.get("file_path"),
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}
