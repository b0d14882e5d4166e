/// Notes attached to PDFs
use crate::{db::parse_timestamp, error::NoteboardResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Stored note
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    /// Id of the PDF this note belongs to; not checked against the pdfs table
    pub pdf_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Note store
#[derive(Clone)]
pub struct NoteStore {
    db: SqlitePool,
}

impl NoteStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Insert a note, assigning its id and creation time
    pub async fn insert(&self, pdf_id: &str, content: &str) -> NoteboardResult<Note> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO notes (id, pdf_id, content, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(pdf_id)
        .bind(content)
        .bind(now.to_rfc3339())
        .execute(&self.db)
        .await?;

        Ok(Note {
            id,
            pdf_id: pdf_id.to_string(),
            content: content.to_string(),
            created_at: now,
        })
    }

    /// All notes for one PDF, in insertion order
    pub async fn list_for_pdf(&self, pdf_id: &str) -> NoteboardResult<Vec<Note>> {
        let rows = sqlx::query(
            r#"
            SELECT id, pdf_id, content, created_at
            FROM notes
            WHERE pdf_id = ?
            ORDER BY rowid
            "#,
        )
        .bind(pdf_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|row| {
                let created_at: String = row.get("created_at");
                Ok(Note {
                    id: row.get("id"),
                    pdf_id: row.get("pdf_id"),
                    content: row.get("content"),
                    created_at: parse_timestamp(&created_at)?,
                })
            })
            .collect()
    }
}
