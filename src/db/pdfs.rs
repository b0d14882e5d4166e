/// PDF metadata records
use crate::{db::parse_timestamp, error::NoteboardResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Stored PDF metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfRecord {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Public path of the binary, `uploads/<name>`
    pub file_path: String,
    /// Size in bytes
    pub size: i64,
    pub upload_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

/// Fields supplied by the uploader
#[derive(Debug, Clone, Default)]
pub struct NewPdf {
    pub title: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub file_path: String,
    pub size: i64,
}

/// PDF metadata store
#[derive(Clone)]
pub struct PdfStore {
    db: SqlitePool,
}

impl PdfStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Insert a PDF record, assigning its id and upload date
    pub async fn insert(&self, pdf: NewPdf) -> NoteboardResult<PdfRecord> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO pdfs (id, title, description, file_path, size, upload_date, author)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&pdf.title)
        .bind(&pdf.description)
        .bind(&pdf.file_path)
        .bind(pdf.size)
        .bind(now.to_rfc3339())
        .bind(&pdf.author)
        .execute(&self.db)
        .await?;

        tracing::debug!("Inserted PDF record {} for {}", id, pdf.file_path);

        Ok(PdfRecord {
            id,
            title: pdf.title,
            description: pdf.description,
            file_path: pdf.file_path,
            size: pdf.size,
            upload_date: now,
            author: pdf.author,
        })
    }

    /// List all PDF records in insertion order
    pub async fn list(&self) -> NoteboardResult<Vec<PdfRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, description, file_path, size, upload_date, author
            FROM pdfs
            ORDER BY rowid
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(parse_pdf).collect()
    }
}

fn parse_pdf(row: sqlx::sqlite::SqliteRow) -> NoteboardResult<PdfRecord> {
    let upload_date: String = row.get("upload_date");

    Ok(PdfRecord {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        file_path: row.get("file_path"),
        size: row.get("size"),
        upload_date: parse_timestamp(&upload_date)?,
        author: row.get("author"),
    })
}
