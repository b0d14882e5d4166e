/// PDF upload and listing endpoints
use crate::{
    context::AppContext,
    db::{NewPdf, PdfRecord},
    error::{NoteboardError, NoteboardResult},
};
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

/// Multipart field carrying the file
const FILE_FIELD: &str = "file";

/// Build PDF routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/upload", post(upload_pdf))
        .route("/pdfs", get(list_pdfs))
}

/// Parts of an upload form we care about
#[derive(Debug, Default)]
struct UploadForm {
    title: Option<String>,
    description: Option<String>,
    author: Option<String>,
    file: Option<(Option<String>, Vec<u8>)>,
}

async fn read_upload_form(mut multipart: Multipart) -> NoteboardResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            FILE_FIELD => {
                let original_name = field.file_name().map(String::from);
                let data = field.bytes().await?;
                form.file = Some((original_name, data.to_vec()));
            }
            "title" => form.title = Some(field.text().await?),
            "description" => form.description = Some(field.text().await?),
            "author" => form.author = Some(field.text().await?),
            other => tracing::debug!("Ignoring multipart field {:?}", other),
        }
    }

    Ok(form)
}

/// Upload a PDF: store the file, then record its metadata.
///
/// If the metadata insert fails the stored file is removed again.
async fn upload_pdf(
    State(ctx): State<AppContext>,
    multipart: Result<Multipart, MultipartRejection>,
) -> NoteboardResult<(StatusCode, Json<PdfRecord>)> {
    let multipart = multipart.map_err(|e| NoteboardError::rejected(e.status(), e.body_text()))?;
    let form = read_upload_form(multipart).await?;

    let (original_name, data) = form
        .file
        .ok_or_else(|| NoteboardError::BadRequest("No file uploaded".to_string()))?;

    tracing::debug!("Upload size: {} bytes", data.len());

    let stored = ctx
        .blob_store
        .store_upload(FILE_FIELD, original_name.as_deref(), &data)
        .await?;

    let inserted = ctx
        .pdfs
        .insert(NewPdf {
            title: form.title,
            description: form.description,
            author: form.author,
            file_path: stored.file_path.clone(),
            size: stored.size as i64,
        })
        .await;

    match inserted {
        Ok(record) => Ok((StatusCode::CREATED, Json(record))),
        Err(err) => {
            if let Err(cleanup) = ctx.blob_store.remove_upload(&stored.file_name).await {
                tracing::warn!("Failed to remove orphaned upload {}: {}", stored.file_name, cleanup);
            }
            Err(err)
        }
    }
}

/// List every stored PDF record
async fn list_pdfs(State(ctx): State<AppContext>) -> NoteboardResult<Json<Vec<PdfRecord>>> {
    Ok(Json(ctx.pdfs.list().await?))
}
