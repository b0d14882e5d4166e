/// Note endpoints
use crate::{
    api::extract::AppJson,
    context::AppContext,
    db::Note,
    error::{NoteboardError, NoteboardResult},
};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

/// Build note routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/notes", post(create_note))
        .route("/notes/:pdf_id", get(list_notes))
}

/// Request body for creating a note
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteRequest {
    pub pdf_id: Option<String>,
    pub content: Option<String>,
}

fn required(value: Option<String>, field: &str) -> NoteboardResult<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| NoteboardError::BadRequest(format!("Missing required field: {}", field)))
}

/// Attach a note to a PDF
async fn create_note(
    State(ctx): State<AppContext>,
    AppJson(request): AppJson<CreateNoteRequest>,
) -> NoteboardResult<Json<Note>> {
    let pdf_id = required(request.pdf_id, "pdfId")?;
    let content = required(request.content, "content")?;

    let note = ctx.notes.insert(&pdf_id, &content).await?;
    Ok(Json(note))
}

/// Notes belonging to one PDF
async fn list_notes(
    State(ctx): State<AppContext>,
    Path(pdf_id): Path<String>,
) -> NoteboardResult<Json<Vec<Note>>> {
    Ok(Json(ctx.notes.list_for_pdf(&pdf_id).await?))
}
