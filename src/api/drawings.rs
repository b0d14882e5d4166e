/// Drawing endpoints: save, list, fetch as data URL, edit, delete
use crate::{
    api::extract::AppJson,
    blob_store::{encode_data_uri, store::drawing_url},
    context::AppContext,
    error::{NoteboardError, NoteboardResult},
};
use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

/// Build drawing routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/save-drawing", post(save_drawing))
        .route("/drawings", get(list_drawings))
        .route("/drawings/:filename", get(get_drawing).delete(delete_drawing))
        .route("/edit-drawing/:filename", put(edit_drawing))
}

/// Body of save and edit requests
#[derive(Debug, Deserialize)]
pub struct DrawingPayload {
    #[serde(rename = "dataURL")]
    pub data_url: Option<String>,
}

impl DrawingPayload {
    /// The data URL, treating an empty string as missing
    fn require(self) -> NoteboardResult<String> {
        self.data_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| NoteboardError::BadRequest("No drawing data received".to_string()))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDrawingResponse {
    pub image_url: String,
}

#[derive(Debug, Serialize)]
pub struct DrawingDataResponse {
    #[serde(rename = "dataURL")]
    pub data_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditDrawingResponse {
    pub message: String,
    pub image_url: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Save a new drawing from a data URL.
///
/// The returned `imageUrl` is the drawing's public path: `GET` on it answers
/// with the image as a data URL, and the raw PNG is served under
/// `/files/drawings/<name>`. If the metadata insert fails the stored image is
/// removed again.
async fn save_drawing(
    State(ctx): State<AppContext>,
    AppJson(payload): AppJson<DrawingPayload>,
) -> NoteboardResult<Json<SaveDrawingResponse>> {
    let data_url = payload.require()?;

    let stored = ctx.blob_store.store_drawing(&data_url).await?;

    if let Err(err) = ctx.drawings.insert(&stored.image_url).await {
        if let Err(cleanup) = ctx.blob_store.delete_drawing(&stored.file_name).await {
            tracing::warn!("Failed to remove orphaned drawing {}: {}", stored.file_name, cleanup);
        }
        return Err(err);
    }

    Ok(Json(SaveDrawingResponse {
        image_url: stored.image_url,
    }))
}

/// File paths of all saved drawings
async fn list_drawings(State(ctx): State<AppContext>) -> NoteboardResult<Json<Vec<String>>> {
    Ok(Json(ctx.drawings.list_file_paths().await?))
}

/// Fetch a drawing re-encoded as a data URL
async fn get_drawing(
    State(ctx): State<AppContext>,
    Path(filename): Path<String>,
) -> NoteboardResult<Json<DrawingDataResponse>> {
    let (data, mime_type) = ctx.blob_store.read_drawing(&filename).await?;

    Ok(Json(DrawingDataResponse {
        data_url: encode_data_uri(mime_type, &data),
    }))
}

/// Delete a drawing's image, then its record
async fn delete_drawing(
    State(ctx): State<AppContext>,
    Path(filename): Path<String>,
) -> NoteboardResult<Json<MessageResponse>> {
    ctx.blob_store.delete_drawing(&filename).await?;

    let removed = ctx.drawings.delete_by_file_path(&drawing_url(&filename)).await?;
    if removed == 0 {
        tracing::warn!("Deleted drawing {} had no metadata record", filename);
    }

    Ok(Json(MessageResponse {
        message: "Image deleted successfully.".to_string(),
    }))
}

/// Overwrite a drawing's image in place.
///
/// A drawing whose record went missing gets a fresh one, so every image on
/// disk stays listed.
async fn edit_drawing(
    State(ctx): State<AppContext>,
    Path(filename): Path<String>,
    AppJson(payload): AppJson<DrawingPayload>,
) -> NoteboardResult<Json<EditDrawingResponse>> {
    let data_url = payload.require()?;
    let image_url = drawing_url(&filename);

    ctx.blob_store.overwrite_drawing(&filename, &data_url).await?;

    match ctx.drawings.find_by_file_path(&image_url).await? {
        Some(drawing) => {
            ctx.drawings
                .update_file_path(&drawing.file_path, &image_url)
                .await?;
            tracing::debug!("Updated drawing {} ({})", drawing.id, image_url);
        }
        None => {
            // A concurrent edit may have recorded it since the lookup
            let drawing = ctx.drawings.upsert(&image_url).await?;
            tracing::info!("Recorded untracked drawing {} ({})", drawing.id, image_url);
        }
    }

    Ok(Json(EditDrawingResponse {
        message: "Drawing updated successfully.".to_string(),
        image_url,
    }))
}
