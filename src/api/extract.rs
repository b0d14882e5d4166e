/// Request extractors that report rejections through the standard error body
use crate::error::NoteboardError;
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

/// A `Json<T>` wrapper that turns deserialization failures into
/// `NoteboardError::BadRequest` (or `PayloadTooLarge` past the body limit),
/// so clients always get a JSON error body.
pub struct AppJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = NoteboardError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| NoteboardError::rejected(e.status(), e.body_text()))?;
        Ok(AppJson(value))
    }
}
