/// API routes and handlers
pub mod drawings;
pub mod extract;
pub mod notes;
pub mod pdfs;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(pdfs::routes())
        .merge(drawings::routes())
        .merge(notes::routes())
}
