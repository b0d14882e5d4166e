/// Noteboard - backend for PDF notes and drawings
///
/// Stores uploaded PDFs with their metadata, freehand drawings as PNG
/// images, and text notes attached to PDFs, behind a small JSON HTTP API.

mod api;
mod blob_store;
mod config;
mod context;
mod db;
mod error;
mod server;

use config::{LogFormat, ServerConfig, DEFAULT_LOG_FILTER};
use context::AppContext;
use error::NoteboardResult;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> NoteboardResult<()> {
    // Load configuration
    let config = ServerConfig::from_env()?;

    // Initialize logging
    init_tracing(&config);

    tracing::info!("Starting noteboard v{}", env!("CARGO_PKG_VERSION"));

    // Create application context
    let ctx = AppContext::new(config).await?;

    // Start server
    server::serve(ctx).await?;

    Ok(())
}

fn init_tracing(config: &ServerConfig) {
    let filter = tracing_subscriber::EnvFilter::try_new(&config.logging.level)
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    let registry = tracing_subscriber::registry().with(filter);

    match config.logging.format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}
