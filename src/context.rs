/// Application context and dependency injection
use crate::{
    blob_store::{BlobStore, BlobStoreConfig},
    config::ServerConfig,
    db::{self, DatabaseOptions, DrawingStore, NoteStore, PdfStore},
    error::NoteboardResult,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub blob_store: Arc<BlobStore>,
    pub pdfs: Arc<PdfStore>,
    pub drawings: Arc<DrawingStore>,
    pub notes: Arc<NoteStore>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> NoteboardResult<Self> {
        // Validate configuration
        config.validate()?;

        // Blob namespaces must exist before the first request
        let blob_store = Arc::new(BlobStore::new(&BlobStoreConfig {
            uploads_location: config.storage.uploads_directory.clone(),
            drawings_location: config.storage.drawings_directory.clone(),
        }));
        blob_store.ensure_namespaces().await?;

        // Initialize metadata database
        let db = db::create_pool(
            &config.storage.database,
            DatabaseOptions {
                max_connections: config.storage.database_max_connections,
                ..DatabaseOptions::default()
            },
        )
        .await?;
        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        tracing::info!("Metadata store ready at {:?}", config.storage.database);

        Ok(Self {
            pdfs: Arc::new(PdfStore::new(db.clone())),
            drawings: Arc::new(DrawingStore::new(db.clone())),
            notes: Arc::new(NoteStore::new(db.clone())),
            config: Arc::new(config),
            db,
            blob_store,
        })
    }
}
