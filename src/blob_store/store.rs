/// Blob Store Manager
///
/// Coordinates the uploads and drawings namespaces and owns the naming
/// scheme for newly stored blobs.
use crate::{
    blob_store::{decode_data_uri, disk::DiskBlobBackend, mime_type_for, validate_blob_name, BlobBackend},
    error::{NoteboardError, NoteboardResult},
};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// How many successive millisecond stamps are tried before giving up on a name
const MAX_NAME_ATTEMPTS: i64 = 1000;

/// Public path prefix of uploaded files
pub const UPLOADS_PREFIX: &str = "uploads";

/// Public path prefix of drawings.
///
/// `/drawings/<name>` is the JSON route answering with a data URL; the raw
/// image bytes are served under `/files/drawings/<name>`.
pub const DRAWINGS_PREFIX: &str = "/drawings";

/// Blob store configuration
#[derive(Debug, Clone)]
pub struct BlobStoreConfig {
    pub uploads_location: PathBuf,
    pub drawings_location: PathBuf,
}

/// Result of storing an uploaded file
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub file_name: String,
    /// Public path, `uploads/<file_name>`
    pub file_path: String,
    pub size: u64,
}

/// Result of storing a new drawing
#[derive(Debug, Clone)]
pub struct StoredDrawing {
    pub file_name: String,
    /// Public path, `/drawings/<file_name>`
    pub image_url: String,
}

/// Main blob store manager
#[derive(Clone)]
pub struct BlobStore {
    uploads: Arc<dyn BlobBackend>,
    drawings: Arc<dyn BlobBackend>,
}

impl BlobStore {
    /// Create a new blob store backed by the local disk
    pub fn new(config: &BlobStoreConfig) -> Self {
        Self::with_backends(
            Arc::new(DiskBlobBackend::new(config.uploads_location.clone())),
            Arc::new(DiskBlobBackend::new(config.drawings_location.clone())),
        )
    }

    /// Create a blob store over arbitrary backends
    pub fn with_backends(uploads: Arc<dyn BlobBackend>, drawings: Arc<dyn BlobBackend>) -> Self {
        Self { uploads, drawings }
    }

    /// Create both namespaces if they are missing
    pub async fn ensure_namespaces(&self) -> NoteboardResult<()> {
        self.uploads.ensure().await?;
        self.drawings.ensure().await?;
        Ok(())
    }

    /// Store an uploaded file as `<field_name>-<epoch millis><extension>`
    pub async fn store_upload(
        &self,
        field_name: &str,
        original_name: Option<&str>,
        data: &[u8],
    ) -> NoteboardResult<StoredUpload> {
        let extension = original_name.map(file_extension).unwrap_or_default();
        let file_name =
            create_unique(self.uploads.as_ref(), field_name, &extension, data).await?;

        tracing::info!("Stored upload {} ({} bytes)", file_name, data.len());

        Ok(StoredUpload {
            file_path: upload_path(&file_name),
            file_name,
            size: data.len() as u64,
        })
    }

    /// Remove an uploaded file; used to roll back a failed upload
    pub async fn remove_upload(&self, file_name: &str) -> NoteboardResult<()> {
        validate_blob_name(file_name)?;
        self.uploads.delete(file_name).await?;
        Ok(())
    }

    /// Decode a data URI and store it as a new `drawing-<epoch millis>.png`
    pub async fn store_drawing(&self, data_uri: &str) -> NoteboardResult<StoredDrawing> {
        let data = decode_data_uri(data_uri)?;
        let file_name = create_unique(self.drawings.as_ref(), "drawing", ".png", &data).await?;

        tracing::info!("Stored drawing {} ({} bytes)", file_name, data.len());

        Ok(StoredDrawing {
            image_url: drawing_url(&file_name),
            file_name,
        })
    }

    /// Read a drawing together with the MIME type implied by its extension
    pub async fn read_drawing(&self, file_name: &str) -> NoteboardResult<(Vec<u8>, &'static str)> {
        validate_blob_name(file_name)?;

        let data = self
            .drawings
            .read(file_name)
            .await?
            .ok_or_else(|| NoteboardError::NotFound("Image not found".to_string()))?;

        Ok((data, mime_type_for(file_name)))
    }

    /// Replace the content of a drawing in place.
    ///
    /// The drawing is not required to exist beforehand.
    pub async fn overwrite_drawing(&self, file_name: &str, data_uri: &str) -> NoteboardResult<()> {
        validate_blob_name(file_name)?;
        let data = decode_data_uri(data_uri)?;

        if !self.drawings.exists(file_name).await? {
            tracing::debug!("Drawing {} did not exist before edit", file_name);
        }

        self.drawings.write(file_name, &data).await
    }

    /// Delete a drawing; `NotFound` if there is nothing to delete
    pub async fn delete_drawing(&self, file_name: &str) -> NoteboardResult<()> {
        validate_blob_name(file_name)?;

        if !self.drawings.delete(file_name).await? {
            return Err(NoteboardError::NotFound("Image not found".to_string()));
        }

        tracing::info!("Deleted drawing {}", file_name);
        Ok(())
    }
}

/// Public path of a drawing
pub fn drawing_url(file_name: &str) -> String {
    format!("{}/{}", DRAWINGS_PREFIX, file_name)
}

/// Public path of an uploaded file
pub fn upload_path(file_name: &str) -> String {
    format!("{}/{}", UPLOADS_PREFIX, file_name)
}

/// Extension of the client's file name, dot included, if it is plain alphanumeric
fn file_extension(original_name: &str) -> String {
    Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default()
}

/// Write `data` under the first free `<prefix>-<millis><extension>` name.
///
/// Two writes in the same millisecond get consecutive stamps instead of
/// overwriting each other.
async fn create_unique(
    backend: &dyn BlobBackend,
    prefix: &str,
    extension: &str,
    data: &[u8],
) -> NoteboardResult<String> {
    let prefix = if validate_blob_name(prefix).is_ok() { prefix } else { "file" };
    let start = Utc::now().timestamp_millis();

    for offset in 0..MAX_NAME_ATTEMPTS {
        let file_name = format!("{}-{}{}", prefix, start + offset, extension);
        if backend.create(&file_name, data).await? {
            return Ok(file_name);
        }
    }

    Err(NoteboardError::BlobStorage(format!(
        "No free file name for {}-{}{}",
        prefix, start, extension
    )))
}
