/// Disk-based blob storage backend
use crate::{
    blob_store::BlobBackend,
    error::{NoteboardError, NoteboardResult},
};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::{fs, io::AsyncWriteExt};

/// Disk storage backend
///
/// Stores every blob of one namespace directly inside `base_path`, under the
/// name it was given. Names are validated by the caller.
#[derive(Clone)]
pub struct DiskBlobBackend {
    base_path: PathBuf,
}

impl DiskBlobBackend {
    /// Create a new disk storage backend
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn get_blob_path(&self, name: &str) -> PathBuf {
        self.base_path.join(name)
    }
}

#[async_trait]
impl BlobBackend for DiskBlobBackend {
    async fn ensure(&self) -> NoteboardResult<()> {
        match fs::create_dir_all(&self.base_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(NoteboardError::BlobStorage(format!(
                "Failed to create blob directory {:?}: {}",
                self.base_path, e
            ))),
        }
    }

    async fn create(&self, name: &str, data: &[u8]) -> NoteboardResult<bool> {
        let blob_path = self.get_blob_path(name);

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&blob_path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => {
                return Err(NoteboardError::BlobStorage(format!(
                    "Failed to create blob {}: {}",
                    name, e
                )))
            }
        };

        let written = async {
            file.write_all(data).await?;
            file.flush().await
        }
        .await;

        if let Err(e) = written {
            drop(file);
            // Don't leave a truncated blob behind under a name we claimed
            if let Err(cleanup) = fs::remove_file(&blob_path).await {
                tracing::warn!("Failed to remove partial blob {}: {}", name, cleanup);
            }
            return Err(NoteboardError::BlobStorage(format!(
                "Failed to write blob {}: {}",
                name, e
            )));
        }

        Ok(true)
    }

    async fn write(&self, name: &str, data: &[u8]) -> NoteboardResult<()> {
        let blob_path = self.get_blob_path(name);

        fs::write(&blob_path, data).await.map_err(|e| {
            NoteboardError::BlobStorage(format!("Failed to write blob {}: {}", name, e))
        })?;

        Ok(())
    }

    async fn read(&self, name: &str) -> NoteboardResult<Option<Vec<u8>>> {
        let blob_path = self.get_blob_path(name);

        match fs::read(&blob_path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(NoteboardError::BlobStorage(format!(
                "Failed to read blob {}: {}",
                name, e
            ))),
        }
    }

    async fn delete(&self, name: &str) -> NoteboardResult<bool> {
        let blob_path = self.get_blob_path(name);

        match fs::remove_file(&blob_path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(NoteboardError::BlobStorage(format!(
                "Failed to delete blob {}: {}",
                name, e
            ))),
        }
    }

    async fn exists(&self, name: &str) -> NoteboardResult<bool> {
        Ok(fs::try_exists(self.get_blob_path(name)).await?)
    }
}
