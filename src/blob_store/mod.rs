/// Blob Storage System
///
/// Holds the binary payloads behind PDF and drawing records: uploaded files
/// in the `uploads` namespace and PNG drawings in the `drawings` namespace.

pub mod data_uri;
pub mod disk;
pub mod store;

pub use data_uri::{decode_data_uri, encode_data_uri, mime_type_for};
pub use store::{BlobStore, BlobStoreConfig};

use crate::error::{NoteboardError, NoteboardResult};
use async_trait::async_trait;

/// Blob storage backend trait
///
/// One backend covers one flat namespace of named blobs.
#[async_trait]
pub trait BlobBackend: Send + Sync {
    /// Create the namespace if it does not exist yet
    async fn ensure(&self) -> NoteboardResult<()>;

    /// Write a new blob; returns false without writing if the name is taken
    async fn create(&self, name: &str, data: &[u8]) -> NoteboardResult<bool>;

    /// Write a blob, replacing any existing content
    async fn write(&self, name: &str, data: &[u8]) -> NoteboardResult<()>;

    /// Read a blob by name
    async fn read(&self, name: &str) -> NoteboardResult<Option<Vec<u8>>>;

    /// Delete a blob; returns false if it did not exist
    async fn delete(&self, name: &str) -> NoteboardResult<bool>;

    /// Check if a blob exists
    async fn exists(&self, name: &str) -> NoteboardResult<bool>;
}

/// Reject names that are not a single plain path component.
///
/// Names come straight from URL parameters, so anything that could escape
/// the namespace directory is a client error.
pub fn validate_blob_name(name: &str) -> NoteboardResult<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(&['/', '\\', '\0'][..])
        && !name.contains("..");

    if valid {
        Ok(())
    } else {
        Err(NoteboardError::BadRequest(format!("Invalid file name: {}", name)))
    }
}
