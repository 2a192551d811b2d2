//! Storage module
//!
//! Blob storage for course thumbnails and module content. Database rows
//! only hold the returned path.

mod local;

use async_trait::async_trait;

pub use local::LocalBlobStore;

/// Kind of uploaded content; decides the sub-directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobKind {
    Image,
    Pdf,
    Video,
}

impl BlobKind {
    pub fn dir_name(&self) -> &'static str {
        match self {
            BlobKind::Image => "images",
            BlobKind::Pdf => "pdfs",
            BlobKind::Video => "videos",
        }
    }
}

/// An uploaded file held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Empty upload: {0}")]
    EmptyUpload(String),
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persist the upload and return its path.
    async fn put(&self, kind: BlobKind, upload: &Upload) -> Result<String, StorageError>;

    /// Delete a stored blob.
    async fn remove(&self, path: &str) -> Result<(), StorageError>;
}

/// Delete a blob without failing the caller.
///
/// The database write has already committed when this runs; a leftover
/// file is only logged.
pub async fn remove_best_effort(store: &dyn BlobStore, path: Option<&str>) {
    let Some(path) = path.filter(|p| !p.is_empty()) else {
        return;
    };
    if let Err(e) = store.remove(path).await {
        tracing::warn!(path = path, error = %e, "Failed to delete stored file");
    }
}
