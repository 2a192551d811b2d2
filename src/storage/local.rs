//! Local filesystem blob store

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::{BlobKind, BlobStore, StorageError, Upload};

/// Stores blobs under `<root>/<kind>/<uuid>-<digest><ext>`.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn file_name_for(upload: &Upload) -> String {
        let digest = hex::encode(Sha256::digest(&upload.bytes));
        let ext = Path::new(&upload.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_ascii_lowercase()))
            .unwrap_or_default();
        format!("{}-{}{}", Uuid::new_v4(), &digest[..16], ext)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, kind: BlobKind, upload: &Upload) -> Result<String, StorageError> {
        if upload.bytes.is_empty() {
            return Err(StorageError::EmptyUpload(upload.file_name.clone()));
        }

        let dir = self.root.join(kind.dir_name());
        tokio::fs::create_dir_all(&dir).await?;

        let path = dir.join(Self::file_name_for(upload));
        tokio::fs::write(&path, &upload.bytes).await?;

        tracing::debug!(path = %path.display(), size = upload.bytes.len(), "Stored upload");
        Ok(path.to_string_lossy().into_owned())
    }

    async fn remove(&self, path: &str) -> Result<(), StorageError> {
        tokio::fs::remove_file(path).await?;
        Ok(())
    }
}
