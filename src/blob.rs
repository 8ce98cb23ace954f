//! Pluggable blob storage for deliverable files.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

/// Errors from the blob backend.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("storage i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// A fetched object: content plus whatever metadata the backend knows.
#[derive(Debug, Clone)]
pub struct StoredObject {
    /// MIME content type, when the backend can determine one
    pub content_type: Option<String>,

    /// The raw object content
    pub data: Bytes,
}

/// Read-only blob storage backend.
///
/// Implementors provide the actual storage mechanism; the gateway only ever
/// fetches. A missing object is `Ok(None)`, never an error.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, BlobError>;
}

/// Filesystem-backed blob store rooted at a configured directory.
///
/// Keys are relative paths under the root (e.g. `products/demo.zip`).
/// Absolute keys and parent-directory components are rejected outright, so a
/// key can never escape the root.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a key to a path under the root, or `None` if the key is
    /// malformed or attempts traversal.
    fn resolve_path(&self, key: &str) -> Option<PathBuf> {
        let relative = Path::new(key);
        if key.is_empty()
            || !relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, BlobError> {
        let Some(path) = self.resolve_path(key) else {
            return Ok(None);
        };

        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(StoredObject {
                content_type: content_type_for(&path),
                data: Bytes::from(data),
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Best-effort content type from the file extension.
fn content_type_for(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "zip" => "application/zip",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "json" => "application/json",
        "txt" | "md" => "text/plain",
        _ => return None,
    };
    Some(mime.to_string())
}
