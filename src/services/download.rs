//! Token-gated download path.
//!
//! Validates a presented token against the store and fetches the backing
//! object. Reads mutate nothing; a link may be used repeatedly until expiry.

use std::sync::Arc;

use chrono::Utc;

use crate::blob::{BlobError, BlobStore, StoredObject};
use crate::store::{StoreError, TokenStore};

/// Why a download request was refused.
///
/// The first three variants are addressable access outcomes and map to
/// distinct client-facing statuses; they are never collapsed into a generic
/// error. Backend failures stay separate.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("Missing token")]
    MissingToken,

    /// Unknown token, or a valid token whose backing object is gone
    #[error("Link not found or expired")]
    NotFound,

    #[error("This download link has expired")]
    Expired,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Blob(#[from] BlobError),
}

/// A granted download: the object plus the filename to present.
#[derive(Debug)]
pub struct Download {
    pub filename: String,
    pub object: StoredObject,
}

/// Serves token-gated file downloads.
pub struct DownloadService {
    store: Arc<dyn TokenStore>,
    blob: Arc<dyn BlobStore>,
}

impl DownloadService {
    pub fn new(store: Arc<dyn TokenStore>, blob: Arc<dyn BlobStore>) -> Self {
        Self { store, blob }
    }

    /// Resolve a presented token into a downloadable object.
    ///
    /// # Decision order
    ///
    /// 1. Missing or empty token parameter → [`DownloadError::MissingToken`]
    /// 2. No record for the token → [`DownloadError::NotFound`]
    /// 3. Record expired (strict: invalid at exactly `expires_at`) →
    ///    [`DownloadError::Expired`]
    /// 4. Backing object missing → [`DownloadError::NotFound`] (the link was
    ///    valid but the asset is gone)
    pub async fn serve(&self, token: Option<&str>) -> Result<Download, DownloadError> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(DownloadError::MissingToken)?;

        let record = self
            .store
            .get_token(token)
            .await?
            .ok_or(DownloadError::NotFound)?;

        if !record.is_valid_at(Utc::now()) {
            tracing::warn!(expires_at = %record.expires_at, "Expired download link presented");
            return Err(DownloadError::Expired);
        }

        let object = self
            .blob
            .get(&record.resource_key)
            .await?
            .ok_or_else(|| {
                tracing::error!(resource_key = %record.resource_key, "Backing object missing");
                DownloadError::NotFound
            })?;

        Ok(Download {
            filename: basename(&record.resource_key),
            object,
        })
    }
}

/// Last path segment of a storage key, for the attachment filename.
fn basename(key: &str) -> String {
    key.rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("download")
        .to_string()
}
