//! Asset Upload Pipeline - validated avatar uploads
//!
//! A candidate is checked locally (size, then MIME type) before any storage
//! call. Accepted assets are written to a deterministic, owner-scoped path:
//!
//! ```text
//! profile_images/{ownerId}/avatar.{extension}
//! ```
//!
//! so a new upload with the same extension replaces the previous avatar
//! instead of accumulating files. Storage failures are returned as-is; the
//! pipeline never retries on its own.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::backend::ObjectStore;
use crate::config::{LinkshareConfig, ACCEPTED_MIME_PREFIX, MAX_ASSET_BYTES};
use crate::error::{UploadError, ValidationError};
use crate::types::{AssetReference, OwnerId, UploadedAsset};

/// Root folder for avatar objects
pub const AVATAR_ROOT: &str = "profile_images";

/// Storage path for an owner's avatar with the candidate's extension
pub fn avatar_path(owner: &OwnerId, candidate: &UploadedAsset) -> String {
    format!("{}/{}/avatar.{}", AVATAR_ROOT, owner, candidate.extension())
}

/// Validates and stores avatar images
#[derive(Clone)]
pub struct AssetUploader {
    store: Arc<dyn ObjectStore>,
    max_bytes: u64,
    mime_prefix: String,
}

impl std::fmt::Debug for AssetUploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetUploader")
            .field("max_bytes", &self.max_bytes)
            .field("mime_prefix", &self.mime_prefix)
            .finish()
    }
}

impl AssetUploader {
    /// Uploader with the default 5 MiB / `image/` limits
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            max_bytes: MAX_ASSET_BYTES,
            mime_prefix: ACCEPTED_MIME_PREFIX.to_string(),
        }
    }

    pub fn with_config(store: Arc<dyn ObjectStore>, config: &LinkshareConfig) -> Self {
        Self {
            store,
            max_bytes: config.max_asset_bytes,
            mime_prefix: config.accepted_mime_prefix.clone(),
        }
    }

    /// Local checks only. Size is checked before type.
    pub fn validate(&self, candidate: &UploadedAsset) -> Result<(), ValidationError> {
        if candidate.byte_size > self.max_bytes {
            return Err(ValidationError::Size {
                actual: candidate.byte_size,
                limit: self.max_bytes,
            });
        }
        if !candidate.mime_type.starts_with(&self.mime_prefix) {
            return Err(ValidationError::Type {
                mime_type: candidate.mime_type.clone(),
            });
        }
        Ok(())
    }

    /// Validate, store and resolve a public reference for `candidate`.
    ///
    /// On a validation error nothing is written.
    pub async fn upload(
        &self,
        candidate: &UploadedAsset,
        owner: &OwnerId,
    ) -> Result<AssetReference, UploadError> {
        if let Err(e) = self.validate(candidate) {
            debug!(%owner, file = %candidate.file_name, error = %e, "Rejected avatar candidate");
            return Err(e.into());
        }

        let path = avatar_path(owner, candidate);
        debug!(%owner, %path, bytes = candidate.byte_size, "Uploading avatar");

        if let Err(e) = self
            .store
            .put_object(&path, candidate.bytes.clone(), &candidate.mime_type)
            .await
        {
            warn!(%owner, %path, error = %e, "Avatar upload failed");
            return Err(e);
        }

        let url = self.store.download_url(&path).await.map_err(|e| {
            warn!(%owner, %path, error = %e, "Could not resolve avatar URL");
            e
        })?;

        info!(%owner, %path, "Avatar uploaded");
        Ok(AssetReference { path, url })
    }
}
