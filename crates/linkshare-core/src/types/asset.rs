//! Uploaded asset types
//!
//! An [`UploadedAsset`] lives only on the client between file selection and
//! a committed profile write. Once stored it is known by its [`AssetReference`].

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Candidate avatar selected by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    pub file_name: String,
    pub byte_size: u64,
    pub mime_type: String,
    pub bytes: Bytes,
}

impl UploadedAsset {
    /// Build a candidate; `byte_size` is taken from the data
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        let bytes: Bytes = bytes.into();
        Self {
            file_name: file_name.into(),
            byte_size: bytes.len() as u64,
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Text after the last `.` of the file name (the whole name if there is none)
    pub fn extension(&self) -> &str {
        self.file_name
            .rsplit('.')
            .next()
            .unwrap_or(self.file_name.as_str())
    }
}

/// Durable, publicly resolvable reference to a stored asset
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetReference {
    /// Owner-scoped storage path
    pub path: String,
    /// URL written into the profile's `imageUrl`
    pub url: String,
}
