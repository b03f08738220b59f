//! Core types for Linkshare

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::LinkshareError;

mod asset;
mod link;
mod profile;

pub use asset::{AssetReference, UploadedAsset};
pub use link::{LinkRecord, Platform};
pub use profile::{ProfilePatch, ProfileRecord};

/// Stable identity issued by the external identity provider.
///
/// The id is the join key for profiles, links and stored assets, and is used
/// verbatim as a storage path segment, so it must be non-empty and free of `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OwnerId(String);

impl OwnerId {
    /// Validate and wrap a provider-issued id
    pub fn new(id: impl Into<String>) -> Result<Self, LinkshareError> {
        let id = id.into();
        if id.trim().is_empty() || id.contains('/') {
            return Err(LinkshareError::InvalidOwner(id));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for OwnerId {
    type Error = LinkshareError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OwnerId> for String {
    fn from(value: OwnerId) -> Self {
        value.0
    }
}

impl std::str::FromStr for OwnerId {
    type Err = LinkshareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for a link record
///
/// Uses ULID so ids sort by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkId(pub Ulid);

impl LinkId {
    /// Create a new LinkId with current timestamp
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Parse from string representation
    pub fn from_string(s: &str) -> Result<Self, ulid::DecodeError> {
        Ok(Self(Ulid::from_string(s)?))
    }
}

impl Default for LinkId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
