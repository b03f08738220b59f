//! Persistent storage using redb.
//!
//! This module provides ACID-compliant storage for:
//! - Profile documents (`profiles/{ownerId}`)
//! - Link documents (flat `links` collection)
//! - Uploaded binary objects (`profile_images/...`)
//!
//! [`Storage`] implements the [`DocumentStore`] and [`ObjectStore`] ports so
//! the rest of the crate can run against a local file or an in-memory database.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use redb::backends::InMemoryBackend;
use redb::Database;

use crate::backend::{DocumentStore, ObjectStore};
use crate::error::{LinkshareError, LinkshareResult, UploadError};
use crate::types::{LinkRecord, OwnerId, ProfilePatch, ProfileRecord};

// Submodules
mod links;
mod objects;
mod profiles;

use links::LINKS_TABLE;
use objects::OBJECTS_TABLE;
use profiles::PROFILES_TABLE;

pub use objects::StoredObject;

/// Base URL used for object download links when none is configured
pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8080/assets";

/// Storage layer using redb for ACID-compliant persistence
#[derive(Clone)]
pub struct Storage {
    db: Arc<RwLock<Database>>,
    public_base_url: Arc<str>,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("public_base_url", &self.public_base_url)
            .finish()
    }
}

impl Storage {
    /// Create a new storage instance at the given path.
    ///
    /// This will:
    /// - Create the database directory if it doesn't exist
    /// - Initialize the database file
    /// - Create all required tables
    pub fn new(path: impl AsRef<Path>) -> LinkshareResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        Self::init(Database::create(path)?)
    }

    /// Create a storage instance that lives only in memory. Use for tests.
    pub fn in_memory() -> LinkshareResult<Self> {
        let db = Database::builder().create_with_backend(InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> LinkshareResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(PROFILES_TABLE)?;
            let _ = write_txn.open_table(LINKS_TABLE)?;
            let _ = write_txn.open_table(OBJECTS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self {
            db: Arc::new(RwLock::new(db)),
            public_base_url: Arc::from(DEFAULT_PUBLIC_BASE_URL),
        })
    }

    /// Set the base URL that object download links are built from
    pub fn with_public_base_url(mut self, base_url: &str) -> Self {
        self.public_base_url = Arc::from(base_url.trim_end_matches('/'));
        self
    }

    pub fn public_base_url(&self) -> &str {
        &self.public_base_url
    }

    /// Get a reference to the shared database handle
    pub(crate) fn db_handle(&self) -> Arc<RwLock<Database>> {
        self.db.clone()
    }
}

#[async_trait]
impl DocumentStore for Storage {
    async fn get_profile(&self, owner: &OwnerId) -> LinkshareResult<Option<ProfileRecord>> {
        self.load_profile(owner)
    }

    async fn merge_profile(
        &self,
        owner: &OwnerId,
        patch: &ProfilePatch,
    ) -> LinkshareResult<ProfileRecord> {
        self.write_profile_patch(owner, patch)
    }

    async fn query_links(&self, owner: &OwnerId) -> LinkshareResult<Vec<LinkRecord>> {
        self.list_links_for(owner)
    }
}

#[async_trait]
impl ObjectStore for Storage {
    async fn put_object(
        &self,
        path: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), UploadError> {
        self.save_object(path, &bytes, content_type)
            .map_err(storage_fault)
    }

    async fn download_url(&self, path: &str) -> Result<String, UploadError> {
        self.object_url(path)
            .map_err(storage_fault)?
            .ok_or_else(|| UploadError::Other(format!("object not found: {}", path)))
    }
}

fn storage_fault(err: LinkshareError) -> UploadError {
    UploadError::Other(err.to_string())
}
