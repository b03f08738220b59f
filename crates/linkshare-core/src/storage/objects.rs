//! Object Storage - uploaded binary assets keyed by storage path
//!
//! Each object carries its content type and a BLAKE3 hash of its bytes. The
//! hash is folded into the download URL so a replaced object gets a new URL
//! while its path stays the same.

use redb::{ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

use crate::error::{LinkshareError, LinkshareResult};

use super::Storage;

/// Table for storing objects (key: storage path, value: postcard StoredObject)
pub(crate) const OBJECTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("objects");

/// Number of hash hex chars used as the URL version tag
const VERSION_TAG_LEN: usize = 16;

/// A stored binary object with its metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    pub content_type: String,
    /// BLAKE3 hash of `bytes`, hex encoded
    pub hash: String,
    pub bytes: Vec<u8>,
}

impl Storage {
    /// Write an object, replacing whatever was stored at `path`
    pub fn save_object(&self, path: &str, bytes: &[u8], content_type: &str) -> LinkshareResult<()> {
        let object = StoredObject {
            content_type: content_type.to_string(),
            hash: blake3::hash(bytes).to_hex().to_string(),
            bytes: bytes.to_vec(),
        };
        let serialized = postcard::to_allocvec(&object)
            .map_err(|e| LinkshareError::Serialization(e.to_string()))?;

        let db = self.db_handle();
        let db_guard = db.read();
        let write_txn = db_guard.begin_write()?;
        {
            let mut table = write_txn.open_table(OBJECTS_TABLE)?;
            table.insert(path, serialized.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Load an object by path
    ///
    /// Returns `None` if nothing is stored there.
    pub fn load_object(&self, path: &str) -> LinkshareResult<Option<StoredObject>> {
        let db = self.db_handle();
        let db_guard = db.read();
        let read_txn = db_guard.begin_read()?;
        let table = read_txn.open_table(OBJECTS_TABLE)?;

        match table.get(path)? {
            Some(data) => {
                let object: StoredObject = postcard::from_bytes(data.value())
                    .map_err(|e| LinkshareError::Serialization(e.to_string()))?;
                Ok(Some(object))
            }
            None => Ok(None),
        }
    }

    /// Paths of all objects under `prefix`
    pub fn list_object_paths(&self, prefix: &str) -> LinkshareResult<Vec<String>> {
        let db = self.db_handle();
        let db_guard = db.read();
        let read_txn = db_guard.begin_read()?;
        let table = read_txn.open_table(OBJECTS_TABLE)?;

        let mut paths = Vec::new();
        for entry in table.iter()? {
            let (key, _) = entry?;
            if key.value().starts_with(prefix) {
                paths.push(key.value().to_string());
            }
        }
        Ok(paths)
    }

    /// Public download URL for the object at `path`, `None` if it doesn't exist
    pub fn object_url(&self, path: &str) -> LinkshareResult<Option<String>> {
        Ok(self.load_object(path)?.map(|object| {
            let tag = &object.hash[..VERSION_TAG_LEN.min(object.hash.len())];
            format!("{}/{}?v={}", self.public_base_url(), path, tag)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_object() {
        let storage = Storage::in_memory().unwrap();
        storage
            .save_object("profile_images/alice/avatar.png", b"png-bytes", "image/png")
            .unwrap();

        let loaded = storage
            .load_object("profile_images/alice/avatar.png")
            .unwrap()
            .unwrap();
        assert_eq!(loaded.bytes, b"png-bytes");
        assert_eq!(loaded.content_type, "image/png");
        assert_eq!(loaded.hash, blake3::hash(b"png-bytes").to_hex().to_string());
    }

    #[test]
    fn test_same_path_overwrites() {
        let storage = Storage::in_memory().unwrap();
        let path = "profile_images/alice/avatar.png";
        storage.save_object(path, b"first", "image/png").unwrap();
        let first_url = storage.object_url(path).unwrap().unwrap();

        storage.save_object(path, b"second", "image/png").unwrap();
        let second_url = storage.object_url(path).unwrap().unwrap();

        assert_eq!(
            storage.list_object_paths("profile_images/alice/").unwrap(),
            vec![path.to_string()]
        );
        assert_eq!(storage.load_object(path).unwrap().unwrap().bytes, b"second");
        assert_ne!(first_url, second_url);
    }

    #[test]
    fn test_object_url_shape() {
        let storage = Storage::in_memory()
            .unwrap()
            .with_public_base_url("https://cdn.example.com");
        storage
            .save_object("profile_images/bob/avatar.jpg", b"jpg", "image/jpeg")
            .unwrap();

        let url = storage.object_url("profile_images/bob/avatar.jpg").unwrap().unwrap();
        assert!(url.starts_with("https://cdn.example.com/profile_images/bob/avatar.jpg?v="));
        assert_eq!(url.rsplit("?v=").next().unwrap().len(), 16);
    }

    #[test]
    fn test_missing_object() {
        let storage = Storage::in_memory().unwrap();
        assert!(storage.load_object("nope").unwrap().is_none());
        assert!(storage.object_url("nope").unwrap().is_none());
    }
}
