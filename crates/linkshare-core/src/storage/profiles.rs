//! Profile Storage - merge-writes for `profiles/{ownerId}`
//!
//! Stores profile documents as JSON with the owner id as the key. There is no
//! whole-document overwrite: every write is a [`ProfilePatch`] merged inside a
//! single write transaction.

use redb::{ReadableTable, TableDefinition};

use crate::error::{LinkshareError, LinkshareResult};
use crate::types::{OwnerId, ProfilePatch, ProfileRecord};

use super::Storage;

/// Table for storing profiles (key: owner id, value: JSON document)
pub(crate) const PROFILES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("profiles");

impl Storage {
    /// Load the profile document for an owner
    ///
    /// Returns `None` if the owner never wrote a profile.
    pub fn load_profile(&self, owner: &OwnerId) -> LinkshareResult<Option<ProfileRecord>> {
        let db = self.db_handle();
        let db_guard = db.read();
        let read_txn = db_guard.begin_read()?;
        let table = read_txn.open_table(PROFILES_TABLE)?;

        match table.get(owner.as_str())? {
            Some(data) => {
                let profile: ProfileRecord = serde_json::from_slice(data.value())
                    .map_err(|e| LinkshareError::Serialization(e.to_string()))?;
                Ok(Some(profile))
            }
            None => Ok(None),
        }
    }

    /// Merge a partial write into the owner's profile.
    ///
    /// Creates an empty document first if none exists. Returns the merged
    /// record exactly as it was committed.
    pub fn write_profile_patch(
        &self,
        owner: &OwnerId,
        patch: &ProfilePatch,
    ) -> LinkshareResult<ProfileRecord> {
        let db = self.db_handle();
        let db_guard = db.read();
        let write_txn = db_guard.begin_write()?;
        let merged = {
            let mut table = write_txn.open_table(PROFILES_TABLE)?;
            let existing = table.get(owner.as_str())?.map(|v| v.value().to_vec());

            let mut record = match existing {
                Some(bytes) => serde_json::from_slice::<ProfileRecord>(&bytes)
                    .map_err(|e| LinkshareError::Serialization(e.to_string()))?,
                None => ProfileRecord::default(),
            };
            record.apply(patch);

            let serialized = serde_json::to_vec(&record)
                .map_err(|e| LinkshareError::Serialization(e.to_string()))?;
            table.insert(owner.as_str(), serialized.as_slice())?;
            record
        };
        write_txn.commit()?;
        Ok(merged)
    }
}
