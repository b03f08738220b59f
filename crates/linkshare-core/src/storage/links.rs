//! Link Storage - the flat `links` collection
//!
//! Links are keyed by their ULID, so a scan returns them in creation order.
//! Reads filter on `userId`; this core never edits links, the insert and
//! delete helpers exist for seeding and administration.

use redb::{ReadableTable, TableDefinition};

use crate::error::{LinkshareError, LinkshareResult};
use crate::types::{LinkId, LinkRecord, OwnerId};

use super::Storage;

/// Table for storing links (key: link id, value: JSON document)
pub(crate) const LINKS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("links");

impl Storage {
    /// Insert or replace a link document
    pub fn save_link(&self, link: &LinkRecord) -> LinkshareResult<()> {
        let db = self.db_handle();
        let db_guard = db.read();
        let write_txn = db_guard.begin_write()?;
        {
            let mut table = write_txn.open_table(LINKS_TABLE)?;
            let serialized =
                serde_json::to_vec(link).map_err(|e| LinkshareError::Serialization(e.to_string()))?;
            let key = link.id.to_string();
            table.insert(key.as_str(), serialized.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Delete a link by id
    ///
    /// Returns `Ok(())` even if the link doesn't exist.
    pub fn delete_link(&self, id: &LinkId) -> LinkshareResult<()> {
        let db = self.db_handle();
        let db_guard = db.read();
        let write_txn = db_guard.begin_write()?;
        {
            let mut table = write_txn.open_table(LINKS_TABLE)?;
            let key = id.to_string();
            table.remove(key.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// All links whose `userId` equals `owner`
    pub fn list_links_for(&self, owner: &OwnerId) -> LinkshareResult<Vec<LinkRecord>> {
        let db = self.db_handle();
        let db_guard = db.read();
        let read_txn = db_guard.begin_read()?;
        let table = read_txn.open_table(LINKS_TABLE)?;

        let mut links = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let link: LinkRecord = serde_json::from_slice(value.value())
                .map_err(|e| LinkshareError::Serialization(e.to_string()))?;
            if &link.user_id == owner {
                links.push(link);
            }
        }
        Ok(links)
    }
}
