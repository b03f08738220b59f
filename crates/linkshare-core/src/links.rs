//! Link Collection Reader - one-shot reads of an owner's links
//!
//! Links are not live: a reader fetches once per mount or identity and only
//! fetches again when asked to.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::backend::DocumentStore;
use crate::error::LinkshareResult;
use crate::snapshot::OneShot;
use crate::types::{LinkRecord, OwnerId};

#[derive(Clone)]
pub struct LinkReader {
    docs: Arc<dyn DocumentStore>,
}

impl std::fmt::Debug for LinkReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkReader").finish_non_exhaustive()
    }
}

impl LinkReader {
    pub fn new(docs: Arc<dyn DocumentStore>) -> Self {
        Self { docs }
    }

    /// Every link whose `userId` is `owner`, in store order
    pub async fn fetch_links(&self, owner: &OwnerId) -> LinkshareResult<Vec<LinkRecord>> {
        match self.docs.query_links(owner).await {
            Ok(links) => {
                debug!(%owner, count = links.len(), "Fetched links");
                Ok(links)
            }
            Err(e) => {
                warn!(%owner, error = %e, "Link fetch failed");
                Err(e)
            }
        }
    }

    /// The fetch as a single-use snapshot source
    pub fn one_shot(&self, owner: &OwnerId) -> OneShot<LinkshareResult<Vec<LinkRecord>>> {
        let reader = self.clone();
        let owner = owner.clone();
        OneShot::new(async move { reader.fetch_links(&owner).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SnapshotSource;
    use crate::storage::Storage;

    fn owner(id: &str) -> OwnerId {
        OwnerId::new(id).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_returns_only_owner_links() {
        let storage = Storage::in_memory().unwrap();
        storage
            .save_link(&LinkRecord::new(owner("alice"), "GitHub", "https://github.com/alice"))
            .unwrap();
        storage
            .save_link(&LinkRecord::new(owner("bob"), "LinkedIn", "https://linkedin.com/in/bob"))
            .unwrap();
        let reader = LinkReader::new(Arc::new(storage));

        let links = reader.fetch_links(&owner("alice")).await.unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://github.com/alice");
    }

    #[tokio::test]
    async fn test_one_shot_does_not_refetch() {
        let storage = Storage::in_memory().unwrap();
        let reader = LinkReader::new(Arc::new(storage.clone()));
        let mut source = reader.one_shot(&owner("alice"));

        let first = source.next_snapshot().await.unwrap().unwrap();
        assert!(first.is_empty());

        storage
            .save_link(&LinkRecord::new(owner("alice"), "GitHub", "https://github.com/alice"))
            .unwrap();
        assert!(source.next_snapshot().await.is_none());

        // An explicit fetch sees the new link
        assert_eq!(reader.fetch_links(&owner("alice")).await.unwrap().len(), 1);
    }
}
