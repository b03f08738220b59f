//! Profile Store - live, merge-consistent profile records
//!
//! ## Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ProfileStore                                                   │
//! │  ├── docs: Arc<dyn DocumentStore>                               │
//! │  │   └── merge-writes to profiles/{ownerId}                     │
//! │  └── feeds: HashMap<OwnerId, FeedSlot>                          │
//! │      └── watch channel of the latest ProfileSnapshot per owner  │
//! │                                                                 │
//! │  commit()    merge + publish under one lock, so feeds see       │
//! │              snapshots in commit order                          │
//! │  feed()      pull-side view of an owner's live feed             │
//! │  subscribe() push-side view, callback per snapshot              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every published snapshot carries a per-owner revision. Feeds never yield
//! a revision lower than one they already yielded.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::DocumentStore;
use crate::error::{LinkshareResult, PersistError};
use crate::snapshot::SnapshotSource;
use crate::types::{OwnerId, ProfilePatch, ProfileRecord};

/// A profile record as published on a live feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSnapshot {
    /// Per-owner publication counter, starting at 1
    pub revision: u64,
    pub record: ProfileRecord,
}

struct FeedSlot {
    tx: watch::Sender<Option<ProfileSnapshot>>,
    revision: u64,
}

impl FeedSlot {
    fn new(initial: Option<ProfileRecord>) -> Self {
        let revision = u64::from(initial.is_some());
        let snapshot = initial.map(|record| ProfileSnapshot { revision, record });
        let (tx, _) = watch::channel(snapshot);
        Self { tx, revision }
    }

    fn publish(&mut self, record: ProfileRecord) -> u64 {
        self.revision += 1;
        let revision = self.revision;
        self.tx
            .send_replace(Some(ProfileSnapshot { revision, record }));
        revision
    }
}

/// Live profile records keyed by owner
///
/// Clones share the same feeds, so a commit through any clone is delivered
/// to every feed and subscription of that owner.
#[derive(Clone)]
pub struct ProfileStore {
    docs: Arc<dyn DocumentStore>,
    feeds: Arc<AsyncMutex<HashMap<OwnerId, FeedSlot>>>,
}

impl std::fmt::Debug for ProfileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileStore").finish_non_exhaustive()
    }
}

impl ProfileStore {
    pub fn new(docs: Arc<dyn DocumentStore>) -> Self {
        Self {
            docs,
            feeds: Arc::new(AsyncMutex::new(HashMap::new())),
        }
    }

    /// Current record for an owner, read straight from the document store
    pub async fn load(&self, owner: &OwnerId) -> LinkshareResult<Option<ProfileRecord>> {
        self.docs.get_profile(owner).await
    }

    /// Merge `patch` into the owner's profile and publish the result.
    ///
    /// Fields absent from `patch` keep their stored value. The caller is
    /// responsible for not running two commits for one owner at once; the
    /// draft editor is the only writer and refuses re-entrant submits.
    pub async fn commit(
        &self,
        owner: &OwnerId,
        patch: &ProfilePatch,
    ) -> Result<ProfileRecord, PersistError> {
        let mut feeds = self.feeds.lock().await;
        prune_idle(&mut feeds);

        let record = self
            .docs
            .merge_profile(owner, patch)
            .await
            .map_err(|e| {
                warn!(%owner, error = %e, "Profile commit failed");
                PersistError::new(e.to_string())
            })?;

        // Nobody is watching this owner; the next feed() seeds from the store.
        match feeds.get_mut(owner) {
            Some(slot) => {
                let revision = slot.publish(record.clone());
                info!(%owner, revision, "Profile committed");
            }
            None => info!(%owner, "Profile committed"),
        }
        Ok(record)
    }

    /// Re-read the owner's document and publish it if it differs from the
    /// latest snapshot. Used to pick up writes made outside this store.
    pub async fn refresh(&self, owner: &OwnerId) -> LinkshareResult<Option<ProfileSnapshot>> {
        let mut feeds = self.feeds.lock().await;
        prune_idle(&mut feeds);
        let Some(record) = self.docs.get_profile(owner).await? else {
            return Ok(None);
        };

        let slot = feeds
            .entry(owner.clone())
            .or_insert_with(|| FeedSlot::new(None));
        let unchanged = slot
            .tx
            .borrow()
            .as_ref()
            .is_some_and(|current| current.record == record);
        if !unchanged {
            let revision = slot.publish(record);
            debug!(%owner, revision, "Published refreshed profile");
        }
        let current = slot.tx.borrow().clone();
        Ok(current)
    }

    /// Open the owner's live feed.
    ///
    /// The first call for an owner seeds the feed from the document store.
    pub async fn feed(&self, owner: &OwnerId) -> LinkshareResult<ProfileFeed> {
        let mut feeds = self.feeds.lock().await;
        prune_idle(&mut feeds);
        let slot = match feeds.entry(owner.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let initial = self.docs.get_profile(owner).await?;
                entry.insert(FeedSlot::new(initial))
            }
        };

        let rx = slot.tx.subscribe();
        Ok(ProfileFeed {
            owner: owner.clone(),
            rx,
            last_seen: 0,
        })
    }

    /// Invoke `on_snapshot` with the owner's current record (if any) before
    /// returning, then once per later commit, until the subscription is
    /// cancelled.
    pub async fn subscribe<F>(&self, owner: &OwnerId, on_snapshot: F) -> LinkshareResult<Subscription>
    where
        F: FnMut(ProfileRecord) + Send + 'static,
    {
        let mut feed = self.feed(owner).await?;
        let callback: Arc<Mutex<Option<SnapshotCallback>>> =
            Arc::new(Mutex::new(Some(Box::new(on_snapshot))));

        if let Some(snapshot) = feed.try_next() {
            if let Some(cb) = callback.lock().as_mut() {
                cb(snapshot.record);
            }
        }

        let token = CancellationToken::new();
        let task = {
            let token = token.clone();
            let callback = callback.clone();
            let owner = owner.clone();
            tokio::spawn(async move {
                loop {
                    let snapshot = tokio::select! {
                        biased;
                        _ = token.cancelled() => break,
                        next = feed.next() => match next {
                            Some(snapshot) => snapshot,
                            None => break,
                        },
                    };
                    let delivered = match callback.lock().as_mut() {
                        Some(cb) => {
                            cb(snapshot.record);
                            true
                        }
                        None => false,
                    };
                    if !delivered {
                        break;
                    }
                }
                debug!(%owner, "Profile subscription ended");
            })
        };

        debug!(%owner, "Profile subscription opened");
        Ok(Subscription {
            owner: owner.clone(),
            token,
            callback,
            task: Some(task),
        })
    }
}

/// Drop feed slots that no feed or subscription holds anymore
fn prune_idle(feeds: &mut HashMap<OwnerId, FeedSlot>) {
    feeds.retain(|owner, slot| {
        let live = slot.tx.receiver_count() > 0;
        if !live {
            debug!(%owner, "Dropped idle profile feed");
        }
        live
    });
}

type SnapshotCallback = Box<dyn FnMut(ProfileRecord) + Send>;

/// Pull-side view of one owner's live profile feed
pub struct ProfileFeed {
    owner: OwnerId,
    rx: watch::Receiver<Option<ProfileSnapshot>>,
    last_seen: u64,
}

impl ProfileFeed {
    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    /// Latest published snapshot, whether or not it was already yielded
    pub fn current(&self) -> Option<ProfileSnapshot> {
        self.rx.borrow().clone()
    }

    /// Unseen snapshot available right now, without waiting
    pub fn try_next(&mut self) -> Option<ProfileSnapshot> {
        let latest = self.rx.borrow_and_update().clone()?;
        if latest.revision > self.last_seen {
            self.last_seen = latest.revision;
            Some(latest)
        } else {
            None
        }
    }

    /// Wait for a snapshot newer than the last one yielded.
    ///
    /// Intermediate revisions may be skipped if several commits land before
    /// the feed is polled; the latest one is always delivered.
    pub async fn next(&mut self) -> Option<ProfileSnapshot> {
        loop {
            if let Some(snapshot) = self.try_next() {
                return Some(snapshot);
            }
            if self.rx.changed().await.is_err() {
                return None;
            }
        }
    }
}

#[async_trait]
impl SnapshotSource<ProfileSnapshot> for ProfileFeed {
    async fn next_snapshot(&mut self) -> Option<ProfileSnapshot> {
        self.next().await
    }
}

/// Handle to a live profile subscription
///
/// Cancelling is synchronous: once [`Subscription::unsubscribe`] returns (or
/// the handle is dropped) the callback never runs again.
pub struct Subscription {
    owner: OwnerId,
    token: CancellationToken,
    callback: Arc<Mutex<Option<SnapshotCallback>>>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }

    pub fn unsubscribe(mut self) {
        self.cancel();
    }

    fn cancel(&mut self) {
        if self.token.is_cancelled() {
            return;
        }
        self.token.cancel();
        // Waits out a callback that is mid-flight, then disarms it.
        self.callback.lock().take();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        debug!(owner = %self.owner, "Profile subscription cancelled");
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("owner", &self.owner)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Holds at most one live subscription, for whichever identity is current
#[derive(Debug, Default)]
pub struct ProfileBinding {
    active: Option<Subscription>,
}

impl ProfileBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Owner of the live subscription, if any
    pub fn owner(&self) -> Option<&OwnerId> {
        self.active.as_ref().map(Subscription::owner)
    }

    /// Cancel the current subscription, then subscribe for `owner`.
    pub async fn bind<F>(
        &mut self,
        store: &ProfileStore,
        owner: &OwnerId,
        on_snapshot: F,
    ) -> LinkshareResult<()>
    where
        F: FnMut(ProfileRecord) + Send + 'static,
    {
        self.unbind();
        self.active = Some(store.subscribe(owner, on_snapshot).await?);
        Ok(())
    }

    pub fn unbind(&mut self) {
        if let Some(subscription) = self.active.take() {
            subscription.unsubscribe();
        }
    }
}
