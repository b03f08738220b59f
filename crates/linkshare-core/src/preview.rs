//! Preview Projector - read-only profile card for owners and visitors
//!
//! Combines the live profile feed with a one-shot link fetch. The preview is
//! `Loading` until both have produced their first value, then re-renders on
//! every profile change. Links are only fetched again on
//! [`PreviewProjector::refresh_links`].

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::LinkshareConfig;
use crate::error::LinkshareResult;
use crate::links::LinkReader;
use crate::profile::{ProfileFeed, ProfileSnapshot, ProfileStore};
use crate::snapshot::{first_of_both, OneShot, SnapshotSource};
use crate::types::{LinkRecord, OwnerId, Platform, ProfileRecord};

/// Link slots on the phone mockup
pub const MOCKUP_SLOTS: usize = 5;

/// A link ready to draw: known platform, brand color, target URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLink {
    pub platform: Platform,
    pub color: &'static str,
    pub url: String,
}

impl RenderedLink {
    /// `None` for platforms outside the known set
    pub fn from_record(link: &LinkRecord) -> Option<Self> {
        let platform = link.known_platform()?;
        Some(Self {
            platform,
            color: platform.color(),
            url: link.url.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePreview {
    /// "First Last", only when both names are set
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub image_url: Option<String>,
    pub links: Vec<RenderedLink>,
    /// Set when the link fetch failed and `links` is empty because of it
    pub link_error: Option<String>,
}

impl ProfilePreview {
    /// Compose a preview. Links on unknown platforms are dropped.
    pub fn compose(record: &ProfileRecord, links: &[LinkRecord]) -> Self {
        Self {
            display_name: record.display_name(),
            email: Some(record.email.clone()).filter(|e| !e.is_empty()),
            image_url: record.image_url.clone(),
            links: links.iter().filter_map(RenderedLink::from_record).collect(),
            link_error: None,
        }
    }

    fn with_link_result(record: &ProfileRecord, links: &LinkshareResult<Vec<LinkRecord>>) -> Self {
        match links {
            Ok(links) => Self::compose(record, links),
            Err(e) => Self {
                link_error: Some(e.to_string()),
                ..Self::compose(record, &[])
            },
        }
    }

    /// Exactly `n` slots, filled with links in order and padded with `None`
    pub fn mockup_slots(&self, n: usize) -> Vec<Option<&RenderedLink>> {
        (0..n).map(|i| self.links.get(i)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewState {
    /// Waiting for the first profile snapshot and the first link fetch
    Loading,
    Ready(ProfilePreview),
    /// The first profile snapshot did not arrive in time, or the feed
    /// could not be opened
    Unavailable,
}

impl PreviewState {
    pub fn is_loading(&self) -> bool {
        matches!(self, PreviewState::Loading)
    }

    pub fn ready(&self) -> Option<&ProfilePreview> {
        match self {
            PreviewState::Ready(preview) => Some(preview),
            _ => None,
        }
    }
}

/// Profile feed that is opened on first poll, so that opening it runs
/// concurrently with whatever it is raced against
struct LazyFeed {
    store: ProfileStore,
    owner: OwnerId,
    feed: Option<ProfileFeed>,
}

#[async_trait]
impl SnapshotSource<ProfileSnapshot> for LazyFeed {
    async fn next_snapshot(&mut self) -> Option<ProfileSnapshot> {
        if self.feed.is_none() {
            match self.store.feed(&self.owner).await {
                Ok(feed) => self.feed = Some(feed),
                Err(e) => {
                    warn!(owner = %self.owner, error = %e, "Could not open profile feed");
                    return None;
                }
            }
        }
        self.feed.as_mut()?.next().await
    }
}

/// Live preview for one owner
pub struct PreviewProjector {
    owner: OwnerId,
    links: LinkReader,
    state_rx: watch::Receiver<PreviewState>,
    refresh_tx: mpsc::UnboundedSender<Vec<LinkRecord>>,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for PreviewProjector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewProjector")
            .field("owner", &self.owner)
            .field("state", &*self.state_rx.borrow())
            .finish_non_exhaustive()
    }
}

impl PreviewProjector {
    /// Start projecting `owner`'s profile with the configured timeout
    pub fn open(
        profiles: &ProfileStore,
        links: &LinkReader,
        owner: &OwnerId,
        config: &LinkshareConfig,
    ) -> Self {
        Self::with_timeout(profiles, links, owner, config.preview_timeout())
    }

    /// Start projecting `owner`'s profile.
    ///
    /// With `first_snapshot_timeout` set, the state moves to `Unavailable` if
    /// the first values have not both arrived in time. It still becomes
    /// `Ready` if they arrive later.
    pub fn with_timeout(
        profiles: &ProfileStore,
        links: &LinkReader,
        owner: &OwnerId,
        first_snapshot_timeout: Option<Duration>,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(PreviewState::Loading);
        let (refresh_tx, refresh_rx) = mpsc::unbounded_channel();

        let feed = LazyFeed {
            store: profiles.clone(),
            owner: owner.clone(),
            feed: None,
        };
        let first_links = links.one_shot(owner);
        let task = tokio::spawn(project(
            owner.clone(),
            feed,
            first_links,
            refresh_rx,
            state_tx,
            first_snapshot_timeout,
        ));

        debug!(%owner, "Preview opened");
        Self {
            owner: owner.clone(),
            links: links.clone(),
            state_rx,
            refresh_tx,
            task,
        }
    }

    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    pub fn state(&self) -> PreviewState {
        self.state_rx.borrow().clone()
    }

    /// Feed of preview states
    pub fn watch(&self) -> watch::Receiver<PreviewState> {
        self.state_rx.clone()
    }

    /// Wait until the preview has left `Loading`
    pub async fn settled(&self) -> PreviewState {
        let mut rx = self.state_rx.clone();
        if let Ok(state) = rx.wait_for(|state| !state.is_loading()).await {
            return state.clone();
        }
        let state = rx.borrow().clone();
        state
    }

    /// Fetch the owner's links again and re-render with them.
    ///
    /// On failure the previously rendered links stay in place. Returns the
    /// number of link records fetched, including unknown platforms.
    pub async fn refresh_links(&self) -> LinkshareResult<usize> {
        let links = self.links.fetch_links(&self.owner).await?;
        let count = links.len();
        if self.refresh_tx.send(links).is_err() {
            debug!(owner = %self.owner, "Preview closed before link refresh");
        }
        Ok(count)
    }
}

impl Drop for PreviewProjector {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn project(
    owner: OwnerId,
    mut feed: LazyFeed,
    mut first_links: OneShot<LinkshareResult<Vec<LinkRecord>>>,
    mut refreshes: mpsc::UnboundedReceiver<Vec<LinkRecord>>,
    state_tx: watch::Sender<PreviewState>,
    first_snapshot_timeout: Option<Duration>,
) {
    let first = {
        let ready = first_of_both(&mut feed, &mut first_links);
        tokio::pin!(ready);
        match first_snapshot_timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut ready).await {
                Ok(first) => first,
                Err(_) => {
                    warn!(%owner, timeout_ms = limit.as_millis() as u64, "Preview still loading");
                    state_tx.send_replace(PreviewState::Unavailable);
                    ready.await
                }
            },
            None => ready.await,
        }
    };

    let Some((snapshot, mut links)) = first else {
        state_tx.send_replace(PreviewState::Unavailable);
        return;
    };
    let mut record = snapshot.record;
    state_tx.send_replace(PreviewState::Ready(ProfilePreview::with_link_result(
        &record, &links,
    )));
    info!(%owner, revision = snapshot.revision, "Preview ready");

    loop {
        tokio::select! {
            next = feed.next_snapshot() => match next {
                Some(snapshot) => {
                    debug!(%owner, revision = snapshot.revision, "Preview re-rendered");
                    record = snapshot.record;
                }
                None => break,
            },
            refreshed = refreshes.recv() => match refreshed {
                Some(fetched) => links = Ok(fetched),
                None => break,
            },
        }
        state_tx.send_replace(PreviewState::Ready(ProfilePreview::with_link_result(
            &record, &links,
        )));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Storage;
    use crate::types::ProfilePatch;
    use std::sync::Arc;

    fn owner(id: &str) -> OwnerId {
        OwnerId::new(id).unwrap()
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    fn seeded() -> (Storage, ProfileStore, LinkReader) {
        let storage = Storage::in_memory().unwrap();
        let alice = owner("alice");
        storage
            .write_profile_patch(
                &alice,
                &ProfilePatch::new()
                    .first_name("Alice")
                    .last_name("Liddell")
                    .email("alice@example.com"),
            )
            .unwrap();
        storage
            .save_link(&LinkRecord::new(alice.clone(), "GitHub", "https://github.com/alice"))
            .unwrap();
        storage
            .save_link(&LinkRecord::new(alice, "Mastodon", "https://mastodon.social/@alice"))
            .unwrap();
        let store = ProfileStore::new(Arc::new(storage.clone()));
        let links = LinkReader::new(Arc::new(storage.clone()));
        (storage, store, links)
    }

    #[test]
    fn test_compose_filters_unknown_platforms() {
        let alice = owner("alice");
        let record = ProfileRecord {
            first_name: "Alice".into(),
            last_name: String::new(),
            email: String::new(),
            image_url: None,
        };
        let links = vec![
            LinkRecord::new(alice.clone(), "Mastodon", "https://m.example/@a"),
            LinkRecord::new(alice, "YouTube", "https://youtube.com/@a"),
        ];

        let preview = ProfilePreview::compose(&record, &links);

        assert_eq!(preview.links.len(), 1);
        assert_eq!(preview.links[0].platform, Platform::YouTube);
        assert_eq!(preview.links[0].color, "#EE3939");
        assert!(preview.display_name.is_none());
        assert!(preview.email.is_none());
    }

    #[test]
    fn test_mockup_slots_pad_and_truncate() {
        let alice = owner("alice");
        let links: Vec<_> = ["GitHub", "LinkedIn"]
            .iter()
            .map(|p| LinkRecord::new(alice.clone(), *p, "https://x"))
            .collect();
        let preview = ProfilePreview::compose(&ProfileRecord::default(), &links);

        let slots = preview.mockup_slots(MOCKUP_SLOTS);
        assert_eq!(slots.len(), 5);
        assert_eq!(slots.iter().filter(|s| s.is_some()).count(), 2);
        assert_eq!(slots[1].unwrap().platform, Platform::LinkedIn);
        assert_eq!(preview.mockup_slots(1).len(), 1);
    }

    #[tokio::test]
    async fn test_ready_with_known_links_only() {
        let (_, store, links) = seeded();
        let projector = PreviewProjector::with_timeout(&store, &links, &owner("alice"), None);

        let state = projector.settled().await;
        let preview = state.ready().unwrap();
        assert_eq!(preview.display_name.as_deref(), Some("Alice Liddell"));
        assert_eq!(preview.links.len(), 1);
        assert_eq!(preview.links[0].platform, Platform::GitHub);
        assert!(preview.link_error.is_none());
    }

    #[tokio::test]
    async fn test_rerenders_on_profile_change_but_not_new_links() {
        let (storage, store, links) = seeded();
        let alice = owner("alice");
        let projector = PreviewProjector::with_timeout(&store, &links, &alice, None);
        projector.settled().await;

        storage
            .save_link(&LinkRecord::new(alice.clone(), "Facebook", "https://facebook.com/a"))
            .unwrap();
        store
            .commit(&alice, &ProfilePatch::new().first_name("Alicia"))
            .await
            .unwrap();
        settle().await;

        let state = projector.state();
        let preview = state.ready().unwrap();
        assert_eq!(preview.display_name.as_deref(), Some("Alicia Liddell"));
        assert_eq!(preview.links.len(), 1);

        assert_eq!(projector.refresh_links().await.unwrap(), 3);
        settle().await;
        assert_eq!(projector.state().ready().unwrap().links.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_then_recovers() {
        let storage = Storage::in_memory().unwrap();
        let store = ProfileStore::new(Arc::new(storage.clone()));
        let links = LinkReader::new(Arc::new(storage));
        let bob = owner("bob");

        let projector =
            PreviewProjector::with_timeout(&store, &links, &bob, Some(Duration::from_secs(2)));
        assert!(projector.state().is_loading());

        assert_eq!(projector.settled().await, PreviewState::Unavailable);

        store
            .commit(&bob, &ProfilePatch::new().first_name("Bob").last_name("B"))
            .await
            .unwrap();
        settle().await;
        assert_eq!(
            projector.state().ready().unwrap().display_name.as_deref(),
            Some("Bob B")
        );
    }
}
