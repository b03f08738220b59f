//! Ports to the external collaborators.
//!
//! The components in this crate never talk to a database, blob store or
//! identity provider directly. They go through these traits, which the
//! redb-backed [`Storage`](crate::storage::Storage) implements for local use
//! and which tests implement to inject failures.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::info;

use crate::error::{AuthError, LinkshareResult, UploadError};
use crate::types::{LinkRecord, OwnerId, ProfilePatch, ProfileRecord};

/// Document store holding `profiles/{ownerId}` and the flat `links` collection
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Current profile document, `None` if it was never written
    async fn get_profile(&self, owner: &OwnerId) -> LinkshareResult<Option<ProfileRecord>>;

    /// Merge `patch` into the owner's document (creating it if needed) and
    /// return the record as stored.
    async fn merge_profile(
        &self,
        owner: &OwnerId,
        patch: &ProfilePatch,
    ) -> LinkshareResult<ProfileRecord>;

    /// All link documents whose `userId` equals `owner`
    async fn query_links(&self, owner: &OwnerId) -> LinkshareResult<Vec<LinkRecord>>;
}

/// Binary object storage for uploaded assets
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `bytes` at `path`, replacing any previous object there
    async fn put_object(&self, path: &str, bytes: Bytes, content_type: &str)
        -> Result<(), UploadError>;

    /// Public URL for the object at `path`
    async fn download_url(&self, path: &str) -> Result<String, UploadError>;
}

/// External identity provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Currently signed-in identity
    fn current(&self) -> Option<OwnerId>;

    /// Feed of identity changes, starting with the current value
    fn watch(&self) -> watch::Receiver<Option<OwnerId>>;

    /// Terminate the provider session
    async fn sign_out(&self) -> Result<(), AuthError>;
}

/// Surfaces the core may force navigation to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Sign-in surface, used after session expiry
    SignIn,
    /// Link summary view, shown after a successful profile save
    Links,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::SignIn => "/login",
            Route::Links => "/links",
        }
    }
}

/// Redirect sink owned by the presentation layer
pub trait Navigator: Send + Sync {
    fn redirect(&self, route: Route);
}

/// Navigator that records every redirect in order
#[derive(Debug, Default)]
pub struct RouteLog {
    routes: Mutex<Vec<Route>>,
}

impl RouteLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// All redirects so far, oldest first
    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().clone()
    }

    pub fn last(&self) -> Option<Route> {
        self.routes.lock().last().copied()
    }
}

impl Navigator for RouteLog {
    fn redirect(&self, route: Route) {
        info!(path = route.path(), "Redirect");
        self.routes.lock().push(route);
    }
}
