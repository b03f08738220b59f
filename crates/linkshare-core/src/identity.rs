//! Local identity provider
//!
//! [`LocalIdentity`] is an in-process stand-in for the external identity
//! provider: it holds the signed-in owner and publishes changes on a watch
//! channel. The CLI uses it to act as a given owner; tests use it to drive
//! sign-in and sign-out.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::info;

use crate::backend::IdentityProvider;
use crate::error::AuthError;
use crate::types::OwnerId;

#[derive(Debug)]
pub struct LocalIdentity {
    tx: watch::Sender<Option<OwnerId>>,
    sign_outs: AtomicUsize,
}

impl Default for LocalIdentity {
    fn default() -> Self {
        Self::new(None)
    }
}

impl LocalIdentity {
    pub fn new(initial: Option<OwnerId>) -> Self {
        let (tx, _) = watch::channel(initial);
        Self {
            tx,
            sign_outs: AtomicUsize::new(0),
        }
    }

    pub fn signed_in(owner: OwnerId) -> Self {
        Self::new(Some(owner))
    }

    /// Sign in as `owner`, replacing any current identity
    pub fn sign_in(&self, owner: OwnerId) {
        info!(%owner, "Identity signed in");
        self.tx.send_replace(Some(owner));
    }

    /// Drop the identity without going through `sign_out`, as when the
    /// session is ended from another device
    pub fn revoke(&self) {
        self.tx.send_replace(None);
    }

    /// Number of completed `sign_out` calls
    pub fn sign_out_count(&self) -> usize {
        self.sign_outs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentity {
    fn current(&self) -> Option<OwnerId> {
        self.tx.borrow().clone()
    }

    fn watch(&self) -> watch::Receiver<Option<OwnerId>> {
        self.tx.subscribe()
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if let Some(owner) = self.tx.send_replace(None) {
            info!(%owner, "Identity signed out");
        }
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
