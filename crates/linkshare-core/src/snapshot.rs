//! Observable snapshots
//!
//! Live feeds (the profile store) and one-shot reads (the link collection)
//! both implement [`SnapshotSource`]. A live source yields a value for every
//! change until it is closed; a one-shot source yields exactly once.
//! [`first_of_both`] is the single synchronization point used to wait for
//! the first value of two sources.

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;

#[async_trait]
pub trait SnapshotSource<T: Send>: Send {
    /// Wait for the next value. `None` once the source has nothing more to give.
    async fn next_snapshot(&mut self) -> Option<T>;
}

/// A source that resolves a single future and is then exhausted
pub struct OneShot<T> {
    pending: Option<BoxFuture<'static, T>>,
}

impl<T> OneShot<T> {
    pub fn new<F>(future: F) -> Self
    where
        F: std::future::Future<Output = T> + Send + 'static,
    {
        Self {
            pending: Some(future.boxed()),
        }
    }
}

#[async_trait]
impl<T: Send + 'static> SnapshotSource<T> for OneShot<T> {
    async fn next_snapshot(&mut self) -> Option<T> {
        match self.pending.take() {
            Some(future) => Some(future.await),
            None => None,
        }
    }
}

/// Wait until both sources have produced their first value.
///
/// The sources are polled concurrently, so neither one's latency adds to the
/// other's. Returns `None` if either source ends without producing a value.
pub async fn first_of_both<A, B, SA, SB>(a: &mut SA, b: &mut SB) -> Option<(A, B)>
where
    A: Send,
    B: Send,
    SA: SnapshotSource<A> + ?Sized,
    SB: SnapshotSource<B> + ?Sized,
{
    let (first_a, first_b) = tokio::join!(a.next_snapshot(), b.next_snapshot());
    Some((first_a?, first_b?))
}
