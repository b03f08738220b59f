//! Session Monitor - idle-timeout sign-out
//!
//! ## Lifecycle
//!
//! ```text
//!   Absent ──observe(Some)──► Active(deadline) ──observe(Some)──► Active(deadline')
//!     ▲                          │        │
//!     │                   observe(None)  timer fires
//!     │                          │        ▼
//!     └──────────────────────────┴──── Expired ──sign-out + redirect──► Absent
//! ```
//!
//! The deadline is fixed at the instant the identity is observed; activity
//! does not extend it. At most one timer is outstanding. Each arming bumps a
//! generation counter, and a timer only expires the session if the
//! generation it was armed with is still current.
//!
//! Idle timeouts are capped at [`MAX_IDLE_TIMEOUT`] so a deadline can always
//! be represented. A failed sign-out after expiry is posted to the notice
//! board; the redirect to sign-in happens regardless.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::{IdentityProvider, Navigator, Route};
use crate::config::{LinkshareConfig, DEFAULT_IDLE_TIMEOUT, MAX_IDLE_TIMEOUT};
use crate::notice::{Notice, NoticeBoard};
use crate::types::OwnerId;

/// Capacity of the session event channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Absent,
    Active { owner: OwnerId, deadline: Instant },
    Expired { owner: OwnerId },
}

impl SessionState {
    pub fn owner(&self) -> Option<&OwnerId> {
        match self {
            SessionState::Absent => None,
            SessionState::Active { owner, .. } | SessionState::Expired { owner } => Some(owner),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Active { .. })
    }
}

/// Transitions broadcast by the monitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A timer was armed (or re-armed) for `owner`
    Armed { owner: OwnerId, deadline: Instant },
    /// The identity went away before the deadline
    Disarmed { owner: OwnerId },
    /// The deadline passed and the owner is being signed out
    Expired { owner: OwnerId },
}

struct Timer {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl Timer {
    fn disarm(self) {
        self.token.cancel();
        self.task.abort();
    }
}

struct Inner {
    state: SessionState,
    generation: u64,
    timer: Option<Timer>,
    follower: Option<JoinHandle<()>>,
}

struct Shared {
    inner: Mutex<Inner>,
    provider: Arc<dyn IdentityProvider>,
    navigator: Arc<dyn Navigator>,
    notices: NoticeBoard,
    idle_timeout: Duration,
    events: broadcast::Sender<SessionEvent>,
    shutdown: CancellationToken,
}

impl Shared {
    fn observe(self: &Arc<Self>, identity: Option<OwnerId>) {
        let mut inner = self.inner.lock();
        if let Some(timer) = inner.timer.take() {
            timer.disarm();
        }
        inner.generation += 1;
        let generation = inner.generation;

        match identity {
            Some(owner) => {
                let deadline = Instant::now() + self.idle_timeout;
                let token = self.shutdown.child_token();
                let task = {
                    let token = token.clone();
                    let shared = Arc::downgrade(self);
                    tokio::spawn(async move {
                        tokio::select! {
                            biased;
                            _ = token.cancelled() => {}
                            _ = tokio::time::sleep_until(deadline) => {
                                if let Some(shared) = Weak::upgrade(&shared) {
                                    shared.expire(generation).await;
                                }
                            }
                        }
                    })
                };
                inner.timer = Some(Timer { token, task });
                inner.state = SessionState::Active {
                    owner: owner.clone(),
                    deadline,
                };
                debug!(%owner, generation, timeout_secs = self.idle_timeout.as_secs(), "Session timer armed");
                let _ = self.events.send(SessionEvent::Armed { owner, deadline });
            }
            None => {
                let previous = std::mem::replace(&mut inner.state, SessionState::Absent);
                if let SessionState::Active { owner, .. } = previous {
                    debug!(%owner, "Session timer disarmed");
                    let _ = self.events.send(SessionEvent::Disarmed { owner });
                }
            }
        }
    }

    async fn expire(&self, generation: u64) {
        let owner = {
            let mut inner = self.inner.lock();
            if inner.generation != generation {
                return;
            }
            let owner = match &inner.state {
                SessionState::Active { owner, .. } => owner.clone(),
                _ => return,
            };
            inner.state = SessionState::Expired {
                owner: owner.clone(),
            };
            // This task is the timer; detach it instead of aborting itself.
            inner.timer = None;
            owner
        };

        info!(%owner, "Session expired after idle timeout");
        let _ = self.events.send(SessionEvent::Expired {
            owner: owner.clone(),
        });

        if let Err(e) = self.provider.sign_out().await {
            warn!(
                %owner,
                code = e.code().unwrap_or("unknown"),
                error = %e,
                "Sign-out after expiry failed"
            );
            self.notices.post(Notice::from(&e));
        }
        self.navigator.redirect(Route::SignIn);

        let mut inner = self.inner.lock();
        if inner.generation == generation {
            inner.state = SessionState::Absent;
        }
    }

    fn shutdown(&self) {
        self.shutdown.cancel();
        let mut inner = self.inner.lock();
        inner.generation += 1;
        if let Some(timer) = inner.timer.take() {
            timer.disarm();
        }
        if let Some(follower) = inner.follower.take() {
            follower.abort();
        }
        inner.state = SessionState::Absent;
    }
}

/// Tracks identity presence and signs the owner out once the idle deadline
/// passes.
///
/// Must be used from within a tokio runtime. Dropping the monitor disarms
/// its timer.
pub struct SessionMonitor {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for SessionMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionMonitor")
            .field("state", &self.state())
            .field("idle_timeout", &self.shared.idle_timeout)
            .finish()
    }
}

impl SessionMonitor {
    pub fn new(provider: Arc<dyn IdentityProvider>, navigator: Arc<dyn Navigator>) -> Self {
        Self::with_idle_timeout(provider, navigator, DEFAULT_IDLE_TIMEOUT)
    }

    /// Monitor using the configured idle timeout and posting failures to
    /// `notices`
    pub fn with_config(
        provider: Arc<dyn IdentityProvider>,
        navigator: Arc<dyn Navigator>,
        notices: NoticeBoard,
        config: &LinkshareConfig,
    ) -> Self {
        Self::build(provider, navigator, notices, config.idle_timeout())
    }

    /// Monitor with its own notice board. Timeouts above
    /// [`MAX_IDLE_TIMEOUT`] are capped.
    pub fn with_idle_timeout(
        provider: Arc<dyn IdentityProvider>,
        navigator: Arc<dyn Navigator>,
        idle_timeout: Duration,
    ) -> Self {
        Self::build(provider, navigator, NoticeBoard::new(), idle_timeout)
    }

    fn build(
        provider: Arc<dyn IdentityProvider>,
        navigator: Arc<dyn Navigator>,
        notices: NoticeBoard,
        idle_timeout: Duration,
    ) -> Self {
        let idle_timeout = if idle_timeout > MAX_IDLE_TIMEOUT {
            warn!(
                requested_secs = idle_timeout.as_secs(),
                max_secs = MAX_IDLE_TIMEOUT.as_secs(),
                "Idle timeout capped"
            );
            MAX_IDLE_TIMEOUT
        } else {
            idle_timeout
        };
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    state: SessionState::Absent,
                    generation: 0,
                    timer: None,
                    follower: None,
                }),
                provider,
                navigator,
                notices,
                idle_timeout,
                events,
                shutdown: CancellationToken::new(),
            }),
        }
    }

    pub fn state(&self) -> SessionState {
        self.shared.inner.lock().state.clone()
    }

    pub fn idle_timeout(&self) -> Duration {
        self.shared.idle_timeout
    }

    /// Board that sign-out failures are posted to
    pub fn notices(&self) -> &NoticeBoard {
        &self.shared.notices
    }

    /// Subscribe to session transitions
    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    /// Feed an identity observation into the state machine.
    ///
    /// `Some` (re)arms the timer from now, cancelling any stale one first.
    /// `None` cancels the timer without expiring the session.
    pub fn observe(&self, identity: Option<OwnerId>) {
        if self.shared.shutdown.is_cancelled() {
            return;
        }
        self.shared.observe(identity);
    }

    /// Observe the provider's current identity and every later change until
    /// shutdown.
    pub fn follow_provider(&self) {
        let mut rx = self.shared.provider.watch();
        let initial = rx.borrow_and_update().clone();
        self.observe(initial);

        let shared = Arc::downgrade(&self.shared);
        let token = self.shared.shutdown.clone();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
                let identity = rx.borrow_and_update().clone();
                match Weak::upgrade(&shared) {
                    Some(shared) => shared.observe(identity),
                    None => break,
                }
            }
        });

        if let Some(previous) = self.shared.inner.lock().follower.replace(task) {
            previous.abort();
        }
    }

    /// Route guard for protected surfaces.
    ///
    /// Returns the current identity, or redirects to sign-in and returns
    /// `None` when there is none.
    pub fn require_identity(&self) -> Option<OwnerId> {
        if let SessionState::Active { owner, .. } = self.state() {
            return Some(owner);
        }
        match self.shared.provider.current() {
            Some(owner) => Some(owner),
            None => {
                debug!("No identity on protected surface");
                self.shared.navigator.redirect(Route::SignIn);
                None
            }
        }
    }

    /// Disarm the timer and stop following the provider. Later observations
    /// are ignored.
    pub fn shutdown(&self) {
        self.shared.shutdown();
    }
}

impl Drop for SessionMonitor {
    fn drop(&mut self) {
        self.shared.shutdown();
    }
}
