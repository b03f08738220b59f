//! Draft Editor - local edits bound to a submission workflow
//!
//! ## Phases
//!
//! ```text
//!   Idle ──submit──► Validating ──► Uploading? ──► Persisting ──► Succeeded ──► Idle
//!    ▲                   │              │              │
//!    │                invalid         error          error
//!    │                   │              ▼              ▼
//!    └───────────────────┴─────────── Failed ◄─────────┘
//! ```
//!
//! While a submission is in flight (`Validating`, `Uploading`, `Persisting`)
//! further submits are rejected, so the editor is the only writer per owner.
//! Snapshots from the profile store refill the draft only while no
//! submission is in flight.
//!
//! [`DraftEditor::follow_identity`] keeps the binding in step with an
//! identity provider: signing out unbinds the editor and drops the selected
//! file, and a new identity rebinds it from scratch.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::{Mutex, MutexGuard};
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backend::{IdentityProvider, Navigator, Route};
use crate::config::LinkshareConfig;
use crate::error::{LinkshareResult, PersistError, UploadError, ValidationError};
use crate::notice::{Notice, NoticeBoard};
use crate::profile::{ProfileBinding, ProfileStore};
use crate::types::{OwnerId, ProfilePatch, ProfileRecord, UploadedAsset};
use crate::upload::AssetUploader;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EditorPhase {
    #[default]
    Idle,
    Validating,
    Uploading,
    Persisting,
    Succeeded,
    Failed,
}

impl EditorPhase {
    /// True while a submission holds the writer gate
    pub fn is_submitting(&self) -> bool {
        matches!(
            self,
            EditorPhase::Validating | EditorPhase::Uploading | EditorPhase::Persisting
        )
    }
}

/// Editable copy of the profile's text fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl Draft {
    pub fn from_record(record: &ProfileRecord) -> Self {
        Self {
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            email: record.email.clone(),
        }
    }

    /// Field-level checks. Names must be non-blank; email, if given, must
    /// look like `local@domain` without whitespace.
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::default();
        if self.first_name.trim().is_empty() {
            errors.first_name = Some(ValidationError::RequiredField {
                field: "First name",
            });
        }
        if self.last_name.trim().is_empty() {
            errors.last_name = Some(ValidationError::RequiredField { field: "Last name" });
        }
        if !self.email.is_empty() && !is_plausible_email(&self.email) {
            errors.email = Some(ValidationError::Format {
                field: "email",
                value: self.email.clone(),
            });
        }
        errors
    }

    fn to_patch(&self, image_url: Option<String>) -> ProfilePatch {
        let mut patch = ProfilePatch::new()
            .first_name(self.first_name.clone())
            .last_name(self.last_name.clone())
            .email(self.email.clone());
        patch.image_url = image_url;
        patch
    }
}

/// Non-whitespace text, an `@`, then more non-whitespace text
fn is_plausible_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    value
        .char_indices()
        .any(|(i, c)| c == '@' && i > 0 && i + 1 < value.len())
}

/// Validation errors keyed by form field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub first_name: Option<ValidationError>,
    pub last_name: Option<ValidationError>,
    pub email: Option<ValidationError>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.email.is_none()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        [&self.first_name, &self.last_name, &self.email]
            .into_iter()
            .flatten()
    }
}

/// What the avatar slot currently shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvatarPreview {
    /// Stored avatar at a public URL
    Remote(String),
    /// Locally selected file, not yet uploaded
    Pending {
        file_name: String,
        mime_type: String,
        bytes: Bytes,
    },
}

impl AvatarPreview {
    pub fn is_pending(&self) -> bool {
        matches!(self, AvatarPreview::Pending { .. })
    }
}

/// Committed values shown ahead of the store's next snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalOverride {
    pub record: ProfileRecord,
}

/// Result of one [`DraftEditor::submit`] call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Committed; the record as stored
    Saved(ProfileRecord),
    /// Draft failed validation, nothing was written
    Invalid(FieldErrors),
    /// Avatar rejected or not stored, the profile was not written
    UploadFailed(UploadError),
    /// The profile merge-write failed
    PersistFailed(PersistError),
    /// Another submission was in flight, or no identity is bound
    Rejected,
}

impl SubmitOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, SubmitOutcome::Saved(_))
    }
}

#[derive(Debug, Default)]
struct EditorState {
    owner: Option<OwnerId>,
    phase: EditorPhase,
    draft: Draft,
    errors: FieldErrors,
    pending: Option<UploadedAsset>,
    avatar: Option<AvatarPreview>,
    authoritative: Option<ProfileRecord>,
    local_override: Option<LocalOverride>,
}

impl EditorState {
    fn apply_snapshot(&mut self, record: ProfileRecord) {
        self.local_override = None;
        if !self.phase.is_submitting() {
            self.draft = Draft::from_record(&record);
            if self.pending.is_none() {
                self.avatar = record.image_url.clone().map(AvatarPreview::Remote);
            }
        }
        self.authoritative = Some(record);
    }
}

/// The parts of the editor that binding touches, shareable with the
/// identity follower task
#[derive(Clone)]
struct Attachment {
    store: ProfileStore,
    state: Arc<Mutex<EditorState>>,
    binding: Arc<AsyncMutex<ProfileBinding>>,
    redirect: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Attachment {
    async fn bind(&self, owner: &OwnerId) -> LinkshareResult<()> {
        let mut binding = self.binding.lock().await;
        binding.unbind();
        self.cancel_redirect();
        self.reset(Some(owner.clone()));

        let state = self.state.clone();
        let bound = owner.clone();
        binding
            .bind(&self.store, owner, move |record| {
                let mut state = state.lock();
                if state.owner.as_ref() == Some(&bound) {
                    state.apply_snapshot(record);
                }
            })
            .await?;
        debug!(%owner, "Editor bound");
        Ok(())
    }

    async fn unbind(&self) {
        let mut binding = self.binding.lock().await;
        binding.unbind();
        self.cancel_redirect();
        self.reset(None);
    }

    /// Bind to `identity` unless already bound to it; unbind on `None`
    async fn follow(&self, identity: Option<OwnerId>) {
        let current = self.state.lock().owner.clone();
        match identity {
            Some(owner) if current.as_ref() == Some(&owner) => {}
            Some(owner) => {
                if let Err(e) = self.bind(&owner).await {
                    warn!(%owner, error = %e, "Editor could not bind to new identity");
                    self.unbind().await;
                }
            }
            None => {
                if let Some(owner) = current {
                    debug!(%owner, "Identity gone, editor unbound");
                    self.unbind().await;
                }
            }
        }
    }

    fn reset(&self, owner: Option<OwnerId>) {
        let mut state = self.state.lock();
        let phase = state.phase;
        *state = EditorState {
            owner,
            phase,
            ..EditorState::default()
        };
    }

    fn cancel_redirect(&self) {
        if let Some(task) = self.redirect.lock().take() {
            task.abort();
        }
    }
}

/// Editable profile draft for the bound identity
pub struct DraftEditor {
    uploader: AssetUploader,
    navigator: Arc<dyn Navigator>,
    notices: NoticeBoard,
    redirect_delay: Duration,
    attachment: Attachment,
    phase_tx: watch::Sender<EditorPhase>,
    follower: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for DraftEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.attachment.state.lock();
        f.debug_struct("DraftEditor")
            .field("owner", &state.owner)
            .field("phase", &state.phase)
            .finish_non_exhaustive()
    }
}

impl DraftEditor {
    pub fn new(
        store: ProfileStore,
        uploader: AssetUploader,
        navigator: Arc<dyn Navigator>,
        notices: NoticeBoard,
        config: &LinkshareConfig,
    ) -> Self {
        let (phase_tx, _) = watch::channel(EditorPhase::Idle);
        Self {
            uploader,
            navigator,
            notices,
            redirect_delay: config.redirect_delay(),
            attachment: Attachment {
                store,
                state: Arc::new(Mutex::new(EditorState::default())),
                binding: Arc::new(AsyncMutex::new(ProfileBinding::new())),
                redirect: Arc::new(Mutex::new(None)),
            },
            phase_tx,
            follower: Mutex::new(None),
        }
    }

    fn state(&self) -> MutexGuard<'_, EditorState> {
        self.attachment.state.lock()
    }

    /// Attach the editor to `owner`'s live profile.
    ///
    /// Any previous binding is cancelled first, and the draft, field errors
    /// and selected file of the previous identity are discarded.
    pub async fn bind(&self, owner: &OwnerId) -> LinkshareResult<()> {
        self.attachment.bind(owner).await
    }

    /// Detach from the current identity and discard local state
    pub async fn unbind(&self) {
        self.attachment.unbind().await
    }

    /// Bind to the provider's current identity and track every later change.
    ///
    /// Losing the identity (sign-out, session expiry) unbinds the editor,
    /// cancelling its profile subscription and discarding the draft and any
    /// selected file. Calling this again replaces the previous follower.
    pub async fn follow_identity(&self, provider: Arc<dyn IdentityProvider>) {
        let mut rx = provider.watch();
        let initial = rx.borrow_and_update().clone();
        self.attachment.follow(initial).await;

        let attachment = self.attachment.clone();
        let task = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let identity = rx.borrow_and_update().clone();
                attachment.follow(identity).await;
            }
            debug!("Identity feed closed, editor stops following");
        });

        if let Some(previous) = self.follower.lock().replace(task) {
            previous.abort();
        }
    }

    pub fn owner(&self) -> Option<OwnerId> {
        self.state().owner.clone()
    }

    pub fn phase(&self) -> EditorPhase {
        self.state().phase
    }

    /// Feed of phase transitions
    pub fn watch_phase(&self) -> watch::Receiver<EditorPhase> {
        self.phase_tx.subscribe()
    }

    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    pub fn draft(&self) -> Draft {
        self.state().draft.clone()
    }

    pub fn field_errors(&self) -> FieldErrors {
        self.state().errors.clone()
    }

    pub fn set_first_name(&self, value: impl Into<String>) {
        self.state().draft.first_name = value.into();
    }

    pub fn set_last_name(&self, value: impl Into<String>) {
        self.state().draft.last_name = value.into();
    }

    pub fn set_email(&self, value: impl Into<String>) {
        self.state().draft.email = value.into();
    }

    /// Replace every draft field at once
    pub fn set_draft(&self, draft: Draft) {
        self.state().draft = draft;
    }

    /// Choose an avatar file. The avatar slot previews it immediately; it is
    /// only validated and uploaded on submit.
    ///
    /// Returns `false`, keeping the previous selection, while a submission
    /// is in flight.
    pub fn select_asset(&self, asset: UploadedAsset) -> bool {
        let mut state = self.state();
        if state.phase.is_submitting() {
            return false;
        }
        state.avatar = Some(AvatarPreview::Pending {
            file_name: asset.file_name.clone(),
            mime_type: asset.mime_type.clone(),
            bytes: asset.bytes.clone(),
        });
        state.pending = Some(asset);
        true
    }

    pub fn pending_asset(&self) -> Option<UploadedAsset> {
        self.state().pending.clone()
    }

    pub fn avatar(&self) -> Option<AvatarPreview> {
        self.state().avatar.clone()
    }

    pub fn local_override(&self) -> Option<LocalOverride> {
        self.state().local_override.clone()
    }

    /// Record to display: the local override if one is pending, else the
    /// latest snapshot.
    pub fn displayed(&self) -> Option<ProfileRecord> {
        let state = self.state();
        state
            .local_override
            .as_ref()
            .map(|o| o.record.clone())
            .or_else(|| state.authoritative.clone())
    }

    fn transition(&self, state: &mut EditorState, phase: EditorPhase) {
        state.phase = phase;
        self.phase_tx.send_replace(phase);
    }

    fn set_phase(&self, phase: EditorPhase) {
        let mut state = self.state();
        self.transition(&mut state, phase);
    }

    fn fail(&self, notice: Notice) {
        self.notices.post(notice);
        let mut state = self.state();
        self.transition(&mut state, EditorPhase::Failed);
        self.transition(&mut state, EditorPhase::Idle);
    }

    /// Validate, upload the selected avatar if any, and merge-commit the
    /// draft.
    ///
    /// Every failure is posted as a notice and leaves the editor `Idle` with
    /// the draft and selected file intact.
    pub async fn submit(&self) -> SubmitOutcome {
        let (owner, draft, pending) = {
            let mut state = self.state();
            if state.phase.is_submitting() {
                debug!(phase = ?state.phase, "Submit rejected, already in flight");
                return SubmitOutcome::Rejected;
            }
            let Some(owner) = state.owner.clone() else {
                warn!("Submit with no bound identity");
                return SubmitOutcome::Rejected;
            };

            self.transition(&mut state, EditorPhase::Validating);
            let errors = state.draft.validate();
            if !errors.is_empty() {
                debug!(%owner, "Draft failed validation");
                state.errors = errors.clone();
                self.transition(&mut state, EditorPhase::Idle);
                return SubmitOutcome::Invalid(errors);
            }
            state.errors = FieldErrors::default();
            (owner, state.draft.clone(), state.pending.clone())
        };

        let mut image_url = None;
        if let Some(asset) = pending.as_ref() {
            self.set_phase(EditorPhase::Uploading);
            match self.uploader.upload(asset, &owner).await {
                Ok(reference) => image_url = Some(reference.url),
                Err(e) => {
                    self.fail(Notice::from(&e));
                    return SubmitOutcome::UploadFailed(e);
                }
            }
        }

        self.set_phase(EditorPhase::Persisting);
        let record = match self.attachment.store.commit(&owner, &draft.to_patch(image_url)).await {
            Ok(record) => record,
            Err(e) => {
                self.fail(Notice::from(&e));
                return SubmitOutcome::PersistFailed(e);
            }
        };

        {
            let mut state = self.state();
            if state.owner.as_ref() == Some(&owner) {
                state.local_override = Some(LocalOverride {
                    record: record.clone(),
                });
                state.pending = None;
                state.avatar = record.image_url.clone().map(AvatarPreview::Remote);
            }
            self.transition(&mut state, EditorPhase::Succeeded);
        }

        info!(%owner, "Profile saved");
        self.notices
            .post(Notice::success("Profile updated successfully!"));
        self.schedule_redirect();
        self.set_phase(EditorPhase::Idle);
        SubmitOutcome::Saved(record)
    }

    fn schedule_redirect(&self) {
        let navigator = self.navigator.clone();
        let delay = self.redirect_delay;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            navigator.redirect(Route::Links);
        });
        if let Some(previous) = self.attachment.redirect.lock().replace(task) {
            previous.abort();
        }
    }
}

impl Drop for DraftEditor {
    fn drop(&mut self) {
        if let Some(follower) = self.follower.lock().take() {
            follower.abort();
        }
        self.attachment.cancel_redirect();
    }
}
