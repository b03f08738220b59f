//! Linkshare Core Library
//!
//! Profile and link synchronization for a link-sharing profile page.
//!
//! ## Overview
//!
//! An authenticated owner maintains a public profile: a display identity
//! (name, email, avatar) plus a set of links to known platforms. This crate
//! keeps the owner's editable draft, the persisted profile record and the
//! read-only preview consistent while their data sources arrive
//! asynchronously, and it enforces a bounded idle-session lifetime.
//!
//! ## Components
//!
//! - **Asset Upload Pipeline** ([`upload`]): validate and store an avatar
//! - **Link Collection Reader** ([`links`]): one-shot fetch of an owner's links
//! - **Profile Store** ([`profile`]): live, merge-write profile records
//! - **Session Monitor** ([`session`]): idle-timeout sign-out
//! - **Draft Editor** ([`editor`]): draft fields and the submit workflow
//! - **Preview Projector** ([`preview`]): profile card composed from the above
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use linkshare_core::{LinkshareConfig, LinkshareEngine, OwnerId, RouteLog};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = LinkshareEngine::open("~/.linkshare", LinkshareConfig::default())?;
//!     let owner = OwnerId::new("alice")?;
//!
//!     let editor = engine.editor(Arc::new(RouteLog::new()));
//!     editor.bind(&owner).await?;
//!     editor.set_first_name("Alice");
//!     editor.set_last_name("Liddell");
//!     editor.submit().await;
//!
//!     let preview = engine.preview(&owner);
//!     println!("{:?}", preview.settled().await);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod editor;
pub mod engine;
pub mod error;
pub mod identity;
pub mod links;
pub mod notice;
pub mod preview;
pub mod profile;
pub mod session;
pub mod snapshot;
pub mod storage;
pub mod types;
pub mod upload;

// Re-exports
pub use backend::{DocumentStore, IdentityProvider, Navigator, ObjectStore, Route, RouteLog};
pub use config::LinkshareConfig;
pub use editor::{AvatarPreview, Draft, DraftEditor, EditorPhase, FieldErrors, SubmitOutcome};
pub use engine::LinkshareEngine;
pub use error::{
    AuthError, LinkshareError, LinkshareResult, PersistError, UploadError, ValidationError,
};
pub use identity::LocalIdentity;
pub use links::LinkReader;
pub use notice::{Notice, NoticeBoard, NoticeLevel};
pub use preview::{PreviewProjector, PreviewState, ProfilePreview, RenderedLink, MOCKUP_SLOTS};
pub use profile::{ProfileBinding, ProfileFeed, ProfileSnapshot, ProfileStore, Subscription};
pub use session::{SessionEvent, SessionMonitor, SessionState};
pub use snapshot::{first_of_both, OneShot, SnapshotSource};
pub use storage::Storage;
pub use types::*;
pub use upload::AssetUploader;
