//! Engine facade wiring storage and components together
//!
//! [`LinkshareEngine`] owns one [`Storage`] and hands out the components that
//! share it. Applications can also build the components directly from their
//! own backend ports.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::backend::{IdentityProvider, Navigator};
use crate::config::LinkshareConfig;
use crate::editor::DraftEditor;
use crate::error::LinkshareResult;
use crate::links::LinkReader;
use crate::notice::NoticeBoard;
use crate::preview::PreviewProjector;
use crate::profile::ProfileStore;
use crate::session::SessionMonitor;
use crate::storage::Storage;
use crate::types::OwnerId;
use crate::upload::AssetUploader;

/// File name of the database inside the data directory
pub const DB_FILE_NAME: &str = "linkshare.redb";

pub struct LinkshareEngine {
    config: LinkshareConfig,
    storage: Storage,
    profiles: ProfileStore,
    links: LinkReader,
    notices: NoticeBoard,
    data_dir: Option<PathBuf>,
}

impl std::fmt::Debug for LinkshareEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkshareEngine")
            .field("data_dir", &self.data_dir)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LinkshareEngine {
    /// Open (or create) the database in `data_dir`
    ///
    /// # Errors
    ///
    /// Returns `LinkshareError::Io` if the directory cannot be created and
    /// `LinkshareError::Database` if the database cannot be opened.
    pub fn open(data_dir: impl AsRef<Path>, config: LinkshareConfig) -> LinkshareResult<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        info!(?data_dir, "Opening Linkshare engine");

        std::fs::create_dir_all(&data_dir)?;
        let storage =
            Storage::new(data_dir.join(DB_FILE_NAME))?.with_public_base_url(&config.public_base_url);
        Ok(Self::from_storage(storage, config, Some(data_dir)))
    }

    /// Engine over an in-memory database
    pub fn in_memory(config: LinkshareConfig) -> LinkshareResult<Self> {
        let storage = Storage::in_memory()?.with_public_base_url(&config.public_base_url);
        Ok(Self::from_storage(storage, config, None))
    }

    fn from_storage(storage: Storage, config: LinkshareConfig, data_dir: Option<PathBuf>) -> Self {
        let docs = Arc::new(storage.clone());
        Self {
            profiles: ProfileStore::new(docs.clone()),
            links: LinkReader::new(docs),
            notices: NoticeBoard::new(),
            config,
            storage,
            data_dir,
        }
    }

    pub fn config(&self) -> &LinkshareConfig {
        &self.config
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// `None` for an in-memory engine
    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    pub fn links(&self) -> &LinkReader {
        &self.links
    }

    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    pub fn uploader(&self) -> AssetUploader {
        AssetUploader::with_config(Arc::new(self.storage.clone()), &self.config)
    }

    /// A new, unbound draft editor posting to the engine's notice board
    pub fn editor(&self, navigator: Arc<dyn Navigator>) -> DraftEditor {
        DraftEditor::new(
            self.profiles.clone(),
            self.uploader(),
            navigator,
            self.notices.clone(),
            &self.config,
        )
    }

    pub fn preview(&self, owner: &OwnerId) -> PreviewProjector {
        PreviewProjector::open(&self.profiles, &self.links, owner, &self.config)
    }

    pub fn session(
        &self,
        provider: Arc<dyn IdentityProvider>,
        navigator: Arc<dyn Navigator>,
    ) -> SessionMonitor {
        SessionMonitor::with_config(provider, navigator, self.notices.clone(), &self.config)
    }
}
