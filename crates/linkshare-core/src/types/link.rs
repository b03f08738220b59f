//! Link Record Type - labeled outbound links owned by a profile
//!
//! Platforms are stored as free strings. Only the platforms in [`Platform`]
//! can be rendered; records naming anything else are skipped by readers.

use serde::{Deserialize, Serialize};

use super::{LinkId, OwnerId};

/// Platforms that have an icon and brand color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    GitHub,
    LinkedIn,
    YouTube,
    Facebook,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::GitHub,
        Platform::LinkedIn,
        Platform::YouTube,
        Platform::Facebook,
    ];

    /// Parse a stored platform name. Matching is exact.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Platform::GitHub => "GitHub",
            Platform::LinkedIn => "LinkedIn",
            Platform::YouTube => "YouTube",
            Platform::Facebook => "Facebook",
        }
    }

    /// Brand color used as the link button background
    pub fn color(&self) -> &'static str {
        match self {
            Platform::GitHub => "#1A1A1A",
            Platform::LinkedIn => "#2D68FF",
            Platform::YouTube => "#EE3939",
            Platform::Facebook => "#4267B2",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One entry of the flat `links` collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRecord {
    pub id: LinkId,
    pub user_id: OwnerId,
    pub platform: String,
    pub url: String,
}

impl LinkRecord {
    pub fn new(user_id: OwnerId, platform: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: LinkId::new(),
            user_id,
            platform: platform.into(),
            url: url.into(),
        }
    }

    /// Known platform for this record, `None` if it cannot be rendered
    pub fn known_platform(&self) -> Option<Platform> {
        Platform::from_name(&self.platform)
    }
}
