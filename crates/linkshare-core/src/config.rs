//! Runtime configuration
//!
//! Every field has a default, so an empty TOML file is a valid config.
//!
//! ```toml
//! idle_timeout_secs = 1800
//! max_asset_bytes = 5242880
//! accepted_mime_prefix = "image/"
//! redirect_delay_ms = 1000
//! public_base_url = "https://cdn.example.com/assets"
//! # preview_timeout_secs = 30
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LinkshareError, LinkshareResult};
use crate::storage::DEFAULT_PUBLIC_BASE_URL;

/// Idle-session lifetime: 30 minutes
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Longest idle-session lifetime a config may ask for: 30 days
pub const MAX_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Maximum avatar size: 5 MiB
pub const MAX_ASSET_BYTES: u64 = 5 * 1024 * 1024;

/// Only MIME types with this prefix are accepted as avatars
pub const ACCEPTED_MIME_PREFIX: &str = "image/";

/// Delay between a successful profile save and the redirect to the links view
pub const DEFAULT_REDIRECT_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkshareConfig {
    pub idle_timeout_secs: u64,
    pub max_asset_bytes: u64,
    pub accepted_mime_prefix: String,
    pub redirect_delay_ms: u64,
    /// How long the preview waits for its first profile snapshot.
    /// Unset means wait indefinitely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_timeout_secs: Option<u64>,
    pub public_base_url: String,
}

impl Default for LinkshareConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT.as_secs(),
            max_asset_bytes: MAX_ASSET_BYTES,
            accepted_mime_prefix: ACCEPTED_MIME_PREFIX.to_string(),
            redirect_delay_ms: DEFAULT_REDIRECT_DELAY.as_millis() as u64,
            preview_timeout_secs: None,
            public_base_url: DEFAULT_PUBLIC_BASE_URL.to_string(),
        }
    }
}

impl LinkshareConfig {
    pub fn from_toml_str(s: &str) -> LinkshareResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| LinkshareError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> LinkshareResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Load from `path` if it exists, defaults otherwise
    pub fn load_or_default(path: impl AsRef<Path>) -> LinkshareResult<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn to_toml_string(&self) -> LinkshareResult<String> {
        toml::to_string_pretty(self).map_err(|e| LinkshareError::Config(e.to_string()))
    }

    fn validate(&self) -> LinkshareResult<()> {
        if self.idle_timeout_secs == 0 {
            return Err(LinkshareError::Config(
                "idle_timeout_secs must be greater than zero".into(),
            ));
        }
        if self.idle_timeout_secs > MAX_IDLE_TIMEOUT.as_secs() {
            return Err(LinkshareError::Config(format!(
                "idle_timeout_secs must be at most {}",
                MAX_IDLE_TIMEOUT.as_secs()
            )));
        }
        if self.accepted_mime_prefix.is_empty() {
            return Err(LinkshareError::Config(
                "accepted_mime_prefix must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn redirect_delay(&self) -> Duration {
        Duration::from_millis(self.redirect_delay_ms)
    }

    pub fn preview_timeout(&self) -> Option<Duration> {
        self.preview_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let config = LinkshareConfig::default();
        assert_eq!(config.idle_timeout(), Duration::from_secs(1800));
        assert_eq!(config.max_asset_bytes, 5 * 1024 * 1024);
        assert_eq!(config.accepted_mime_prefix, "image/");
        assert_eq!(config.redirect_delay(), Duration::from_secs(1));
        assert_eq!(config.preview_timeout(), None);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = LinkshareConfig::from_toml_str("").unwrap();
        assert_eq!(config, LinkshareConfig::default());
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config = LinkshareConfig::from_toml_str(
            "idle_timeout_secs = 60\npreview_timeout_secs = 5\n",
        )
        .unwrap();
        assert_eq!(config.idle_timeout(), Duration::from_secs(60));
        assert_eq!(config.preview_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.max_asset_bytes, MAX_ASSET_BYTES);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(LinkshareConfig::from_toml_str("idle_timeout_secs = 0").is_err());
        assert!(LinkshareConfig::from_toml_str("accepted_mime_prefix = \"\"").is_err());
        assert!(LinkshareConfig::from_toml_str("idle_timeout_secs = \"soon\"").is_err());
    }

    #[test]
    fn test_idle_timeout_upper_bound() {
        let max = MAX_IDLE_TIMEOUT.as_secs();
        let config =
            LinkshareConfig::from_toml_str(&format!("idle_timeout_secs = {}", max)).unwrap();
        assert_eq!(config.idle_timeout(), MAX_IDLE_TIMEOUT);

        let err = LinkshareConfig::from_toml_str(&format!("idle_timeout_secs = {}", max + 1))
            .unwrap_err();
        assert!(err.to_string().contains("idle_timeout_secs"));
        assert!(
            LinkshareConfig::from_toml_str("idle_timeout_secs = 9223372036854775807").is_err()
        );
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = LinkshareConfig::default();
        let text = config.to_toml_string().unwrap();
        assert_eq!(LinkshareConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = LinkshareConfig::load_or_default(dir.path().join("linkshare.toml")).unwrap();
        assert_eq!(config, LinkshareConfig::default());
    }
}
