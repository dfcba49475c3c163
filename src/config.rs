//! Configuration loaded from `~/.config/vidpeek/config.toml`.
//!
//! Every field has a default, so an absent file or a partial file is fine.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::fingerprint::DEFAULT_ACCEPT_LANGUAGE;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub timeouts: Timeouts,
    pub endpoints: Endpoints,
    /// Maximum redirects followed for a single request.
    pub max_redirects: usize,
    /// `Accept-Language` sent with every request.
    pub accept_language: String,
}

/// Per-call timeouts, in seconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Page fetches and short-link resolution.
    pub page_secs: u64,
    /// Auxiliary lookups (tag lists, playable URLs).
    pub secondary_secs: u64,
    pub connect_secs: u64,
}

/// Upstream endpoints. Overridable so the pipeline can run against a mock.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// Base URL of the Bilibili web API.
    pub bilibili_api: String,
    /// Stream URL template for Xiaohongshu video keys; `{key}` is replaced.
    pub xiaohongshu_video_cdn: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeouts: Timeouts::default(),
            endpoints: Endpoints::default(),
            max_redirects: 10,
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            page_secs: 10,
            secondary_secs: 5,
            connect_secs: 10,
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            bilibili_api: "https://api.bilibili.com".to_string(),
            xiaohongshu_video_cdn: "http://sns-video-bd.xhscdn.com/stream/{key}".to_string(),
        }
    }
}

impl Timeouts {
    #[must_use]
    pub fn page(&self) -> Duration {
        Duration::from_secs(self.page_secs)
    }

    #[must_use]
    pub fn secondary(&self) -> Duration {
        Duration::from_secs(self.secondary_secs)
    }

    #[must_use]
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }
}

impl Config {
    /// Load from the default location.
    ///
    /// Returns defaults if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::from_file(&path)
    }

    /// Load from an explicit path. The file must exist.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("invalid TOML in {}", path.display()))
    }

    /// Parse a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Return the path to the config file.
#[must_use]
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vidpeek")
        .join("config.toml")
}
