//! Global configuration management.
//!
//! Configuration lives in `~/.armory/config.toml` on Unix-like systems and
//! `%LOCALAPPDATA%\armory\config.toml` on Windows; the `ARMORY_CONFIG`
//! environment variable or the `--config` flag point somewhere else. Every
//! key is optional and a missing file is simply the defaults, so a fresh
//! machine works with zero setup. Command-line flags override file values.
//!
//! ```toml
//! base_url = "https://artifacts.example.com"
//! repository = "releases"
//! install_dir = "~/tools"
//! verify_downloads = true
//! min_binary_size = 1048576
//! ```

use crate::constants::DEFAULT_REPOSITORY;
use crate::installer::InstallOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// User-level settings shared by every invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Artifact server base URL. Required for installs unless given on the
    /// command line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Repository identifier on the artifact server. Defaults to
    /// `releases`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,

    /// Root directory installs nest under. Tilde-expanded. Defaults to
    /// `~/.armory/tools`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_dir: Option<String>,

    /// Whether downloaded files are re-hashed and compared against the
    /// server digest before being installed. Defaults to on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_downloads: Option<bool>,

    /// Smallest byte count treated as a real binary. Defaults to 1 MiB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_binary_size: Option<u64>,
}

impl GlobalConfig {
    /// Load configuration from the default location, or defaults when no
    /// file exists.
    pub async fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit path when one was given,
    /// falling back to [`GlobalConfig::load`] behavior otherwise.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(&path).await,
            None => Self::load().await,
        }
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or does not parse as the
    /// expected TOML schema.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("failed to parse config from {}", path.display()))
    }

    /// Write this configuration to a specific file, creating parent
    /// directories as needed.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let content =
            toml::to_string_pretty(self).context("failed to serialize configuration")?;
        fs::write(path, content)
            .await
            .with_context(|| format!("failed to write config to {}", path.display()))
    }

    /// The per-user configuration file location.
    ///
    /// `ARMORY_CONFIG` overrides; otherwise the platform convention
    /// applies.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("ARMORY_CONFIG") {
            return Ok(PathBuf::from(path));
        }

        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("unable to determine local data directory"))?
                .join("armory")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("unable to determine home directory"))?
                .join(".armory")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// The repository identifier to fetch from.
    #[must_use]
    pub fn repository(&self) -> &str {
        self.repository.as_deref().unwrap_or(DEFAULT_REPOSITORY)
    }

    /// The install root, tilde-expanded, defaulting to `~/.armory/tools`.
    pub fn resolved_install_dir(&self) -> Result<PathBuf> {
        match &self.install_dir {
            Some(dir) => Ok(PathBuf::from(shellexpand::tilde(dir).into_owned())),
            None => Ok(dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("unable to determine home directory"))?
                .join(".armory")
                .join("tools")),
        }
    }

    /// Installer options with this configuration's overrides applied.
    #[must_use]
    pub fn install_options(&self) -> InstallOptions {
        let mut options = InstallOptions::default();
        if let Some(verify) = self.verify_downloads {
            options.verify_downloads = verify;
        }
        if let Some(min_size) = self.min_binary_size {
            options.min_size = min_size;
        }
        options
    }
}
