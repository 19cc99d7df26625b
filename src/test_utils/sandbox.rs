//! Throwaway install roots for integration and library tests.

use crate::digest;
use crate::platform::Platform;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary install root with helpers for planting and inspecting
/// installed binaries.
///
/// The sandbox owns its [`TempDir`]; everything under it disappears when the
/// sandbox is dropped.
pub struct InstallSandbox {
    pub temp_dir: TempDir,
    pub base_dir: PathBuf,
}

impl InstallSandbox {
    /// Create a fresh sandbox with an empty install root.
    pub fn new() -> Result<Self> {
        super::init_test_logging(None);

        let temp_dir = TempDir::new()?;
        let base_dir = temp_dir.path().join("tools");
        std::fs::create_dir_all(&base_dir)?;

        Ok(Self { temp_dir, base_dir })
    }

    /// Install directory for a tool and version directory name.
    #[must_use]
    pub fn install_dir(&self, tool: &str, version_dir: &str) -> PathBuf {
        self.base_dir.join(tool).join(version_dir)
    }

    /// Binary path inside [`InstallSandbox::install_dir`], with the
    /// platform's file name adjustments applied.
    #[must_use]
    pub fn binary_path(&self, tool: &str, version_dir: &str) -> PathBuf {
        self.install_dir(tool, version_dir).join(Platform::current().binary_file_name(tool))
    }

    /// Plant a binary and matching digest sidecar, exactly as a completed
    /// install would leave them.
    pub async fn plant_install(
        &self,
        tool: &str,
        version_dir: &str,
        bytes: &[u8],
    ) -> Result<PathBuf> {
        let dir = self.install_dir(tool, version_dir);
        tokio::fs::create_dir_all(&dir).await?;

        let binary = dir.join(Platform::current().binary_file_name(tool));
        tokio::fs::write(&binary, bytes).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).await?;
        }

        digest::persist_digest(&dir, &digest::hash_bytes(bytes)).await?;
        Ok(binary)
    }

    /// Read an installed binary's bytes.
    pub async fn read_binary(&self, tool: &str, version_dir: &str) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(self.binary_path(tool, version_dir)).await?)
    }

    /// The digest sidecar contents for an install directory, if present.
    pub async fn recorded_digest(&self, tool: &str, version_dir: &str) -> Option<String> {
        digest::read_cached_digest(&self.install_dir(tool, version_dir))
            .await
            .ok()
            .flatten()
    }

    /// File names of leftover download staging files under an install
    /// directory. A clean install or a clean failure leaves none.
    pub fn temp_litter(&self, tool: &str, version_dir: &str) -> Vec<String> {
        list_temp_files(&self.install_dir(tool, version_dir))
    }
}

/// Staging-file names (`*.tmp.*`) directly under `dir`.
#[must_use]
pub fn list_temp_files(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.contains(".tmp."))
        .collect()
}
