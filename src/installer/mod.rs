//! Binary installation pipeline.
//!
//! The [`Installer`] is the one entry point for getting a tool binary onto
//! disk. Each call works through a fixed sequence for its target path:
//!
//! ```text
//! acquire per-target lock
//!   -> fetch advertised metadata
//!   -> existing binary usable?
//!        no  -> fresh install (download, validate, atomic rename)
//!        yes -> digest cache current?
//!                 yes -> AlreadyCurrent (no writes at all)
//!                 no  -> upgrade in place (may yield SkippedKept when the
//!                        target is held by another process)
//! release lock
//! ```
//!
//! The lock is held for the whole sequence, network transfer included, so
//! two concurrent callers can never both decide "I must install" for one
//! path; the loser re-observes the winner's completed state and usually
//! skips. Locks key on `{directory, binary name}` and are process-local;
//! see [`LockRegistry`] for the exact guarantees.
//!
//! All mutation of the target directory goes through atomic renames of
//! fully-written temp files, which keeps the binary at its final path
//! complete at every instant, crashes and parallel processes included.

mod atomic;
mod classify;
mod context;
mod registry;
mod upgrade;

pub use classify::{RenameFailure, classify_rename_error};
#[cfg(any(test, feature = "test-utils"))]
pub use context::LockedTargetSimulation;
pub use context::{InstallOptions, InstallRequest, InstallTarget};
pub use registry::{InstallGuard, LockKey, LockRegistry};

use crate::digest;
use crate::platform::Platform;
use crate::source::ArtifactSource;
use crate::utils::DownloadProgress;
use anyhow::Result;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// How an install call left the target directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    /// No usable binary existed; one was downloaded and installed.
    Installed,
    /// The installed binary already matches the server digest; nothing was
    /// downloaded or written.
    AlreadyCurrent,
    /// An existing binary was replaced with newer content.
    Upgraded,
    /// The target was held by another process; the existing valid binary
    /// was kept and the upgrade deferred to a future invocation.
    SkippedKept,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Installed => "installed",
            Self::AlreadyCurrent => "already current",
            Self::Upgraded => "upgraded",
            Self::SkippedKept => "kept existing (target busy)",
        };
        f.write_str(text)
    }
}

/// Successful result of an install call.
///
/// Carries the install directory, never the binary path; callers that need
/// the binary itself join the directory with the platform binary name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub kind: OutcomeKind,
    /// Directory containing the installed binary. Exists and holds a valid
    /// binary on every `Ok` outcome, including the skipped ones.
    pub dir: PathBuf,
}

impl InstallOutcome {
    /// Whether this call wrote a new binary to disk.
    #[must_use]
    pub const fn changed(&self) -> bool {
        matches!(self.kind, OutcomeKind::Installed | OutcomeKind::Upgraded)
    }
}

#[cfg(unix)]
fn has_exec_bit(meta: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn has_exec_bit(_meta: &std::fs::Metadata) -> bool {
    true
}

/// Whether a real, runnable binary sits at `path`.
///
/// The size floor is a heuristic proxy for "not a truncated or placeholder
/// file"; it spares us a per-format magic-number check.
pub(crate) async fn is_usable_binary(path: &Path, min_size: u64) -> bool {
    match tokio::fs::metadata(path).await {
        Ok(meta) => meta.is_file() && meta.len() > min_size && has_exec_bit(&meta),
        Err(_) => false,
    }
}

/// Fetches, verifies, and installs tool binaries.
///
/// One installer (or clones of its [`LockRegistry`]) should serve the whole
/// process; the per-target serialization guarantee only covers callers
/// sharing a registry.
///
/// # Examples
///
/// ```rust,no_run
/// use armory::installer::{Installer, InstallRequest};
/// use armory::source::HttpSource;
/// use armory::version::VersionSpec;
///
/// # async fn example() -> anyhow::Result<()> {
/// let source = HttpSource::new("https://artifacts.example.com")?;
/// let installer = Installer::new(source);
///
/// let request = InstallRequest::new(
///     "kite",
///     VersionSpec::parse("2.7.0")?,
///     "/opt/tools",
/// );
/// let outcome = installer.install(&request).await?;
/// println!("{}", outcome.dir.display());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Installer<S> {
    source: S,
    options: InstallOptions,
    registry: LockRegistry,
    platform: Platform,
}

impl<S: ArtifactSource> Installer<S> {
    /// Creates an installer with default options and a fresh lock registry.
    pub fn new(source: S) -> Self {
        Self::with_options(source, InstallOptions::default())
    }

    /// Creates an installer with explicit options and a fresh lock
    /// registry.
    pub fn with_options(source: S, options: InstallOptions) -> Self {
        Self::with_registry(source, options, LockRegistry::new())
    }

    /// Creates an installer sharing an existing lock registry.
    ///
    /// Use this when several installer instances must serialize against
    /// each other; the registry is the unit of coordination.
    pub fn with_registry(source: S, options: InstallOptions, registry: LockRegistry) -> Self {
        Self {
            source,
            options,
            registry,
            platform: Platform::current(),
        }
    }

    /// The options this installer applies to every request.
    #[must_use]
    pub fn options(&self) -> &InstallOptions {
        &self.options
    }

    /// Ensures the requested binary is installed and current.
    ///
    /// Blocks while another install for the same `{directory, binary}` is
    /// in flight; hold times include network transfer, so waiting for
    /// seconds is ordinary. On every `Ok` the returned directory contains
    /// a valid binary, though [`OutcomeKind`] tells whether this call
    /// wrote it, found it already current, or kept a locked older copy.
    ///
    /// # Errors
    ///
    /// [`crate::core::ArmoryError`] variants for transport, integrity,
    /// permission, sidecar, and unsurvivable locked-target failures.
    pub async fn install(&self, request: &InstallRequest) -> Result<InstallOutcome> {
        let target = InstallTarget::resolve(request, self.platform);
        let location = request.location(self.platform);
        debug!(
            tool = %request.tool,
            version = %request.version,
            dir = %target.dir.display(),
            "starting install"
        );

        let _guard = self.registry.acquire(target.lock_key()).await;

        let metadata = self.source.fetch_metadata(&location).await?;
        let existing_valid = is_usable_binary(&target.binary_path, self.options.min_size).await;

        if existing_valid && !digest::should_download(&metadata.sha256, &target.dir).await {
            info!(
                binary = %target.binary_path.display(),
                "installed binary is current, skipping download"
            );
            return Ok(InstallOutcome {
                kind: OutcomeKind::AlreadyCurrent,
                dir: target.dir,
            });
        }

        let progress = if self.options.show_progress {
            DownloadProgress::for_download(&request.tool, metadata.content_length)
        } else {
            DownloadProgress::hidden()
        };

        let kind = if existing_valid {
            upgrade::install_upgrade(
                &self.source,
                &location,
                &target,
                &self.options,
                &metadata,
                &progress,
            )
            .await
        } else {
            atomic::install_fresh(
                &self.source,
                &location,
                &target,
                &self.options,
                &metadata,
                &progress,
            )
            .await
            .map(|()| OutcomeKind::Installed)
        };
        progress.finish();

        Ok(InstallOutcome { kind: kind?, dir: target.dir })
    }
}
