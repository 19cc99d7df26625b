//! Immutable per-invocation install context.
//!
//! A request describes what the caller wants, a target describes where it
//! lands on disk, and options describe how careful to be getting it there.
//! All three are constructed fresh per invocation and never mutated, so
//! concurrent installs share nothing but the lock registry and the source.

use crate::constants::{DEFAULT_REPOSITORY, MIN_BINARY_SIZE};
use crate::installer::registry::LockKey;
use crate::platform::Platform;
use crate::source::ArtifactLocation;
use crate::version::VersionSpec;
use std::path::PathBuf;

/// One caller's install request.
///
/// # Examples
///
/// ```rust
/// use armory::installer::InstallRequest;
/// use armory::version::VersionSpec;
///
/// let request = InstallRequest::new(
///     "kite",
///     VersionSpec::parse("2.7.0").unwrap(),
///     "/opt/tools",
/// );
/// assert_eq!(request.repository, "releases");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    /// Tool name; also the product segment in artifact URLs.
    pub tool: String,
    pub version: VersionSpec,
    /// Repository identifier on the artifact server.
    pub repository: String,
    /// Root directory installs nest under.
    pub base_dir: PathBuf,
}

impl InstallRequest {
    pub fn new(
        tool: impl Into<String>,
        version: VersionSpec,
        base_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            tool: tool.into(),
            version,
            repository: DEFAULT_REPOSITORY.to_string(),
            base_dir: base_dir.into(),
        }
    }

    /// Overrides the artifact repository this request fetches from.
    #[must_use]
    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = repository.into();
        self
    }

    /// Artifact coordinates for this request on `platform`.
    #[must_use]
    pub fn location(&self, platform: Platform) -> ArtifactLocation {
        ArtifactLocation {
            repository: self.repository.clone(),
            tool: self.tool.clone(),
            version: self.version.clone(),
            platform,
            binary_name: platform.binary_file_name(&self.tool),
        }
    }
}

/// Where a request's binary lives on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallTarget {
    /// Per-version install directory `{base}/{tool}/{version}`.
    pub dir: PathBuf,
    /// Full path of the binary inside [`InstallTarget::dir`].
    pub binary_path: PathBuf,
    /// Platform-adjusted binary file name.
    pub binary_name: String,
}

impl InstallTarget {
    /// Derives the target for a request.
    ///
    /// Latest requests share one `latest` directory per tool and are
    /// upgraded in place there as new releases appear.
    #[must_use]
    pub fn resolve(request: &InstallRequest, platform: Platform) -> Self {
        let dir = request
            .base_dir
            .join(&request.tool)
            .join(request.version.dir_segment());
        let binary_name = platform.binary_file_name(&request.tool);
        let binary_path = dir.join(&binary_name);
        Self { dir, binary_path, binary_name }
    }

    /// The registry key serializing writers of this target.
    #[must_use]
    pub fn lock_key(&self) -> LockKey {
        LockKey {
            dir: self.dir.clone(),
            binary_name: self.binary_name.clone(),
        }
    }
}

/// Behavior toggles for an install.
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Recompute and compare the SHA-256 of downloaded files against the
    /// server digest before promoting them.
    pub verify_downloads: bool,
    /// Smallest byte count a real binary can have. Files at or below this
    /// size are treated as torn previous installs.
    pub min_size: u64,
    /// Render a progress bar while downloading.
    pub show_progress: bool,
    /// Makes renames onto the target binary fail as if another process
    /// held it. Test hook; unreachable in release builds.
    #[cfg(any(test, feature = "test-utils"))]
    pub locked_target_simulation: Option<LockedTargetSimulation>,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            verify_downloads: true,
            min_size: MIN_BINARY_SIZE,
            show_progress: false,
            #[cfg(any(test, feature = "test-utils"))]
            locked_target_simulation: None,
        }
    }
}

impl InstallOptions {
    #[must_use]
    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify_downloads = verify;
        self
    }

    #[must_use]
    pub fn with_min_size(mut self, min_size: u64) -> Self {
        self.min_size = min_size;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    #[cfg(any(test, feature = "test-utils"))]
    #[must_use]
    pub fn with_locked_target_simulation(mut self, simulation: LockedTargetSimulation) -> Self {
        self.locked_target_simulation = Some(simulation);
        self
    }
}

/// Injects rename failures that look like a file lock held elsewhere.
///
/// Real locked-target behavior only exists on platforms with mandatory
/// file locking on open executables, which a portable test cannot
/// produce. This hook makes the rename step fail with the locking errno
/// a fixed number of times, sharing its countdown across clones so a
/// test can hand one to the installer and keep a handle itself.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Clone)]
pub struct LockedTargetSimulation {
    failures: std::sync::Arc<std::sync::atomic::AtomicUsize>,
}

#[cfg(any(test, feature = "test-utils"))]
impl LockedTargetSimulation {
    /// Fail the next `count` renames.
    #[must_use]
    pub fn failing(count: usize) -> Self {
        Self {
            failures: std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(count)),
        }
    }

    /// Fail every rename.
    #[must_use]
    pub fn always() -> Self {
        Self::failing(usize::MAX)
    }

    /// Consumes one pending failure; `false` once the budget is spent.
    pub fn take_failure(&self) -> bool {
        use std::sync::atomic::Ordering;

        let mut remaining = self.failures.load(Ordering::Relaxed);
        loop {
            if remaining == 0 {
                return false;
            }
            match self.failures.compare_exchange_weak(
                remaining,
                remaining.saturating_sub(1),
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(actual) => remaining = actual,
            }
        }
    }

    /// The errno a locked rename produces on this platform.
    #[must_use]
    pub fn locked_error() -> std::io::Error {
        #[cfg(windows)]
        {
            // ERROR_SHARING_VIOLATION
            std::io::Error::from_raw_os_error(32)
        }
        #[cfg(not(windows))]
        {
            // ETXTBSY
            std::io::Error::from_raw_os_error(26)
        }
    }
}
