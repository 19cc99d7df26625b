//! Test utilities.
//!
//! This module provides the pieces tests need to drive the full install
//! pipeline without a network: an in-memory [`MockArtifactSource`] with
//! injectable failures and call counters, and a process-wide logging
//! initializer safe to call from every test.
//!
//! It is compiled for this crate's own tests and for integration tests via
//! the `test-utils` feature; nothing here exists in release builds.

pub mod sandbox;

pub use sandbox::InstallSandbox;

use crate::core::ArmoryError;
use crate::digest;
use crate::source::{ArtifactLocation, ArtifactMetadata, ArtifactSource};
use crate::utils::DownloadProgress;
use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests.
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Initializes the tracing subscriber at most once regardless of how many
/// tests call it. Honors `ARMORY_LOG` (then `RUST_LOG`) when no explicit
/// level is given; stays silent when neither is set.
///
/// ```bash
/// ARMORY_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if let Ok(spec) = std::env::var("ARMORY_LOG") {
            EnvFilter::new(spec)
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}

#[derive(Debug, Clone)]
struct MockArtifact {
    body: Vec<u8>,
    digest: String,
}

#[derive(Debug, Default)]
struct MockInner {
    artifacts: Mutex<HashMap<String, MockArtifact>>,
    metadata_failures: AtomicUsize,
    download_failures: AtomicUsize,
    abort_download_after: Mutex<Option<u64>>,
    metadata_fetches: AtomicUsize,
    downloads: AtomicUsize,
}

/// In-memory artifact source with failure injection.
///
/// Artifacts are published per [`ArtifactLocation`]; fetches against
/// unpublished locations return HTTP 404 errors like a real server would.
/// Clones share all state, so a test keeps one handle for assertions while
/// the installer owns another.
///
/// # Examples
///
/// ```rust
/// use armory::installer::InstallRequest;
/// use armory::platform::Platform;
/// use armory::test_utils::MockArtifactSource;
/// use armory::version::VersionSpec;
///
/// let source = MockArtifactSource::new();
/// let request = InstallRequest::new("kite", VersionSpec::Latest, "/tmp/tools");
/// source.publish(&request.location(Platform::current()), vec![1, 2, 3]);
/// assert_eq!(source.downloads(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockArtifactSource {
    inner: Arc<MockInner>,
}

impl MockArtifactSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a body whose advertised digest is its real SHA-256.
    pub fn publish(&self, location: &ArtifactLocation, body: Vec<u8>) {
        let digest = digest::hash_bytes(&body);
        self.publish_with_digest(location, body, &digest);
    }

    /// Publishes a body with an arbitrary advertised digest.
    ///
    /// Pass an empty digest for a server that advertises none, or a wrong
    /// one for a server that lies.
    pub fn publish_with_digest(&self, location: &ArtifactLocation, body: Vec<u8>, digest: &str) {
        self.inner.artifacts.lock().unwrap().insert(
            location.remote_path(),
            MockArtifact { body, digest: digest.to_string() },
        );
    }

    /// Makes the next `count` metadata fetches fail with HTTP 503.
    pub fn fail_metadata(&self, count: usize) {
        self.inner.metadata_failures.store(count, Ordering::SeqCst);
    }

    /// Makes the next `count` downloads fail with HTTP 500 before writing
    /// anything.
    pub fn fail_downloads(&self, count: usize) {
        self.inner.download_failures.store(count, Ordering::SeqCst);
    }

    /// Makes the next download write at most `bytes` bytes and then fail
    /// as if the connection dropped.
    pub fn abort_download_after(&self, bytes: u64) {
        *self.inner.abort_download_after.lock().unwrap() = Some(bytes);
    }

    /// Number of download calls made so far, failed ones included.
    #[must_use]
    pub fn downloads(&self) -> usize {
        self.inner.downloads.load(Ordering::SeqCst)
    }

    /// Number of metadata fetches made so far, failed ones included.
    #[must_use]
    pub fn metadata_fetches(&self) -> usize {
        self.inner.metadata_fetches.load(Ordering::SeqCst)
    }

    fn artifact_for(&self, location: &ArtifactLocation) -> Result<MockArtifact> {
        let path = location.remote_path();
        self.inner
            .artifacts
            .lock()
            .unwrap()
            .get(&path)
            .cloned()
            .ok_or_else(|| ArmoryError::HttpStatus { url: path, status: 404 }.into())
    }
}

fn take_budget(budget: &AtomicUsize) -> bool {
    let mut remaining = budget.load(Ordering::SeqCst);
    loop {
        if remaining == 0 {
            return false;
        }
        match budget.compare_exchange_weak(
            remaining,
            remaining - 1,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            Ok(_) => return true,
            Err(actual) => remaining = actual,
        }
    }
}

impl ArtifactSource for MockArtifactSource {
    async fn fetch_metadata(&self, location: &ArtifactLocation) -> Result<ArtifactMetadata> {
        self.inner.metadata_fetches.fetch_add(1, Ordering::SeqCst);

        if take_budget(&self.inner.metadata_failures) {
            return Err(ArmoryError::HttpStatus {
                url: location.remote_path(),
                status: 503,
            }
            .into());
        }

        let artifact = self.artifact_for(location)?;
        Ok(ArtifactMetadata {
            sha256: artifact.digest,
            content_length: Some(artifact.body.len() as u64),
        })
    }

    async fn fetch(
        &self,
        location: &ArtifactLocation,
        dest: &Path,
        progress: &DownloadProgress,
    ) -> Result<ArtifactMetadata> {
        self.inner.downloads.fetch_add(1, Ordering::SeqCst);

        if take_budget(&self.inner.download_failures) {
            return Err(ArmoryError::HttpStatus {
                url: location.remote_path(),
                status: 500,
            }
            .into());
        }

        let artifact = self.artifact_for(location)?;
        let abort_after = self.inner.abort_download_after.lock().unwrap().take();

        if let Some(limit) = abort_after {
            let cut = artifact.body.len().min(limit as usize);
            tokio::fs::write(dest, &artifact.body[..cut]).await?;
            progress.advance(cut as u64);
            return Err(anyhow::anyhow!(
                "connection reset after {cut} bytes while fetching {}",
                location.remote_path()
            ));
        }

        tokio::fs::write(dest, &artifact.body).await?;
        progress.advance(artifact.body.len() as u64);
        Ok(ArtifactMetadata {
            sha256: artifact.digest,
            content_length: Some(artifact.body.len() as u64),
        })
    }
}
