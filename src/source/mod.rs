//! Artifact source abstraction.
//!
//! The installer never talks to the network directly; it goes through the
//! [`ArtifactSource`] trait. The production implementation is
//! [`http::HttpSource`]; tests drive the full install pipeline against an
//! in-memory source instead, so every concurrency and failure path is
//! exercised without a server.
//!
//! Artifacts live at a well-known layout below the source's base URL:
//!
//! ```text
//! {repository}/v2/{version}/{tool}-{os}-{arch}/{binary}
//! ```
//!
//! where `{version}` is either an exact `MAJOR.MINOR.PATCH` or the
//! `[RELEASE]` sentinel the server resolves to the newest release.

pub mod http;

pub use http::HttpSource;

use crate::platform::Platform;
use crate::utils::DownloadProgress;
use crate::version::VersionSpec;
use anyhow::Result;
use std::path::Path;

/// What a source knows about an artifact before (or while) fetching it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactMetadata {
    /// Lowercase hex SHA-256 the server advertises for the artifact.
    /// Empty when the server published no digest; that is legal, not an
    /// error.
    pub sha256: String,
    /// Body size in bytes when the server reports one.
    pub content_length: Option<u64>,
}

/// Fully-resolved coordinates of one artifact. Computed per request, never
/// stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLocation {
    pub repository: String,
    pub tool: String,
    pub version: VersionSpec,
    pub platform: Platform,
    pub binary_name: String,
}

impl ArtifactLocation {
    /// URL path of this artifact relative to the source base URL.
    #[must_use]
    pub fn remote_path(&self) -> String {
        format!(
            "{}/v2/{}/{}-{}/{}",
            self.repository,
            self.version.path_segment(),
            self.tool,
            self.platform.descriptor(),
            self.binary_name
        )
    }
}

/// A place binaries are fetched from.
///
/// Implementations must be cheap to share (`&self` methods, internal
/// `Arc`s where state exists) because one source instance serves every
/// concurrent install in the process.
pub trait ArtifactSource: Send + Sync {
    /// Fetch the advertised metadata for an artifact without its body.
    ///
    /// A missing digest header yields empty `sha256`, not an error.
    fn fetch_metadata(
        &self,
        location: &ArtifactLocation,
    ) -> impl Future<Output = Result<ArtifactMetadata>> + Send;

    /// Stream the artifact body into `dest`, reporting progress as chunks
    /// arrive, and return the metadata observed on the response.
    ///
    /// The destination file is created (or truncated) by the source. On
    /// error the file may hold a partial body; the caller owns cleanup.
    fn fetch(
        &self,
        location: &ArtifactLocation,
        dest: &Path,
        progress: &DownloadProgress,
    ) -> impl Future<Output = Result<ArtifactMetadata>> + Send;
}
