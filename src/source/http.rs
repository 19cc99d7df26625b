//! HTTP artifact source.
//!
//! Fetches binaries over plain HTTP(S) from an artifact server laid out as
//! described in [`crate::source`]. Digests ride on response headers; the
//! server is probed for `X-Checksum-Sha256` first and the Artifactory
//! spelling `X-Artifactory-Checksum-Sha256` second, first non-empty match
//! wins. Header lookup is case-insensitive.

use super::{ArtifactLocation, ArtifactMetadata, ArtifactSource};
use crate::constants::{DIGEST_HEADERS, HTTP_CONNECT_TIMEOUT};
use crate::core::ArmoryError;
use crate::utils::DownloadProgress;
use anyhow::{Context, Result};
use reqwest::header::HeaderMap;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Artifact source backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSource {
    /// Builds a source rooted at `base_url`.
    ///
    /// A trailing slash on the base URL is tolerated. The client carries a
    /// connect timeout and an `armory/{version}` user agent; response
    /// timeouts are deliberately absent because artifact bodies legitimately
    /// take minutes on slow links.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .user_agent(concat!("armory/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url_for(&self, location: &ArtifactLocation) -> String {
        format!("{}/{}", self.base_url, location.remote_path())
    }

    /// First advertised digest found among the accepted header names,
    /// lowercased; empty string when the server sent none.
    fn digest_from_headers(headers: &HeaderMap) -> String {
        for name in DIGEST_HEADERS {
            if let Some(value) = headers.get(name)
                && let Ok(text) = value.to_str()
            {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    return trimmed.to_ascii_lowercase();
                }
            }
        }
        String::new()
    }

    /// Content length parsed from the header rather than the body size
    /// hint, so HEAD responses report the real artifact size.
    fn content_length_from_headers(headers: &HeaderMap) -> Option<u64> {
        headers
            .get(reqwest::header::CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|text| text.trim().parse().ok())
    }

    fn metadata_from_headers(headers: &HeaderMap) -> ArtifactMetadata {
        ArtifactMetadata {
            sha256: Self::digest_from_headers(headers),
            content_length: Self::content_length_from_headers(headers),
        }
    }
}

impl ArtifactSource for HttpSource {
    async fn fetch_metadata(&self, location: &ArtifactLocation) -> Result<ArtifactMetadata> {
        let url = self.url_for(location);
        debug!(url = %url, "fetching artifact metadata");

        let response = self
            .client
            .head(&url)
            .send()
            .await
            .map_err(|err| ArmoryError::Transport { url: url.clone(), source: err })?;
        if !response.status().is_success() {
            return Err(ArmoryError::HttpStatus {
                url,
                status: response.status().as_u16(),
            }
            .into());
        }

        Ok(Self::metadata_from_headers(response.headers()))
    }

    async fn fetch(
        &self,
        location: &ArtifactLocation,
        dest: &Path,
        progress: &DownloadProgress,
    ) -> Result<ArtifactMetadata> {
        let url = self.url_for(location);
        debug!(url = %url, dest = %dest.display(), "downloading artifact");

        let mut response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| ArmoryError::Transport { url: url.clone(), source: err })?;
        if !response.status().is_success() {
            return Err(ArmoryError::HttpStatus {
                url,
                status: response.status().as_u16(),
            }
            .into());
        }

        let metadata = Self::metadata_from_headers(response.headers());

        let mut file = tokio::fs::File::create(dest)
            .await
            .with_context(|| format!("failed to create {}", dest.display()))?;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|err| ArmoryError::Transport { url: url.clone(), source: err })?
        {
            file.write_all(&chunk)
                .await
                .with_context(|| format!("failed to write {}", dest.display()))?;
            progress.advance(chunk.len() as u64);
        }
        file.flush()
            .await
            .with_context(|| format!("failed to flush {}", dest.display()))?;
        // Durability before the rename that will publish this file.
        file.sync_all()
            .await
            .with_context(|| format!("failed to sync {}", dest.display()))?;

        Ok(metadata)
    }
}
