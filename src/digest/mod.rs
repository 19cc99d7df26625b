//! SHA-256 digest handling for installed binaries.
//!
//! Every install directory carries a sidecar file named `sha256` holding the
//! lowercase hex digest of the binary that was installed there. On the next
//! request for the same tool the cached digest is compared against the digest
//! the artifact server advertises, and the download is skipped when they
//! match. The sidecar is advisory: a missing or unreadable one simply forces
//! a re-download, it never fails an install.

use crate::constants::{HASH_BUF_SIZE, SIDECAR_FILE_NAME};
use crate::core::ArmoryError;
use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

/// Path of the digest sidecar inside an install directory.
#[must_use]
pub fn sidecar_path(install_dir: &Path) -> PathBuf {
    install_dir.join(SIDECAR_FILE_NAME)
}

/// Read the digest recorded by a previous install, if any.
///
/// Returns `None` when no sidecar exists. Trailing whitespace is tolerated
/// so that a sidecar edited by hand (or written with a trailing newline by
/// another tool) still compares equal.
///
/// # Errors
///
/// Returns [`ArmoryError::SidecarIo`] when the sidecar exists but cannot be
/// read.
pub async fn read_cached_digest(install_dir: &Path) -> Result<Option<String>> {
    let path = sidecar_path(install_dir);
    match tokio::fs::read_to_string(&path).await {
        Ok(contents) => Ok(Some(contents.trim_end().to_string())),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(ArmoryError::SidecarIo { path, source: err }.into()),
    }
}

/// Decide whether a download is needed given the server's advertised digest.
///
/// An empty server digest means the server could not tell us what it would
/// serve, so the answer is always "download". Otherwise the cached digest is
/// compared in constant time and a match means the installed binary is
/// already the advertised bytes.
///
/// This never fails: an unreadable sidecar is treated as absent, so the
/// worst a corrupted digest cache can cause is one redundant download.
pub async fn should_download(server_digest: &str, install_dir: &Path) -> bool {
    if server_digest.is_empty() {
        debug!("server did not advertise a digest, forcing download");
        return true;
    }

    let cached = match read_cached_digest(install_dir).await {
        Ok(cached) => cached,
        Err(err) => {
            warn!(error = %err, "digest sidecar unreadable, forcing download");
            None
        }
    };

    match cached {
        Some(cached) if constant_time_eq(cached.as_bytes(), server_digest.as_bytes()) => {
            debug!(digest = %server_digest, "cached digest matches server");
            false
        }
        Some(cached) => {
            debug!(cached = %cached, server = %server_digest, "cached digest is stale");
            true
        }
        None => true,
    }
}

/// Record the digest of a freshly installed binary.
///
/// Written atomically (temp file then rename) so a crash mid-write cannot
/// leave a truncated sidecar that would poison future comparisons. An empty
/// digest is not persisted at all: it would match nothing and only force a
/// spurious mismatch log on the next run.
///
/// # Errors
///
/// Returns [`ArmoryError::SidecarIo`] when the sidecar cannot be written.
pub async fn persist_digest(install_dir: &Path, digest: &str) -> Result<()> {
    if digest.is_empty() {
        return Ok(());
    }

    let path = sidecar_path(install_dir);
    let sidecar_io = |err: std::io::Error| ArmoryError::SidecarIo { path: path.clone(), source: err };

    tokio::fs::create_dir_all(install_dir).await.map_err(sidecar_io)?;

    // Debris at the sidecar path (say, a directory created by a broken
    // sync job) would make the rename fail forever. Clear it first.
    if tokio::fs::metadata(&path).await.is_ok_and(|meta| meta.is_dir()) {
        warn!(path = %path.display(), "removing directory found at digest sidecar path");
        tokio::fs::remove_dir_all(&path).await.map_err(sidecar_io)?;
    }

    let temp = install_dir.join(format!("{SIDECAR_FILE_NAME}.tmp"));
    tokio::fs::write(&temp, digest.as_bytes())
        .await
        .map_err(|err| ArmoryError::SidecarIo { path: temp.clone(), source: err })?;
    tokio::fs::rename(&temp, &path).await.map_err(sidecar_io)?;

    debug!(path = %path.display(), digest = %digest, "persisted digest sidecar");
    Ok(())
}

/// Compute the lowercase hex SHA-256 digest of a file, streaming in 64 KiB
/// chunks so large binaries never sit in memory whole.
pub async fn hash_file(path: &Path) -> Result<String> {
    let mut file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("failed to open {} for hashing", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_BUF_SIZE];

    loop {
        let read = file
            .read(&mut buf)
            .await
            .with_context(|| format!("failed to read {} while hashing", path.display()))?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Lowercase hex SHA-256 digest of an in-memory buffer.
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Constant-time equality over byte strings.
///
/// Digest comparison decides whether to trust an already-installed binary,
/// so it must not leak how much of the digest matched through timing.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
