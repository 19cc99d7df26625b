//! Transactional binary materialization.
//!
//! Binaries are never written at their final path. The body streams into a
//! uniquely-named temp file in the install directory (same filesystem, so
//! the final rename is atomic), gets validated there, and is then renamed
//! into place. Observers of the final path see either the old content or
//! the complete new content, never a partial write, even under crashes or
//! parallel invocations from separate processes.
//!
//! Failure at any point after the temp file exists ends with a best-effort
//! removal of that temp file; an interrupted process can at worst leave an
//! orphaned `*.tmp.*` file behind, which later installs ignore.

use crate::constants::{RENAME_RETRY_ATTEMPTS, RENAME_RETRY_INITIAL_DELAY_MS};
use crate::core::ArmoryError;
use crate::digest;
use crate::installer::classify::{RenameFailure, classify_rename_error};
use crate::installer::context::{InstallOptions, InstallTarget};
use crate::source::{ArtifactLocation, ArtifactMetadata, ArtifactSource};
use crate::utils::{DownloadProgress, ensure_dir, set_executable};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_retry::RetryIf;
use tokio_retry::strategy::ExponentialBackoff;
use tracing::{debug, info, warn};

/// Stage label baked into temp names by the fresh-install path.
pub(crate) const STAGE_INSTALL: &str = "install";
/// Stage label baked into temp names by the upgrade path.
pub(crate) const STAGE_UPGRADE: &str = "upgrade";

/// Disambiguates temp files created by this process within one millisecond.
static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// A downloaded, validated artifact sitting in its temp file.
#[derive(Debug)]
pub(crate) struct DownloadedArtifact {
    /// Temp file holding the complete body. The caller owns promoting or
    /// removing it.
    pub temp: PathBuf,
    /// Digest of record: the download response's own digest when it sent
    /// one, else the digest the caller fetched up front. May be empty.
    pub digest: String,
}

/// Builds a temp file name unique across concurrent invocations.
///
/// `{binary}.tmp.{stage}.{millis}.{pid}.{seq}`: pid separates processes,
/// the atomic counter separates tasks within a process, and the timestamp
/// keeps names from recurring across process restarts with recycled pids.
fn temp_path(target: &InstallTarget, stage: &str) -> PathBuf {
    let millis = chrono::Utc::now().timestamp_millis();
    let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
    target.dir.join(format!(
        "{}.tmp.{}.{}.{}.{}",
        target.binary_name,
        stage,
        millis,
        std::process::id(),
        seq
    ))
}

/// Renames `from` onto `to`, routing through the locked-target simulation
/// when a test installed one.
pub(crate) async fn rename_binary(
    options: &InstallOptions,
    from: &Path,
    to: &Path,
) -> std::io::Result<()> {
    #[cfg(any(test, feature = "test-utils"))]
    if let Some(simulation) = &options.locked_target_simulation
        && simulation.take_failure()
    {
        use crate::installer::context::LockedTargetSimulation;
        debug!(to = %to.display(), "simulating locked rename target");
        return Err(LockedTargetSimulation::locked_error());
    }
    #[cfg(not(any(test, feature = "test-utils")))]
    let _ = options;

    tokio::fs::rename(from, to).await
}

/// Removes a temp file that will not be promoted.
///
/// Best-effort: a temp file we cannot remove is janitorial debris, not a
/// correctness hazard, so failures are logged and swallowed rather than
/// allowed to mask the error that brought us here.
pub(crate) async fn cleanup_temp(temp: &Path) {
    match tokio::fs::remove_file(temp).await {
        Ok(()) => debug!(temp = %temp.display(), "removed temp file"),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            warn!(temp = %temp.display(), error = %err, "failed to remove temp file");
        }
    }
}

/// Streams the artifact into a fresh temp file and validates it there.
///
/// On success the temp file holds a complete, non-empty, digest-checked
/// body. On failure the temp file has already been cleaned up.
pub(crate) async fn download_to_temp<S: ArtifactSource>(
    source: &S,
    location: &ArtifactLocation,
    target: &InstallTarget,
    options: &InstallOptions,
    advertised: &ArtifactMetadata,
    stage: &str,
    progress: &DownloadProgress,
) -> Result<DownloadedArtifact> {
    ensure_dir(&target.dir)?;
    let temp = temp_path(target, stage);

    let fetched = match source.fetch(location, &temp, progress).await {
        Ok(fetched) => fetched,
        Err(err) => {
            cleanup_temp(&temp).await;
            return Err(err);
        }
    };

    // The download response's digest describes the bytes actually sent,
    // which matters when a latest request resolves to a newer release
    // between the metadata fetch and the download.
    let digest_of_record = if fetched.sha256.is_empty() {
        advertised.sha256.clone()
    } else {
        fetched.sha256
    };

    if let Err(err) = validate_download(&temp, &digest_of_record, target, options).await {
        cleanup_temp(&temp).await;
        return Err(err);
    }

    Ok(DownloadedArtifact { temp, digest: digest_of_record })
}

/// Size and digest checks on the downloaded temp file.
async fn validate_download(
    temp: &Path,
    expected_digest: &str,
    target: &InstallTarget,
    options: &InstallOptions,
) -> Result<()> {
    let meta = tokio::fs::metadata(temp)
        .await
        .with_context(|| format!("downloaded file missing at {}", temp.display()))?;
    if meta.len() == 0 {
        return Err(ArmoryError::DownloadIntegrity {
            tool: target.binary_name.clone(),
            reason: "downloaded file is empty".to_string(),
        }
        .into());
    }

    if options.verify_downloads && !expected_digest.is_empty() {
        let actual = digest::hash_file(temp).await?;
        if !digest::constant_time_eq(actual.as_bytes(), expected_digest.as_bytes()) {
            return Err(ArmoryError::DownloadIntegrity {
                tool: target.binary_name.clone(),
                reason: format!(
                    "digest mismatch: expected {expected_digest}, downloaded file has {actual}"
                ),
            }
            .into());
        }
        debug!(digest = %expected_digest, "download digest verified");
    }

    Ok(())
}

/// Maps a failed rename onto the error taxonomy.
pub(crate) fn map_rename_error(error: std::io::Error, binary_path: &Path) -> anyhow::Error {
    match classify_rename_error(&error) {
        RenameFailure::Locked => ArmoryError::LockedTarget {
            path: binary_path.to_path_buf(),
        }
        .into(),
        RenameFailure::PermissionDenied => ArmoryError::Permission {
            operation: "replace binary".to_string(),
            path: binary_path.to_path_buf(),
        }
        .into(),
        RenameFailure::Other => anyhow::Error::from(error)
            .context(format!("failed to move binary into {}", binary_path.display())),
    }
}

/// Promotes the temp file to the final path, retrying only while the
/// failure is a lock held elsewhere.
///
/// Backoff starts at 1 s and doubles per attempt, 5 attempts total. A
/// transient hold (an antivirus scanner, a short-lived reader) clears well
/// inside that window; anything still locked after it gets reported.
async fn promote_with_retry(
    options: &InstallOptions,
    temp: &Path,
    binary_path: &Path,
) -> std::io::Result<()> {
    let strategy = ExponentialBackoff::from_millis(2)
        .factor(RENAME_RETRY_INITIAL_DELAY_MS / 2)
        .take(RENAME_RETRY_ATTEMPTS - 1);

    RetryIf::spawn(
        strategy,
        || async move { rename_binary(options, temp, binary_path).await },
        |err: &std::io::Error| {
            let retry = classify_rename_error(err) == RenameFailure::Locked;
            if retry {
                warn!(
                    binary = %binary_path.display(),
                    error = %err,
                    "rename target is locked, will retry"
                );
            }
            retry
        },
    )
    .await
}

/// Fresh install: download, validate, promote, mark executable, record the
/// digest.
pub(crate) async fn install_fresh<S: ArtifactSource>(
    source: &S,
    location: &ArtifactLocation,
    target: &InstallTarget,
    options: &InstallOptions,
    advertised: &ArtifactMetadata,
    progress: &DownloadProgress,
) -> Result<()> {
    let artifact =
        download_to_temp(source, location, target, options, advertised, STAGE_INSTALL, progress)
            .await?;

    if let Err(err) = promote_with_retry(options, &artifact.temp, &target.binary_path).await {
        cleanup_temp(&artifact.temp).await;
        return Err(map_rename_error(err, &target.binary_path));
    }

    // From here the binary is at its final path. A failure below leaves a
    // half-installed state that must be reported, not hidden.
    set_executable(&target.binary_path).await?;
    digest::persist_digest(&target.dir, &artifact.digest).await?;

    info!(
        binary = %target.binary_path.display(),
        "installed binary"
    );
    Ok(())
}
