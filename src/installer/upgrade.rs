//! Lock-aware replacement of an already-installed binary.
//!
//! Upgrades run the same download-validate-rename transaction as a fresh
//! install, with one twist: the target file may be held open by another
//! process, and on platforms with mandatory file locking the rename then
//! fails. A long-running build agent routinely holds the previous binary
//! mid-execution while a parallel stage tries to upgrade it, and failing
//! that stage would break an otherwise-correct pipeline. So when the
//! rename hits a lock and a valid binary is still in place, the upgrade is
//! abandoned for this invocation and the caller proceeds with the existing
//! copy.
//!
//! The rename is attempted exactly once here, without the fresh-install
//! retry loop. A process holding the binary open does not let go on retry
//! timescales, and every waiter queued on the install lock would stack
//! behind the doomed backoff.

use crate::core::ArmoryError;
use crate::digest;
use crate::installer::atomic::{
    STAGE_UPGRADE, cleanup_temp, download_to_temp, rename_binary,
};
use crate::installer::classify::{RenameFailure, classify_rename_error};
use crate::installer::context::{InstallOptions, InstallTarget};
use crate::installer::{OutcomeKind, is_usable_binary};
use crate::source::{ArtifactLocation, ArtifactMetadata, ArtifactSource};
use crate::utils::{DownloadProgress, set_executable};
use anyhow::Result;
use tracing::{info, warn};

/// Replaces the binary at the target, keeping the existing copy when the
/// target turns out to be locked by another process.
///
/// Returns [`OutcomeKind::Upgraded`] on success and
/// [`OutcomeKind::SkippedKept`] when the locked target was survivable; the
/// sidecar is left untouched in the skipped case so the next invocation
/// retries the upgrade.
pub(crate) async fn install_upgrade<S: ArtifactSource>(
    source: &S,
    location: &ArtifactLocation,
    target: &InstallTarget,
    options: &InstallOptions,
    advertised: &ArtifactMetadata,
    progress: &DownloadProgress,
) -> Result<OutcomeKind> {
    let artifact =
        download_to_temp(source, location, target, options, advertised, STAGE_UPGRADE, progress)
            .await?;

    match rename_binary(options, &artifact.temp, &target.binary_path).await {
        Ok(()) => {
            set_executable(&target.binary_path).await?;
            digest::persist_digest(&target.dir, &artifact.digest).await?;
            info!(binary = %target.binary_path.display(), "upgraded binary");
            Ok(OutcomeKind::Upgraded)
        }
        Err(err) => {
            cleanup_temp(&artifact.temp).await;

            let verdict = classify_rename_error(&err);
            let locked_like =
                matches!(verdict, RenameFailure::Locked | RenameFailure::PermissionDenied);
            if locked_like && is_usable_binary(&target.binary_path, options.min_size).await {
                warn!(
                    binary = %target.binary_path.display(),
                    "target binary is held by another process; keeping the installed copy, \
                     upgrade will be retried on a future invocation"
                );
                return Ok(OutcomeKind::SkippedKept);
            }

            match verdict {
                RenameFailure::Locked => Err(ArmoryError::LockedTarget {
                    path: target.binary_path.clone(),
                }
                .into()),
                RenameFailure::PermissionDenied => Err(ArmoryError::Permission {
                    operation: "replace binary".to_string(),
                    path: target.binary_path.clone(),
                }
                .into()),
                RenameFailure::Other => Err(anyhow::Error::from(err).context(format!(
                    "failed to replace binary at {}",
                    target.binary_path.display()
                ))),
            }
        }
    }
}
