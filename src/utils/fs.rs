//! File system helpers shared by the install paths.

use crate::core::ArmoryError;
use anyhow::Result;
use std::path::Path;

/// Ensures a directory exists, creating parents as needed.
///
/// # Errors
///
/// Returns [`ArmoryError::Permission`] when creation is refused, and a plain
/// error when the path exists but is not a directory.
///
/// # Examples
///
/// ```rust,no_run
/// use armory::utils::ensure_dir;
/// use std::path::Path;
///
/// # fn example() -> anyhow::Result<()> {
/// ensure_dir(Path::new("tools/kite/latest"))?;
/// # Ok(())
/// # }
/// ```
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::PermissionDenied {
                anyhow::Error::from(ArmoryError::Permission {
                    operation: "create directory".to_string(),
                    path: path.to_path_buf(),
                })
            } else {
                anyhow::Error::from(err)
                    .context(format!("failed to create directory: {}", path.display()))
            }
        })?;
    } else if !path.is_dir() {
        return Err(anyhow::anyhow!(
            "path exists but is not a directory: {}",
            path.display()
        ));
    }
    Ok(())
}

/// Marks an installed binary as executable.
///
/// On Unix this sets mode `0o755`. Windows has no executable bit, so the
/// call is a no-op there.
#[cfg(unix)]
pub async fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let perms = std::fs::Permissions::from_mode(0o755);
    tokio::fs::set_permissions(path, perms).await.map_err(|err| {
        if err.kind() == std::io::ErrorKind::PermissionDenied {
            anyhow::Error::from(ArmoryError::Permission {
                operation: "mark binary executable".to_string(),
                path: path.to_path_buf(),
            })
        } else {
            anyhow::Error::from(err)
                .context(format!("failed to set permissions on {}", path.display()))
        }
    })
}

#[cfg(not(unix))]
pub async fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}
