//! Verify an installed binary against its recorded digest.
//!
//! Recomputes the binary's SHA-256 and compares it with the sidecar written
//! at install time. A mismatch means the file changed after installation
//! (truncation, partial overwrite, tampering) and exits non-zero.

use crate::config::GlobalConfig;
use crate::digest;
use crate::platform::Platform;
use crate::version::VersionSpec;
use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

/// Command-line arguments for the `verify` command.
#[derive(Args, Debug)]
pub struct VerifyCommand {
    /// Tool to verify
    #[arg(value_name = "TOOL")]
    tool: String,

    /// Version to verify; defaults to the tracking `latest` install
    #[arg(long, value_name = "VERSION")]
    version: Option<String>,

    /// Install root; overrides the configured directory
    #[arg(long, value_name = "DIR")]
    dir: Option<String>,
}

impl VerifyCommand {
    pub async fn execute(self, global: &GlobalConfig) -> Result<()> {
        let version = VersionSpec::parse(self.version.as_deref().unwrap_or(""))?;
        let base_dir = match &self.dir {
            Some(dir) => PathBuf::from(shellexpand::tilde(dir).into_owned()),
            None => global.resolved_install_dir()?,
        };
        let install_dir = base_dir.join(&self.tool).join(version.dir_segment());
        let binary = install_dir.join(Platform::current().binary_file_name(&self.tool));

        let Some(recorded) = digest::read_cached_digest(&install_dir).await? else {
            bail!(
                "no digest recorded for {} {} under {}; run 'armory install {}' first",
                self.tool,
                version,
                install_dir.display(),
                self.tool
            );
        };
        let actual = digest::hash_file(&binary).await?;

        if !digest::constant_time_eq(recorded.as_bytes(), actual.as_bytes()) {
            bail!(
                "binary at {} does not match its recorded digest (recorded {recorded}, file has {actual}); reinstall with 'armory install {}'",
                binary.display(),
                self.tool
            );
        }

        println!("{} {} {} matches its recorded digest", "✓".green(), self.tool.bold(), version);
        Ok(())
    }
}
