//! Install a tool binary from the artifact server.
//!
//! The happy path prints exactly one line to stdout: the install
//! directory. Scripts prepend it to `PATH` and move on; everything
//! human-facing (outcome, progress, warnings) goes to stderr.
//!
//! # Examples
//!
//! ```bash
//! armory install kite
//! armory install kite --version 2.7.0
//! armory install kite --dir /opt/tools --url https://artifacts.example.com
//! PATH="$(armory install kite):$PATH"
//! ```

use crate::config::GlobalConfig;
use crate::core::ArmoryError;
use crate::installer::{InstallRequest, Installer, OutcomeKind};
use crate::source::HttpSource;
use crate::version::VersionSpec;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

/// Command-line arguments for the `install` command.
#[derive(Args, Debug)]
pub struct InstallCommand {
    /// Tool to install
    #[arg(value_name = "TOOL")]
    tool: String,

    /// Version to install; `latest` (the default) tracks the newest
    /// release
    #[arg(long, value_name = "VERSION")]
    version: Option<String>,

    /// Install root; overrides the configured directory
    #[arg(long, value_name = "DIR")]
    dir: Option<String>,

    /// Repository identifier on the artifact server
    #[arg(long, value_name = "NAME")]
    repository: Option<String>,

    /// Artifact server base URL; overrides the configured one
    #[arg(long, value_name = "URL")]
    url: Option<String>,
}

impl InstallCommand {
    pub async fn execute(self, global: &GlobalConfig) -> Result<()> {
        // Validate the version before resolving anything else, so an
        // obviously-bad request fails without config or network access.
        let version = VersionSpec::parse(self.version.as_deref().unwrap_or(""))?;

        let base_url = self
            .url
            .clone()
            .or_else(|| global.base_url.clone())
            .ok_or_else(|| ArmoryError::Config {
                reason: "no artifact server configured; pass --url or set base_url in the config file"
                    .to_string(),
            })?;
        let base_dir = self.resolve_base_dir(global)?;
        let repository = self
            .repository
            .clone()
            .unwrap_or_else(|| global.repository().to_string());

        let options = global.install_options().with_progress(true);
        let source = HttpSource::new(&base_url)?;
        let installer = Installer::with_options(source, options);
        let request =
            InstallRequest::new(&self.tool, version, base_dir).with_repository(repository);

        let outcome = installer.install(&request).await?;

        let summary = format!("{} {} {}", self.tool.bold(), request.version, outcome.kind);
        match outcome.kind {
            OutcomeKind::SkippedKept => eprintln!("{} {summary}", "⚠".yellow()),
            _ => eprintln!("{} {summary}", "✓".green()),
        }
        println!("{}", outcome.dir.display());
        Ok(())
    }

    fn resolve_base_dir(&self, global: &GlobalConfig) -> Result<PathBuf> {
        match &self.dir {
            Some(dir) => Ok(PathBuf::from(shellexpand::tilde(dir).into_owned())),
            None => global.resolved_install_dir(),
        }
    }
}
