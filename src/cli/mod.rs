//! Command-line interface.
//!
//! The `armory` binary wraps the installer library for scripts and build
//! agents. Three subcommands cover the lifecycle:
//!
//! - `install` fetches and pins a tool binary, printing its install
//!   directory (the one line scripts consume, typically to prepend to
//!   `PATH`)
//! - `status` reports what is installed locally, falling back to `PATH`
//!   lookup
//! - `verify` re-hashes an installed binary against its recorded digest
//!
//! Global flags control verbosity, progress rendering, and the config file
//! location; they apply to every subcommand.

mod install;
mod status;
mod verify;

pub use install::InstallCommand;
pub use status::StatusCommand;
pub use verify::VerifyCommand;

use crate::config::GlobalConfig;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Runtime configuration distilled from the global CLI flags.
///
/// Translated into environment variables once at startup so that every
/// layer (progress bars, config discovery, logging) observes the same
/// settings without plumbing flags through each call.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter for `ARMORY_LOG`. `None` preserves whatever the
    /// environment already says.
    pub log_level: Option<String>,
    /// Disables progress bars via `ARMORY_NO_PROGRESS`.
    pub no_progress: bool,
    /// Custom config file location for `ARMORY_CONFIG`.
    pub config_path: Option<String>,
}

impl CliConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply this configuration to the process environment.
    ///
    /// Called once at startup, before the runtime spawns anything that
    /// might read the environment concurrently.
    pub fn apply_to_env(&self) {
        // SAFETY: single-threaded startup path; no other thread exists
        // to observe the environment mid-write.
        if let Some(ref level) = self.log_level {
            unsafe { std::env::set_var("ARMORY_LOG", level) };
        }

        if self.no_progress {
            unsafe { std::env::set_var("ARMORY_NO_PROGRESS", "1") };
        }

        if let Some(ref path) = self.config_path {
            unsafe { std::env::set_var("ARMORY_CONFIG", path) };
        }
    }
}

/// Initialize the tracing subscriber for the CLI.
///
/// Reads `ARMORY_LOG` (already rewritten by [`CliConfig::apply_to_env`]
/// when `-v`/`-q` were given), defaulting to warnings only so script
/// output stays clean. Logs go to stderr; stdout is reserved for command
/// output.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env("ARMORY_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Top-level argument parser for the `armory` binary.
#[derive(Parser)]
#[command(
    name = "armory",
    about = "Fetches, verifies, and pins versioned CLI tool binaries",
    version,
    author,
    long_about = "Armory downloads tool binaries from an artifact server, verifies their \
                  digests, and installs them atomically into per-version directories, so \
                  parallel build stages can depend on the same tools without racing each other."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output.
    ///
    /// Equivalent to `ARMORY_LOG=debug`. Mutually exclusive with
    /// `--quiet`.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors; for scripts and CI.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to a custom configuration file.
    ///
    /// Overrides the default location (`~/.armory/config.toml`).
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<String>,

    /// Disable progress bars and spinners.
    #[arg(long, global = true)]
    no_progress: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Install a tool binary, or confirm the installed one is current
    Install(InstallCommand),
    /// Show installed versions of a tool
    Status(StatusCommand),
    /// Check an installed binary against its recorded digest
    Verify(VerifyCommand),
}

impl Cli {
    /// Parse-free entry point: build the runtime config from the flags
    /// and execute.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// Build a [`CliConfig`] from the parsed global flags.
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            Some("error".to_string())
        } else {
            None
        };

        CliConfig {
            log_level,
            no_progress: self.no_progress,
            config_path: self.config.clone(),
        }
    }

    /// Execute with an explicit runtime configuration.
    ///
    /// Split from [`Cli::execute`] so tests can inject settings without
    /// going through real command-line parsing.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.apply_to_env();
        init_logging();

        let global =
            GlobalConfig::load_with_optional(self.config.as_ref().map(PathBuf::from)).await?;

        match self.command {
            Commands::Install(cmd) => cmd.execute(&global).await,
            Commands::Status(cmd) => cmd.execute(&global).await,
            Commands::Verify(cmd) => cmd.execute(&global).await,
        }
    }
}
