//! Report which versions of a tool are installed.
//!
//! Walks the per-version directories under the install root and prints
//! one row per installed copy, newest first. When nothing is installed
//! the command falls back to a `PATH` lookup so users learn whether the
//! tool is available at all.
//!
//! # Examples
//!
//! ```bash
//! armory status kite
//! armory status kite --format json
//! ```

use crate::config::GlobalConfig;
use crate::digest;
use crate::installer;
use crate::platform::Platform;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::Args;
use colored::Colorize;
use semver::Version;
use serde::Serialize;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// Command-line arguments for the `status` command.
#[derive(Args, Debug)]
pub struct StatusCommand {
    /// Tool to report on
    #[arg(value_name = "TOOL")]
    tool: String,

    /// Install root; overrides the configured directory
    #[arg(long, value_name = "DIR")]
    dir: Option<String>,

    /// Output format (text or json)
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    format: String,
}

/// One installed copy of a tool.
#[derive(Debug, Serialize)]
struct StatusRow {
    version: String,
    path: PathBuf,
    size_bytes: u64,
    digest: Option<String>,
    modified: Option<String>,
    usable: bool,
}

impl StatusCommand {
    pub async fn execute(self, global: &GlobalConfig) -> Result<()> {
        let base_dir = match &self.dir {
            Some(dir) => PathBuf::from(shellexpand::tilde(dir).into_owned()),
            None => global.resolved_install_dir()?,
        };
        let tool_dir = base_dir.join(&self.tool);
        let binary_name = Platform::current().binary_file_name(&self.tool);
        let min_size = global.install_options().min_size;

        let mut rows = collect_rows(&tool_dir, &binary_name, min_size).await?;
        rows.sort_by(|a, b| compare_versions(&a.version, &b.version));

        match self.format.as_str() {
            "json" => {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            }
            _ => self.display_text(&tool_dir, &rows),
        }
        Ok(())
    }

    fn display_text(&self, tool_dir: &Path, rows: &[StatusRow]) {
        if rows.is_empty() {
            println!("{} is not installed under {}", self.tool.bold(), tool_dir.display());
            if let Ok(path) = which::which(&self.tool) {
                println!("found on {} at {}", "PATH".bold(), path.display());
            }
            return;
        }

        println!("{}", format!("{} under {}", self.tool, tool_dir.display()).bold());
        println!();
        println!(
            "{:<12} {:>12} {:<18} {:<7} {}",
            "Version".cyan().bold(),
            "Size".cyan().bold(),
            "Modified".cyan().bold(),
            "Usable".cyan().bold(),
            "Digest".cyan().bold()
        );
        println!("{}", "-".repeat(72).bright_black());
        for row in rows {
            let usable =
                if row.usable { "yes".green().to_string() } else { "no".red().to_string() };
            println!(
                "{:<12} {:>12} {:<18} {:<7} {}",
                row.version,
                row.size_bytes,
                row.modified.as_deref().unwrap_or("-"),
                usable,
                short_digest(row.digest.as_deref()),
            );
        }
    }
}

/// Scan the per-version directories for installed binaries.
async fn collect_rows(tool_dir: &Path, binary_name: &str, min_size: u64) -> Result<Vec<StatusRow>> {
    let mut rows = Vec::new();
    let mut entries = match tokio::fs::read_dir(tool_dir).await {
        Ok(entries) => entries,
        // Nothing installed yet.
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(rows),
        Err(e) => {
            return Err(e)
                .with_context(|| format!("failed to read install root {}", tool_dir.display()));
        }
    };

    while let Some(entry) = entries
        .next_entry()
        .await
        .with_context(|| format!("failed to read install root {}", tool_dir.display()))?
    {
        let version_dir = entry.path();
        if !version_dir.is_dir() {
            continue;
        }
        let binary = version_dir.join(binary_name);
        let Ok(meta) = tokio::fs::metadata(&binary).await else {
            continue;
        };
        if !meta.is_file() {
            continue;
        }

        let version = entry.file_name().to_string_lossy().into_owned();
        let modified = meta
            .modified()
            .ok()
            .map(|t| DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M").to_string());
        rows.push(StatusRow {
            version,
            size_bytes: meta.len(),
            digest: digest::read_cached_digest(&version_dir).await.ok().flatten(),
            modified,
            usable: installer::is_usable_binary(&binary, min_size).await,
            path: binary,
        });
    }
    Ok(rows)
}

/// Orders version directory names newest first, with `latest` pinned to
/// the top and non-semver names trailing alphabetically.
fn compare_versions(a: &str, b: &str) -> Ordering {
    match (a == "latest", b == "latest") {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => match (Version::parse(a), Version::parse(b)) {
            (Ok(va), Ok(vb)) => vb.cmp(&va),
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => a.cmp(b),
        },
    }
}

fn short_digest(digest: Option<&str>) -> String {
    match digest {
        Some(d) if d.len() > 12 => format!("{}…", &d[..12]),
        Some(d) => d.to_string(),
        None => "-".to_string(),
    }
}
