//! armory - versioned CLI tool installer
//!
//! Fetches tool binaries from an artifact server, verifies them against the
//! server's published SHA-256 digests, and installs them into per-version
//! directories that callers put on their `PATH`. Repeat invocations are cheap:
//! a digest cache next to each installed binary lets armory prove the
//! installed copy is current with a single HEAD request.
//!
//! # Architecture Overview
//!
//! armory follows a fetch/verify/promote model where:
//! - Artifacts live at `{base_url}/{repository}/v2/{version}/{tool}-{os}-{arch}/{binary}`
//!   with the literal version segment `[RELEASE]` selecting the newest release
//! - Each install directory `{base}/{tool}/{version}` holds the binary plus a
//!   `sha256` sidecar recording what was installed there
//! - Downloads land in uniquely-named temp files and are renamed into place,
//!   so a crash mid-download never corrupts an installed binary
//! - A process-wide lock registry serializes installers working on the same
//!   target directory, keyed by directory and binary name
//!
//! ## Key Features
//!
//! - **Idempotent**: a matching digest cache skips the download entirely
//! - **Atomic**: binaries are promoted with a rename, never written in place
//! - **Lock-aware**: a running copy of the tool never blocks other work; the
//!   upgrade is skipped and retried on a future invocation
//! - **Cross-platform**: artifact descriptors and `.exe` handling cover
//!   Linux, macOS, and Windows targets
//! - **Verified**: downloads are rejected when empty or when their recomputed
//!   SHA-256 disagrees with the digest the server advertised
//!
//! # Core Modules
//!
//! ## Core Functionality
//! - [`cli`] - Command-line interface (`install`, `status`, `verify`)
//! - [`config`] - Global configuration (~/.armory/config.toml)
//! - [`constants`] - Size thresholds, retry parameters, protocol constants
//! - [`core`] - Error types and user-facing error presentation
//!
//! ## Artifact Retrieval
//! - [`source`] - Artifact server client and the [`source::ArtifactSource`] seam
//! - [`digest`] - SHA-256 hashing and the per-directory digest cache
//!
//! ## Installation
//! - [`installer`] - Lock registry, download staging, atomic promotion, and
//!   the install/upgrade flow
//!
//! ## Supporting Modules
//! - [`platform`] - OS and architecture detection and artifact descriptors
//! - [`utils`] - Filesystem helpers and download progress rendering
//! - [`version`] - Version string validation and the `latest` sentinel
//!
//! # Configuration Format (~/.armory/config.toml)
//!
//! ```toml
//! base_url = "https://artifacts.example.com"
//! repository = "releases"
//! install_dir = "~/.armory/tools"
//! verify_downloads = true
//! ```
//!
//! # Command-Line Usage
//!
//! ```bash
//! # Install the newest release and put it on PATH
//! PATH="$(armory install kite):$PATH"
//!
//! # Pin an exact version
//! armory install kite --version 2.7.0
//!
//! # Report what is installed
//! armory status kite --format json
//!
//! # Check an installed binary against its recorded digest
//! armory verify kite --version 2.7.0
//! ```
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use armory::installer::{InstallRequest, Installer};
//! use armory::source::HttpSource;
//! use armory::version::VersionSpec;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let source = HttpSource::new("https://artifacts.example.com")?;
//! let installer = Installer::new(source);
//! let request = InstallRequest::new("kite", VersionSpec::Latest, "/opt/tools");
//! let outcome = installer.install(&request).await?;
//! println!("{} under {}", outcome.kind, outcome.dir.display());
//! # Ok(())
//! # }
//! ```

// Core functionality modules
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;

// Artifact retrieval
pub mod digest;
pub mod source;

// Installation
pub mod installer;

// Supporting modules
pub mod platform;
pub mod utils;
pub mod version;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
