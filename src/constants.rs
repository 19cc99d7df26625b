//! Global constants used throughout the armory codebase.
//!
//! This module contains size thresholds, retry parameters, and protocol
//! constants that are used across multiple modules. Defining them centrally
//! improves maintainability and makes magic numbers more discoverable.

use std::time::Duration;

/// Smallest size in bytes a binary may have and still count as a usable
/// installation (1 MiB).
///
/// Real tool binaries are multiple megabytes; anything at or below this
/// threshold is treated as a torn or corrupt download left behind by an
/// interrupted install, and is replaced rather than reused.
pub const MIN_BINARY_SIZE: u64 = 1024 * 1024;

/// File name of the digest cache written next to each installed binary.
///
/// The file holds the SHA-256 digest the artifact server published for the
/// installed binary, as lowercase hex with no trailing newline.
pub const SIDECAR_FILE_NAME: &str = "sha256";

/// Response headers probed for the artifact's SHA-256 digest, in priority
/// order. Header lookup is case-insensitive; the first present, non-empty
/// value wins.
pub const DIGEST_HEADERS: [&str; 2] = ["x-checksum-sha256", "x-artifactory-checksum-sha256"];

/// Total attempts when promoting a downloaded file into its final location
/// (the first try plus retries).
///
/// Retries only happen when the failure is classified as a transient file
/// lock; everything else aborts on the first attempt.
pub const RENAME_RETRY_ATTEMPTS: usize = 5;

/// Initial delay before the first rename retry (1 second).
///
/// Subsequent delays double: 1s, 2s, 4s, 8s. File locks held by antivirus
/// scanners or short-lived processes usually clear within this window.
pub const RENAME_RETRY_INITIAL_DELAY_MS: u64 = 1_000;

/// Buffer size for streaming SHA-256 computation over files (64 KiB).
pub const HASH_BUF_SIZE: usize = 64 * 1024;

/// Connect timeout for requests to artifact servers.
///
/// This bounds how long connection establishment may take; transfers
/// themselves are not limited, since binaries can be large and links slow.
pub const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Repository key used when the configuration does not name one.
pub const DEFAULT_REPOSITORY: &str = "releases";
