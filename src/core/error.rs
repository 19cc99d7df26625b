//! Error handling for armory
//!
//! This module provides the error types and user-friendly error reporting for
//! the installer. The error system is designed around two core principles:
//! 1. **Strongly-typed errors** for precise error handling in code
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! The error system consists of two main types:
//! - [`ArmoryError`] - Enumerated error types for all failure cases
//! - [`ErrorContext`] - Wrapper that adds user-friendly messages and suggestions
//!
//! # Error Categories
//!
//! Errors are organized into several categories:
//! - **Network**: [`ArmoryError::Transport`], [`ArmoryError::HttpStatus`]
//! - **Integrity**: [`ArmoryError::DownloadIntegrity`]
//! - **File System**: [`ArmoryError::Permission`], [`ArmoryError::LockedTarget`],
//!   [`ArmoryError::SidecarIo`]
//! - **Input**: [`ArmoryError::InvalidVersion`], [`ArmoryError::Config`]
//!
//! Use [`user_friendly_error`] to convert any error into a user-friendly format
//! with contextual suggestions for CLI display. Library callers should match on
//! the typed enum instead.
//!
//! # Examples
//!
//! ```rust,no_run
//! use armory::core::{ArmoryError, user_friendly_error};
//!
//! fn fetch_tool() -> Result<(), ArmoryError> {
//!     Err(ArmoryError::HttpStatus {
//!         url: "https://artifacts.example.com/releases/v2/1.0.0/demo-linux-amd64/demo"
//!             .to_string(),
//!         status: 404,
//!     })
//! }
//!
//! if let Err(e) = fetch_tool() {
//!     let ctx = user_friendly_error(anyhow::Error::from(e));
//!     ctx.display(); // Shows colored error with suggestions
//! }
//! ```

use colored::Colorize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for armory operations.
///
/// Each variant represents a specific failure mode and carries the details a
/// caller needs to react to it: URLs for network failures, paths for file
/// system failures, and human-readable reasons for validation failures.
///
/// # Design Philosophy
///
/// - **Specific error types**: each variant is one failure mode
/// - **Rich context**: errors include the paths, URLs, and values involved
/// - **User-friendly**: messages are written for end users, not just developers
///
/// # Examples
///
/// ```rust,no_run
/// use armory::core::ArmoryError;
/// use std::path::PathBuf;
///
/// fn handle_error(error: ArmoryError) {
///     match error {
///         ArmoryError::LockedTarget { path } => {
///             eprintln!("binary at {} is busy, try again later", path.display());
///         }
///         ArmoryError::DownloadIntegrity { tool, reason } => {
///             eprintln!("download of '{tool}' is unusable: {reason}");
///         }
///         _ => eprintln!("unexpected error: {error}"),
///     }
/// }
/// ```
#[derive(Error, Debug)]
pub enum ArmoryError {
    /// A network request failed before a response was fully received.
    ///
    /// Covers connection failures, timeouts, TLS problems, and transfers that
    /// break off mid-stream. The original [`reqwest::Error`] is preserved as
    /// the source for callers that need to inspect it.
    #[error("request to {url} failed")]
    Transport {
        /// The URL the request was sent to
        url: String,
        /// The underlying client error
        #[source]
        source: reqwest::Error,
    },

    /// The artifact server answered with a non-success HTTP status.
    ///
    /// Distinct from [`Transport`](Self::Transport): the server was reachable
    /// and responded, but refused or could not serve the artifact.
    #[error("server returned HTTP {status} for {url}")]
    HttpStatus {
        /// The URL that was requested
        url: String,
        /// The HTTP status code from the response
        status: u16,
    },

    /// A downloaded binary failed integrity checks before installation.
    ///
    /// Raised when the downloaded file is empty, or when its recomputed
    /// SHA-256 does not match the digest the server published. The partial
    /// download is removed; nothing is installed.
    #[error("downloaded binary for '{tool}' failed integrity checks: {reason}")]
    DownloadIntegrity {
        /// The tool whose download was rejected
        tool: String,
        /// Why the download was rejected (empty file, digest mismatch, ...)
        reason: String,
    },

    /// The operating system denied a file system operation.
    ///
    /// Covers directory creation, permission-bit changes, and renames that
    /// fail for reasons unrelated to file locking.
    #[error("permission denied while trying to {operation}: {path}")]
    Permission {
        /// What armory was trying to do (e.g. "create directory")
        operation: String,
        /// The path the operation targeted
        path: PathBuf,
    },

    /// Replacing the installed binary failed because another process holds it,
    /// and no usable previous installation exists to fall back on.
    ///
    /// When a usable previous binary exists this situation is survivable and
    /// the installer reports it as a skipped upgrade instead of an error.
    #[error("target binary is held by another process: {path}")]
    LockedTarget {
        /// The binary path that could not be replaced
        path: PathBuf,
    },

    /// Reading or writing the digest cache file failed in a way that must
    /// surface.
    ///
    /// A successful binary install with an unwritable digest cache is reported
    /// as a failure: silently continuing would make every future invocation
    /// re-download the binary.
    #[error("failed to update digest cache at {path}")]
    SidecarIo {
        /// Path of the digest cache file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A requested version string is not installable.
    ///
    /// Either it does not match the `MAJOR.MINOR.PATCH` format, or it is older
    /// than the minimum version the artifact layout supports.
    #[error("invalid version '{version}': {reason}")]
    InvalidVersion {
        /// The version string as the user supplied it
        version: String,
        /// Why it was rejected
        reason: String,
    },

    /// The configuration file or CLI flags leave armory unable to proceed.
    #[error("configuration error: {reason}")]
    Config {
        /// What is wrong with the configuration
        reason: String,
    },

    /// Catch-all for errors that do not fit the other variants.
    #[error("{message}")]
    Other {
        /// The error message
        message: String,
    },
}

/// Rich error context with user-friendly messages and actionable suggestions.
///
/// Wraps an [`ArmoryError`] with an optional suggestion (what the user can do)
/// and optional details (why it happened). The CLI renders these with colors
/// via [`ErrorContext::display`].
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: ArmoryError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: ArmoryError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    ///
    /// Suggestions should be actionable steps. They are displayed in green in
    /// the terminal to draw attention.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining why the error occurred.
    ///
    /// Details are displayed in yellow, less prominent than the error itself
    /// or the suggestion.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error, details, and suggestion to stderr with terminal
    /// colors.
    ///
    /// This is the primary way the CLI presents errors:
    /// - Error message: red and bold
    /// - Details: yellow
    /// - Suggestion: green
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable
/// suggestions.
///
/// This function is the main entry point for converting arbitrary errors into
/// user-friendly messages for CLI display. It recognizes [`ArmoryError`]
/// variants and common I/O failures, and provides appropriate context for
/// each; anything else is passed through with its full context chain.
///
/// # Examples
///
/// ```rust,no_run
/// use armory::core::{ArmoryError, user_friendly_error};
///
/// let error = ArmoryError::InvalidVersion {
///     version: "1.2".to_string(),
///     reason: "expected MAJOR.MINOR.PATCH".to_string(),
/// };
/// let context = user_friendly_error(anyhow::Error::from(error));
/// context.display();
/// ```
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    // Typed errors first; downcast by value so no clone is needed.
    let error = match error.downcast::<ArmoryError>() {
        Ok(armory_error) => return create_error_context(armory_error),
        Err(other) => other,
    };

    if let Some(io_error) = error.root_cause().downcast_ref::<std::io::Error>() {
        let message = format!("{error:#}");
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(ArmoryError::Other { message })
                    .with_suggestion(
                        "Check ownership of the install directory, or point --dir at a directory you can write to",
                    )
                    .with_details("The operating system denied a file operation");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(ArmoryError::Other { message })
                    .with_suggestion("Check that the path exists and is spelled correctly");
            }
            std::io::ErrorKind::StorageFull => {
                return ErrorContext::new(ArmoryError::Other { message })
                    .with_suggestion("Free up disk space and retry the install");
            }
            _ => {}
        }
    }

    ErrorContext::new(ArmoryError::Other {
        message: format!("{error:#}"),
    })
}

/// Build the suggestion and details for a typed error.
fn create_error_context(error: ArmoryError) -> ErrorContext {
    let (suggestion, details) = match &error {
        ArmoryError::Transport { url, .. } => (
            format!("Check your network connection and that {url} is reachable (proxy, VPN, firewall)"),
            "The request did not complete; no response or only a partial response was received".to_string(),
        ),
        ArmoryError::HttpStatus { status, .. } => (
            match status {
                401 | 403 => "Check your credentials for the artifact server".to_string(),
                404 => "Check the tool name, version, and repository; the artifact does not exist at this location".to_string(),
                _ => "Retry later, or check the artifact server's status".to_string(),
            },
            format!("The server responded with HTTP {status}"),
        ),
        ArmoryError::DownloadIntegrity { .. } => (
            "Retry the install; if the mismatch persists, the published artifact may be corrupt".to_string(),
            "The downloaded file was discarded and nothing was installed".to_string(),
        ),
        ArmoryError::Permission { path, .. } => (
            format!("Check permissions on {} or choose a different install directory with --dir", path.display()),
            "The operating system denied the operation".to_string(),
        ),
        ArmoryError::LockedTarget { .. } => (
            "Stop the running process that is using the binary, then retry".to_string(),
            "The existing installation could not be kept because it is missing or incomplete".to_string(),
        ),
        ArmoryError::SidecarIo { .. } => (
            "Check permissions on the install directory".to_string(),
            "Without the digest cache, every future invocation would re-download the binary".to_string(),
        ),
        ArmoryError::InvalidVersion { .. } => (
            "Pass a version like 2.7.0, or \"latest\" for the newest release".to_string(),
            "Versions must be MAJOR.MINOR.PATCH and at least the minimum supported release".to_string(),
        ),
        ArmoryError::Config { .. } => (
            "Check ~/.armory/config.toml, or pass --url and --repository explicitly".to_string(),
            "Configuration values can also be set per invocation via CLI flags".to_string(),
        ),
        ArmoryError::Other { .. } => {
            return ErrorContext::new(error);
        }
    };

    ErrorContext::new(error).with_suggestion(suggestion).with_details(details)
}
