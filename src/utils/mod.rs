//! Cross-platform utilities and helpers.
//!
//! # Modules
//!
//! - [`fs`] - File system operations shared by the installer paths
//! - [`progress`] - Download progress reporting for interactive terminals
//!
//! Everything here behaves the same on Windows, macOS, and Linux; the few
//! platform differences (executable bits, lock error codes) are handled
//! inside the functions rather than at call sites.

pub mod fs;
pub mod progress;

pub use fs::{ensure_dir, set_executable};
pub use progress::DownloadProgress;
