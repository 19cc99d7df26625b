//! Integration test suite for armory
//!
//! These tests drive the full install pipeline end to end against an
//! in-memory artifact source, plus the compiled binary for CLI surface
//! checks. No network access is required.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! Tests are organized by functionality area:
//! - **install_flow**: Fresh installs, digest skipping, download validation
//! - **upgrade_flow**: In-place upgrades and locked-target handling
//! - **concurrency**: Concurrent installers sharing a lock registry
//! - **cli**: Compiled-binary behavior (flags, exit codes, output)

// Shared helpers for this suite
mod common;

// Integration tests
mod cli;
mod concurrency;
mod install_flow;
mod upgrade_flow;
