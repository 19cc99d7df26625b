//! Core types shared across the armory codebase.
//!
//! This module is the foundation of the crate's type system. It currently
//! holds the error machinery; the domain modules ([`crate::installer`],
//! [`crate::source`], [`crate::digest`]) build on the types defined here.
//!
//! # Error Management
//!
//! armory uses a two-layer error system:
//! - **Strongly-typed errors** ([`ArmoryError`]) for precise handling in code
//! - **User-friendly contexts** ([`ErrorContext`]) with actionable suggestions
//!   for CLI users, produced by [`user_friendly_error`]
//!
//! Library code propagates `anyhow::Result` with typed [`ArmoryError`] values
//! at the failure points that callers are expected to distinguish; the CLI
//! converts whatever bubbles up into an [`ErrorContext`] for display.

pub mod error;

pub use error::{ArmoryError, ErrorContext, user_friendly_error};
