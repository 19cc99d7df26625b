//! armory CLI entry point
//!
//! This is the main executable for the armory tool installer.
//! It handles command-line argument parsing, error display, and command
//! execution.
//!
//! The CLI supports three commands:
//! - `install` - Fetch, verify, and install a tool binary
//! - `status` - Report which versions of a tool are installed
//! - `verify` - Check an installed binary against its recorded digest

use anyhow::Result;
use armory::cli;
use armory::core::user_friendly_error;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    // Execute the command
    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            // Convert to user-friendly error with context and suggestions
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
