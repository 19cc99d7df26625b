//! Download progress reporting.
//!
//! Wraps the `indicatif` crate with the styling used across the CLI. When
//! the server reports a content length the bar shows bytes and an ETA;
//! otherwise it degrades to a spinner. Setting `ARMORY_NO_PROGRESS` (or
//! running the installer as a library with progress disabled) swaps in a
//! hidden bar that silently ignores every update, so callers never need to
//! branch on interactivity.

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::time::Duration;

fn is_progress_disabled() -> bool {
    std::env::var("ARMORY_NO_PROGRESS").is_ok()
}

fn download_style() -> IndicatifStyle {
    IndicatifStyle::default_bar()
        .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        .unwrap()
        .progress_chars("━╸━")
}

fn spinner_style() -> IndicatifStyle {
    IndicatifStyle::default_spinner()
        .template("{prefix:.bold.cyan} {spinner:.cyan} {bytes}")
        .unwrap()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
}

/// Progress indicator for a single binary download.
///
/// # Examples
///
/// ```rust
/// use armory::utils::DownloadProgress;
///
/// let progress = DownloadProgress::for_download("kite", Some(1024));
/// progress.advance(512);
/// progress.advance(512);
/// progress.finish();
/// ```
#[derive(Clone)]
pub struct DownloadProgress {
    inner: IndicatifBar,
}

impl DownloadProgress {
    /// Creates a progress indicator for downloading `tool`.
    ///
    /// With a known `total` byte count this renders a bar with ETA; without
    /// one it renders a byte-counting spinner.
    #[must_use]
    pub fn for_download(tool: &str, total: Option<u64>) -> Self {
        let bar = if is_progress_disabled() {
            IndicatifBar::hidden()
        } else {
            match total {
                Some(len) => {
                    let bar = IndicatifBar::new(len);
                    bar.set_style(download_style());
                    bar
                }
                None => {
                    let bar = IndicatifBar::new_spinner();
                    bar.set_style(spinner_style());
                    bar.enable_steady_tick(Duration::from_millis(100));
                    bar
                }
            }
        };
        bar.set_prefix(tool.to_string());
        Self { inner: bar }
    }

    /// A progress indicator that displays nothing.
    #[must_use]
    pub fn hidden() -> Self {
        Self { inner: IndicatifBar::hidden() }
    }

    /// Records `bytes` more bytes downloaded.
    pub fn advance(&self, bytes: u64) {
        self.inner.inc(bytes);
    }

    /// Completes the indicator and clears it from the terminal.
    pub fn finish(&self) {
        self.inner.finish_and_clear();
    }
}
