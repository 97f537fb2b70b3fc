//! Spinner shown with `--progress`

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress reporter for the generate pipeline
pub struct Progress {
    enabled: bool,
}

impl Progress {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Create a spinner for indeterminate progress
    pub fn spinner(&self, message: &str) -> Option<ProgressBar> {
        if !self.enabled {
            return None;
        }

        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        Some(spinner)
    }

    pub fn set_message(&self, spinner: &Option<ProgressBar>, message: &str) {
        if let Some(bar) = spinner {
            bar.set_message(message.to_string());
        }
    }

    pub fn finish(&self, spinner: Option<ProgressBar>) {
        if let Some(bar) = spinner {
            bar.finish_and_clear();
        }
    }
}
