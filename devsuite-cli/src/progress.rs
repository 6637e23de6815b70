//! Terminal progress bars for the install pipeline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use devsuite_core::{DownloadProgress, ItemState, ProgressSink};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

const SPINNER_TEMPLATE: &str = "  {spinner:.cyan} {prefix:<24} {msg}";
const BAR_TEMPLATE: &str =
    "  {spinner:.cyan} {prefix:<24} {msg} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({eta})";

/// One bar per item. Starts as a spinner and turns into a byte bar once a
/// download reports progress.
pub struct BarProgress {
    bar: ProgressBar,
    /// Set once the spinner has been swapped for the byte bar.
    switched: AtomicBool,
}

impl BarProgress {
    pub fn new(multi: &MultiProgress, state: &ItemState) -> Self {
        let bar = multi.add(ProgressBar::new(state.size_estimate));
        if let Ok(style) = ProgressStyle::default_spinner().template(SPINNER_TEMPLATE) {
            bar.set_style(style);
        }
        bar.set_prefix(state.display_name);
        bar.enable_steady_tick(Duration::from_millis(120));
        Self {
            bar,
            switched: AtomicBool::new(false),
        }
    }
}

impl ProgressSink for BarProgress {
    fn set_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
    }

    fn set_progress(&self, progress: &DownloadProgress) {
        if !self.switched.swap(true, Ordering::Relaxed) {
            if let Ok(style) = ProgressStyle::default_bar().template(BAR_TEMPLATE) {
                self.bar.set_style(style.progress_chars("=> "));
            }
        }
        if let Some(total) = progress.total_bytes {
            self.bar.set_length(total);
        }
        self.bar.set_position(progress.bytes_downloaded);
    }

    fn set_complete(&self) {
        if let Some(total) = self.bar.length() {
            self.bar.set_position(total);
        }
    }
}


impl Drop for BarProgress {
    fn drop(&mut self) {
        if let Ok(style) = ProgressStyle::default_spinner().template(SPINNER_TEMPLATE) {
            self.bar.set_style(style);
        }
        self.bar.finish();
    }
}
