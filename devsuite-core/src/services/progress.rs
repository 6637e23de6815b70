//! Progress reporting for pipeline stages.

use tracing::{debug, info};

use crate::installables::ItemKey;

// ============================================================================
// Download Progress
// ============================================================================

/// Progress information during a download.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadProgress {
    /// Bytes downloaded so far.
    pub bytes_downloaded: u64,
    /// Total bytes expected (Content-Length, or the item's size estimate).
    pub total_bytes: Option<u64>,
    /// Progress percentage (0.0 to 100.0), or None if total is unknown.
    pub percent: Option<f32>,
}

impl DownloadProgress {
    pub fn new(bytes_downloaded: u64, total_bytes: Option<u64>) -> Self {
        let percent = total_bytes.map(|total| {
            if total > 0 {
                ((bytes_downloaded as f32 / total as f32) * 100.0).min(100.0)
            } else {
                0.0
            }
        });

        Self {
            bytes_downloaded,
            total_bytes,
            percent,
        }
    }
}

// ============================================================================
// Progress Sink
// ============================================================================

/// Receives status and progress updates for one item's pipeline.
pub trait ProgressSink: Send + Sync {
    /// Short human-readable status ("Downloading", "Installing", ...).
    fn set_status(&self, status: &str);

    /// Byte-level progress of a transfer.
    fn set_progress(&self, _progress: &DownloadProgress) {}

    /// The current stage finished.
    fn set_complete(&self);
}

/// Discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn set_status(&self, _status: &str) {}

    fn set_complete(&self) {}
}

/// Forwards updates to the `tracing` log, prefixed with the item key.
#[derive(Debug, Clone, Copy)]
pub struct LogProgress {
    key: ItemKey,
}

impl LogProgress {
    pub fn new(key: ItemKey) -> Self {
        Self { key }
    }
}

impl ProgressSink for LogProgress {
    fn set_status(&self, status: &str) {
        info!("{} - {}", self.key, status);
    }

    fn set_progress(&self, progress: &DownloadProgress) {
        if let Some(percent) = progress.percent {
            debug!("{} - download progress: {:.1}%", self.key, percent);
        }
    }

    fn set_complete(&self) {
        debug!("{} - stage complete", self.key);
    }
}
