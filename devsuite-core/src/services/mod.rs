//! Collaborators the installable items delegate to.
//!
//! - `downloader`: byte transfer of an artifact into a writable destination
//! - `extractor`: archive unpacking (zip, tar.gz, tar.xz)
//! - `progress`: status/progress sinks for the presentation layer

pub mod downloader;
pub mod extractor;
pub mod progress;

pub use downloader::{Downloader, HttpDownloader};
pub use extractor::{extract_archive, ArchiveUnpacker, Unpacker};
pub use progress::{DownloadProgress, LogProgress, NullProgress, ProgressSink};
