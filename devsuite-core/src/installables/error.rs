//! Error types for detection and the install pipeline.

use std::path::PathBuf;

use thiserror::Error;

use super::types::{ItemKey, Platform, Stage};
use crate::runner::CommandError;

/// A fatal pipeline failure for one item.
///
/// Every variant names the item so failures can be traced back from the log
/// and the progress view.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("{key} - no artifact available for {platform}")]
    UnsupportedPlatform { key: ItemKey, platform: Platform },

    #[error("{key} - download failed: {source:#}")]
    Transfer {
        key: ItemKey,
        #[source]
        source: anyhow::Error,
    },

    #[error("{key} - extraction failed: {source:#}")]
    Extraction {
        key: ItemKey,
        #[source]
        source: anyhow::Error,
    },

    #[error("{key} - cannot list {}: {source}", dir.display())]
    ListDirectory {
        key: ItemKey,
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{key} - no entry starting with '{prefix}' in {}", dir.display())]
    NoMatchingEntry {
        key: ItemKey,
        prefix: String,
        dir: PathBuf,
    },

    #[error("{key} - rename {} to {} failed: {source}", from.display(), to.display())]
    Rename {
        key: ItemKey,
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{key} - {action} failed: {source}")]
    Command {
        key: ItemKey,
        action: String,
        #[source]
        source: CommandError,
    },

    #[error("{key} - {message}")]
    Setup { key: ItemKey, message: String },

    #[error("{key} - {context}: {source}")]
    Io {
        key: ItemKey,
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{key} - cannot move from {from} to {to}")]
    InvalidTransition { key: ItemKey, from: Stage, to: Stage },
}

impl InstallError {
    /// The item this failure belongs to.
    pub fn key(&self) -> ItemKey {
        match self {
            Self::UnsupportedPlatform { key, .. }
            | Self::Transfer { key, .. }
            | Self::Extraction { key, .. }
            | Self::ListDirectory { key, .. }
            | Self::NoMatchingEntry { key, .. }
            | Self::Rename { key, .. }
            | Self::Command { key, .. }
            | Self::Setup { key, .. }
            | Self::Io { key, .. }
            | Self::InvalidTransition { key, .. } => *key,
        }
    }
}

/// Why a detection pass did not find a usable install.
///
/// Never escapes the item: it is logged and turned into
/// `existing_install = false`.
#[derive(Debug, Error)]
pub enum DetectionFailure {
    #[error("no install found")]
    NotFound,

    #[error("probe failed: {0}")]
    Command(#[from] CommandError),

    #[error("no version in probe output")]
    Unparseable,

    #[error("version {found} is older than the required {minimum}")]
    VersionTooOld { found: String, minimum: String },

    #[error("could not resolve an install location")]
    NoLocation,

    #[error("{} does not contain {marker}", path.display())]
    MissingMarker { path: PathBuf, marker: String },

    #[error("detection is not supported on {0}")]
    Unsupported(Platform),
}

impl DetectionFailure {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Command(e) if e.is_timeout())
    }
}
