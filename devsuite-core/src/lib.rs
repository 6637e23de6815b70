//! Development Suite Core Library
//!
//! This crate provides the core of the Development Suite installer, which
//! sets up VirtualBox, a JDK, Developer Studio, Vagrant, Cygwin and the
//! Container Development Kit as one bundle. It includes:
//!
//! - Command runner for detection probes and vendor installers
//! - Installable items with the detect → download → install → setup pipeline
//! - Item registry driving every item in install order
//! - Confirmation step: detection, selection and prerequisite gating
//! - Configuration management (settings stored in SQLite)
//! - Download and archive extraction services

pub mod config;
pub mod confirm;
pub mod db;
pub mod installables;
pub mod registry;
pub mod runner;
pub mod services;

// Re-exports for convenience
pub use config::Settings;
pub use db::Database;

// Re-export runner
pub use runner::{CommandError, CommandOutput, CommandRunner, ProcessRunner};

// Re-export items
pub use installables::{
    CheckComplete, DetectionMap, InstallEnv, InstallError, Installable, ItemKey, ItemState,
    Platform, Stage,
};

// Re-export registry and confirmation
pub use confirm::{
    detection_channel, ConfirmController, ConfirmError, DetectionEvent, DetectionReceiver,
    DetectionSender, Phase,
};
pub use registry::{InstallPaths, InstallReport, InstallerData, ItemOutcome, ItemRoots};

// Re-export services
pub use services::{DownloadProgress, LogProgress, NullProgress, ProgressSink};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
