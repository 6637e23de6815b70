//! Configuration module for the installer.
//!
//! Manages installer settings stored in SQLite.

mod settings;

pub use settings::{
    Settings, DEFAULT_DETECTION_TIMEOUT_SECS, DEFAULT_INSTALLER_TIMEOUT_SECS,
    DEFAULT_PROBE_TIMEOUT_SECS,
};
