//! Installable items of the suite.
//!
//! Each tool implements [`Installable`]: detection of an existing install
//! plus the download → install → setup pipeline.
//!
//! # Module Structure
//!
//! - `types`: item keys, platforms, pipeline stages, artifact formats
//! - `catalog`: hardcoded item definitions and download URLs
//! - `item`: the `Installable` trait, item state and detection results
//! - `steps`: pipeline steps shared between items
//! - `version`: version parsing for detection probes
//! - `jdk`, `jbds`, `tool`, `cdk`: the concrete items

pub mod catalog;
mod cdk;
mod error;
mod item;
mod jbds;
mod jdk;
mod steps;
mod tool;
mod types;
pub mod version;

#[cfg(test)]
pub(crate) mod testing;

pub use cdk::CdkInstall;
pub use error::{DetectionFailure, InstallError};
pub use item::{CheckComplete, DetectionMap, InstallEnv, Installable, ItemState};
pub use jbds::JbdsInstall;
pub use jdk::JdkInstall;
pub use steps::find_entry_by_prefix;
pub use tool::{ToolInstall, ToolProbe};
pub use types::{ArchiveFormat, ItemKey, Platform, Stage};

use crate::registry::InstallPaths;

/// Builds every item of the suite in registration order.
pub fn all_items(platform: Platform, paths: &InstallPaths) -> Vec<Box<dyn Installable>> {
    ItemKey::all()
        .iter()
        .map(|key| -> Box<dyn Installable> {
            match key {
                ItemKey::VirtualBox => Box::new(ToolInstall::virtualbox(platform, paths)),
                ItemKey::Jdk => Box::new(JdkInstall::new(platform, paths)),
                ItemKey::Jbds => Box::new(JbdsInstall::new(platform, paths)),
                ItemKey::Vagrant => Box::new(ToolInstall::vagrant(platform, paths)),
                ItemKey::Cygwin => Box::new(ToolInstall::cygwin(platform, paths)),
                ItemKey::Cdk => Box::new(CdkInstall::new(platform, paths)),
            }
        })
        .collect()
}
