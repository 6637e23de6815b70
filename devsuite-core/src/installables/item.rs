//! The installable item abstraction.
//!
//! Every tool of the suite implements [`Installable`]: a detection probe and
//! the download → install → setup pipeline. Per-item data lives in
//! [`ItemState`], which each variant embeds.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::catalog::ItemDefinition;
use super::error::{DetectionFailure, InstallError};
use super::steps;
use super::types::{ItemKey, Platform, Stage};
use crate::config::Settings;
use crate::registry::InstallPaths;
use crate::runner::{CommandRunner, ProcessRunner};
use crate::services::{ArchiveUnpacker, Downloader, HttpDownloader, ProgressSink, Unpacker};

// ============================================================================
// Environment
// ============================================================================

/// Collaborators and shared parameters handed to every item operation.
#[derive(Clone)]
pub struct InstallEnv {
    pub paths: InstallPaths,
    pub platform: Platform,
    pub runner: Arc<dyn CommandRunner>,
    pub downloader: Arc<dyn Downloader>,
    pub unpacker: Arc<dyn Unpacker>,
    /// Bound for each detection probe.
    pub probe_timeout: Duration,
    /// Bound for vendor installers and plugin installs.
    pub installer_timeout: Duration,
}

impl InstallEnv {
    /// Environment backed by real processes, HTTP and archive extraction.
    pub fn from_settings(settings: &Settings, platform: Platform) -> Self {
        Self {
            paths: InstallPaths::from_settings(settings),
            platform,
            runner: Arc::new(ProcessRunner),
            downloader: Arc::new(HttpDownloader::new()),
            unpacker: Arc::new(ArchiveUnpacker),
            probe_timeout: settings.probe_timeout(),
            installer_timeout: settings.installer_timeout(),
        }
    }
}

// ============================================================================
// Detection Results
// ============================================================================

/// Completion signal of one detection pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckComplete {
    pub key: ItemKey,
    pub found: bool,
}

/// Per-key detection outcomes shared between the orchestrator and the items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectionMap {
    entries: BTreeMap<ItemKey, bool>,
}

impl DetectionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&mut self, key: ItemKey, found: bool) {
        self.entries.insert(key, found);
    }

    pub fn get(&self, key: ItemKey) -> Option<bool> {
        self.entries.get(&key).copied()
    }

    pub fn is_found(&self, key: ItemKey) -> bool {
        self.get(key).unwrap_or(false)
    }
}

// ============================================================================
// Item State
// ============================================================================

/// Mutable state of one item.
#[derive(Debug, Clone)]
pub struct ItemState {
    pub key: ItemKey,
    pub display_name: &'static str,
    pub version: &'static str,
    /// Bytes, used as the progress total when the server sends no length.
    pub size_estimate: u64,
    pub download_url: Option<&'static str>,
    pub sha256: Option<&'static str>,
    /// File name shared by the temp download and the pre-staged copy.
    pub artifact_name: Option<&'static str>,
    pub artifact_path: Option<PathBuf>,
    pub existing_install_location: Option<PathBuf>,
    pub existing_install: bool,
    pub selected: bool,
    pub stage: Stage,
    pub last_error: Option<String>,
}

impl ItemState {
    pub fn new(definition: &ItemDefinition, platform: Platform, paths: &InstallPaths) -> Self {
        let download = definition.download_for(platform);

        Self {
            key: definition.key,
            display_name: definition.display_name,
            version: definition.version,
            size_estimate: definition.size_bytes(),
            download_url: download.map(|d| d.url),
            sha256: download.and_then(|d| d.sha256),
            artifact_name: download.map(|d| d.file_name()),
            artifact_path: download.map(|d| paths.temp_artifact(d.file_name())),
            existing_install_location: None,
            existing_install: false,
            // Nothing to install without an artifact for this platform
            selected: download.is_some(),
            stage: Stage::NotStarted,
            last_error: None,
        }
    }

    /// The detected location, if it is non-empty.
    pub fn location(&self) -> Option<&Path> {
        self.existing_install_location
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }

    /// Record a successful detection. An empty location is not a usable
    /// install and leaves the item unfound.
    pub fn mark_found(&mut self, location: PathBuf) {
        self.existing_install = !location.as_os_str().is_empty();
        self.existing_install_location = Some(location);
    }

    pub fn mark_not_found(&mut self) {
        self.existing_install = false;
    }

    /// Move to `next`, rejecting transitions that break the stage order.
    pub fn advance(&mut self, next: Stage) -> Result<(), InstallError> {
        if !self.stage.can_transition(next, self.existing_install) {
            return Err(InstallError::InvalidTransition {
                key: self.key,
                from: self.stage,
                to: next,
            });
        }
        debug!("{} - stage {} -> {}", self.key, self.stage, next);
        self.stage = next;
        Ok(())
    }

    /// Mark the pipeline as failed and keep the cause for the progress view.
    pub fn fail(&mut self, error: &InstallError) {
        if !self.stage.is_terminal() {
            self.stage = Stage::Failed;
        }
        self.last_error = Some(error.to_string());
    }
}

// ============================================================================
// Installable Trait
// ============================================================================

/// One orchestrated tool with its own detect/download/install/setup pipeline.
#[async_trait]
pub trait Installable: Send + Sync {
    fn state(&self) -> &ItemState;

    fn state_mut(&mut self) -> &mut ItemState;

    fn key(&self) -> ItemKey {
        self.state().key
    }

    /// Look for a usable install and return its root.
    ///
    /// `selection` scopes the probe to a directory the user picked.
    async fn probe(
        &self,
        env: &InstallEnv,
        selection: Option<&Path>,
    ) -> Result<PathBuf, DetectionFailure>;

    /// Run the probe and fold its outcome into the item state.
    ///
    /// Failures are never returned: they leave `existing_install == false`.
    /// Every call produces exactly one [`CheckComplete`].
    async fn detect_existing_install(
        &mut self,
        env: &InstallEnv,
        selection: Option<&Path>,
        shared: Option<&mut DetectionMap>,
    ) -> CheckComplete {
        let key = self.key();
        let outcome = self.probe(env, selection).await;

        let state = self.state_mut();
        match outcome {
            Ok(location) => {
                let location = selection.map(Path::to_path_buf).unwrap_or(location);
                info!("{} - found existing install at {}", key, location.display());
                state.mark_found(location);
            }
            Err(failure) if failure.is_timeout() => {
                warn!("{} - probe timed out: {}", key, failure);
                state.mark_not_found();
            }
            Err(failure) => {
                debug!("{} - no usable install: {}", key, failure);
                state.mark_not_found();
            }
        }

        let found = state.existing_install;
        if let Some(shared) = shared {
            shared.mark(key, found);
        }

        CheckComplete { key, found }
    }

    /// Fetch the artifact into the temp directory, or adopt a pre-staged one.
    async fn download_installer(
        &mut self,
        env: &InstallEnv,
        progress: &dyn ProgressSink,
    ) -> Result<(), InstallError> {
        steps::fetch_artifact(self.state_mut(), env, progress).await
    }

    /// Install the fetched artifact and return the item's target directory.
    async fn install(
        &mut self,
        env: &InstallEnv,
        progress: &dyn ProgressSink,
    ) -> Result<PathBuf, InstallError>;

    /// Post-install configuration. Most tools need none.
    async fn setup(
        &mut self,
        _env: &InstallEnv,
        progress: &dyn ProgressSink,
    ) -> Result<(), InstallError> {
        progress.set_status("Setting up");
        progress.set_complete();
        Ok(())
    }

    fn is_configured(&self, _platform: Platform) -> bool {
        let state = self.state();
        state.existing_install || state.selected
    }
}
