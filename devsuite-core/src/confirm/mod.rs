//! Confirmation step.
//!
//! [`ConfirmController`] runs before anything is installed. It detects
//! existing installs one item at a time, lets the user pick what to install
//! or point at an existing folder, and on confirm hands the resolved install
//! roots to the registry.

mod gate;

pub use gate::PrerequisiteGate;

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::installables::{CheckComplete, DetectionMap, ItemKey};
use crate::registry::{InstallerData, ItemRoots};

/// Items detected when the confirmation view opens, in order.
pub const DETECTION_ORDER: [ItemKey; 3] = [ItemKey::VirtualBox, ItemKey::Vagrant, ItemKey::Jdk];

/// Items that must be configured before the installation can start.
pub const REQUIRED_ITEMS: [ItemKey; 4] = [
    ItemKey::VirtualBox,
    ItemKey::Cygwin,
    ItemKey::Vagrant,
    ItemKey::Cdk,
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfirmError {
    #[error("configuration is incomplete, missing: {}", display_keys(.missing))]
    InvalidConfiguration { missing: Vec<ItemKey> },

    #[error("{0} is not registered")]
    UnknownItem(ItemKey),

    #[error("{key} requires {prerequisite}")]
    PrerequisiteMissing { key: ItemKey, prerequisite: ItemKey },

    #[error("installation already confirmed")]
    AlreadyConfirmed,
}

fn display_keys(keys: &[ItemKey]) -> String {
    keys.iter()
        .map(ItemKey::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// Events
// ============================================================================

/// Progress of detection, for views that render it live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectionEvent {
    Started(ItemKey),
    CheckComplete(CheckComplete),
    /// Every item of a `detect_all` pass has signalled.
    Finished,
}

pub type DetectionSender = mpsc::UnboundedSender<DetectionEvent>;

pub type DetectionReceiver = mpsc::UnboundedReceiver<DetectionEvent>;

pub fn detection_channel() -> (DetectionSender, DetectionReceiver) {
    mpsc::unbounded_channel()
}

// ============================================================================
// Controller
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Confirm,
    Install,
}

pub struct ConfirmController {
    data: InstallerData,
    detection: DetectionMap,
    gate: PrerequisiteGate,
    detection_timeout: Duration,
    events: Option<DetectionSender>,
    phase: Phase,
}

impl ConfirmController {
    pub fn new(data: InstallerData, detection_timeout: Duration) -> Self {
        let mut controller = Self {
            data,
            detection: DetectionMap::new(),
            gate: PrerequisiteGate::jdk(),
            detection_timeout,
            events: None,
            phase: Phase::Confirm,
        };
        controller.refresh_gate();
        controller
    }

    pub fn with_events(mut self, events: DetectionSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Attach or detach the event channel. Detaching closes it once no
    /// other sender is left.
    pub fn set_events(&mut self, events: Option<DetectionSender>) {
        self.events = events;
    }

    pub fn data(&self) -> &InstallerData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut InstallerData {
        &mut self.data
    }

    pub fn into_data(self) -> InstallerData {
        self.data
    }

    pub fn detection(&self) -> &DetectionMap {
        &self.detection
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn emit(&self, event: DetectionEvent) {
        if let Some(events) = &self.events {
            // A dropped receiver only means nobody is watching.
            let _ = events.send(event);
        }
    }

    /// Detect every item of [`DETECTION_ORDER`], each awaited before the
    /// next one starts.
    pub async fn detect_all(&mut self) -> Vec<CheckComplete> {
        let mut results = Vec::with_capacity(DETECTION_ORDER.len());
        for key in DETECTION_ORDER {
            match self.run_detection(key, None).await {
                Ok(done) => results.push(done),
                Err(e) => warn!("{}", e),
            }
        }
        self.emit(DetectionEvent::Finished);
        results
    }

    /// Re-run the auto-probe of one item.
    pub async fn check_item(&mut self, key: ItemKey) -> Result<CheckComplete, ConfirmError> {
        self.run_detection(key, None).await
    }

    /// The user picked a folder for `key`, or cancelled the dialog (`None`),
    /// which falls back to the auto-probe.
    pub async fn select_item(
        &mut self,
        key: ItemKey,
        folder: Option<PathBuf>,
    ) -> Result<CheckComplete, ConfirmError> {
        if let Some(folder) = &folder {
            info!("{} - checking selected folder {}", key, folder.display());
        }
        self.run_detection(key, folder.as_deref()).await
    }

    async fn run_detection(
        &mut self,
        key: ItemKey,
        selection: Option<&Path>,
    ) -> Result<CheckComplete, ConfirmError> {
        if self.data.get(key).is_none() {
            return Err(ConfirmError::UnknownItem(key));
        }
        self.emit(DetectionEvent::Started(key));

        let data = &mut self.data;
        let map = &mut self.detection;
        let outcome = tokio::time::timeout(
            self.detection_timeout,
            data.detect(key, selection, Some(map)),
        )
        .await;

        let done = match outcome {
            Ok(Some(done)) => done,
            Ok(None) => return Err(ConfirmError::UnknownItem(key)),
            Err(_) => {
                warn!(
                    "{} - detection timed out after {}ms",
                    key,
                    self.detection_timeout.as_millis()
                );
                if let Some(item) = self.data.get_mut(key) {
                    item.state_mut().mark_not_found();
                }
                self.detection.mark(key, false);
                CheckComplete { key, found: false }
            }
        };

        debug!("{} - check complete, found: {}", key, done.found);
        self.emit(DetectionEvent::CheckComplete(done));
        self.refresh_gate();
        Ok(done)
    }

    pub fn is_selected(&self, key: ItemKey) -> bool {
        self.data
            .get(key)
            .is_some_and(|item| item.state().selected)
    }

    /// Toggle whether `key` is installed.
    ///
    /// A dependent cannot be selected while its prerequisite is unconfigured.
    pub fn set_selected(&mut self, key: ItemKey, selected: bool) -> Result<(), ConfirmError> {
        if selected && self.gate.guards(key) && !self.is_configured(self.gate.prerequisite) {
            return Err(ConfirmError::PrerequisiteMissing {
                key,
                prerequisite: self.gate.prerequisite,
            });
        }

        let item = self
            .data
            .get_mut(key)
            .ok_or(ConfirmError::UnknownItem(key))?;
        item.state_mut().selected = selected;
        debug!("{} - selected: {}", key, selected);

        self.refresh_gate();
        Ok(())
    }

    fn refresh_gate(&mut self) {
        let configured = self.is_configured(self.gate.prerequisite);
        for dependent in self.gate.evaluate(configured) {
            if let Some(item) = self.data.get_mut(dependent) {
                if item.state().selected {
                    info!(
                        "{} - deselected, {} is not configured",
                        dependent, self.gate.prerequisite
                    );
                }
                item.state_mut().selected = false;
            }
        }
    }

    /// Installed already, chosen for installation, found by detection, or
    /// not needed on this platform.
    pub fn is_configured(&self, key: ItemKey) -> bool {
        let platform = self.data.env().platform;
        self.data
            .get(key)
            .is_some_and(|item| item.is_configured(platform))
            || self.detection.is_found(key)
    }

    pub fn missing_items(&self) -> Vec<ItemKey> {
        REQUIRED_ITEMS
            .into_iter()
            .filter(|key| !self.is_configured(*key))
            .collect()
    }

    pub fn is_configuration_valid(&self) -> bool {
        self.missing_items().is_empty()
    }

    /// Root of the existing install of `key`, if detection found one.
    pub fn item_root(&self, key: ItemKey) -> Option<PathBuf> {
        let state = self.data.get(key)?.state();
        if !state.existing_install {
            return None;
        }
        state.location().map(Path::to_path_buf)
    }

    /// Lock in the selection and hand the resolved roots to the registry.
    pub fn confirm(&mut self) -> Result<ItemRoots, ConfirmError> {
        if self.phase != Phase::Confirm {
            return Err(ConfirmError::AlreadyConfirmed);
        }

        let missing = self.missing_items();
        if !missing.is_empty() {
            return Err(ConfirmError::InvalidConfiguration { missing });
        }

        let roots = ItemRoots::resolve(|key| self.item_root(key));
        self.data.setup(&roots);
        self.phase = Phase::Install;
        info!("installation confirmed");
        Ok(roots)
    }
}
