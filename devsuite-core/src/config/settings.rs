//! Installer settings.
//!
//! Settings are persisted to the SQLite database as JSON.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default timeout for detection probes (`java -version`, `which vagrant`).
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 2;

/// Default budget for one item's whole detection pass.
pub const DEFAULT_DETECTION_TIMEOUT_SECS: u64 = 10;

/// Default timeout for vendor installers and plugin installs.
pub const DEFAULT_INSTALLER_TIMEOUT_SECS: u64 = 1800;

/// Directory name of the suite under the user's home.
const DEFAULT_INSTALL_SUBDIR: &str = "DevelopmentSuite";

/// Subdirectory name under the OS temp folder.
const TEMP_SUBDIR: &str = "devsuite";

// =============================================================================
// Installer Settings
// =============================================================================

/// Installer settings - persisted to database as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Root directory the suite is installed into.
    /// Defaults to `~/DevelopmentSuite`.
    #[serde(default)]
    pub install_root: Option<PathBuf>,

    /// Where artifacts are downloaded to.
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,

    /// Directory searched for pre-staged artifacts before downloading.
    /// Defaults to the directory of the running executable.
    #[serde(default)]
    pub bundle_dir: Option<PathBuf>,

    pub probe_timeout_secs: u64,

    pub detection_timeout_secs: u64,

    pub installer_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            install_root: None,
            temp_dir: None,
            bundle_dir: None,
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            detection_timeout_secs: DEFAULT_DETECTION_TIMEOUT_SECS,
            installer_timeout_secs: DEFAULT_INSTALLER_TIMEOUT_SECS,
        }
    }
}

impl Settings {
    /// Load settings from database, using defaults for missing values.
    ///
    /// If settings don't exist or can't be parsed, returns defaults.
    pub fn load(db: &crate::db::Database) -> Self {
        let mut settings = Self::default();

        if let Ok(Some(json)) = db.get_setting("settings") {
            match serde_json::from_str::<Settings>(&json) {
                Ok(loaded) => settings = loaded,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to parse settings, using defaults");
                }
            }
        }

        settings.validate();
        settings
    }

    /// Save settings to database.
    pub fn save(&self, db: &crate::db::Database) -> anyhow::Result<()> {
        let json = serde_json::to_string(self)?;
        db.set_setting("settings", &json)?;
        Ok(())
    }

    /// Drop the stored settings so the next load starts from defaults.
    pub fn reset(db: &crate::db::Database) -> anyhow::Result<()> {
        db.delete_setting("settings")?;
        Ok(())
    }

    /// Validate and clamp settings to valid ranges.
    pub fn validate(&mut self) {
        self.probe_timeout_secs = self.probe_timeout_secs.clamp(1, 60);
        // A detection runs up to two probes, so its budget must cover both
        self.detection_timeout_secs = self
            .detection_timeout_secs
            .clamp(self.probe_timeout_secs * 2, 300);
        self.installer_timeout_secs = self.installer_timeout_secs.clamp(60, 4 * 3600);

        for dir in [&mut self.install_root, &mut self.temp_dir, &mut self.bundle_dir] {
            if dir.as_ref().is_some_and(|p| p.as_os_str().is_empty()) {
                *dir = None;
            }
        }
    }

    /// Update one field from its textual form, as used by `settings set`.
    pub fn set_field(&mut self, field: &str, value: &str) -> anyhow::Result<()> {
        let as_secs = || -> anyhow::Result<u64> {
            value
                .parse::<u64>()
                .map_err(|_| anyhow::anyhow!("'{}' is not a number of seconds", value))
        };
        let as_dir = || (!value.is_empty()).then(|| PathBuf::from(value));

        match field {
            "install_root" => self.install_root = as_dir(),
            "temp_dir" => self.temp_dir = as_dir(),
            "bundle_dir" => self.bundle_dir = as_dir(),
            "probe_timeout_secs" => self.probe_timeout_secs = as_secs()?,
            "detection_timeout_secs" => self.detection_timeout_secs = as_secs()?,
            "installer_timeout_secs" => self.installer_timeout_secs = as_secs()?,
            other => anyhow::bail!("Unknown setting: {}", other),
        }

        self.validate();
        Ok(())
    }

    pub fn install_root(&self) -> PathBuf {
        self.install_root.clone().unwrap_or_else(default_install_root)
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(TEMP_SUBDIR))
    }

    pub fn bundle_dir(&self) -> PathBuf {
        self.bundle_dir.clone().unwrap_or_else(default_bundle_dir)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn detection_timeout(&self) -> Duration {
        Duration::from_secs(self.detection_timeout_secs)
    }

    pub fn installer_timeout(&self) -> Duration {
        Duration::from_secs(self.installer_timeout_secs)
    }
}

fn default_install_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(DEFAULT_INSTALL_SUBDIR)
}

fn default_bundle_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
}
