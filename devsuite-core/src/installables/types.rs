//! Core types for installable items.
//!
//! This module defines the foundational types used across the installer:
//! item keys, platform detection, pipeline stages and artifact formats.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

// ============================================================================
// Item Keys
// ============================================================================

/// Stable identifier of each installable item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKey {
    /// Oracle VirtualBox hypervisor.
    VirtualBox,
    /// Zulu OpenJDK 8.
    Jdk,
    /// JBoss Developer Studio.
    Jbds,
    /// HashiCorp Vagrant.
    Vagrant,
    /// Cygwin (Windows only).
    Cygwin,
    /// Container Development Kit.
    Cdk,
}

impl ItemKey {
    /// Returns all item keys in registration (install) order.
    pub fn all() -> &'static [ItemKey] {
        &[
            Self::VirtualBox,
            Self::Jdk,
            Self::Jbds,
            Self::Vagrant,
            Self::Cygwin,
            Self::Cdk,
        ]
    }

    /// Returns the lowercase string identifier for this item.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VirtualBox => "virtualbox",
            Self::Jdk => "jdk",
            Self::Jbds => "jbds",
            Self::Vagrant => "vagrant",
            Self::Cygwin => "cygwin",
            Self::Cdk => "cdk",
        }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ItemKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "virtualbox" | "vbox" => Ok(Self::VirtualBox),
            "jdk" | "java" => Ok(Self::Jdk),
            "jbds" | "devstudio" => Ok(Self::Jbds),
            "vagrant" => Ok(Self::Vagrant),
            "cygwin" => Ok(Self::Cygwin),
            "cdk" => Ok(Self::Cdk),
            _ => Err(format!("Unknown item: {}", s)),
        }
    }
}

// ============================================================================
// Platform Detection
// ============================================================================

/// Represents a supported platform (OS + architecture).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    LinuxX64,
    LinuxArm64,
    MacosX64,
    MacosArm64,
    WindowsX64,
}

impl Platform {
    /// Detects the current platform at runtime.
    ///
    /// Returns `None` if the platform is unsupported.
    pub fn detect() -> Option<Self> {
        #[cfg(all(target_os = "linux", target_arch = "x86_64"))]
        {
            Some(Platform::LinuxX64)
        }
        #[cfg(all(target_os = "linux", target_arch = "aarch64"))]
        {
            Some(Platform::LinuxArm64)
        }
        #[cfg(all(target_os = "macos", target_arch = "x86_64"))]
        {
            Some(Platform::MacosX64)
        }
        #[cfg(all(target_os = "macos", target_arch = "aarch64"))]
        {
            Some(Platform::MacosArm64)
        }
        #[cfg(all(target_os = "windows", target_arch = "x86_64"))]
        {
            Some(Platform::WindowsX64)
        }
        #[cfg(not(any(
            all(target_os = "linux", target_arch = "x86_64"),
            all(target_os = "linux", target_arch = "aarch64"),
            all(target_os = "macos", target_arch = "x86_64"),
            all(target_os = "macos", target_arch = "aarch64"),
            all(target_os = "windows", target_arch = "x86_64"),
        )))]
        {
            None
        }
    }

    /// Returns a human-readable description of the platform.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::LinuxX64 => "Linux (x86_64)",
            Self::LinuxArm64 => "Linux (ARM64)",
            Self::MacosX64 => "macOS (Intel)",
            Self::MacosArm64 => "macOS (Apple Silicon)",
            Self::WindowsX64 => "Windows (x86_64)",
        }
    }

    pub fn is_windows(&self) -> bool {
        matches!(self, Self::WindowsX64)
    }

    /// Suffix appended to executable names (`.exe` on Windows).
    pub fn exe_suffix(&self) -> &'static str {
        if self.is_windows() {
            ".exe"
        } else {
            ""
        }
    }

    /// Shell command that prints the full path of `tool` found on `PATH`.
    pub fn locate_command(&self, tool: &str) -> String {
        if self.is_windows() {
            format!("where {}", tool)
        } else {
            format!("which {}", tool)
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// Pipeline Stage
// ============================================================================

/// Position of an item in its download → install → setup pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    NotStarted,
    Downloading,
    Installing,
    SettingUp,
    Complete,
    Failed,
}

impl Stage {
    /// Returns true for `Complete` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    /// Checks whether moving from `self` to `next` keeps the stage order.
    ///
    /// Stages advance one step at a time. The only skip is
    /// `NotStarted → SettingUp` for an item with an existing install, and any
    /// non-terminal stage may fail.
    pub fn can_transition(&self, next: Stage, existing_install: bool) -> bool {
        use Stage::*;

        match (self, next) {
            (from, Failed) => !from.is_terminal(),
            (NotStarted, Downloading) => !existing_install,
            (NotStarted, SettingUp) => existing_install,
            (Downloading, Installing) => true,
            (Installing, SettingUp) => true,
            (SettingUp, Complete) => true,
            _ => false,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::NotStarted => "Not started",
            Self::Downloading => "Downloading",
            Self::Installing => "Installing",
            Self::SettingUp => "Setting up",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ============================================================================
// Artifact Format
// ============================================================================

/// Format of a downloaded artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchiveFormat {
    /// Gzip-compressed tar archive (.tar.gz, .tgz)
    TarGz,
    /// XZ-compressed tar archive (.tar.xz)
    TarXz,
    /// ZIP archive (.zip)
    Zip,
    /// Windows Installer package (.msi)
    Msi,
    /// Self-contained installer program (.exe, .jar)
    Executable,
}

impl ArchiveFormat {
    /// Infers the format from a URL or filename.
    pub fn from_url(url: &str) -> Option<Self> {
        let lower = url.to_lowercase();
        if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if lower.ends_with(".tar.xz") {
            Some(Self::TarXz)
        } else if lower.ends_with(".zip") {
            Some(Self::Zip)
        } else if lower.ends_with(".msi") {
            Some(Self::Msi)
        } else if lower.ends_with(".exe") || lower.ends_with(".jar") {
            Some(Self::Executable)
        } else {
            None
        }
    }

    /// Infers the format from the file name of `path`.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.file_name()
            .and_then(|name| name.to_str())
            .and_then(Self::from_url)
    }

    /// Returns true if the format requires extraction.
    pub fn requires_extraction(&self) -> bool {
        matches!(self, Self::TarGz | Self::TarXz | Self::Zip)
    }
}
