//! Item catalog with hardcoded definitions.
//!
//! Static metadata for every item in the suite: display names, artifact
//! download URLs per platform, size estimates and target directory names.

use super::types::{ItemKey, Platform};

/// A downloadable artifact for one platform.
#[derive(Debug, Clone, Copy)]
pub struct PlatformDownload {
    pub url: &'static str,
    pub sha256: Option<&'static str>,
}

impl PlatformDownload {
    pub const fn new(url: &'static str, sha256: Option<&'static str>) -> Self {
        Self { url, sha256 }
    }

    /// File name of the artifact, taken from the last URL segment.
    ///
    /// The same name is used for the temp download and for the pre-staged
    /// copy in the bundle directory.
    pub fn file_name(&self) -> &'static str {
        self.url.rsplit('/').next().unwrap_or(self.url)
    }
}

/// Artifact downloads per supported platform.
#[derive(Debug, Clone, Copy)]
pub struct PlatformUrls {
    pub linux_x64: Option<PlatformDownload>,
    pub linux_arm64: Option<PlatformDownload>,
    pub macos_x64: Option<PlatformDownload>,
    pub macos_arm64: Option<PlatformDownload>,
    pub windows_x64: Option<PlatformDownload>,
}

impl PlatformUrls {
    pub const fn same_for_all(download: PlatformDownload) -> Self {
        Self {
            linux_x64: Some(download),
            linux_arm64: Some(download),
            macos_x64: Some(download),
            macos_arm64: Some(download),
            windows_x64: Some(download),
        }
    }

    pub const fn windows_only(download: PlatformDownload) -> Self {
        Self {
            linux_x64: None,
            linux_arm64: None,
            macos_x64: None,
            macos_arm64: None,
            windows_x64: Some(download),
        }
    }

    pub fn for_platform(&self, platform: Platform) -> Option<&PlatformDownload> {
        match platform {
            Platform::LinuxX64 => self.linux_x64.as_ref(),
            Platform::LinuxArm64 => self.linux_arm64.as_ref(),
            Platform::MacosX64 => self.macos_x64.as_ref(),
            Platform::MacosArm64 => self.macos_arm64.as_ref(),
            Platform::WindowsX64 => self.windows_x64.as_ref(),
        }
    }
}

/// A vendor installer invocation.
///
/// `{artifact}` and `{target}` in the program and arguments are replaced
/// with the downloaded artifact path and the item's target directory.
#[derive(Debug, Clone, Copy)]
pub struct InstallerCommand {
    pub program: &'static str,
    pub args: &'static [&'static str],
}

impl InstallerCommand {
    pub fn render(template: &str, artifact: &str, target: &str) -> String {
        template
            .replace("{artifact}", artifact)
            .replace("{target}", target)
    }
}

/// Complete static definition of an installable item.
#[derive(Debug, Clone, Copy)]
pub struct ItemDefinition {
    pub key: ItemKey,
    pub display_name: &'static str,
    pub version: &'static str,
    /// Approximate download size, used to weight progress.
    pub size_mb: u64,
    /// Directory name under the install root.
    pub target_subdir: &'static str,
    pub urls: PlatformUrls,
    pub installer: Option<InstallerCommand>,
}

impl ItemDefinition {
    pub fn size_bytes(&self) -> u64 {
        self.size_mb * 1024 * 1024
    }

    pub fn download_for(&self, platform: Platform) -> Option<&PlatformDownload> {
        self.urls.for_platform(platform)
    }
}

// ============================================================================
// VirtualBox
// ============================================================================

const VIRTUALBOX_DEFINITION: ItemDefinition = ItemDefinition {
    key: ItemKey::VirtualBox,
    display_name: "Oracle VirtualBox",
    version: "5.0.8",
    size_mb: 110,
    target_subdir: "virtualbox",
    urls: PlatformUrls::windows_only(PlatformDownload::new(
        "https://download.virtualbox.org/virtualbox/5.0.8/VirtualBox-5.0.8-103449-Win.exe",
        None,
    )),
    installer: Some(InstallerCommand {
        program: "{artifact}",
        args: &["--silent", "--msiparams", "INSTALLDIR={target}"],
    }),
};

// ============================================================================
// JDK
// ============================================================================

const JDK_DEFINITION: ItemDefinition = ItemDefinition {
    key: ItemKey::Jdk,
    display_name: "JDK 8",
    version: "8.0.212",
    size_mb: 260,
    target_subdir: "jdk8",
    urls: PlatformUrls {
        linux_x64: Some(PlatformDownload::new(
            "https://cdn.azul.com/zulu/bin/zulu8.40.0.25-ca-jdk8.0.222-linux_x64.tar.gz",
            None,
        )),
        linux_arm64: None,
        macos_x64: Some(PlatformDownload::new(
            "https://cdn.azul.com/zulu/bin/zulu8.40.0.25-ca-jdk8.0.222-macosx_x64.zip",
            None,
        )),
        macos_arm64: None,
        windows_x64: Some(PlatformDownload::new(
            "https://cdn.azul.com/zulu/bin/zulu8.40.0.25-ca-jdk8.0.222-win_x64.zip",
            None,
        )),
    },
    installer: None,
};

// ============================================================================
// JBoss Developer Studio
// ============================================================================

const JBDS_DEFINITION: ItemDefinition = ItemDefinition {
    key: ItemKey::Jbds,
    display_name: "JBoss Developer Studio",
    version: "9.0.0.GA",
    size_mb: 560,
    target_subdir: "developer-studio",
    urls: PlatformUrls::same_for_all(PlatformDownload::new(
        "https://download.jboss.org/devstudio/9.0.0.GA/jboss-devstudio-9.0.0.GA-installer-standalone.jar",
        None,
    )),
    installer: None,
};

// ============================================================================
// Vagrant
// ============================================================================

const VAGRANT_DEFINITION: ItemDefinition = ItemDefinition {
    key: ItemKey::Vagrant,
    display_name: "Vagrant",
    version: "1.7.4",
    size_mb: 190,
    target_subdir: "vagrant",
    urls: PlatformUrls::windows_only(PlatformDownload::new(
        "https://releases.hashicorp.com/vagrant/1.7.4/vagrant_1.7.4.msi",
        None,
    )),
    installer: Some(InstallerCommand {
        program: "msiexec",
        args: &["/i", "{artifact}", "VAGRANTAPPDIR={target}", "/qb!", "/norestart"],
    }),
};

// ============================================================================
// Cygwin
// ============================================================================

const CYGWIN_DEFINITION: ItemDefinition = ItemDefinition {
    key: ItemKey::Cygwin,
    display_name: "Cygwin",
    version: "2.873",
    size_mb: 20,
    target_subdir: "cygwin",
    urls: PlatformUrls::windows_only(PlatformDownload::new(
        "https://cygwin.com/setup-x86_64.exe",
        None,
    )),
    installer: Some(InstallerCommand {
        program: "{artifact}",
        args: &[
            "--no-admin",
            "--quiet-mode",
            "--only-site",
            "--site",
            "http://mirrors.xmission.com/cygwin",
            "--root",
            "{target}",
            "--categories",
            "Base",
            "--packages",
            "openssh,rsync",
        ],
    }),
};

// ============================================================================
// Container Development Kit
// ============================================================================

const CDK_DEFINITION: ItemDefinition = ItemDefinition {
    key: ItemKey::Cdk,
    display_name: "Container Development Kit",
    version: "2.0.0-beta3",
    size_mb: 30,
    target_subdir: "cdk",
    urls: PlatformUrls::same_for_all(PlatformDownload::new(
        "https://developers.redhat.com/download-manager/jdf/file/cdk-2.0.0-beta3.zip",
        None,
    )),
    installer: None,
};

// ============================================================================
// Catalog Access
// ============================================================================

/// Returns the definition for a specific item.
pub fn get_definition(key: ItemKey) -> &'static ItemDefinition {
    match key {
        ItemKey::VirtualBox => &VIRTUALBOX_DEFINITION,
        ItemKey::Jdk => &JDK_DEFINITION,
        ItemKey::Jbds => &JBDS_DEFINITION,
        ItemKey::Vagrant => &VAGRANT_DEFINITION,
        ItemKey::Cygwin => &CYGWIN_DEFINITION,
        ItemKey::Cdk => &CDK_DEFINITION,
    }
}
