//! Tools installed by their vendor installer: VirtualBox, Vagrant, Cygwin.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use super::catalog::{get_definition, InstallerCommand};
use super::error::{DetectionFailure, InstallError};
use super::item::{InstallEnv, Installable, ItemState};
use super::steps;
use super::types::{ItemKey, Platform};
use super::version::ToolVersion;
use crate::registry::InstallPaths;
use crate::services::ProgressSink;

/// How a tool is found and version-checked.
#[derive(Debug, Clone, Copy)]
pub struct ToolProbe {
    pub executable: &'static str,
    pub version_arg: &'static str,
    pub minimum: Option<ToolVersion>,
    /// Only needed on Windows; always configured elsewhere.
    pub windows_only: bool,
}

const VIRTUALBOX_PROBE: ToolProbe = ToolProbe {
    executable: "VBoxManage",
    version_arg: "--version",
    minimum: Some(ToolVersion::new(5, 0)),
    windows_only: false,
};

const VAGRANT_PROBE: ToolProbe = ToolProbe {
    executable: "vagrant",
    version_arg: "--version",
    minimum: Some(ToolVersion::new(1, 7)),
    windows_only: false,
};

const CYGWIN_PROBE: ToolProbe = ToolProbe {
    executable: "cygcheck",
    version_arg: "-V",
    minimum: None,
    windows_only: true,
};

pub struct ToolInstall {
    state: ItemState,
    probe: ToolProbe,
    installer: Option<InstallerCommand>,
}

impl ToolInstall {
    fn new(key: ItemKey, probe: ToolProbe, platform: Platform, paths: &InstallPaths) -> Self {
        let definition = get_definition(key);
        Self {
            state: ItemState::new(definition, platform, paths),
            probe,
            installer: definition.installer,
        }
    }

    pub fn virtualbox(platform: Platform, paths: &InstallPaths) -> Self {
        Self::new(ItemKey::VirtualBox, VIRTUALBOX_PROBE, platform, paths)
    }

    pub fn vagrant(platform: Platform, paths: &InstallPaths) -> Self {
        Self::new(ItemKey::Vagrant, VAGRANT_PROBE, platform, paths)
    }

    pub fn cygwin(platform: Platform, paths: &InstallPaths) -> Self {
        Self::new(ItemKey::Cygwin, CYGWIN_PROBE, platform, paths)
    }

    fn not_needed(&self, platform: Platform) -> bool {
        self.probe.windows_only && !platform.is_windows()
    }
}

/// Install root from `which`/`where` output: the folder holding the
/// executable, or its parent when that folder is `bin`.
fn tool_root(output: &str) -> Option<PathBuf> {
    let line = output.lines().map(str::trim).find(|l| !l.is_empty())?;
    let dir = Path::new(line).parent()?;
    if dir.file_name().is_some_and(|name| name == "bin") {
        dir.parent().map(Path::to_path_buf)
    } else {
        Some(dir.to_path_buf())
    }
}

#[async_trait]
impl Installable for ToolInstall {
    fn state(&self) -> &ItemState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ItemState {
        &mut self.state
    }

    async fn probe(
        &self,
        env: &InstallEnv,
        selection: Option<&Path>,
    ) -> Result<PathBuf, DetectionFailure> {
        if self.not_needed(env.platform) {
            return Err(DetectionFailure::Unsupported(env.platform));
        }

        let program = match selection {
            Some(dir) => {
                let exe = format!("{}{}", self.probe.executable, env.platform.exe_suffix());
                let in_bin = dir.join("bin").join(&exe);
                if tokio::fs::try_exists(&in_bin).await.unwrap_or(false) {
                    in_bin
                } else {
                    dir.join(exe)
                }
            }
            None => PathBuf::from(self.probe.executable),
        };

        let output = env
            .runner
            .execute_file(&program, &[self.probe.version_arg.to_string()], env.probe_timeout)
            .await?;
        let version = ToolVersion::parse(&output.combined()).ok_or(DetectionFailure::Unparseable)?;
        if let Some(minimum) = self.probe.minimum {
            if version < minimum {
                return Err(DetectionFailure::VersionTooOld {
                    found: version.to_string(),
                    minimum: minimum.to_string(),
                });
            }
        }
        debug!("{} - version {}", self.key(), version);

        if let Some(dir) = selection {
            return Ok(dir.to_path_buf());
        }

        let located = env
            .runner
            .execute_command(
                &env.platform.locate_command(self.probe.executable),
                env.probe_timeout,
            )
            .await?;
        tool_root(&located.stdout).ok_or(DetectionFailure::NoLocation)
    }

    async fn install(
        &mut self,
        env: &InstallEnv,
        progress: &dyn ProgressSink,
    ) -> Result<PathBuf, InstallError> {
        let key = self.key();
        if self.state.existing_install {
            return Ok(self
                .state
                .location()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| env.paths.item_dir(key)));
        }

        progress.set_status("Installing");
        let installer = self.installer.ok_or(InstallError::UnsupportedPlatform {
            key,
            platform: env.platform,
        })?;
        let artifact = steps::artifact(&self.state)?.display().to_string();
        let target = env.paths.item_dir(key);
        let target_str = target.display().to_string();

        let program = InstallerCommand::render(installer.program, &artifact, &target_str);
        let args: Vec<String> = installer
            .args
            .iter()
            .map(|arg| InstallerCommand::render(arg, &artifact, &target_str))
            .collect();

        env.runner
            .execute_file(Path::new(&program), &args, env.installer_timeout)
            .await
            .map_err(steps::command_failed(key, "installer"))?;

        info!("{} - installed to {}", key, target.display());
        progress.set_complete();
        Ok(target)
    }

    fn is_configured(&self, platform: Platform) -> bool {
        self.not_needed(platform) || self.state.existing_install || self.state.selected
    }
}
