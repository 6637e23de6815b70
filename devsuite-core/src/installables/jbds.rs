//! JBoss Developer Studio.
//!
//! Installed by running the standalone installer jar headless with the JDK
//! of the suite and an automated-install descriptor.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use super::catalog::get_definition;
use super::error::{DetectionFailure, InstallError};
use super::item::{InstallEnv, Installable, ItemState};
use super::steps;
use super::types::{ItemKey, Platform};
use crate::registry::InstallPaths;
use crate::services::ProgressSink;

/// Files that identify a Developer Studio install folder.
const MARKERS: &[&str] = &["studio/jbdevstudio.ini", "jbdevstudio.ini"];

const DESCRIPTOR_NAME: &str = "jbds-install.xml";

pub struct JbdsInstall {
    state: ItemState,
}

impl JbdsInstall {
    pub fn new(platform: Platform, paths: &InstallPaths) -> Self {
        Self {
            state: ItemState::new(get_definition(ItemKey::Jbds), platform, paths),
        }
    }
}

/// Automated-install descriptor understood by the installer jar.
fn install_descriptor(target: &Path, java: &Path) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<AutomatedInstallation langpack="eng">
<com.jboss.devstudio.core.installer.HTMLInfoPanelWithRootWarning id="introduction"/>
<com.izforge.izpack.panels.HTMLLicencePanel id="licence"/>
<com.jboss.devstudio.core.installer.PathInputPanel id="target">
<installpath>{}</installpath>
</com.jboss.devstudio.core.installer.PathInputPanel>
<com.jboss.devstudio.core.installer.JREPathPanel id="jre">
<jrelocation>{}</jrelocation>
</com.jboss.devstudio.core.installer.JREPathPanel>
<com.izforge.izpack.panels.InstallPanel id="install"/>
<com.izforge.izpack.panels.FinishPanel id="finish"/>
</AutomatedInstallation>
"#,
        target.display(),
        java.display()
    )
}

#[async_trait]
impl Installable for JbdsInstall {
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
        let dir = selection
            .map(Path::to_path_buf)
            .unwrap_or_else(|| env.paths.item_dir(ItemKey::Jbds));

        for marker in MARKERS {
            if tokio::fs::try_exists(dir.join(marker)).await.unwrap_or(false) {
                return Ok(dir);
            }
        }

        Err(DetectionFailure::MissingMarker {
            path: dir,
            marker: MARKERS[0].to_string(),
        })
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
        let installer = steps::artifact(&self.state)?;
        let target = env.paths.item_dir(key);
        let java = env
            .paths
            .jdk_dir()
            .join("bin")
            .join(format!("java{}", env.platform.exe_suffix()));

        let descriptor = env.paths.temp_dir.join(DESCRIPTOR_NAME);
        let write_descriptor = async {
            tokio::fs::create_dir_all(&env.paths.temp_dir).await?;
            tokio::fs::write(&descriptor, install_descriptor(&target, &java)).await
        };
        write_descriptor
            .await
            .map_err(|source| InstallError::Io {
                key,
                context: format!("cannot write {}", descriptor.display()),
                source,
            })?;

        let args = vec![
            "-jar".to_string(),
            installer.display().to_string(),
            descriptor.display().to_string(),
        ];
        env.runner
            .execute_file(&java, &args, env.installer_timeout)
            .await
            .map_err(steps::command_failed(key, "installer"))?;

        info!("{} - installed to {}", key, target.display());
        progress.set_complete();
        Ok(target)
    }
}
