//! Zulu OpenJDK 8.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use super::catalog::get_definition;
use super::error::{DetectionFailure, InstallError};
use super::item::{InstallEnv, Installable, ItemState};
use super::steps;
use super::types::{ItemKey, Platform};
use super::version::{parse_java_home, JavaVersion, MIN_JAVA_FEATURE};
use crate::registry::InstallPaths;
use crate::services::ProgressSink;

/// Top-level folder prefix of Zulu archives, e.g. `zulu8.40.0.25-jdk8.0.212`.
const FOLDER_PREFIX: &str = "zulu";

pub struct JdkInstall {
    state: ItemState,
}

impl JdkInstall {
    pub fn new(platform: Platform, paths: &InstallPaths) -> Self {
        Self {
            state: ItemState::new(get_definition(ItemKey::Jdk), platform, paths),
        }
    }

    /// Command printing where the JDK lives.
    fn locator_command(platform: Platform) -> String {
        if platform.is_windows() {
            "java -XshowSettings:properties -version".to_string()
        } else {
            platform.locate_command("java")
        }
    }
}

/// Resolve the JDK root from locator output.
///
/// A `java.home = ...` property wins. Otherwise the first line is taken as
/// the path of the `java` executable, following symlinks, and `bin/java` is
/// stripped. A trailing `jre` folder is dropped in both cases.
async fn java_home_from(output: &str) -> Option<PathBuf> {
    if let Some(home) = parse_java_home(output) {
        return Some(strip_jre(PathBuf::from(home)));
    }

    let line = output.lines().map(str::trim).find(|l| !l.is_empty())?;
    let java = tokio::fs::canonicalize(line)
        .await
        .unwrap_or_else(|_| PathBuf::from(line));
    let home = java.parent()?.parent()?;
    Some(strip_jre(home.to_path_buf()))
}

fn strip_jre(home: PathBuf) -> PathBuf {
    if home.file_name().is_some_and(|name| name == "jre") {
        if let Some(parent) = home.parent() {
            return parent.to_path_buf();
        }
    }
    home
}

#[async_trait]
impl Installable for JdkInstall {
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
        let java = match selection {
            Some(dir) => dir
                .join("bin")
                .join(format!("java{}", env.platform.exe_suffix())),
            None => PathBuf::from("java"),
        };

        let output = env
            .runner
            .execute_file(&java, &["-version".to_string()], env.probe_timeout)
            .await?;

        let version = JavaVersion::parse(&output.combined()).ok_or(DetectionFailure::Unparseable)?;
        if !version.is_supported() {
            return Err(DetectionFailure::VersionTooOld {
                found: version.to_string(),
                minimum: MIN_JAVA_FEATURE.to_string(),
            });
        }
        debug!("{} - java {} at {}", self.key(), version, java.display());

        if let Some(dir) = selection {
            return Ok(dir.to_path_buf());
        }

        let located = env
            .runner
            .execute_command(&Self::locator_command(env.platform), env.probe_timeout)
            .await?;
        java_home_from(&located.combined())
            .await
            .ok_or(DetectionFailure::NoLocation)
    }

    async fn install(
        &mut self,
        env: &InstallEnv,
        progress: &dyn ProgressSink,
    ) -> Result<PathBuf, InstallError> {
        if self.state.existing_install {
            return Ok(self
                .state
                .location()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| env.paths.jdk_dir()));
        }

        progress.set_status("Installing");
        let target = env.paths.jdk_dir();
        let path = steps::unpack_and_rename(&self.state, env, FOLDER_PREFIX, &target).await?;
        info!("{} - installed to {}", self.key(), path.display());
        progress.set_complete();
        Ok(path)
    }
}
