//! Container Development Kit.
//!
//! Unpacked next to the other tools; setup installs its Vagrant plugins with
//! the suite's Vagrant.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{info, warn};

use super::catalog::get_definition;
use super::error::{DetectionFailure, InstallError};
use super::item::{InstallEnv, Installable, ItemState};
use super::steps;
use super::types::{ItemKey, Platform};
use crate::registry::InstallPaths;
use crate::services::ProgressSink;

const FOLDER_PREFIX: &str = "cdk";
const PLUGINS_DIR: &str = "plugins";

pub struct CdkInstall {
    state: ItemState,
}

impl CdkInstall {
    pub fn new(platform: Platform, paths: &InstallPaths) -> Self {
        Self {
            state: ItemState::new(get_definition(ItemKey::Cdk), platform, paths),
        }
    }
}

#[async_trait]
impl Installable for CdkInstall {
    fn state(&self) -> &ItemState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ItemState {
        &mut self.state
    }

    async fn probe(
        &self,
        _env: &InstallEnv,
        selection: Option<&Path>,
    ) -> Result<PathBuf, DetectionFailure> {
        let dir = selection.ok_or(DetectionFailure::NotFound)?;
        if tokio::fs::try_exists(dir.join(PLUGINS_DIR)).await.unwrap_or(false) {
            Ok(dir.to_path_buf())
        } else {
            Err(DetectionFailure::MissingMarker {
                path: dir.to_path_buf(),
                marker: PLUGINS_DIR.to_string(),
            })
        }
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
                .unwrap_or_else(|| env.paths.cdk_dir()));
        }

        progress.set_status("Installing");
        let target = env.paths.cdk_dir();
        let path = steps::unpack_and_rename(&self.state, env, FOLDER_PREFIX, &target).await?;
        info!("{} - installed to {}", self.key(), path.display());
        progress.set_complete();
        Ok(path)
    }

    /// Install every bundled `*.gem` as a Vagrant plugin.
    async fn setup(
        &mut self,
        env: &InstallEnv,
        progress: &dyn ProgressSink,
    ) -> Result<(), InstallError> {
        let key = self.key();
        progress.set_status("Setting up");

        let plugins = env.paths.cdk_dir().join(PLUGINS_DIR);
        let mut gems: Vec<String> = steps::list_entries(key, &plugins)
            .await?
            .into_iter()
            .filter(|name| name.ends_with(".gem"))
            .collect();
        gems.sort();

        if gems.is_empty() {
            warn!("{} - no plugins found in {}", key, plugins.display());
        }

        let vagrant = env
            .paths
            .vagrant_dir()
            .join("bin")
            .join(format!("vagrant{}", env.platform.exe_suffix()));

        for gem in gems {
            info!("{} - installing vagrant plugin {}", key, gem);
            let args = vec![
                "plugin".to_string(),
                "install".to_string(),
                plugins.join(&gem).display().to_string(),
            ];
            env.runner
                .execute_file(&vagrant, &args, env.installer_timeout)
                .await
                .map_err(steps::command_failed(key, "vagrant plugin install"))?;
        }

        progress.set_complete();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::installables::testing::{
        env_with, FakeDownloader, FakeUnpacker, RecordingProgress, Scripted, ScriptedRunner,
    };
    use std::sync::Arc;
    use tempfile::TempDir;

    fn plugin_line(env: &InstallEnv, gem: &str) -> String {
        format!(
            "{} plugin install {}",
            env.paths.vagrant_dir().join("bin").join("vagrant").display(),
            env.paths.cdk_dir().join(PLUGINS_DIR).join(gem).display()
        )
    }

    fn cdk_env(dir: &TempDir, runner: ScriptedRunner, unpacker: FakeUnpacker) -> (Arc<ScriptedRunner>, InstallEnv) {
        let runner = Arc::new(runner);
        let env = env_with(
            dir.path(),
            Platform::LinuxX64,
            runner.clone(),
            Arc::new(FakeDownloader::new(b"")),
            Arc::new(unpacker),
        );
        (runner, env)
    }

    fn stage_plugins(env: &InstallEnv, gems: &[&str]) {
        let plugins = env.paths.cdk_dir().join(PLUGINS_DIR);
        std::fs::create_dir_all(&plugins).unwrap();
        for gem in gems {
            std::fs::write(plugins.join(gem), b"").unwrap();
        }
    }

    #[tokio::test]
    async fn test_detect_requires_selection() {
        let dir = TempDir::new().unwrap();
        let (_, env) = cdk_env(&dir, ScriptedRunner::new(), FakeUnpacker::default());
        let mut cdk = CdkInstall::new(env.platform, &env.paths);

        assert!(!cdk.detect_existing_install(&env, None, None).await.found);

        let selected = dir.path().join("my-cdk");
        std::fs::create_dir_all(selected.join("plugins")).unwrap();
        assert!(cdk.detect_existing_install(&env, Some(&selected), None).await.found);
        assert_eq!(cdk.state().location(), Some(selected.as_path()));
    }

    #[tokio::test]
    async fn test_install_renames_cdk_folder() {
        let dir = TempDir::new().unwrap();
        let (_, env) = cdk_env(
            &dir,
            ScriptedRunner::new(),
            FakeUnpacker::with_entries(&["cdk-2.0.0-beta3/"]),
        );
        let mut cdk = CdkInstall::new(env.platform, &env.paths);
        let archive = dir.path().join("cdk.zip");
        std::fs::write(&archive, b"").unwrap();
        cdk.state_mut().artifact_path = Some(archive);

        let path = cdk.install(&env, &RecordingProgress::default()).await.unwrap();

        assert_eq!(path, env.paths.cdk_dir());
        assert!(path.is_dir());
    }

    #[tokio::test]
    async fn test_reinstall_replaces_previous_cdk_folder() {
        let dir = TempDir::new().unwrap();
        let (_, env) = cdk_env(
            &dir,
            ScriptedRunner::new(),
            FakeUnpacker::with_entries(&[
                "cdk-2.0.0-beta3/",
                "cdk-2.0.0-beta3/plugins/",
                "cdk-2.0.0-beta3/plugins/landrush-0.18.0.gem",
            ]),
        );
        stage_plugins(&env, &["landrush-0.17.0.gem"]);
        let mut cdk = CdkInstall::new(env.platform, &env.paths);
        let archive = dir.path().join("cdk.zip");
        std::fs::write(&archive, b"").unwrap();
        cdk.state_mut().artifact_path = Some(archive);

        let path = cdk.install(&env, &RecordingProgress::default()).await.unwrap();

        let plugins = path.join(PLUGINS_DIR);
        assert!(plugins.join("landrush-0.18.0.gem").is_file());
        assert!(!plugins.join("landrush-0.17.0.gem").exists());
        assert!(!env.paths.install_dir.join("cdk-2.0.0-beta3").exists());
    }

    #[tokio::test]
    async fn test_install_ignores_leftover_target_when_archive_has_no_folder() {
        let dir = TempDir::new().unwrap();
        let (_, env) = cdk_env(&dir, ScriptedRunner::new(), FakeUnpacker::with_entries(&["README"]));
        stage_plugins(&env, &["landrush-0.17.0.gem"]);
        let mut cdk = CdkInstall::new(env.platform, &env.paths);
        let archive = dir.path().join("cdk.zip");
        std::fs::write(&archive, b"").unwrap();
        cdk.state_mut().artifact_path = Some(archive);

        let err = cdk.install(&env, &RecordingProgress::default()).await.unwrap_err();
        assert!(matches!(err, InstallError::NoMatchingEntry { key: ItemKey::Cdk, .. }));
    }

    #[tokio::test]
    async fn test_setup_installs_each_gem_in_order() {
        let dir = TempDir::new().unwrap();
        let probe_env = cdk_env(&dir, ScriptedRunner::new(), FakeUnpacker::default()).1;
        let runner = ScriptedRunner::new()
            .stdout(&plugin_line(&probe_env, "vagrant-registration-1.0.0.gem"), "Installed")
            .stdout(&plugin_line(&probe_env, "landrush-0.18.0.gem"), "Installed");
        let (runner, env) = cdk_env(&dir, runner, FakeUnpacker::default());
        stage_plugins(
            &env,
            &["vagrant-registration-1.0.0.gem", "README.md", "landrush-0.18.0.gem"],
        );
        let mut cdk = CdkInstall::new(env.platform, &env.paths);
        let progress = RecordingProgress::default();

        cdk.setup(&env, &progress).await.unwrap();

        assert_eq!(
            runner.calls(),
            vec![
                plugin_line(&env, "landrush-0.18.0.gem"),
                plugin_line(&env, "vagrant-registration-1.0.0.gem"),
            ]
        );
        assert_eq!(progress.statuses(), vec!["Setting up".to_string()]);
        assert!(progress.completed());
    }

    #[tokio::test]
    async fn test_setup_plugin_failure() {
        let dir = TempDir::new().unwrap();
        let probe_env = cdk_env(&dir, ScriptedRunner::new(), FakeUnpacker::default()).1;
        let runner = ScriptedRunner::new().on(&plugin_line(&probe_env, "landrush.gem"), Scripted::Exit(1));
        let (_, env) = cdk_env(&dir, runner, FakeUnpacker::default());
        stage_plugins(&env, &["landrush.gem"]);
        let mut cdk = CdkInstall::new(env.platform, &env.paths);

        let err = cdk.setup(&env, &RecordingProgress::default()).await.unwrap_err();
        assert!(matches!(err, InstallError::Command { key: ItemKey::Cdk, .. }));
    }

    #[tokio::test]
    async fn test_setup_without_plugins_dir() {
        let dir = TempDir::new().unwrap();
        let (_, env) = cdk_env(&dir, ScriptedRunner::new(), FakeUnpacker::default());
        let mut cdk = CdkInstall::new(env.platform, &env.paths);

        let err = cdk.setup(&env, &RecordingProgress::default()).await.unwrap_err();
        assert!(matches!(err, InstallError::ListDirectory { .. }));
    }
}
