//! Item registry.
//!
//! [`InstallerData`] owns the ordered collection of items together with the
//! shared install parameters, and drives each item through its pipeline.
//! Registration order is install order: the JDK is installed before
//! Developer Studio needs it, Vagrant before the CDK plugins.

mod paths;

pub use paths::InstallPaths;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::installables::{
    all_items, CheckComplete, DetectionMap, InstallEnv, InstallError, Installable, ItemKey,
    ItemState, Stage,
};
use crate::services::ProgressSink;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("item {0} is registered twice")]
    DuplicateKey(ItemKey),
}

// ============================================================================
// Item Roots
// ============================================================================

/// Roots of existing installs handed over by the confirmation step.
///
/// `None` means the item is installed into its default target directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemRoots {
    pub virtualbox: Option<PathBuf>,
    pub jdk: Option<PathBuf>,
    pub jbds: Option<PathBuf>,
    pub vagrant: Option<PathBuf>,
    pub cygwin: Option<PathBuf>,
    pub cdk: Option<PathBuf>,
}

impl ItemRoots {
    /// Resolve every root in order: VirtualBox, JDK, JBDS, Vagrant, Cygwin, CDK.
    pub fn resolve(mut root: impl FnMut(ItemKey) -> Option<PathBuf>) -> Self {
        Self {
            virtualbox: root(ItemKey::VirtualBox),
            jdk: root(ItemKey::Jdk),
            jbds: root(ItemKey::Jbds),
            vagrant: root(ItemKey::Vagrant),
            cygwin: root(ItemKey::Cygwin),
            cdk: root(ItemKey::Cdk),
        }
    }

    pub fn get(&self, key: ItemKey) -> Option<&Path> {
        let root = match key {
            ItemKey::VirtualBox => &self.virtualbox,
            ItemKey::Jdk => &self.jdk,
            ItemKey::Jbds => &self.jbds,
            ItemKey::Vagrant => &self.vagrant,
            ItemKey::Cygwin => &self.cygwin,
            ItemKey::Cdk => &self.cdk,
        };
        root.as_deref()
    }
}

// ============================================================================
// Install Report
// ============================================================================

/// Result of one item's pipeline run.
#[derive(Debug, Clone)]
pub struct ItemOutcome {
    pub key: ItemKey,
    pub stage: Stage,
    pub installed_at: Option<PathBuf>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ItemOutcome {
    pub fn succeeded(&self) -> bool {
        self.stage == Stage::Complete
    }
}

#[derive(Debug, Clone, Default)]
pub struct InstallReport {
    pub outcomes: Vec<ItemOutcome>,
}

impl InstallReport {
    pub fn succeeded(&self) -> bool {
        self.outcomes.iter().all(ItemOutcome::succeeded)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }

    pub fn get(&self, key: ItemKey) -> Option<&ItemOutcome> {
        self.outcomes.iter().find(|o| o.key == key)
    }
}

// ============================================================================
// Installer Data
// ============================================================================

pub struct InstallerData {
    env: InstallEnv,
    items: Vec<Box<dyn Installable>>,
}

impl InstallerData {
    /// Registry with every item of the suite.
    pub fn new(env: InstallEnv) -> Self {
        let items = all_items(env.platform, &env.paths);
        Self { env, items }
    }

    /// Registry with the given items, in the given order.
    pub fn with_items(
        env: InstallEnv,
        items: Vec<Box<dyn Installable>>,
    ) -> Result<Self, RegistryError> {
        for (i, item) in items.iter().enumerate() {
            if items[..i].iter().any(|other| other.key() == item.key()) {
                return Err(RegistryError::DuplicateKey(item.key()));
            }
        }
        Ok(Self { env, items })
    }

    pub fn env(&self) -> &InstallEnv {
        &self.env
    }

    pub fn paths(&self) -> &InstallPaths {
        &self.env.paths
    }

    pub fn keys(&self) -> Vec<ItemKey> {
        self.items.iter().map(|item| item.key()).collect()
    }

    pub fn all(&self) -> impl Iterator<Item = &dyn Installable> {
        self.items.iter().map(|item| item.as_ref())
    }

    pub fn get(&self, key: ItemKey) -> Option<&dyn Installable> {
        self.items
            .iter()
            .find(|item| item.key() == key)
            .map(|item| item.as_ref())
    }

    pub fn get_mut(&mut self, key: ItemKey) -> Option<&mut dyn Installable> {
        for item in self.items.iter_mut() {
            if item.key() == key {
                return Some(item.as_mut());
            }
        }
        None
    }

    /// Run detection for one item. `None` if the key is not registered.
    pub async fn detect(
        &mut self,
        key: ItemKey,
        selection: Option<&Path>,
        shared: Option<&mut DetectionMap>,
    ) -> Option<CheckComplete> {
        let env = &self.env;
        let item = self.items.iter_mut().find(|item| item.key() == key)?;
        Some(item.detect_existing_install(env, selection, shared).await)
    }

    /// Take over the roots of existing installs as item target directories.
    pub fn setup(&mut self, roots: &ItemRoots) {
        for key in self.keys() {
            let root = roots.get(key);
            if let Some(root) = root {
                info!("{} - using existing install at {}", key, root.display());
            }
            self.env.paths.set_root(key, root);
        }
    }

    /// Run the pipeline of every selected or already installed item, in
    /// registration order.
    ///
    /// A failing item stops only its own pipeline. Nothing is retried.
    pub async fn install_all<F>(&mut self, mut progress_for: F) -> InstallReport
    where
        F: FnMut(&ItemState) -> Box<dyn ProgressSink>,
    {
        let mut report = InstallReport::default();
        let env = &self.env;

        for item in self.items.iter_mut() {
            let state = item.state();
            if !(state.selected || state.existing_install) {
                continue;
            }

            let key = item.key();
            let progress = progress_for(item.state());
            let started_at = Utc::now();

            let result = run_pipeline(item.as_mut(), env, progress.as_ref()).await;
            let (installed_at, error) = match result {
                Ok(path) => {
                    info!("{} - complete", key);
                    (Some(path), None)
                }
                Err(e) => {
                    error!("{} - pipeline failed: {}", key, e);
                    item.state_mut().fail(&e);
                    (None, Some(e.to_string()))
                }
            };

            report.outcomes.push(ItemOutcome {
                key,
                stage: item.state().stage,
                installed_at,
                error,
                started_at,
                finished_at: Utc::now(),
            });
        }

        let failed = report.failures().count();
        if failed > 0 {
            warn!("{} of {} items failed", failed, report.outcomes.len());
        }
        report
    }
}

/// Download → install → setup for one item.
///
/// With an existing install the first two stages are skipped.
async fn run_pipeline(
    item: &mut dyn Installable,
    env: &InstallEnv,
    progress: &dyn ProgressSink,
) -> Result<PathBuf, InstallError> {
    let path = if item.state().existing_install {
        item.install(env, progress).await?
    } else {
        item.state_mut().advance(Stage::Downloading)?;
        item.download_installer(env, progress).await?;
        item.state_mut().advance(Stage::Installing)?;
        item.install(env, progress).await?
    };

    item.state_mut().advance(Stage::SettingUp)?;
    item.setup(env, progress).await?;
    item.state_mut().advance(Stage::Complete)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::installables::testing::{env_in, env_with, FakeDownloader, FakeUnpacker, ScriptedRunner};
    use crate::installables::{DetectionFailure, Platform};
    use crate::services::NullProgress;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Item whose stages succeed or fail on request and log their calls.
    struct StubItem {
        state: ItemState,
        fail_install: bool,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl StubItem {
        fn boxed(key: ItemKey, env: &InstallEnv, fail_install: bool, log: &Arc<Mutex<Vec<String>>>) -> Box<dyn Installable> {
            let definition = crate::installables::catalog::get_definition(key);
            Box::new(Self {
                state: ItemState::new(definition, env.platform, &env.paths),
                fail_install,
                log: log.clone(),
            })
        }

        fn record(&self, what: &str) {
            self.log.lock().unwrap().push(format!("{}:{}", self.state.key, what));
        }
    }

    #[async_trait]
    impl Installable for StubItem {
        fn state(&self) -> &ItemState {
            &self.state
        }

        fn state_mut(&mut self) -> &mut ItemState {
            &mut self.state
        }

        async fn probe(&self, _env: &InstallEnv, _selection: Option<&Path>) -> Result<PathBuf, DetectionFailure> {
            Err(DetectionFailure::NotFound)
        }

        async fn download_installer(&mut self, _env: &InstallEnv, _progress: &dyn ProgressSink) -> Result<(), InstallError> {
            self.record("download");
            Ok(())
        }

        async fn install(&mut self, env: &InstallEnv, _progress: &dyn ProgressSink) -> Result<PathBuf, InstallError> {
            self.record("install");
            if self.fail_install {
                return Err(InstallError::Setup {
                    key: self.state.key,
                    message: "installer exited".to_string(),
                });
            }
            Ok(env.paths.item_dir(self.state.key))
        }

        async fn setup(&mut self, _env: &InstallEnv, _progress: &dyn ProgressSink) -> Result<(), InstallError> {
            self.record("setup");
            Ok(())
        }
    }

    fn stub_env(dir: &TempDir) -> InstallEnv {
        env_in(dir.path(), Platform::WindowsX64, Arc::new(FakeDownloader::new(b"")))
    }

    #[test]
    fn test_new_registers_every_item_in_order() {
        let dir = TempDir::new().unwrap();
        let data = InstallerData::new(stub_env(&dir));
        assert_eq!(data.keys(), ItemKey::all());
        assert!(data.get(ItemKey::Cdk).is_some());
    }

    #[test]
    fn test_with_items_rejects_duplicates() {
        let dir = TempDir::new().unwrap();
        let env = stub_env(&dir);
        let log = Arc::new(Mutex::new(Vec::new()));
        let items = vec![
            StubItem::boxed(ItemKey::Jdk, &env, false, &log),
            StubItem::boxed(ItemKey::Jdk, &env, false, &log),
        ];
        assert!(matches!(
            InstallerData::with_items(env, items),
            Err(RegistryError::DuplicateKey(ItemKey::Jdk))
        ));
    }

    #[test]
    fn test_setup_records_roots() {
        let dir = TempDir::new().unwrap();
        let mut data = InstallerData::new(stub_env(&dir));
        let roots = ItemRoots {
            jdk: Some(PathBuf::from("/usr/lib/jvm/zulu-8")),
            ..ItemRoots::default()
        };

        data.setup(&roots);

        assert_eq!(data.paths().jdk_dir(), PathBuf::from("/usr/lib/jvm/zulu-8"));
        assert!(data.paths().vagrant_dir().starts_with(&data.paths().install_dir));
    }

    #[test]
    fn test_item_roots_resolve_order() {
        let mut order = Vec::new();
        let roots = ItemRoots::resolve(|key| {
            order.push(key);
            (key == ItemKey::Cdk).then(|| PathBuf::from("/cdk"))
        });
        assert_eq!(
            order,
            vec![
                ItemKey::VirtualBox,
                ItemKey::Jdk,
                ItemKey::Jbds,
                ItemKey::Vagrant,
                ItemKey::Cygwin,
                ItemKey::Cdk
            ]
        );
        assert_eq!(roots.get(ItemKey::Cdk), Some(Path::new("/cdk")));
        assert_eq!(roots.get(ItemKey::Jdk), None);
    }

    #[tokio::test]
    async fn test_detect_unknown_key() {
        let dir = TempDir::new().unwrap();
        let env = stub_env(&dir);
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut data =
            InstallerData::with_items(env.clone(), vec![StubItem::boxed(ItemKey::Jdk, &env, false, &log)]).unwrap();

        assert!(data.detect(ItemKey::Cdk, None, None).await.is_none());
        let done = data.detect(ItemKey::Jdk, None, None).await.unwrap();
        assert!(!done.found);
    }

    #[tokio::test]
    async fn test_install_all_continues_after_failure() {
        let dir = TempDir::new().unwrap();
        let env = stub_env(&dir);
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut data = InstallerData::with_items(
            env.clone(),
            vec![
                StubItem::boxed(ItemKey::Jdk, &env, true, &log),
                StubItem::boxed(ItemKey::Vagrant, &env, false, &log),
            ],
        )
        .unwrap();

        let report = data.install_all(|_| Box::new(NullProgress)).await;

        assert!(!report.succeeded());
        let jdk = report.get(ItemKey::Jdk).unwrap();
        assert_eq!(jdk.stage, Stage::Failed);
        assert!(jdk.error.as_deref().unwrap().contains("installer exited"));
        assert!(report.get(ItemKey::Vagrant).unwrap().succeeded());
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "jdk:download",
                "jdk:install",
                "vagrant:download",
                "vagrant:install",
                "vagrant:setup"
            ]
        );
        assert_eq!(data.get(ItemKey::Jdk).unwrap().state().last_error.as_deref(), jdk.error.as_deref());
    }

    #[tokio::test]
    async fn test_install_all_skips_unselected_and_shortcuts_existing() {
        let dir = TempDir::new().unwrap();
        let env = stub_env(&dir);
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut data = InstallerData::with_items(
            env.clone(),
            vec![
                StubItem::boxed(ItemKey::VirtualBox, &env, false, &log),
                StubItem::boxed(ItemKey::Jdk, &env, false, &log),
            ],
        )
        .unwrap();
        data.get_mut(ItemKey::VirtualBox).unwrap().state_mut().selected = false;
        data.get_mut(ItemKey::Jdk)
            .unwrap()
            .state_mut()
            .mark_found(PathBuf::from("/opt/zulu8"));

        let report = data.install_all(|_| Box::new(NullProgress)).await;

        assert_eq!(report.outcomes.len(), 1);
        assert!(report.succeeded());
        assert_eq!(*log.lock().unwrap(), vec!["jdk:install", "jdk:setup"]);
        assert_eq!(data.get(ItemKey::Jdk).unwrap().state().stage, Stage::Complete);
    }

    #[tokio::test]
    async fn test_install_all_with_real_jdk_and_fallback_artifact() {
        let dir = TempDir::new().unwrap();
        let downloader = Arc::new(FakeDownloader::new(b""));
        let env = env_with(
            dir.path(),
            Platform::WindowsX64,
            Arc::new(ScriptedRunner::new()),
            downloader.clone(),
            Arc::new(FakeUnpacker::with_entries(&["zulu8.40.0.25-jdk8.0.212/"])),
        );
        let mut data = InstallerData::new(env.clone());
        for key in ItemKey::all() {
            data.get_mut(*key).unwrap().state_mut().selected = *key == ItemKey::Jdk;
        }
        let name = data.get(ItemKey::Jdk).unwrap().state().artifact_name.unwrap();
        std::fs::create_dir_all(&env.paths.bundle_dir).unwrap();
        std::fs::write(env.paths.fallback_artifact(name), b"zip").unwrap();

        let report = data.install_all(|_| Box::new(NullProgress)).await;

        assert!(report.succeeded(), "{:?}", report);
        assert_eq!(downloader.calls(), 0);
        assert_eq!(
            report.get(ItemKey::Jdk).unwrap().installed_at.as_deref(),
            Some(env.paths.jdk_dir().as_path())
        );
        assert!(env.paths.jdk_dir().is_dir());
    }
}
