//! Shared directory parameters of an installation run.
//!
//! Every item target lives under the install root unless the confirmation
//! step handed over the root of an existing install:
//!
//! - `{install_dir}/jdk8/`
//! - `{install_dir}/vagrant/`
//! - ...
//!
//! Artifacts are downloaded into `{temp_dir}/` and looked up first in
//! `{bundle_dir}/` for offline distributions.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::installables::catalog::get_definition;
use crate::installables::ItemKey;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPaths {
    pub install_dir: PathBuf,
    pub temp_dir: PathBuf,
    pub bundle_dir: PathBuf,
    roots: BTreeMap<ItemKey, PathBuf>,
}

impl InstallPaths {
    pub fn new(
        install_dir: impl Into<PathBuf>,
        temp_dir: impl Into<PathBuf>,
        bundle_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            install_dir: install_dir.into(),
            temp_dir: temp_dir.into(),
            bundle_dir: bundle_dir.into(),
            roots: BTreeMap::new(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.install_root(),
            settings.temp_dir(),
            settings.bundle_dir(),
        )
    }

    /// Target directory of `key`: the recorded root of an existing install,
    /// or `{install_dir}/{subdir}`.
    pub fn item_dir(&self, key: ItemKey) -> PathBuf {
        self.roots
            .get(&key)
            .cloned()
            .unwrap_or_else(|| self.install_dir.join(get_definition(key).target_subdir))
    }

    pub fn jdk_dir(&self) -> PathBuf {
        self.item_dir(ItemKey::Jdk)
    }

    pub fn vagrant_dir(&self) -> PathBuf {
        self.item_dir(ItemKey::Vagrant)
    }

    pub fn cdk_dir(&self) -> PathBuf {
        self.item_dir(ItemKey::Cdk)
    }

    /// Record the root of an existing install. `None` restores the default.
    pub fn set_root(&mut self, key: ItemKey, root: Option<&Path>) {
        match root {
            Some(root) => {
                self.roots.insert(key, root.to_path_buf());
            }
            None => {
                self.roots.remove(&key);
            }
        }
    }

    /// Download destination for an artifact file name.
    pub fn temp_artifact(&self, file_name: &str) -> PathBuf {
        self.temp_dir.join(file_name)
    }

    /// Pre-staged location of an artifact file name.
    pub fn fallback_artifact(&self, file_name: &str) -> PathBuf {
        self.bundle_dir.join(file_name)
    }
}
