//! Pipeline steps shared by several items.

use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use super::error::InstallError;
use super::item::{InstallEnv, ItemState};
use super::types::ItemKey;
use crate::runner::CommandError;
use crate::services::ProgressSink;

/// Download the item's artifact, or adopt a pre-staged copy.
///
/// Only the bundle directory is checked for an existing artifact. A file
/// already sitting at the temp path is overwritten.
pub(crate) async fn fetch_artifact(
    state: &mut ItemState,
    env: &InstallEnv,
    progress: &dyn ProgressSink,
) -> Result<(), InstallError> {
    let key = state.key;
    progress.set_status("Downloading");

    if state.existing_install {
        progress.set_complete();
        return Ok(());
    }

    let (Some(url), Some(file_name)) = (state.download_url, state.artifact_name) else {
        return Err(InstallError::UnsupportedPlatform {
            key,
            platform: env.platform,
        });
    };

    let fallback = env.paths.fallback_artifact(file_name);
    if tokio::fs::try_exists(&fallback).await.unwrap_or(false) {
        info!("{} - using pre-staged artifact {}", key, fallback.display());
        state.artifact_path = Some(fallback);
        progress.set_complete();
        return Ok(());
    }

    let dest = env.paths.temp_artifact(file_name);
    tokio::fs::create_dir_all(&env.paths.temp_dir)
        .await
        .map_err(|source| InstallError::Io {
            key,
            context: format!("cannot create {}", env.paths.temp_dir.display()),
            source,
        })?;

    let mut file = tokio::fs::File::create(&dest)
        .await
        .map_err(|source| InstallError::Io {
            key,
            context: format!("cannot create {}", dest.display()),
            source,
        })?;

    let result = env
        .downloader
        .download(
            url,
            &mut file,
            state.sha256,
            Some(state.size_estimate),
            progress,
        )
        .await;
    drop(file);

    match result {
        Ok(bytes) => {
            info!("{} - downloaded {} bytes to {}", key, bytes, dest.display());
            state.artifact_path = Some(dest);
            progress.set_complete();
            Ok(())
        }
        Err(source) => {
            error!("{} - download failed: {:#}", key, source);
            let _ = tokio::fs::remove_file(&dest).await;
            Err(InstallError::Transfer { key, source })
        }
    }
}

/// The fetched artifact, or an error if download has not run.
pub(crate) fn artifact(state: &ItemState) -> Result<&Path, InstallError> {
    state
        .artifact_path
        .as_deref()
        .ok_or_else(|| InstallError::Setup {
            key: state.key,
            message: "no artifact to install".to_string(),
        })
}

/// Names of the immediate children of `dir`, in listing order.
pub(crate) async fn list_entries(key: ItemKey, dir: &Path) -> Result<Vec<String>, InstallError> {
    let list_error = |source| InstallError::ListDirectory {
        key,
        dir: dir.to_path_buf(),
        source,
    };

    let mut reader = tokio::fs::read_dir(dir).await.map_err(list_error)?;
    let mut names = Vec::new();
    while let Some(entry) = reader.next_entry().await.map_err(list_error)? {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    Ok(names)
}

/// First name starting with `prefix`, in listing order.
///
/// Listing order is filesystem dependent, so with several matches the
/// result is not stable across platforms.
pub fn find_entry_by_prefix<'a>(names: &'a [String], prefix: &str) -> Option<&'a str> {
    names
        .iter()
        .map(String::as_str)
        .find(|name| name.starts_with(prefix))
}

pub(crate) async fn rename_entry(key: ItemKey, from: &Path, to: &Path) -> Result<(), InstallError> {
    info!("{} - rename {} to {}", key, from.display(), to.display());

    if let Some(parent) = to.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| InstallError::Io {
                key,
                context: format!("cannot create {}", parent.display()),
                source,
            })?;
    }

    tokio::fs::rename(from, to).await.map_err(|source| {
        error!("{} - {}", key, source);
        InstallError::Rename {
            key,
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source,
        }
    })
}

/// Unpack the artifact into the install directory and move the top-level
/// folder whose name starts with `prefix` to `target`.
///
/// Archive top-level folder names change between releases, hence the
/// prefix lookup. Whatever an earlier install left at `target` is replaced.
pub(crate) async fn unpack_and_rename(
    state: &ItemState,
    env: &InstallEnv,
    prefix: &str,
    target: &Path,
) -> Result<PathBuf, InstallError> {
    let key = state.key;
    let archive = artifact(state)?;
    let install_dir = &env.paths.install_dir;

    env.unpacker
        .unpack(archive, install_dir)
        .await
        .map_err(|source| {
            error!("{} - {:#}", key, source);
            InstallError::Extraction { key, source }
        })?;

    // A previous install may have left `target` behind, and its name can
    // share the prefix
    let target_name = target.file_name().map(|n| n.to_string_lossy().into_owned());
    let names: Vec<String> = list_entries(key, install_dir)
        .await?
        .into_iter()
        .filter(|name| Some(name) != target_name.as_ref())
        .collect();
    let name = find_entry_by_prefix(&names, prefix).ok_or_else(|| {
        error!("{} - no entry starting with '{}'", key, prefix);
        InstallError::NoMatchingEntry {
            key,
            prefix: prefix.to_string(),
            dir: install_dir.clone(),
        }
    })?;

    let source = install_dir.join(name);
    remove_stale_target(key, target).await?;
    rename_entry(key, &source, target).await?;
    Ok(target.to_path_buf())
}

/// Delete what an earlier install left at `target`.
async fn remove_stale_target(key: ItemKey, target: &Path) -> Result<(), InstallError> {
    let metadata = match tokio::fs::symlink_metadata(target).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(source) => {
            return Err(InstallError::Io {
                key,
                context: format!("cannot inspect {}", target.display()),
                source,
            })
        }
    };

    warn!("{} - replacing previous install at {}", key, target.display());
    let removed = if metadata.is_dir() {
        tokio::fs::remove_dir_all(target).await
    } else {
        tokio::fs::remove_file(target).await
    };
    removed.map_err(|source| InstallError::Io {
        key,
        context: format!("cannot remove {}", target.display()),
        source,
    })
}

/// Map a runner failure to an install error for `action`.
pub(crate) fn command_failed(key: ItemKey, action: &str) -> impl FnOnce(CommandError) -> InstallError + '_ {
    move |source| {
        error!("{} - {} failed: {}", key, action, source);
        InstallError::Command {
            key,
            action: action.to_string(),
            source,
        }
    }
}
