//! Scripted collaborators for unit tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::item::InstallEnv;
use super::types::Platform;
use crate::registry::InstallPaths;
use crate::runner::{CommandError, CommandOutput, CommandRunner};
use crate::services::{Downloader, DownloadProgress, ProgressSink, Unpacker};

// ============================================================================
// Runner
// ============================================================================

#[derive(Debug, Clone)]
pub enum Scripted {
    Output(CommandOutput),
    Exit(i32),
    Timeout,
    /// Never completes.
    Hang,
}

/// Answers commands from a script keyed by the full command line.
///
/// Unscripted commands fail to spawn, like a missing program.
#[derive(Default)]
pub struct ScriptedRunner {
    script: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, command: &str, response: Scripted) -> Self {
        self.script
            .lock()
            .unwrap()
            .insert(command.to_string(), response);
        self
    }

    pub fn stdout(self, command: &str, stdout: &str) -> Self {
        self.on(command, Scripted::Output(CommandOutput::new(stdout, "")))
    }

    pub fn stderr(self, command: &str, stderr: &str) -> Self {
        self.on(command, Scripted::Output(CommandOutput::new("", stderr)))
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn respond(&self, line: String, limit: Duration) -> Result<CommandOutput, CommandError> {
        self.calls.lock().unwrap().push(line.clone());
        let response = self.script.lock().unwrap().get(&line).cloned();

        match response {
            Some(Scripted::Output(output)) => Ok(output),
            Some(Scripted::Exit(code)) => Err(CommandError::NonZeroExit {
                code,
                stderr: String::new(),
            }),
            Some(Scripted::Timeout) => Err(CommandError::TimedOut {
                secs: limit.as_secs(),
            }),
            Some(Scripted::Hang) => std::future::pending().await,
            None => Err(CommandError::Spawn {
                program: line,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not scripted"),
            }),
        }
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn execute_file(
        &self,
        program: &Path,
        args: &[String],
        limit: Duration,
    ) -> Result<CommandOutput, CommandError> {
        let mut line = program.display().to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        self.respond(line, limit).await
    }

    async fn execute_command(
        &self,
        command: &str,
        limit: Duration,
    ) -> Result<CommandOutput, CommandError> {
        self.respond(command.to_string(), limit).await
    }
}

// ============================================================================
// Downloader
// ============================================================================

/// Writes fixed content and counts transfers.
pub struct FakeDownloader {
    content: Vec<u8>,
    fail: bool,
    calls: AtomicUsize,
}

impl FakeDownloader {
    pub fn new(content: &[u8]) -> Self {
        Self {
            content: content.to_vec(),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(b"partial")
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Downloader for FakeDownloader {
    async fn download(
        &self,
        _url: &str,
        dest: &mut (dyn AsyncWrite + Unpin + Send),
        _expected_sha256: Option<&str>,
        size_hint: Option<u64>,
        progress: &dyn ProgressSink,
    ) -> Result<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        dest.write_all(&self.content).await?;
        dest.flush().await?;
        if self.fail {
            anyhow::bail!("connection reset");
        }
        progress.set_progress(&DownloadProgress::new(self.content.len() as u64, size_hint));
        Ok(self.content.len() as u64)
    }
}

// ============================================================================
// Unpacker
// ============================================================================

/// Pretends to unpack by creating the given top-level entries.
///
/// Names ending in `/` become directories, everything else an empty file.
#[derive(Default)]
pub struct FakeUnpacker {
    entries: Vec<String>,
    calls: AtomicUsize,
}

impl FakeUnpacker {
    pub fn with_entries(entries: &[&str]) -> Self {
        Self {
            entries: entries.iter().map(|e| e.to_string()).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Unpacker for FakeUnpacker {
    async fn unpack(&self, archive: &Path, dest_dir: &Path) -> Result<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !archive.exists() {
            anyhow::bail!("archive {} does not exist", archive.display());
        }
        std::fs::create_dir_all(dest_dir)?;
        for entry in &self.entries {
            match entry.strip_suffix('/') {
                Some(dir) => std::fs::create_dir_all(dest_dir.join(dir))?,
                None => std::fs::write(dest_dir.join(entry), b"")?,
            }
        }
        Ok(dest_dir.to_path_buf())
    }
}

// ============================================================================
// Progress
// ============================================================================

#[derive(Default)]
pub struct RecordingProgress {
    statuses: Mutex<Vec<String>>,
    complete: AtomicBool,
}

impl RecordingProgress {
    pub fn statuses(&self) -> Vec<String> {
        self.statuses.lock().unwrap().clone()
    }

    pub fn completed(&self) -> bool {
        self.complete.load(Ordering::SeqCst)
    }
}

impl ProgressSink for RecordingProgress {
    fn set_status(&self, status: &str) {
        self.statuses.lock().unwrap().push(status.to_string());
    }

    fn set_complete(&self) {
        self.complete.store(true, Ordering::SeqCst);
    }
}

// ============================================================================
// Environment
// ============================================================================

pub fn paths_in(root: &Path) -> InstallPaths {
    InstallPaths::new(root.join("install"), root.join("temp"), root.join("bundle"))
}

pub fn env_with(
    root: &Path,
    platform: Platform,
    runner: Arc<ScriptedRunner>,
    downloader: Arc<FakeDownloader>,
    unpacker: Arc<FakeUnpacker>,
) -> InstallEnv {
    InstallEnv {
        paths: paths_in(root),
        platform,
        runner,
        downloader,
        unpacker,
        probe_timeout: Duration::from_secs(2),
        installer_timeout: Duration::from_secs(60),
    }
}

pub fn env_in(root: &Path, platform: Platform, downloader: Arc<FakeDownloader>) -> InstallEnv {
    env_with(
        root,
        platform,
        Arc::new(ScriptedRunner::new()),
        downloader,
        Arc::new(FakeUnpacker::default()),
    )
}
