//! External command execution with timeout protection.
//!
//! Detection probes (`java -version`, `which vagrant`, ...) and vendor
//! installers all go through the [`CommandRunner`] trait so the installable
//! items never spawn processes directly.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, info};

// =============================================================================
// Output / Errors
// =============================================================================

/// Captured output of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Stdout followed by stderr.
    ///
    /// Some tools (notably `java -version`) print their banner on stderr, so
    /// parsers should look at both streams.
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (false, false) => format!("{}\n{}", self.stdout, self.stderr),
            (false, true) => self.stdout.clone(),
            _ => self.stderr.clone(),
        }
    }
}

/// Errors returned by a [`CommandRunner`].
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command timed out after {secs} seconds")]
    TimedOut { secs: u64 },

    #[error("Command failed (exit code: {code}): {stderr}")]
    NonZeroExit { code: i32, stderr: String },
}

impl CommandError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

// =============================================================================
// Runner Trait
// =============================================================================

/// Runs external programs on behalf of the installer.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Launch `program` directly with an argument list.
    async fn execute_file(
        &self,
        program: &Path,
        args: &[String],
        limit: Duration,
    ) -> Result<CommandOutput, CommandError>;

    /// Run a command line through the platform shell.
    async fn execute_command(
        &self,
        command: &str,
        limit: Duration,
    ) -> Result<CommandOutput, CommandError>;
}

/// [`CommandRunner`] backed by `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn execute_file(
        &self,
        program: &Path,
        args: &[String],
        limit: Duration,
    ) -> Result<CommandOutput, CommandError> {
        info!(program = %program.display(), ?args, timeout = limit.as_secs(), "Executing file");
        let mut cmd = Command::new(program);
        cmd.args(args);
        run_with_timeout(cmd, &program.display().to_string(), limit).await
    }

    async fn execute_command(
        &self,
        command: &str,
        limit: Duration,
    ) -> Result<CommandOutput, CommandError> {
        let shell = if cfg!(windows) { "cmd" } else { "sh" };
        let shell_arg = if cfg!(windows) { "/C" } else { "-c" };

        info!(command = %command, timeout = limit.as_secs(), "Executing command");
        let mut cmd = Command::new(shell);
        cmd.arg(shell_arg).arg(command);
        run_with_timeout(cmd, shell, limit).await
    }
}

async fn run_with_timeout(
    mut cmd: Command,
    program: &str,
    limit: Duration,
) -> Result<CommandOutput, CommandError> {
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true);

    // Set headless environment
    cmd.env("TERM", "dumb");
    cmd.env("NO_COLOR", "1");
    cmd.env("CLICOLOR", "0");

    let mut child = cmd.spawn().map_err(|source| CommandError::Spawn {
        program: program.to_string(),
        source,
    })?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let output_future = async {
        let read_stdout = async {
            let mut lines_out = Vec::new();
            if let Some(stdout) = stdout {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    lines_out.push(line);
                }
            }
            lines_out
        };
        let read_stderr = async {
            let mut lines_out = Vec::new();
            if let Some(stderr) = stderr {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    lines_out.push(line);
                }
            }
            lines_out
        };

        // Drain both pipes together so a chatty stderr cannot block stdout.
        let (stdout_lines, stderr_lines) = tokio::join!(read_stdout, read_stderr);
        let exit_status = child.wait().await;
        (stdout_lines, stderr_lines, exit_status)
    };

    match timeout(limit, output_future).await {
        Ok((stdout_lines, stderr_lines, exit_status)) => {
            let code = exit_status.map(|s| s.code().unwrap_or(-1)).unwrap_or(-1);
            let output = CommandOutput::new(stdout_lines.join("\n"), stderr_lines.join("\n"));
            debug!(program, code, "Command finished");

            if code == 0 {
                Ok(output)
            } else {
                Err(CommandError::NonZeroExit {
                    code,
                    stderr: output.stderr,
                })
            }
        }
        // kill_on_drop reaps the child when it goes out of scope here.
        Err(_) => Err(CommandError::TimedOut {
            secs: limit.as_secs(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_output() {
        assert_eq!(CommandOutput::new("out", "").combined(), "out");
        assert_eq!(CommandOutput::new("", "err").combined(), "err");
        assert_eq!(CommandOutput::new("out", "err").combined(), "out\nerr");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_command_echo() {
        let output = ProcessRunner
            .execute_command("echo hello", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(output.stdout, "hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_command_captures_stderr() {
        let output = ProcessRunner
            .execute_command("echo error >&2", Duration::from_secs(5))
            .await
            .unwrap();
        assert!(output.stdout.is_empty());
        assert_eq!(output.stderr, "error");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_command_exit_code() {
        let err = ProcessRunner
            .execute_command("exit 42", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::NonZeroExit { code: 42, .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_command_times_out() {
        let err = ProcessRunner
            .execute_command("sleep 5", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_file_with_args() {
        let output = ProcessRunner
            .execute_file(
                Path::new("sh"),
                &["-c".to_string(), "echo $0".to_string(), "probe".to_string()],
                Duration::from_secs(5),
            )
            .await
            .unwrap();
        assert_eq!(output.stdout, "probe");
    }

    #[tokio::test]
    async fn test_execute_file_missing_program() {
        let err = ProcessRunner
            .execute_file(
                Path::new("/nonexistent/definitely-not-a-program"),
                &[],
                Duration::from_secs(2),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
    }
}
