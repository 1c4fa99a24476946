// ABOUTME: Local process execution for the external toolchains.
// ABOUTME: Runs kubectl, docker and git with bounded timeouts and captured output.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Errors from launching or waiting on an external process.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("I/O error while running {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Output from a finished process.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code, `None` if the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Case-insensitive search in stderr.
    pub fn stderr_contains(&self, needle: &str) -> bool {
        self.stderr
            .to_lowercase()
            .contains(&needle.to_lowercase())
    }

    /// Trimmed stderr, falling back to stdout when stderr is empty.
    pub fn failure_message(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// An external command-line tool.
#[derive(Debug, Clone)]
pub struct Tool {
    program: PathBuf,
    timeout: Duration,
    current_dir: Option<PathBuf>,
}

impl Tool {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: Duration::from_secs(60),
            current_dir: None,
        }
    }

    /// Default timeout for invocations of this tool.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    pub async fn run<I, S>(&self, args: I) -> Result<CommandOutput, ProcessError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.execute(collect_args(args), None, self.timeout).await
    }

    pub async fn run_with_timeout<I, S>(
        &self,
        args: I,
        timeout: Duration,
    ) -> Result<CommandOutput, ProcessError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.execute(collect_args(args), None, timeout).await
    }

    /// Run with `input` written to the child's stdin, then closed.
    pub async fn run_with_stdin<I, S>(
        &self,
        args: I,
        input: &str,
    ) -> Result<CommandOutput, ProcessError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.execute(collect_args(args), Some(input), self.timeout)
            .await
    }

    async fn execute(
        &self,
        args: Vec<OsString>,
        input: Option<&str>,
        timeout: Duration,
    ) -> Result<CommandOutput, ProcessError> {
        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(ref dir) = self.current_dir {
            command.current_dir(dir);
        }

        tracing::debug!(program = %self.program.display(), ?args, "running command");

        let mut child = command.spawn().map_err(|source| ProcessError::Spawn {
            program: self.name(),
            source,
        })?;

        if let Some(input) = input
            && let Some(mut stdin) = child.stdin.take()
        {
            stdin
                .write_all(input.as_bytes())
                .await
                .map_err(|source| ProcessError::Io {
                    program: self.name(),
                    source,
                })?;
        }

        // Dropping the child on timeout kills it.
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|source| ProcessError::Io {
                program: self.name(),
                source,
            })?,
            Err(_) => {
                tracing::warn!(program = %self.program.display(), ?timeout, "command timed out");
                return Err(ProcessError::Timeout {
                    program: self.name(),
                    timeout,
                });
            }
        };

        let result = CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        tracing::debug!(
            program = %self.program.display(),
            exit_code = ?result.exit_code,
            "command finished"
        );

        Ok(result)
    }
}

fn collect_args<I, S>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    args.into_iter().map(|a| a.as_ref().to_os_string()).collect()
}
