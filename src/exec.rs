//! Remote command execution.
//!
//! The dispatcher only depends on the [`RemoteShell`] trait; [`Ssh`] is the
//! production implementation that shells out to an `ssh`-compatible client.
use anyhow::{Context as _, Result};
use std::process::{Command, Output};

/// Result of a command execution.
#[derive(Debug, Clone, Default)]
pub struct ExecResult {
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Exit code, or `None` if the process was killed by a signal.
    pub code: Option<i32>,
}

impl ExecResult {
    /// Exit code for display; `-1` when the process had none.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.code.unwrap_or(-1)
    }
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

/// Capability to run one command on one remote host.
///
/// Implementations must be shareable across the dispatcher's worker threads.
#[cfg_attr(test, mockall::automock)]
pub trait RemoteShell: Send + Sync {
    /// Run `command` on `host`, passing `options` to the connection layer.
    ///
    /// A non-zero remote exit status is reported through
    /// [`ExecResult::success`], not as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote shell itself cannot be launched.
    fn execute(&self, host: &str, command: &str, options: &[String]) -> Result<ExecResult>;

    /// The argument vector [`execute`](Self::execute) would run, for logging.
    fn describe(&self, host: &str, command: &str, options: &[String]) -> Vec<String>;
}

/// Runs commands through an external `ssh`-style client.
///
/// Invokes `<program> <options...> <host> <command>` and captures both
/// output streams.
#[derive(Debug, Clone)]
pub struct Ssh {
    program: String,
}

impl Ssh {
    /// Use `program` (normally `ssh`) as the remote shell client.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for Ssh {
    fn default() -> Self {
        Self::new("ssh")
    }
}

impl RemoteShell for Ssh {
    fn execute(&self, host: &str, command: &str, options: &[String]) -> Result<ExecResult> {
        let output = Command::new(&self.program)
            .args(options)
            .arg(host)
            .arg(command)
            .output()
            .with_context(|| format!("failed to execute: {}", self.program))?;
        Ok(ExecResult::from(output))
    }

    fn describe(&self, host: &str, command: &str, options: &[String]) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(options.iter().cloned())
            .chain([host.to_string(), command.to_string()])
            .collect()
    }
}
