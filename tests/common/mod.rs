// Shared helpers for integration tests.
//
// Provides a temporary directory holding inventory, host-list and settings
// fixtures, plus a recording remote shell so dispatch can be exercised
// without contacting any host.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use clap::Parser as _;
use tgt::cli::Cli;
use tgt::commands::CommandSetup;
use tgt::exec::{ExecResult, RemoteShell};
use tgt::logging::Logger;

/// Inventory in `known_hosts` layout used by most tests.
pub const INVENTORY: &str = "\
# fleet inventory
web01,web01b ssh-ed25519 AAAAC3Nza
web01c ssh-ed25519 AAAAC3Nzb
web01 ssh-rsa AAAAB3Nzc
web02,10.0.0.2 ssh-ed25519 AAAAC3Nzd
db01,10.0.1.1 ssh-ed25519 AAAAC3Nze
|1|c2FsdA==|aGFzaA== ssh-ed25519 AAAAC3Nzf
@cert-authority *.corp ssh-rsa AAAAB3Nzg
mail01 ssh-ed25519 AAAAC3Nzh
";

/// An isolated set of input files backed by a [`tempfile::TempDir`].
pub struct IntegrationTestContext {
    /// Temporary directory containing the fixtures.
    pub root: tempfile::TempDir,
}

impl IntegrationTestContext {
    /// Create a context whose `known_hosts` holds [`INVENTORY`].
    pub fn new() -> Self {
        TestContextBuilder::new().with_inventory(INVENTORY).build()
    }

    /// Path of the inventory file.
    pub fn inventory(&self) -> PathBuf {
        self.root.path().join("known_hosts")
    }

    /// Path of the host list file.
    pub fn host_list(&self) -> PathBuf {
        self.root.path().join("hosts.txt")
    }

    /// Path of the settings file; empty unless a test writes settings.
    pub fn settings(&self) -> PathBuf {
        self.root.path().join("config.toml")
    }

    /// Parse `args` (after the program name), pointing `--hostkey` and
    /// `--config` at this context's files, and resolve a [`CommandSetup`].
    pub fn setup(&self, args: &[&str], log: &Logger) -> CommandSetup {
        let hostkey = self.inventory();
        let config = self.settings();
        let mut argv: Vec<String> = vec![
            "tgt".into(),
            "--hostkey".into(),
            hostkey.display().to_string(),
            "--config".into(),
            config.display().to_string(),
        ];
        argv.extend(args.iter().map(ToString::to_string));
        let cli = Cli::parse_from(argv);
        CommandSetup::init(&cli, log).expect("resolve command setup")
    }
}

/// Fluent builder for [`IntegrationTestContext`].
pub struct TestContextBuilder {
    ctx: IntegrationTestContext,
}

impl TestContextBuilder {
    /// Begin building a context holding only an empty settings file, so
    /// the user's own settings never leak into a test.
    pub fn new() -> Self {
        Self {
            ctx: IntegrationTestContext {
                root: tempfile::tempdir().expect("create temp dir"),
            },
        }
        .write("config.toml", "")
    }

    fn write(self, name: &str, content: &str) -> Self {
        std::fs::write(self.ctx.root.path().join(name), content).expect("write fixture");
        self
    }

    /// Write the `known_hosts` inventory.
    pub fn with_inventory(self, content: &str) -> Self {
        self.write("known_hosts", content)
    }

    /// Write the `hosts.txt` host list.
    pub fn with_host_list(self, content: &str) -> Self {
        self.write("hosts.txt", content)
    }

    /// Write the `config.toml` settings file.
    pub fn with_settings(self, content: &str) -> Self {
        self.write("config.toml", content)
    }

    /// Finish building and return the configured context.
    pub fn build(self) -> IntegrationTestContext {
        self.ctx
    }
}

/// A logger with no log file; events go to whatever subscriber is active.
pub fn logger() -> Arc<Logger> {
    Arc::new(Logger::new(None))
}

/// A [`RemoteShell`] that records every call and never spawns a process.
#[derive(Debug, Default)]
pub struct RecordingShell {
    calls: Mutex<Vec<(String, String, Vec<String>)>>,
    failing: HashSet<String>,
}

impl RecordingShell {
    /// Succeed on every host.
    pub fn new() -> Self {
        Self::default()
    }

    /// Exit with status 1 on each of `hosts`.
    pub fn failing_on(hosts: &[&str]) -> Self {
        Self {
            failing: hosts.iter().map(ToString::to_string).collect(),
            ..Self::default()
        }
    }

    /// Hosts `execute` was called for, sorted.
    pub fn hosts(&self) -> Vec<String> {
        let mut hosts: Vec<String> = self
            .calls
            .lock()
            .unwrap()
            .iter()
            .map(|(host, _, _)| host.clone())
            .collect();
        hosts.sort();
        hosts
    }

    /// Every recorded `(host, command, options)` call.
    pub fn calls(&self) -> Vec<(String, String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

impl RemoteShell for RecordingShell {
    fn execute(&self, host: &str, command: &str, options: &[String]) -> anyhow::Result<ExecResult> {
        self.calls
            .lock()
            .unwrap()
            .push((host.to_string(), command.to_string(), options.to_vec()));
        let success = !self.failing.contains(host);
        Ok(ExecResult {
            stdout: format!("{host}: {command}\n"),
            stderr: if success { String::new() } else { "boom\n".to_string() },
            success,
            code: Some(i32::from(!success)),
        })
    }

    fn describe(&self, host: &str, command: &str, options: &[String]) -> Vec<String> {
        std::iter::once("ssh".to_string())
            .chain(options.iter().cloned())
            .chain([host.to_string(), command.to_string()])
            .collect()
    }
}
