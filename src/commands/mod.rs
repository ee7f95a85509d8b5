//! Top-level command orchestration.

pub mod run;

use anyhow::Result;

use crate::cli::Cli;
use crate::config::Settings;
use crate::dispatch::DispatchOpts;
use crate::inventory::{HostSource, expand_home};
use crate::logging::Log;
use crate::target::Expression;

/// Everything resolved from the command line and settings file before any
/// host is read.
#[derive(Debug)]
pub struct CommandSetup {
    /// Effective settings after loading the settings file.
    pub settings: Settings,
    /// Where hosts come from.
    pub source: HostSource,
    /// Dispatch options with command-line values taking precedence.
    pub opts: DispatchOpts,
}

impl CommandSetup {
    /// Load settings and resolve the host source and dispatch options.
    ///
    /// An invalid target expression is logged and matches no alias, so the
    /// run selects nothing instead of failing. The inventory is still read.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file cannot be read or parsed.
    pub fn init(cli: &Cli, log: &dyn Log) -> Result<Self> {
        let settings = Settings::load(cli.config.as_deref())?;
        Ok(Self::with_settings(cli, settings, log))
    }

    /// Resolve against already-loaded `settings`.
    #[must_use]
    pub fn with_settings(cli: &Cli, settings: Settings, log: &dyn Log) -> Self {
        let source = host_source(cli, &settings, log);
        let opts = DispatchOpts {
            command: cli.cmd.clone().unwrap_or_default(),
            options: settings
                .ssh_options
                .iter()
                .chain(&cli.ssh_options)
                .cloned()
                .collect(),
            parallelism: cli.parallelism.unwrap_or(settings.parallelism),
            dry_run: cli.dry_run,
        };
        Self {
            settings,
            source,
            opts,
        }
    }
}

fn host_source(cli: &Cli, settings: &Settings, log: &dyn Log) -> HostSource {
    if let Some(list) = &cli.list {
        return HostSource::List(expand_home(list));
    }
    let expr = cli.tgt.as_deref().unwrap_or_default();
    let target = Expression::parse(expr)
        .inspect_err(|e| log.error(&format!("Invalid compound target: {expr}: {e}")))
        .ok();
    let hostkey = cli.hostkey.as_ref().unwrap_or(&settings.hostkey);
    HostSource::Inventory {
        path: expand_home(hostkey),
        target,
    }
}
