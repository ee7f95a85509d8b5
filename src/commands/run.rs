//! The `tgt` run: select hosts and dispatch the command to them.

use std::sync::Arc;

use anyhow::Result;

use super::CommandSetup;
use crate::cli::Cli;
use crate::dispatch::{self, DispatchReport};
use crate::exec::{RemoteShell, Ssh};
use crate::logging::Logger;

/// Select hosts and run the command on each of them.
///
/// Per-host failures are reported in the summary and never make this
/// function fail.
///
/// # Errors
///
/// Returns an error if the settings file, inventory, or host list cannot be
/// read, or if the worker pool cannot be started.
pub fn run(cli: &Cli, log: &Arc<Logger>) -> Result<()> {
    let setup = CommandSetup::init(cli, &**log)?;
    let shell = Ssh::new(setup.settings.ssh_program.clone());
    execute(&setup, &shell, log)?;
    log.print_summary();
    Ok(())
}

/// Select hosts from `setup.source` and dispatch through `shell`.
///
/// # Errors
///
/// Returns an error if the host source cannot be read or the worker pool
/// cannot be started.
pub fn execute(
    setup: &CommandSetup,
    shell: &dyn RemoteShell,
    log: &Arc<Logger>,
) -> Result<DispatchReport> {
    log.stage("Selecting hosts");
    let hosts = setup.source.select()?;
    log.info(&format!(
        "{} hosts selected from {}",
        hosts.len(),
        setup.source.path().display()
    ));
    if hosts.is_empty() {
        log.warn("no hosts selected");
        return Ok(DispatchReport::default());
    }

    if setup.opts.dry_run {
        log.stage(&format!("Previewing on {} hosts", hosts.len()));
    } else {
        log.stage(&format!("Running `{}` on {} hosts", setup.opts.command, hosts.len()));
    }
    let report = dispatch::dispatch(&hosts, &setup.opts, shell, log)?;
    log.debug(&format!(
        "{} ok, {} failed, {} dry-run",
        report.ok, report.failed, report.dry_run
    ));
    Ok(report)
}
