#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::wildcard_imports,
    clippy::indexing_slicing
)]
//! Integration tests for the `run` command: selection followed by dispatch.
//!
//! A [`RecordingShell`](common::RecordingShell) stands in for `ssh`, so
//! these tests verify that:
//! - each selected host is contacted exactly once
//! - dry-run contacts no host but still accounts for every one
//! - a failing host is reported without stopping the others
//! - settings-file options precede command-line connection options

mod common;

use tgt::commands::run::execute;
use tgt::logging::HostStatus;

#[test]
fn every_selected_host_is_contacted_once() {
    let ctx = common::IntegrationTestContext::new();
    let log = common::logger();
    let setup = ctx.setup(&["--tgt", "web*", "--cmd", "uptime", "--parallelism", "2"], &log);
    let shell = common::RecordingShell::new();

    let report = execute(&setup, &shell, &log).unwrap();

    assert_eq!(report.ok, 4);
    assert_eq!(shell.hosts(), vec!["web01", "web01b", "web01c", "web02"]);
    assert!(shell.calls().iter().all(|(_, cmd, _)| cmd == "uptime"));
}

#[test]
fn dry_run_contacts_no_host() {
    let ctx = common::IntegrationTestContext::new();
    let log = common::logger();
    let setup = ctx.setup(&["--tgt", "db* or mail*", "--dry-run"], &log);
    let shell = common::RecordingShell::new();

    let report = execute(&setup, &shell, &log).unwrap();

    assert!(shell.calls().is_empty());
    assert_eq!(report.dry_run, 2);
    assert_eq!(log.count(HostStatus::DryRun), 2);
}

#[test]
fn failing_host_does_not_stop_the_rest() {
    let ctx = common::IntegrationTestContext::new();
    let log = common::logger();
    let setup = ctx.setup(&["--tgt", "web*", "--cmd", "false", "--parallelism", "1"], &log);
    let shell = common::RecordingShell::failing_on(&["web01b"]);

    let report = execute(&setup, &shell, &log).unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.ok, 3);
    let failed: Vec<_> = log
        .host_entries()
        .into_iter()
        .filter(|e| e.status == HostStatus::Failed)
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].host, "web01b");
    assert_eq!(failed[0].message.as_deref(), Some("exit 1"));
}

#[test]
fn settings_options_come_before_cli_options() {
    let ctx = common::TestContextBuilder::new()
        .with_inventory(common::INVENTORY)
        .with_settings("parallelism = 3\nssh_options = [\"-o\", \"BatchMode=yes\"]\n")
        .build();
    let log = common::logger();
    let setup = ctx.setup(&["--tgt", "mail01", "--cmd", "hostname", "-p", "2222"], &log);
    assert_eq!(setup.opts.parallelism.get(), 3);
    let shell = common::RecordingShell::new();

    execute(&setup, &shell, &log).unwrap();

    let calls = shell.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "mail01");
    assert_eq!(calls[0].2, vec!["-o", "BatchMode=yes", "-p", "2222"]);
}

#[test]
fn invalid_expression_runs_nothing_and_succeeds() {
    let ctx = common::IntegrationTestContext::new();
    let log = common::logger();
    let setup = ctx.setup(&["--tgt", "web* or", "--cmd", "uptime"], &log);
    let shell = common::RecordingShell::new();

    let report = execute(&setup, &shell, &log).unwrap();

    assert_eq!(report.total(), 0);
    assert!(shell.calls().is_empty());
}

#[test]
fn invalid_expression_with_missing_inventory_is_fatal() {
    let ctx = common::TestContextBuilder::new().build();
    let log = common::logger();
    let setup = ctx.setup(&["--tgt", "and", "--cmd", "uptime"], &log);
    let shell = common::RecordingShell::new();

    assert!(execute(&setup, &shell, &log).is_err());
    assert!(shell.calls().is_empty());
}

#[test]
fn built_in_defaults_apply_without_settings() {
    let ctx = common::IntegrationTestContext::new();
    let log = common::logger();
    let setup = ctx.setup(&["--tgt", "web*", "--cmd", "uptime"], &log);

    assert_eq!(setup.opts.parallelism, tgt::config::DEFAULT_PARALLELISM);
    assert_eq!(setup.settings.ssh_program, "ssh");
    assert!(setup.opts.options.is_empty());
}

#[test]
fn host_list_hosts_are_dispatched() {
    let ctx = common::TestContextBuilder::new()
        .with_host_list("a.example\nb.example\na.example\n")
        .build();
    let list = ctx.host_list().display().to_string();
    let log = common::logger();
    let setup = ctx.setup(&["--list", &list, "--cmd", "id"], &log);
    let shell = common::RecordingShell::new();

    let report = execute(&setup, &shell, &log).unwrap();

    assert_eq!(report.ok, 2);
    assert_eq!(shell.hosts(), vec!["a.example", "b.example"]);
}
