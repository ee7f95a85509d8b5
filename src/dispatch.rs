//! Bounded concurrent dispatch of one remote command to many hosts.
//!
//! Every selected host becomes one task on a dedicated [`rayon`] pool of
//! exactly `parallelism` workers, so no more than that many remote commands
//! are ever in flight. Each task buffers its output and flushes it as one
//! block when it finishes. A failing host never affects its siblings.
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use crate::error::DispatchError;
use crate::exec::RemoteShell;
use crate::logging::{BufferedLog, HostStatus, Log, Logger};

/// What to run and how.
#[derive(Debug, Clone)]
pub struct DispatchOpts {
    /// Command line executed on every host.
    pub command: String,
    /// Connection options passed to the remote shell.
    pub options: Vec<String>,
    /// Maximum number of hosts contacted at once.
    pub parallelism: NonZeroUsize,
    /// Log the invocation for each host instead of running it.
    pub dry_run: bool,
}

/// Outcome counts for a completed dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Hosts where the command exited zero.
    pub ok: usize,
    /// Hosts where the command exited non-zero or could not be launched.
    pub failed: usize,
    /// Hosts skipped because of dry-run mode.
    pub dry_run: usize,
}

impl DispatchReport {
    fn tally(&mut self, status: HostStatus) {
        match status {
            HostStatus::Ok => self.ok += 1,
            HostStatus::Failed => self.failed += 1,
            HostStatus::DryRun => self.dry_run += 1,
        }
    }

    /// Number of hosts processed.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.ok + self.failed + self.dry_run
    }
}

/// Run `opts.command` on every host and wait for all of them.
///
/// Returns once every task has finished, whatever its outcome.
///
/// # Errors
///
/// Returns [`DispatchError::Pool`] if the worker pool cannot be created.
pub fn dispatch(
    hosts: &[String],
    opts: &DispatchOpts,
    shell: &dyn RemoteShell,
    log: &Arc<Logger>,
) -> Result<DispatchReport, DispatchError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.parallelism.get())
        .thread_name(|i| format!("tgt-worker-{i}"))
        .build()?;
    tracing::debug!(
        "dispatching to {} hosts, {} at a time",
        hosts.len(),
        opts.parallelism
    );

    // Workers inherit the caller's subscriber.
    let subscriber = tracing::dispatcher::get_default(Clone::clone);
    let report = Mutex::new(DispatchReport::default());

    pool.scope(|s| {
        for host in hosts {
            let subscriber = &subscriber;
            let report = &report;
            s.spawn(move |_| {
                let status =
                    tracing::dispatcher::with_default(subscriber, || run_host(host, opts, shell, log));
                report
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .tally(status);
            });
        }
    });

    Ok(report
        .into_inner()
        .unwrap_or_else(std::sync::PoisonError::into_inner))
}

/// One dispatch task: execute against `host` with buffered output.
fn run_host(
    host: &str,
    opts: &DispatchOpts,
    shell: &dyn RemoteShell,
    log: &Arc<Logger>,
) -> HostStatus {
    log.notify_host_start(host);
    let buf = BufferedLog::new(Arc::clone(log));
    let status = execute_host(host, opts, shell, &buf);
    buf.flush_and_complete(host);
    status
}

/// Execute (or preview) the command on `host`, log its output, and record
/// the result.
///
/// Exit zero logs stdout; non-zero logs stderr. Every line is tagged with
/// the host and exit code.
fn execute_host(
    host: &str,
    opts: &DispatchOpts,
    shell: &dyn RemoteShell,
    log: &dyn Log,
) -> HostStatus {
    if opts.dry_run {
        let argv = shell.describe(host, &opts.command, &opts.options);
        log.dry_run(&format!("{host}: would run: {}", argv.join(" ")));
        log.record_host(host, HostStatus::DryRun, None);
        return HostStatus::DryRun;
    }

    log.debug(&format!("{host}: running {}", opts.command));
    match shell.execute(host, &opts.command, &opts.options) {
        Ok(result) if result.success => {
            emit_lines(host, 0, &result.stdout, |line| log.info(line));
            log.record_host(host, HostStatus::Ok, None);
            HostStatus::Ok
        }
        Ok(result) => {
            let code = result.exit_code();
            emit_lines(host, code, &result.stderr, |line| log.error(line));
            log.record_host(host, HostStatus::Failed, Some(&format!("exit {code}")));
            HostStatus::Failed
        }
        Err(e) => {
            log.error(&format!("{host}: {e:#}"));
            log.record_host(host, HostStatus::Failed, Some(&e.to_string()));
            HostStatus::Failed
        }
    }
}

/// Emit `{host} [{code}]: {line}` for every line of `output`, or a bare
/// `{host} [{code}]` when there is none.
fn emit_lines(host: &str, code: i32, output: &str, emit: impl Fn(&str)) {
    let mut any = false;
    for line in output.lines() {
        any = true;
        emit(&format!("{host} [{code}]: {line}"));
    }
    if !any {
        emit(&format!("{host} [{code}]"));
    }
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::significant_drop_tightening
)]
mod tests {
    use super::*;
    use crate::exec::{ExecResult, MockRemoteShell};
    use crate::logging::isolated_logger;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Condvar;
    use std::time::Duration;

    fn opts(parallelism: usize, dry_run: bool) -> DispatchOpts {
        DispatchOpts {
            command: "uptime".to_string(),
            options: vec!["-o".to_string(), "BatchMode=yes".to_string()],
            parallelism: NonZeroUsize::new(parallelism).unwrap(),
            dry_run,
        }
    }

    fn hosts(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    fn ok(stdout: &str) -> ExecResult {
        ExecResult {
            stdout: stdout.to_string(),
            success: true,
            code: Some(0),
            ..ExecResult::default()
        }
    }

    /// Records every message with its level for assertions.
    #[derive(Debug, Default)]
    struct RecordingLog {
        lines: Mutex<Vec<(&'static str, String)>>,
        hosts: Mutex<Vec<(String, HostStatus, Option<String>)>>,
    }

    impl RecordingLog {
        fn push(&self, level: &'static str, msg: &str) {
            self.lines.lock().unwrap().push((level, msg.to_string()));
        }

        fn lines(&self) -> Vec<(&'static str, String)> {
            self.lines.lock().unwrap().clone()
        }
    }

    impl Log for RecordingLog {
        fn stage(&self, msg: &str) {
            self.push("stage", msg);
        }
        fn info(&self, msg: &str) {
            self.push("info", msg);
        }
        fn debug(&self, msg: &str) {
            self.push("debug", msg);
        }
        fn warn(&self, msg: &str) {
            self.push("warn", msg);
        }
        fn error(&self, msg: &str) {
            self.push("error", msg);
        }
        fn dry_run(&self, msg: &str) {
            self.push("dry_run", msg);
        }
        fn record_host(&self, host: &str, status: HostStatus, message: Option<&str>) {
            self.hosts
                .lock()
                .unwrap()
                .push((host.to_string(), status, message.map(String::from)));
        }
    }

    // -----------------------------------------------------------------------
    // execute_host
    // -----------------------------------------------------------------------

    #[test]
    fn success_logs_stdout_lines_tagged_with_host() {
        let mut shell = MockRemoteShell::new();
        shell
            .expect_execute()
            .withf(|host, cmd, options| host == "web01" && cmd == "uptime" && options.len() == 2)
            .times(1)
            .returning(|_, _, _| Ok(ok("line one\nline two\n")));
        let log = RecordingLog::default();

        let status = execute_host("web01", &opts(1, false), &shell, &log);

        assert_eq!(status, HostStatus::Ok);
        let info: Vec<String> = log
            .lines()
            .into_iter()
            .filter(|(level, _)| *level == "info")
            .map(|(_, msg)| msg)
            .collect();
        assert_eq!(info, vec!["web01 [0]: line one", "web01 [0]: line two"]);
        assert_eq!(log.hosts.lock().unwrap()[0].1, HostStatus::Ok);
    }

    #[test]
    fn failure_logs_stderr_and_exit_code() {
        let mut shell = MockRemoteShell::new();
        shell.expect_execute().returning(|_, _, _| {
            Ok(ExecResult {
                stdout: "ignored".to_string(),
                stderr: "Permission denied".to_string(),
                success: false,
                code: Some(255),
            })
        });
        let log = RecordingLog::default();

        let status = execute_host("web01", &opts(1, false), &shell, &log);

        assert_eq!(status, HostStatus::Failed);
        let lines = log.lines();
        assert!(lines.contains(&("error", "web01 [255]: Permission denied".to_string())));
        assert!(!lines.iter().any(|(_, msg)| msg.contains("ignored")));
        let recorded = log.hosts.lock().unwrap();
        assert_eq!(recorded[0].2.as_deref(), Some("exit 255"));
    }

    #[test]
    fn silent_success_still_logs_host() {
        let mut shell = MockRemoteShell::new();
        shell.expect_execute().returning(|_, _, _| Ok(ok("")));
        let log = RecordingLog::default();
        execute_host("db01", &opts(1, false), &shell, &log);
        assert!(log.lines().contains(&("info", "db01 [0]".to_string())));
    }

    #[test]
    fn launch_failure_is_logged_and_recorded() {
        let mut shell = MockRemoteShell::new();
        shell
            .expect_execute()
            .returning(|_, _, _| Err(anyhow::anyhow!("failed to execute: ssh")));
        let log = RecordingLog::default();

        let status = execute_host("web01", &opts(1, false), &shell, &log);

        assert_eq!(status, HostStatus::Failed);
        assert!(
            log.lines()
                .contains(&("error", "web01: failed to execute: ssh".to_string()))
        );
    }

    #[test]
    fn dry_run_describes_without_executing() {
        let mut shell = MockRemoteShell::new();
        shell.expect_execute().times(0);
        shell.expect_describe().times(1).returning(|host, cmd, options| {
            let mut argv = vec!["ssh".to_string()];
            argv.extend(options.iter().cloned());
            argv.extend([host.to_string(), cmd.to_string()]);
            argv
        });
        let log = RecordingLog::default();

        let status = execute_host("web01", &opts(1, true), &shell, &log);

        assert_eq!(status, HostStatus::DryRun);
        assert!(log.lines().contains(&(
            "dry_run",
            "web01: would run: ssh -o BatchMode=yes web01 uptime".to_string()
        )));
    }

    // -----------------------------------------------------------------------
    // dispatch
    // -----------------------------------------------------------------------

    #[test]
    fn dispatch_runs_every_host_once() {
        let (log, _tmp, _guard) = isolated_logger();
        let log = Arc::new(log);
        let mut shell = MockRemoteShell::new();
        shell.expect_execute().times(3).returning(|_, _, _| Ok(ok("up")));

        let report = dispatch(&hosts(&["a", "b", "c"]), &opts(2, false), &shell, &log).unwrap();

        assert_eq!(report, DispatchReport { ok: 3, failed: 0, dry_run: 0 });
        let mut recorded: Vec<String> = log.host_entries().into_iter().map(|e| e.host).collect();
        recorded.sort();
        assert_eq!(recorded, vec!["a", "b", "c"]);
    }

    #[test]
    fn dry_run_dispatch_never_executes() {
        let (log, _tmp, _guard) = isolated_logger();
        let log = Arc::new(log);
        let mut shell = MockRemoteShell::new();
        shell.expect_execute().times(0);
        shell.expect_describe().returning(|host, _, _| vec![host.to_string()]);

        let report = dispatch(&hosts(&["a", "b", "c", "d"]), &opts(3, true), &shell, &log).unwrap();

        assert_eq!(report.dry_run, 4);
        assert_eq!(log.count(HostStatus::DryRun), 4);
    }

    #[test]
    fn one_failure_does_not_stop_the_others() {
        let (log, _tmp, _guard) = isolated_logger();
        let log = Arc::new(log);
        let mut shell = MockRemoteShell::new();
        shell.expect_execute().times(4).returning(|host, _, _| {
            if host == "bad" {
                Err(anyhow::anyhow!("connection refused"))
            } else {
                Ok(ok("fine"))
            }
        });

        let report =
            dispatch(&hosts(&["a", "bad", "b", "c"]), &opts(2, false), &shell, &log).unwrap();

        assert_eq!(report, DispatchReport { ok: 3, failed: 1, dry_run: 0 });
        assert_eq!(report.total(), 4);
    }

    #[test]
    fn buffered_output_reaches_log_file() {
        let (log, tmp, _guard) = isolated_logger();
        let log = Arc::new(log);
        let mut shell = MockRemoteShell::new();
        shell.expect_execute().returning(|_, _, _| Ok(ok("load average: 0.01")));

        dispatch(&hosts(&["web01"]), &opts(1, false), &shell, &log).unwrap();

        let contents = std::fs::read_to_string(tmp.path().join("run.log")).unwrap();
        assert!(contents.contains("web01 [0]: load average: 0.01"));
    }

    /// Holds every call until `rendezvous` calls have been in flight at
    /// once, then records the peak overlap.
    #[derive(Debug)]
    struct OverlapShell {
        rendezvous: usize,
        in_flight: Mutex<usize>,
        arrived: Condvar,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    impl OverlapShell {
        fn new(rendezvous: usize) -> Self {
            Self {
                rendezvous,
                in_flight: Mutex::new(0),
                arrived: Condvar::new(),
                peak: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl RemoteShell for OverlapShell {
        fn execute(&self, _host: &str, _command: &str, _options: &[String]) -> anyhow::Result<ExecResult> {
            let mut in_flight = self.in_flight.lock().unwrap();
            *in_flight += 1;
            self.peak.fetch_max(*in_flight, Ordering::SeqCst);
            self.arrived.notify_all();
            // A gate narrower than `rendezvous` times out here and shows up as a low peak.
            let (in_flight, _) = self
                .arrived
                .wait_timeout_while(in_flight, Duration::from_secs(5), |_| {
                    self.peak.load(Ordering::SeqCst) < self.rendezvous
                })
                .unwrap();
            drop(in_flight);
            std::thread::sleep(Duration::from_millis(10));
            *self.in_flight.lock().unwrap() -= 1;
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ok(""))
        }

        fn describe(&self, host: &str, _command: &str, _options: &[String]) -> Vec<String> {
            vec![host.to_string()]
        }
    }

    #[test]
    fn in_flight_tasks_reach_but_never_exceed_parallelism() {
        let (log, _tmp, _guard) = isolated_logger();
        let log = Arc::new(log);
        let shell = OverlapShell::new(2);
        let names: Vec<String> = (0..8).map(|i| format!("host{i}")).collect();

        let report = dispatch(&names, &opts(2, false), &shell, &log).unwrap();

        assert_eq!(report.ok, 8);
        assert_eq!(shell.calls.load(Ordering::SeqCst), 8);
        assert_eq!(shell.peak.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn parallelism_of_one_is_sequential() {
        let (log, _tmp, _guard) = isolated_logger();
        let log = Arc::new(log);
        let shell = OverlapShell::new(1);
        dispatch(&hosts(&["a", "b", "c"]), &opts(1, false), &shell, &log).unwrap();
        assert_eq!(shell.peak.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_host_list_is_a_no_op() {
        let (log, _tmp, _guard) = isolated_logger();
        let log = Arc::new(log);
        let mut shell = MockRemoteShell::new();
        shell.expect_execute().times(0);
        let report = dispatch(&[], &opts(4, false), &shell, &log).unwrap();
        assert_eq!(report.total(), 0);
    }
}
