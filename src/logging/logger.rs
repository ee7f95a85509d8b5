//! Structured logger with dry-run awareness and summary collection.
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Mutex;

use super::subscriber::{DRY_RUN_TARGET, STAGE_TARGET};
use super::types::{HostEntry, HostStatus, Log};
use super::utils::terminal_columns;

/// Implement the display methods of [`Log`] by delegating to inherent methods
/// of the same name on the implementing type.
macro_rules! forward_log_methods {
    ($($method:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                self.$method(msg);
            }
        )+
    };
}

/// Structured logger with dry-run awareness and per-host summary collection.
///
/// Messages go through [`tracing`]; the subscriber installed by
/// [`init_subscriber`](super::subscriber::init_subscriber) decides where
/// they land. The log file path is only kept for the summary footer.
#[derive(Debug)]
pub struct Logger {
    hosts: Mutex<Vec<HostEntry>>,
    log_file: Option<PathBuf>,
    /// Serializes console output from concurrent dispatch flushes.
    pub(super) flush_lock: Mutex<()>,
    /// Hosts whose dispatch task is currently running.
    pub(super) active_hosts: Mutex<Vec<String>>,
    /// Whether a progress line is currently displayed (`0` = no, `1` = yes).
    ///
    /// The progress line is always truncated to a single terminal row so
    /// clearing it never needs cursor-up movement.
    pub(super) progress_rows: Mutex<u16>,
}

impl Logger {
    /// Create a new logger; `log_file` is shown in the summary footer.
    #[must_use]
    pub const fn new(log_file: Option<PathBuf>) -> Self {
        Self {
            hosts: Mutex::new(Vec::new()),
            log_file,
            flush_lock: Mutex::new(()),
            active_hosts: Mutex::new(Vec::new()),
            progress_rows: Mutex::new(0),
        }
    }

    /// Return a clone of all recorded host entries.
    #[must_use]
    pub fn host_entries(&self) -> Vec<HostEntry> {
        self.hosts.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Return the current value of `progress_rows` (test-only).
    #[cfg(test)]
    pub(crate) fn progress_rows_count(&self) -> u16 {
        *self
            .progress_rows
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header (major section).
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message.
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Log a dry-run action message.
    pub fn dry_run(&self, msg: &str) {
        tracing::info!(target: DRY_RUN_TARGET, "{msg}");
    }

    /// Record a host result for the summary.
    pub fn record_host(&self, host: &str, status: HostStatus, message: Option<&str>) {
        if let Ok(mut guard) = self.hosts.lock() {
            guard.push(HostEntry {
                host: host.to_string(),
                status,
                message: message.map(String::from),
            });
        }
    }

    /// Count the number of recorded hosts with `status`.
    #[must_use]
    pub fn count(&self, status: HostStatus) -> usize {
        self.hosts
            .lock()
            .map_or(0, |guard| guard.iter().filter(|h| h.status == status).count())
    }

    /// Print the run summary: totals, then every failed host.
    pub fn print_summary(&self) {
        let hosts = match self.hosts.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => return,
        };
        if hosts.is_empty() {
            return;
        }

        self.stage("Summary");

        let mut ok = 0u32;
        let mut dry_run = 0u32;
        let mut failed = 0u32;
        for entry in &hosts {
            match entry.status {
                HostStatus::Ok => ok += 1,
                HostStatus::DryRun => dry_run += 1,
                HostStatus::Failed => {
                    failed += 1;
                    let suffix = entry
                        .message
                        .as_ref()
                        .map_or_else(String::new, |msg| format!(" ({msg})"));
                    self.info(&format!("\x1b[31m✗ {}{suffix}\x1b[0m", entry.host));
                }
            }
        }

        let total = ok + dry_run + failed;
        self.info(&format!(
            "{total} hosts: \x1b[32m{ok} ok\x1b[0m, \x1b[37m{dry_run} dry-run\x1b[0m, \x1b[31m{failed} failed\x1b[0m"
        ));

        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }

    /// Erase the in-progress status line from the console.
    ///
    /// No-op if no progress line is currently shown.
    /// Must be called while holding `flush_lock`.
    #[allow(clippy::print_stdout)]
    pub(super) fn clear_progress(&self) {
        let mut guard = self
            .progress_rows
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if *guard > 0 {
            print!("\r\x1b[K");
            std::io::stdout().flush().ok();
            *guard = 0;
        }
    }

    /// Print an in-progress status line listing `names` and mark it as shown.
    ///
    /// Truncated to one terminal row. Must be called while holding
    /// `flush_lock`.
    #[allow(clippy::print_stdout)]
    pub(super) fn draw_progress(&self, names: &str) {
        let max_chars = terminal_columns().saturating_sub(4);
        let display = if names.chars().count() > max_chars {
            let truncated: String = names.chars().take(max_chars.saturating_sub(1)).collect();
            format!("{truncated}…")
        } else {
            names.to_string()
        };
        print!("  \x1b[2m▹ {display}\x1b[0m");
        std::io::stdout().flush().ok();
        let mut guard = self
            .progress_rows
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = 1;
    }

    /// Record that a dispatch task has started on `host`.
    ///
    /// Erases any previous progress line, adds the host to the active set,
    /// and redraws the status line.
    pub fn notify_host_start(&self, host: &str) {
        let _guard = self
            .flush_lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        self.clear_progress();
        let names = self.active_hosts.lock().map_or_else(
            |_| host.to_string(),
            |mut active| {
                active.push(host.to_string());
                active.join(", ")
            },
        );
        self.draw_progress(&names);
    }
}

impl Log for Logger {
    forward_log_methods!(stage, info, debug, warn, error, dry_run);

    fn record_host(&self, host: &str, status: HostStatus, message: Option<&str>) {
        self.record_host(host, status, message);
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::logging::isolated_logger;
    use std::fs;

    #[test]
    fn logger_starts_empty() {
        let (log, _tmp, _guard) = isolated_logger();
        assert!(log.host_entries().is_empty());
    }

    #[test]
    fn record_host_with_message() {
        let (log, _tmp, _guard) = isolated_logger();
        log.record_host("web01", HostStatus::Failed, Some("exit 255"));
        let entries = log.host_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].host, "web01");
        assert_eq!(entries[0].message, Some("exit 255".to_string()));
    }

    #[test]
    fn count_by_status() {
        let (log, _tmp, _guard) = isolated_logger();
        log.record_host("a", HostStatus::Ok, None);
        log.record_host("b", HostStatus::Failed, Some("exit 1"));
        log.record_host("c", HostStatus::Failed, Some("exit 2"));
        log.record_host("d", HostStatus::DryRun, None);
        assert_eq!(log.count(HostStatus::Ok), 1);
        assert_eq!(log.count(HostStatus::Failed), 2);
        assert_eq!(log.count(HostStatus::DryRun), 1);
    }

    #[test]
    fn log_trait_delegates_to_logger() {
        let (log, _tmp, _guard) = isolated_logger();
        let log_ref: &dyn Log = &log;
        log_ref.record_host("via-trait", HostStatus::Ok, None);
        assert_eq!(log.host_entries().len(), 1);
    }

    #[test]
    fn messages_are_written_to_file_with_tags() {
        let (log, tmp, _guard) = isolated_logger();
        log.stage("stage-marker");
        log.warn("warn-marker");
        log.error("error-marker");
        log.dry_run("dryrun-marker");
        log.debug("debug-marker");
        let contents = fs::read_to_string(tmp.path().join("run.log")).unwrap();
        assert!(contents.contains("==> stage-marker"));
        assert!(contents.contains("[warn] warn-marker"));
        assert!(contents.contains("[error] error-marker"));
        assert!(contents.contains("[dry run] dryrun-marker"));
        assert!(contents.contains("[debug] debug-marker"));
    }

    #[test]
    fn summary_lists_failed_hosts() {
        let (log, tmp, _guard) = isolated_logger();
        log.record_host("web01", HostStatus::Ok, None);
        log.record_host("web02", HostStatus::Failed, Some("exit 255"));
        log.print_summary();
        let contents = fs::read_to_string(tmp.path().join("run.log")).unwrap();
        assert!(contents.contains("✗ web02 (exit 255)"));
        assert!(!contents.contains("✗ web01"));
        assert!(contents.contains("2 hosts: 1 ok, 0 dry-run, 1 failed"));
    }

    #[test]
    fn notify_host_start_sets_progress_rows() {
        let (log, _tmp, _guard) = isolated_logger();
        log.notify_host_start("web01");
        assert_eq!(log.progress_rows_count(), 1);
        assert!(log.active_hosts.lock().unwrap().contains(&"web01".to_string()));
    }

    #[test]
    fn draw_progress_caps_rows_to_one() {
        let (log, _tmp, _guard) = isolated_logger();
        log.draw_progress(&"a".repeat(500));
        assert_eq!(log.progress_rows_count(), 1);
    }
}
