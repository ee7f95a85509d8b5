//! Buffered logger for concurrent dispatch tasks.
use std::sync::{Arc, Mutex};

use super::logger::Logger;
use super::subscriber::{DRY_RUN_TARGET, STAGE_TARGET};
use super::types::{HostStatus, Log};

/// A single buffered log entry, replayed when flushed.
#[derive(Debug, Clone)]
enum LogEntry {
    Stage(String),
    Info(String),
    Debug(String),
    Warn(String),
    Error(String),
    DryRun(String),
}

impl LogEntry {
    /// Replay this entry to the console and log file via tracing.
    fn replay(&self) {
        match self {
            Self::Stage(msg) => tracing::info!(target: STAGE_TARGET, "{msg}"),
            Self::Info(msg) => tracing::info!("{msg}"),
            Self::Debug(msg) => tracing::debug!("{msg}"),
            Self::Warn(msg) => tracing::warn!("{msg}"),
            Self::Error(msg) => tracing::error!("{msg}"),
            Self::DryRun(msg) => tracing::info!(target: DRY_RUN_TARGET, "{msg}"),
        }
    }
}

/// Implement the display methods of [`Log`] by buffering each message into
/// `self.entries` as the corresponding [`LogEntry`] variant.
macro_rules! buffer_log_methods {
    ($($method:ident => $variant:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                if let Ok(mut guard) = self.entries.lock() {
                    guard.push(LogEntry::$variant(msg.to_string()));
                }
            }
        )+
    };
}

/// Buffered logger for one host's dispatch task.
///
/// Captures output in memory so that hosts running concurrently do not
/// interleave their lines. The captured entries are replayed as one block
/// when [`flush_and_complete`](Self::flush_and_complete) is called.
///
/// [`record_host`](Log::record_host) is forwarded directly to the underlying
/// [`Logger`] because the summary collection is already thread-safe.
#[derive(Debug)]
pub struct BufferedLog {
    inner: Arc<Logger>,
    entries: Mutex<Vec<LogEntry>>,
}

impl BufferedLog {
    /// Create a new buffered logger backed by the given [`Logger`].
    #[must_use]
    pub const fn new(inner: Arc<Logger>) -> Self {
        Self {
            inner,
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Flush all buffered entries and remove `host` from the active set.
    ///
    /// Holds the flush lock on the backing [`Logger`] while replaying, so a
    /// host's block is never split by another host finishing at the same
    /// time. Redraws the progress line for the hosts still running.
    pub fn flush_and_complete(&self, host: &str) {
        let _guard = self
            .inner
            .flush_lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        self.inner.clear_progress();
        let entries = match self.entries.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(_) => return,
        };
        for entry in &entries {
            entry.replay();
        }
        let remaining = self.inner.active_hosts.lock().ok().and_then(|mut active| {
            active.retain(|n| n != host);
            (!active.is_empty()).then(|| active.join(", "))
        });
        if let Some(names) = remaining {
            self.inner.draw_progress(&names);
        }
    }
}

impl Log for BufferedLog {
    buffer_log_methods! {
        stage   => Stage,
        info    => Info,
        debug   => Debug,
        warn    => Warn,
        error   => Error,
        dry_run => DryRun,
    }

    fn record_host(&self, host: &str, status: HostStatus, message: Option<&str>) {
        self.inner.record_host(host, status, message);
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::logging::isolated_logger;
    use std::fs;

    #[test]
    fn record_host_forwards_to_logger() {
        let (log, _tmp, _guard) = isolated_logger();
        let log = Arc::new(log);
        let buf = BufferedLog::new(Arc::clone(&log));
        buf.record_host("web01", HostStatus::Ok, None);
        assert_eq!(log.host_entries().len(), 1);
        assert_eq!(log.host_entries()[0].host, "web01");
    }

    #[test]
    fn output_is_held_until_flush() {
        let (log, tmp, _guard) = isolated_logger();
        let log = Arc::new(log);
        let buf = BufferedLog::new(Arc::clone(&log));
        let path = tmp.path().join("run.log");
        buf.info("buf-marker");
        let before = fs::read_to_string(&path).unwrap();
        assert!(
            !before.contains("buf-marker"),
            "buffered output should not be written before flush"
        );
        buf.flush_and_complete("web01");
        let after = fs::read_to_string(&path).unwrap();
        assert!(
            after.contains("buf-marker"),
            "buffered output should appear after flush"
        );
    }

    #[test]
    fn entries_are_replayed_in_order() {
        let (log, tmp, _guard) = isolated_logger();
        let buf = BufferedLog::new(Arc::new(log));
        buf.stage("stage-1");
        buf.info("info-1");
        buf.debug("debug-1");
        buf.warn("warn-1");
        buf.error("error-1");
        buf.dry_run("dryrun-1");
        buf.flush_and_complete("web01");
        let contents = fs::read_to_string(tmp.path().join("run.log")).unwrap();
        let positions: Vec<usize> = ["stage-1", "info-1", "debug-1", "warn-1", "error-1", "dryrun-1"]
            .iter()
            .map(|m| contents.find(m).expect("marker in log"))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn flush_twice_does_not_duplicate() {
        let (log, tmp, _guard) = isolated_logger();
        let buf = BufferedLog::new(Arc::new(log));
        buf.info("once-only");
        buf.flush_and_complete("web01");
        buf.flush_and_complete("web01");
        let contents = fs::read_to_string(tmp.path().join("run.log")).unwrap();
        assert_eq!(contents.matches("once-only").count(), 1);
    }

    #[test]
    fn flush_and_complete_clears_progress_rows() {
        let (log, _tmp, _guard) = isolated_logger();
        let log = Arc::new(log);
        log.notify_host_start("web01");
        let buf = BufferedLog::new(Arc::clone(&log));
        buf.flush_and_complete("web01");
        assert_eq!(log.progress_rows_count(), 0);
    }

    #[test]
    #[allow(clippy::significant_drop_tightening)]
    fn flush_and_complete_keeps_other_hosts_active() {
        let (log, _tmp, _guard) = isolated_logger();
        let log = Arc::new(log);
        log.notify_host_start("web01");
        log.notify_host_start("web02");
        let buf = BufferedLog::new(Arc::clone(&log));
        buf.flush_and_complete("web01");
        let active = log.active_hosts.lock().unwrap();
        assert_eq!(*active, vec!["web02".to_string()]);
        assert_eq!(log.progress_rows_count(), 1);
    }
}
