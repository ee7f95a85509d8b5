//! Core logging types: per-host entries, status, and the [`Log`] trait.

/// Dispatch result for one host, kept for the run summary.
#[derive(Debug, Clone)]
pub struct HostEntry {
    /// Host the command was dispatched to.
    pub host: String,
    /// Final status of the dispatch.
    pub status: HostStatus,
    /// Optional detail (e.g., exit status or launch error).
    pub message: Option<String>,
}

/// Status of a completed dispatch task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostStatus {
    /// The remote command exited with status zero.
    Ok,
    /// Dry-run mode; the host was not contacted.
    DryRun,
    /// The remote command exited non-zero or could not be launched.
    Failed,
}

/// Abstraction over logging backends.
///
/// Both [`Logger`](super::logger::Logger) (direct output) and
/// [`BufferedLog`](super::buffered::BufferedLog) (deferred output for
/// concurrent dispatch tasks) implement this trait, so dispatch code logs
/// without knowing whether output is immediate or buffered.
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (suppressed on console unless verbose).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Log a dry-run action message.
    fn dry_run(&self, msg: &str);
    /// Record a host result for the summary.
    fn record_host(&self, host: &str, status: HostStatus, message: Option<&str>);
}
