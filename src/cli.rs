//! Command-line interface definition.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::{ArgGroup, Parser};

/// Build version, set by `build.rs` from `git describe` when available.
pub const VERSION: &str = match option_env!("TGT_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};

/// Run one command on many hosts selected by a target expression.
#[derive(Parser, Debug)]
#[command(
    name = "tgt",
    about = "Run a command on hosts selected by a target expression",
    version = VERSION
)]
#[command(group(ArgGroup::new("source").required(true).args(["tgt", "list"])))]
pub struct Cli {
    /// Target expression matched against inventory aliases
    /// (e.g. "web* and not L@web01,web02")
    #[arg(long)]
    pub tgt: Option<String>,

    /// File listing hosts one per line; no expression is evaluated
    #[arg(long, value_name = "PATH")]
    pub list: Option<PathBuf>,

    /// Command to run on every selected host
    #[arg(long, required_unless_present = "dry_run")]
    pub cmd: Option<String>,

    /// Maximum number of hosts contacted at once [default: 10]
    #[arg(long, value_name = "N")]
    pub parallelism: Option<NonZeroUsize>,

    /// Inventory file read in expression mode [default: ~/.ssh/known_hosts]
    #[arg(long, value_name = "PATH")]
    pub hostkey: Option<PathBuf>,

    /// Show what would run without contacting any host
    #[arg(long)]
    pub dry_run: bool,

    /// Settings file [default: $XDG_CONFIG_HOME/tgt/config.toml]
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Unrecognized trailing arguments, forwarded verbatim to the remote
    /// shell (e.g. `-o BatchMode=yes -p 2222`)
    #[arg(
        trailing_var_arg = true,
        allow_hyphen_values = true,
        num_args = 0..,
        value_name = "SSH_OPTION"
    )]
    pub ssh_options: Vec<String>,
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use clap::error::ErrorKind;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_target_and_command() {
        let cli = Cli::parse_from(["tgt", "--tgt", "web* and not web01", "--cmd", "uptime"]);
        assert_eq!(cli.tgt.as_deref(), Some("web* and not web01"));
        assert_eq!(cli.cmd.as_deref(), Some("uptime"));
        assert!(cli.list.is_none());
        assert!(cli.parallelism.is_none());
        assert!(!cli.dry_run);
    }

    #[test]
    fn parse_long_flags() {
        let cli = Cli::parse_from([
            "tgt", "--list", "hosts.txt", "--cmd", "df -h", "--parallelism", "3", "--dry-run",
            "--verbose",
        ]);
        assert_eq!(cli.list, Some(PathBuf::from("hosts.txt")));
        assert_eq!(cli.cmd.as_deref(), Some("df -h"));
        assert_eq!(cli.parallelism.map(NonZeroUsize::get), Some(3));
        assert!(cli.dry_run);
        assert!(cli.verbose);
        assert!(cli.ssh_options.is_empty());
    }

    #[test]
    fn source_is_required() {
        let err = Cli::try_parse_from(["tgt", "--cmd", "uptime"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn tgt_and_list_conflict() {
        let err = Cli::try_parse_from(["tgt", "--tgt", "web*", "--list", "hosts", "--cmd", "x"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn cmd_required_without_dry_run() {
        let err = Cli::try_parse_from(["tgt", "--tgt", "web*"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn cmd_optional_with_dry_run() {
        let cli = Cli::try_parse_from(["tgt", "--tgt", "web*", "--dry-run"]).unwrap();
        assert!(cli.cmd.is_none());
    }

    #[test]
    fn zero_parallelism_is_rejected() {
        assert!(Cli::try_parse_from(["tgt", "--tgt", "a", "--cmd", "x", "--parallelism", "0"]).is_err());
    }

    #[test]
    fn unrecognized_trailing_args_are_ssh_options() {
        let cli = Cli::parse_from(["tgt", "--tgt", "web*", "--cmd", "uptime", "-o", "BatchMode=yes"]);
        assert_eq!(cli.ssh_options, vec!["-o", "BatchMode=yes"]);
    }

    #[test]
    fn ssh_style_short_flags_are_not_tgt_flags() {
        let cli = Cli::parse_from([
            "tgt", "--tgt", "web*", "--cmd", "uptime", "-p", "2222", "-l", "root", "-v",
        ]);
        assert!(cli.parallelism.is_none());
        assert!(cli.list.is_none());
        assert!(!cli.verbose);
        assert_eq!(cli.ssh_options, vec!["-p", "2222", "-l", "root", "-v"]);
    }

    #[test]
    fn double_dash_still_separates_ssh_options() {
        let cli = Cli::parse_from([
            "tgt", "--tgt", "web*", "--cmd", "uptime", "--", "-o", "BatchMode=yes", "-q",
        ]);
        assert_eq!(cli.ssh_options, vec!["-o", "BatchMode=yes", "-q"]);
    }

    #[test]
    fn hostkey_and_config_paths() {
        let cli = Cli::parse_from([
            "tgt", "--tgt", "a", "--cmd", "x", "--hostkey", "/tmp/kh", "--config", "/tmp/c.toml",
        ]);
        assert_eq!(cli.hostkey, Some(PathBuf::from("/tmp/kh")));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
    }
}
