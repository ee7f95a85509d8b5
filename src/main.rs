//! `tgt` command-line entry point.
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use tgt::{cli, commands, logging};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();
    let log_file = logging::default_log_path();
    logging::init_subscriber(args.verbose, log_file.as_deref());
    let log = Arc::new(logging::Logger::new(log_file));
    commands::run::run(&args, &log)
}
