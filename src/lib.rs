//! Targeted remote command runner.
//!
//! Selects hosts with a small boolean target language (globs, regexes and
//! explicit lists joined by `and`, `or` and `not`) evaluated against an
//! inventory in `known_hosts` layout, or takes them verbatim from a host
//! list, then runs one shell command on every selected host with bounded
//! concurrency.
//!
//! The public API is organised into layers:
//!
//! - **[`target`]**: compile and evaluate target expressions
//! - **[`inventory`]**: read candidate hosts and select the matching ones
//! - **[`dispatch`]**: run a command on many hosts through a [`exec::RemoteShell`]
//! - **[`commands`]**: top-level orchestration for the `tgt` binary
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod exec;
pub mod inventory;
pub mod logging;
pub mod target;
