//! Domain-specific error types for tgt.
//!
//! Internal modules return typed errors (e.g., [`TargetError`],
//! [`InventoryError`]) while the command handler at the CLI boundary converts
//! them to [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! TgtError
//! ├── Target(TargetError)       # malformed target expression
//! ├── Inventory(InventoryError) # unreadable inventory or host list
//! ├── Config(ConfigError)       # settings file I/O and parsing
//! └── Dispatch(DispatchError)   # worker pool construction
//! ```
//!
//! Remote command failures are not errors: they are recorded per
//! host and never fail the run.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for tgt.
#[derive(Error, Debug)]
pub enum TgtError {
    /// The target expression could not be compiled.
    #[error("Invalid target: {0}")]
    Target(#[from] TargetError),

    /// The inventory or host list could not be read.
    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),

    /// The settings file could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The dispatcher could not be started.
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

/// Errors raised while compiling a target expression.
#[derive(Error, Debug)]
pub enum TargetError {
    /// The expression contains no tokens.
    #[error("empty target expression")]
    EmptyExpression,

    /// A token appeared where the grammar does not allow it.
    #[error("unexpected '{token}' at token {position}")]
    UnexpectedToken {
        /// The offending token text.
        token: String,
        /// Zero-based token index.
        position: usize,
    },

    /// The expression ended while an operand was still expected.
    #[error("unexpected end of expression")]
    UnexpectedEnd,

    /// A `(` was never closed.
    #[error("unbalanced parenthesis")]
    UnbalancedParen,

    /// A `P@` atom does not compile as a regular expression.
    #[error("invalid regex '{pattern}': {source}")]
    InvalidRegex {
        /// Pattern text after the `P@` prefix.
        pattern: String,
        /// Underlying compile error.
        source: regex::Error,
    },
}

/// Errors raised while reading the inventory or host-list file.
#[derive(Error, Debug)]
pub enum InventoryError {
    /// The file could not be opened or read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors raised while loading the settings file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An I/O error occurred while reading the settings file.
    #[error("IO error reading config file {}: {source}", path.display())]
    Io {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The settings file is not valid TOML or has unknown keys.
    #[error("Invalid TOML in {}: {source}", path.display())]
    Parse {
        /// Path to the file that failed to parse.
        path: PathBuf,
        /// Underlying deserialization error.
        source: toml::de::Error,
    },
}

/// Errors raised while starting the dispatcher.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The bounded worker pool could not be built.
    #[error("cannot start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}
