//! Optional TOML settings file.
//!
//! ```toml
//! parallelism = 10
//! hostkey = "~/.ssh/known_hosts"
//! ssh_program = "ssh"
//! ssh_options = ["-o", "BatchMode=yes"]
//! ```
//!
//! Every key is optional. Values given on the command line win over the
//! file, which wins over the built-in defaults.
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

/// Default number of hosts contacted at once.
pub const DEFAULT_PARALLELISM: NonZeroUsize = NonZeroUsize::MIN.saturating_add(9);

/// Default inventory path.
pub const DEFAULT_HOSTKEY: &str = "~/.ssh/known_hosts";

/// Settings read from `config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Maximum number of concurrent dispatch tasks.
    pub parallelism: NonZeroUsize,
    /// Inventory file used in expression mode.
    pub hostkey: PathBuf,
    /// Remote shell program.
    pub ssh_program: String,
    /// Connection options placed before any given on the command line.
    pub ssh_options: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            parallelism: DEFAULT_PARALLELISM,
            hostkey: PathBuf::from(DEFAULT_HOSTKEY),
            ssh_program: "ssh".to_string(),
            ssh_options: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings from `path`, or from [`default_config_path`] when `None`.
    ///
    /// A missing default file yields [`Settings::default`]; a missing
    /// explicitly named file is an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it is not valid TOML, names an unknown key,
    /// or sets `parallelism` to zero.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) if p.exists() => p,
                _ => return Ok(Self::default()),
            },
        };
        tracing::debug!("loading settings from {}", path.display());

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse { path, source })
    }

    /// Parse settings from TOML text.
    ///
    /// # Errors
    ///
    /// Returns the deserialization error for malformed input.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// `$XDG_CONFIG_HOME/tgt/config.toml`, falling back to `~/.config/tgt/config.toml`.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var_os("HOME")
                .or_else(|| std::env::var_os("USERPROFILE"))
                .map(|home| PathBuf::from(home).join(".config"))
        })?;
    Some(base.join("tgt").join("config.toml"))
}
