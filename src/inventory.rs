//! Candidate host sources and selection.
//!
//! Hosts come either from an explicit host list (one name per line, used
//! verbatim) or from an inventory in `known_hosts` layout, whose first field
//! on each line is a comma-separated group of aliases. Inventory aliases are
//! filtered through a target [`Expression`]; both modes are deduplicated in
//! first-seen order.
use std::path::{Path, PathBuf};

use indexmap::IndexSet;

use crate::error::InventoryError;
use crate::target::Expression;

/// Where candidate hosts come from.
#[derive(Debug, Clone)]
pub enum HostSource {
    /// One host per line, taken verbatim without evaluating any expression.
    List(PathBuf),
    /// Inventory lines whose aliases are filtered by an expression.
    Inventory {
        /// Inventory file path.
        path: PathBuf,
        /// Expression each alias must satisfy; `None` when the expression
        /// failed to compile, which matches no alias.
        target: Option<Expression>,
    },
}

impl HostSource {
    /// The file this source reads.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::List(path) | Self::Inventory { path, .. } => path,
        }
    }

    /// Read the backing file and produce the selected host sequence.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::Io`] if the file cannot be read.
    pub fn select(&self) -> Result<Vec<String>, InventoryError> {
        let content = read(self.path())?;
        let hosts = match self {
            Self::List(_) => dedup(list_hosts(&content)),
            Self::Inventory { target, .. } => dedup(
                inventory_aliases(&content)
                    .filter(|alias| target.as_ref().is_some_and(|t| t.matches(alias))),
            ),
        };
        for host in &hosts {
            tracing::debug!("found {host}");
        }
        Ok(hosts)
    }
}

fn read(path: &Path) -> Result<String, InventoryError> {
    std::fs::read_to_string(path).map_err(|source| InventoryError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Hosts from a plain host list: trimmed, non-empty lines.
pub fn list_hosts(content: &str) -> impl Iterator<Item = &str> {
    content.lines().map(str::trim).filter(|line| !line.is_empty())
}

/// Every alias of every inventory entry, in file order.
///
/// Blank lines and `#` comments are skipped. A leading `@cert-authority` or
/// `@revoked` marker moves the host field to the next column. Hashed names
/// (`|1|salt|hash`) cannot be matched and are skipped.
pub fn inventory_aliases(content: &str) -> impl Iterator<Item = &str> {
    content
        .lines()
        .filter_map(host_field)
        .flat_map(|field| field.split(','))
        .filter(|alias| !alias.is_empty())
}

fn host_field(line: &str) -> Option<&str> {
    let mut fields = line.split_whitespace();
    let mut field = fields.next()?;
    if field.starts_with('#') {
        return None;
    }
    if field.starts_with('@') {
        field = fields.next()?;
    }
    if field.starts_with('|') {
        tracing::debug!("skipping hashed inventory entry");
        return None;
    }
    Some(field)
}

/// Keep the first occurrence of every host, preserving order.
pub fn dedup<'a>(hosts: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    hosts
        .into_iter()
        .collect::<IndexSet<&str>>()
        .into_iter()
        .map(String::from)
        .collect()
}

/// Expand a leading `~/` to the user's home directory.
#[must_use]
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map_or_else(|| path.to_path_buf(), |home| PathBuf::from(home).join(rest)),
        Err(_) => path.to_path_buf(),
    }
}
