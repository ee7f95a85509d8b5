//! Target expressions: a small boolean language over host names.
//!
//! ```text
//! web* and not web01
//! ( P@db\d+$ or L@cache1,cache2 ) and not G@*-old
//! ```
//!
//! Words are separated by single spaces. `and`, `or`, `not`, `(` and `)` are
//! operators; every other word is an [`Atom`]. See [`expr`] for the grammar.

pub mod atom;
pub mod expr;
pub mod token;

pub use atom::{Atom, Engine, glob_match};
pub use expr::{Expression, Node};

/// Compile `expr` and evaluate it against `host`.
///
/// Any parse error is logged and treated as "no match", so a malformed
/// expression never selects a host.
#[must_use]
pub fn matches(expr: &str, host: &str) -> bool {
    match Expression::parse(expr) {
        Ok(compiled) => compiled.matches(host),
        Err(e) => {
            tracing::error!("Invalid compound target: {expr}: {e}");
            false
        }
    }
}
