//! Atom classification and the three matching engines.
//!
//! An atom is any word of a target expression that is not an operator. An
//! optional `<engine>@` prefix selects how the rest of the word is matched:
//!
//! - `L@a,b,c` matches a host equal to one of the comma-separated names
//! - `P@^web\d+` matches a regex at the start of the host
//! - `G@web*` or plain `web*` matches a shell glob against the whole host

use regex::Regex;

use crate::error::TargetError;

/// Matching engine selected by an atom's prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    /// Shell-style glob (`*`, `?`, `[...]`), the default.
    Glob,
    /// Regular expression anchored at the start of the host name.
    Regex,
    /// Exact membership in a comma-separated list.
    List,
}

#[derive(Debug, Clone)]
enum Matcher {
    List(Vec<String>),
    Pattern(Regex),
}

/// A compiled matcher unit.
#[derive(Debug, Clone)]
pub struct Atom {
    engine: Engine,
    pattern: String,
    matcher: Matcher,
}

impl Atom {
    /// Compile an atom for `engine` over `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::InvalidRegex`] if a regex pattern does not
    /// compile.
    pub fn new(engine: Engine, pattern: &str) -> Result<Self, TargetError> {
        let matcher = match engine {
            Engine::List => Matcher::List(pattern.split(',').map(String::from).collect()),
            Engine::Regex => Matcher::Pattern(compile(&format!("^(?:{pattern})"), pattern)?),
            Engine::Glob => Matcher::Pattern(compile(&glob_to_regex(pattern), pattern)?),
        };
        Ok(Self {
            engine,
            pattern: pattern.to_string(),
            matcher,
        })
    }

    /// Classify one word of `expr` and compile it.
    ///
    /// A word that cannot be split into engine and pattern (only the empty
    /// word left by doubled spaces) falls back to a glob over the whole
    /// expression, with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::InvalidRegex`] if a regex pattern does not
    /// compile.
    pub fn classify(word: &str, expr: &str) -> Result<Self, TargetError> {
        match split_engine(word) {
            Some((engine, pattern)) => Self::new(engine, pattern),
            None => {
                tracing::warn!("Unable to parse target \"{expr}\"");
                Self::new(Engine::Glob, expr)
            }
        }
    }

    /// The engine this atom matches with.
    #[must_use]
    pub const fn engine(&self) -> Engine {
        self.engine
    }

    /// The pattern text after any engine prefix.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Evaluate this atom against one host name.
    #[must_use]
    pub fn matches(&self, host: &str) -> bool {
        match &self.matcher {
            Matcher::List(names) => names.iter().any(|n| n == host),
            Matcher::Pattern(re) => re.is_match(host),
        }
    }
}

/// Split `word` into its engine and pattern.
///
/// A recognised prefix only applies when a non-empty pattern follows it;
/// otherwise the whole word is a glob (`P@` alone globs for the literal
/// text `P@`). Returns `None` for the empty word.
fn split_engine(word: &str) -> Option<(Engine, &str)> {
    if let Some((prefix, rest)) = word.split_once('@')
        && !rest.is_empty()
    {
        let engine = match prefix {
            "" | "G" => Some(Engine::Glob),
            "P" => Some(Engine::Regex),
            "L" => Some(Engine::List),
            _ => None,
        };
        if let Some(engine) = engine {
            return Some((engine, rest));
        }
    }
    (!word.is_empty()).then_some((Engine::Glob, word))
}

fn compile(source: &str, pattern: &str) -> Result<Regex, TargetError> {
    Regex::new(source).map_err(|source| TargetError::InvalidRegex {
        pattern: pattern.to_string(),
        source,
    })
}

/// Match `host` against a shell glob.
///
/// Case-sensitive on Unix and case-insensitive on Windows, following the
/// platform's filename conventions.
#[must_use]
pub fn glob_match(pattern: &str, host: &str) -> bool {
    Regex::new(&glob_to_regex(pattern)).is_ok_and(|re| re.is_match(host))
}

/// Translate a shell glob into an equivalent whole-string regex.
///
/// `*` matches any run of characters, `?` any single character, `[...]` a
/// character set (`[!...]` negated). A `[` with no closing `]` is literal.
/// Within a set, a `]` directly after `[` or `[!` is literal and `a-z`
/// ranges with a reversed bound match nothing.
fn glob_to_regex(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::from(if cfg!(windows) { "(?is)\\A" } else { "(?s)\\A" });
    let mut i = 0;
    while let Some(&c) = chars.get(i) {
        i += 1;
        match c {
            '*' => {
                while chars.get(i) == Some(&'*') {
                    i += 1;
                }
                out.push_str(".*");
            }
            '?' => out.push('.'),
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    out.push_str(&translate_class(chars.get(i..end).unwrap_or_default()));
                    i = end + 1;
                }
                None => out.push_str("\\["),
            },
            _ => out.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    out.push_str("\\z");
    out
}

/// Index of the `]` closing a set whose body starts at `start`.
fn class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut j = start;
    if chars.get(j) == Some(&'!') {
        j += 1;
    }
    if chars.get(j) == Some(&']') {
        j += 1;
    }
    chars
        .get(j..)?
        .iter()
        .position(|&c| c == ']')
        .map(|offset| j + offset)
}

fn translate_class(body: &[char]) -> String {
    let (negated, body) = match body.split_first() {
        Some(('!', rest)) => (true, rest),
        _ => (false, body),
    };

    let mut items = String::new();
    let mut k = 0;
    while let Some(&lo) = body.get(k) {
        if body.get(k + 1) == Some(&'-')
            && let Some(&hi) = body.get(k + 2)
        {
            if lo <= hi {
                items.push_str(&escape_char(lo));
                items.push('-');
                items.push_str(&escape_char(hi));
            }
            k += 3;
        } else {
            items.push_str(&escape_char(lo));
            k += 1;
        }
    }

    match (items.is_empty(), negated) {
        // Every range was reversed: nothing (or, negated, anything) matches.
        (true, false) => "(?:\\z.)".to_string(),
        (true, true) => ".".to_string(),
        (false, false) => format!("[{items}]"),
        (false, true) => format!("[^{items}]"),
    }
}

fn escape_char(c: char) -> String {
    regex::escape(c.encode_utf8(&mut [0; 4]))
}
