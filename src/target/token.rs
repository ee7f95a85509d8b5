//! Tokenizer for target expressions.

/// Boolean operators and grouping tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `and`
    And,
    /// `or`
    Or,
    /// `not`
    Not,
    /// `(`
    Open,
    /// `)`
    Close,
}

impl Operator {
    /// Recognise an operator word. Operators are lowercase only.
    #[must_use]
    pub fn from_word(word: &str) -> Option<Self> {
        match word {
            "and" => Some(Self::And),
            "or" => Some(Self::Or),
            "not" => Some(Self::Not),
            "(" => Some(Self::Open),
            ")" => Some(Self::Close),
            _ => None,
        }
    }

    /// The source text of this operator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
            Self::Open => "(",
            Self::Close => ")",
        }
    }
}

/// Split a target expression into raw words.
///
/// Splits on every single space, so doubled spaces yield empty words. An
/// empty expression yields no words at all. There is no quoting: a pattern
/// can never contain a space.
#[must_use]
pub fn split(expr: &str) -> Vec<&str> {
    if expr.is_empty() {
        return Vec::new();
    }
    expr.split(' ').collect()
}
