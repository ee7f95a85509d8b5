//! Boolean target expressions.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! or    := and ( "or" and )*
//! and   := unary ( "and" unary )*
//! unary := "not" unary | "(" or ")" | ATOM
//! ```
//!
//! The shape of an expression does not depend on the host it is evaluated
//! against, so it is parsed once and every malformed placement (leading
//! binary operator, `( and`, adjacent atoms, unbalanced parentheses) is
//! rejected up front. Adjacent atoms are never joined with an implicit `and`.

use std::iter::{Enumerate, Peekable};
use std::vec::IntoIter;

use super::atom::Atom;
use super::token::{self, Operator};
use crate::error::TargetError;

/// A parsed expression tree.
#[derive(Debug, Clone)]
pub enum Node {
    /// A single matcher.
    Atom(Atom),
    /// Negation.
    Not(Box<Self>),
    /// All children must match.
    And(Vec<Self>),
    /// Any child must match.
    Or(Vec<Self>),
}

impl Node {
    fn eval(&self, host: &str) -> bool {
        match self {
            Self::Atom(atom) => atom.matches(host),
            Self::Not(inner) => !inner.eval(host),
            Self::And(children) => children.iter().all(|c| c.eval(host)),
            Self::Or(children) => children.iter().any(|c| c.eval(host)),
        }
    }
}

/// A compiled target expression.
#[derive(Debug, Clone)]
pub struct Expression {
    source: String,
    root: Node,
}

impl Expression {
    /// Compile a target expression.
    ///
    /// # Errors
    ///
    /// Returns a [`TargetError`] if the expression is empty, places an
    /// operator where an operand is expected, leaves trailing tokens, has
    /// unbalanced parentheses, or contains a regex atom that does not compile.
    pub fn parse(expr: &str) -> Result<Self, TargetError> {
        let words = token::split(expr);
        if words.is_empty() {
            return Err(TargetError::EmptyExpression);
        }

        let tokens = words
            .into_iter()
            .map(|word| match Operator::from_word(word) {
                Some(op) => Ok(Token::Op(op)),
                None => Atom::classify(word, expr).map(|atom| Token::Atom(word.to_string(), atom)),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut parser = Parser {
            tokens: tokens.into_iter().enumerate().peekable(),
        };
        let root = parser.or_expr()?;
        if let Some((position, tok)) = parser.tokens.next() {
            return Err(match tok {
                Token::Op(Operator::Open) => TargetError::UnbalancedParen,
                _ => TargetError::UnexpectedToken {
                    token: tok.text().to_string(),
                    position,
                },
            });
        }

        Ok(Self {
            source: expr.to_string(),
            root,
        })
    }

    /// The expression text this was compiled from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The parsed tree.
    #[must_use]
    pub const fn root(&self) -> &Node {
        &self.root
    }

    /// Evaluate the expression against one host name.
    #[must_use]
    pub fn matches(&self, host: &str) -> bool {
        let matched = self.root.eval(host);
        tracing::trace!("compound_match {host} ? \"{}\" => {matched}", self.source);
        matched
    }
}

#[derive(Debug)]
enum Token {
    Op(Operator),
    Atom(String, Atom),
}

impl Token {
    fn text(&self) -> &str {
        match self {
            Self::Op(op) => op.as_str(),
            Self::Atom(word, _) => word,
        }
    }
}

struct Parser {
    tokens: Peekable<Enumerate<IntoIter<Token>>>,
}

impl Parser {
    fn next_is(&mut self, op: Operator) -> bool {
        self.tokens
            .next_if(|(_, tok)| matches!(tok, Token::Op(o) if *o == op))
            .is_some()
    }

    fn or_expr(&mut self) -> Result<Node, TargetError> {
        let mut children = vec![self.and_expr()?];
        while self.next_is(Operator::Or) {
            children.push(self.and_expr()?);
        }
        Ok(collapse(children, Node::Or))
    }

    fn and_expr(&mut self) -> Result<Node, TargetError> {
        let mut children = vec![self.unary()?];
        while self.next_is(Operator::And) {
            children.push(self.unary()?);
        }
        Ok(collapse(children, Node::And))
    }

    fn unary(&mut self) -> Result<Node, TargetError> {
        let Some((position, tok)) = self.tokens.next() else {
            return Err(TargetError::UnexpectedEnd);
        };
        match tok {
            Token::Atom(_, atom) => Ok(Node::Atom(atom)),
            Token::Op(Operator::Not) => Ok(Node::Not(Box::new(self.unary()?))),
            Token::Op(Operator::Open) => {
                let inner = self.or_expr()?;
                if self.next_is(Operator::Close) {
                    Ok(inner)
                } else {
                    Err(TargetError::UnbalancedParen)
                }
            }
            Token::Op(op @ (Operator::And | Operator::Or | Operator::Close)) => {
                Err(TargetError::UnexpectedToken {
                    token: op.as_str().to_string(),
                    position,
                })
            }
        }
    }
}

fn collapse(mut children: Vec<Node>, join: fn(Vec<Node>) -> Node) -> Node {
    if children.len() == 1
        && let Some(only) = children.pop()
    {
        return only;
    }
    join(children)
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;

    fn eval(expr: &str, host: &str) -> bool {
        Expression::parse(expr).expect("expression should parse").matches(host)
    }

    fn parse_err(expr: &str) -> TargetError {
        Expression::parse(expr).expect_err("expression should be rejected")
    }

    // -----------------------------------------------------------------------
    // Evaluation
    // -----------------------------------------------------------------------

    #[test]
    fn single_atom() {
        assert!(eval("web*", "web01"));
        assert!(!eval("web*", "db01"));
    }

    #[test]
    fn and_not() {
        assert!(!eval("web* and not web01", "web01"));
        assert!(eval("web* and not web01", "web02"));
    }

    #[test]
    fn not_binds_tighter_than_and_and_and_tighter_than_or() {
        // parsed as (db*) or ((web*) and (not web01))
        assert!(eval("db* or web* and not web01", "db01"));
        assert!(eval("db* or web* and not web01", "web02"));
        assert!(!eval("db* or web* and not web01", "web01"));
    }

    #[test]
    fn parentheses_override_precedence() {
        assert!(!eval("( db* or web* ) and not web01", "web01"));
        assert!(eval("( db* or web* ) and not web01", "db01"));
        assert!(!eval("not ( db* or web* )", "db01"));
        assert!(eval("not ( db* or web* )", "mail01"));
    }

    #[test]
    fn double_negation() {
        assert!(eval("not not web01", "web01"));
    }

    #[test]
    fn mixed_engines() {
        let expr = "P@web\\d and not L@web01,web03 or G@db0?";
        assert!(eval(expr, "web02"));
        assert!(!eval(expr, "web03"));
        assert!(eval(expr, "db01"));
        assert!(!eval(expr, "db011"));
    }

    #[test]
    fn nested_groups() {
        assert!(eval("( ( web01 ) )", "web01"));
    }

    #[test]
    fn tree_is_flattened_per_level() {
        let e = Expression::parse("a and b and c or d").unwrap();
        match e.root() {
            Node::Or(parts) => {
                assert_eq!(parts.len(), 2);
                assert!(matches!(&parts[0], Node::And(inner) if inner.len() == 3));
            }
            other => panic!("expected Or, got {other:?}"),
        }
    }

    // -----------------------------------------------------------------------
    // Fail-closed rejection
    // -----------------------------------------------------------------------

    #[test]
    fn empty_expression_is_rejected() {
        assert!(matches!(parse_err(""), TargetError::EmptyExpression));
    }

    #[test]
    fn leading_binary_operator_is_rejected() {
        assert!(matches!(
            parse_err("and web01"),
            TargetError::UnexpectedToken { position: 0, .. }
        ));
        assert!(matches!(parse_err("or web01"), TargetError::UnexpectedToken { .. }));
    }

    #[test]
    fn binary_operator_after_open_paren_is_rejected() {
        assert!(matches!(
            parse_err("( and web01 )"),
            TargetError::UnexpectedToken { position: 1, .. }
        ));
        assert!(matches!(parse_err("( or web01 )"), TargetError::UnexpectedToken { .. }));
    }

    #[test]
    fn adjacent_atoms_are_not_joined() {
        let err = parse_err("web* db*");
        match err {
            TargetError::UnexpectedToken { token, position } => {
                assert_eq!(token, "db*");
                assert_eq!(position, 1);
            }
            other => panic!("expected UnexpectedToken, got {other:?}"),
        }
    }

    #[test]
    fn not_without_operator_after_atom_is_rejected() {
        assert!(matches!(parse_err("web* not web01"), TargetError::UnexpectedToken { .. }));
    }

    #[test]
    fn dangling_operators_are_rejected() {
        assert!(matches!(parse_err("web* and"), TargetError::UnexpectedEnd));
        assert!(matches!(parse_err("not"), TargetError::UnexpectedEnd));
    }

    #[test]
    fn unbalanced_parentheses_are_rejected() {
        assert!(matches!(parse_err("( web*"), TargetError::UnbalancedParen));
        assert!(matches!(parse_err("web* ( db*"), TargetError::UnbalancedParen));
        assert!(matches!(parse_err("web* )"), TargetError::UnexpectedToken { .. }));
        assert!(matches!(parse_err("( )"), TargetError::UnexpectedToken { .. }));
    }

    #[test]
    fn doubled_space_yields_invalid_sequence() {
        // The empty word becomes a fallback atom right after `web*`.
        assert!(matches!(parse_err("web*  db*"), TargetError::UnexpectedToken { .. }));
    }

    #[test]
    fn invalid_regex_rejects_whole_expression() {
        assert!(matches!(
            parse_err("web* or P@[a"),
            TargetError::InvalidRegex { .. }
        ));
    }

    #[test]
    fn uppercase_operators_are_atoms() {
        assert!(matches!(parse_err("web* AND db*"), TargetError::UnexpectedToken { .. }));
    }

    #[test]
    fn source_is_kept() {
        let e = Expression::parse("web* or db*").unwrap();
        assert_eq!(e.source(), "web* or db*");
    }
}
