// crates/chamber-expr/src/parser.rs
// ============================================================================
// Module: Condition expression parser
// Description: Hand-written tokenizer and recursive-descent parser for the
//              condition expression grammar.
// Purpose: Turn a config-authored string into an Expr without pulling in a
//          general-purpose parser generator or scripting engine.
// Dependencies: crate::ast
// ============================================================================

//! ## Overview
//! Grammar, loosest to tightest binding:
//!
//! ```text
//! expr       := or_expr
//! or_expr    := and_expr ( "||" and_expr )*
//! and_expr   := unary     ( "&&" unary )*
//! unary      := "!" unary | compare
//! compare    := atom ( ("==" | "!=") atom )?
//! atom       := literal | reference | "(" expr ")"
//! reference  := "node" "." ident "." "state"
//!             | "puzzle" "." ident "." "outcome"
//!             | "event" "." "fields" "." ident
//! literal    := "true" | "false" | number | string
//! ```
//!
//! There is deliberately no precedence climbing beyond this table and no
//! way to add a new operator short of editing this file.

#![allow(
    clippy::missing_docs_in_private_items,
    reason = "tokenizer and parser internals are documented by the grammar above, not per-field"
)]

use std::iter::Peekable;
use std::str::CharIndices;

use thiserror::Error;

use crate::ast::Comparator;
use crate::ast::Expr;
use crate::ast::Literal;
use crate::ast::Reference;

/// An error produced while parsing a condition expression.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The expression ended in the middle of a construct.
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    /// A token was encountered where it does not belong.
    #[error("unexpected token {0:?}")]
    UnexpectedToken(String),
    /// A reference did not match one of the three permitted shapes.
    #[error("malformed reference: {0}")]
    MalformedReference(String),
    /// A string literal was never closed.
    #[error("unterminated string literal")]
    UnterminatedString,
    /// Trailing input remained after a complete expression was parsed.
    #[error("unexpected trailing input: {0:?}")]
    TrailingInput(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    True,
    False,
    AndAnd,
    OrOr,
    Bang,
    EqEq,
    NotEq,
    LParen,
    RParen,
}

fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    let mut chars: Peekable<CharIndices<'_>> = source.char_indices().peekable();
    let mut tokens = Vec::new();

    while let Some(&(start, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }
        match ch {
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '!' => {
                chars.next();
                if matches!(chars.peek(), Some((_, '='))) {
                    chars.next();
                    tokens.push(Token::NotEq);
                } else {
                    tokens.push(Token::Bang);
                }
            }
            '=' => {
                chars.next();
                if matches!(chars.peek(), Some((_, '='))) {
                    chars.next();
                    tokens.push(Token::EqEq);
                } else {
                    return Err(ParseError::UnexpectedToken("=".to_owned()));
                }
            }
            '&' => {
                chars.next();
                if matches!(chars.peek(), Some((_, '&'))) {
                    chars.next();
                    tokens.push(Token::AndAnd);
                } else {
                    return Err(ParseError::UnexpectedToken("&".to_owned()));
                }
            }
            '|' => {
                chars.next();
                if matches!(chars.peek(), Some((_, '|'))) {
                    chars.next();
                    tokens.push(Token::OrOr);
                } else {
                    return Err(ParseError::UnexpectedToken("|".to_owned()));
                }
            }
            '"' => {
                chars.next();
                let mut value = String::new();
                let mut closed = false;
                for (_, next) in chars.by_ref() {
                    if next == '"' {
                        closed = true;
                        break;
                    }
                    value.push(next);
                }
                if !closed {
                    return Err(ParseError::UnterminatedString);
                }
                tokens.push(Token::Str(value));
            }
            c if c.is_ascii_digit() => {
                let mut end = start;
                let mut saw_dot = false;
                while let Some(&(idx, next)) = chars.peek() {
                    if next.is_ascii_digit() {
                        end = idx;
                        chars.next();
                    } else if next == '.' && !saw_dot {
                        saw_dot = true;
                        end = idx;
                        chars.next();
                    } else {
                        break;
                    }
                }
                let text = &source[start..=end];
                if saw_dot {
                    let value: f64 = text
                        .parse()
                        .map_err(|_| ParseError::UnexpectedToken(text.to_owned()))?;
                    tokens.push(Token::Float(value));
                } else {
                    let value: i64 = text
                        .parse()
                        .map_err(|_| ParseError::UnexpectedToken(text.to_owned()))?;
                    tokens.push(Token::Int(value));
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut end = start;
                while let Some(&(idx, next)) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' || next == '.' {
                        end = idx;
                        chars.next();
                    } else {
                        break;
                    }
                }
                let text = &source[start..=end];
                match text {
                    "true" => tokens.push(Token::True),
                    "false" => tokens.push(Token::False),
                    _ => tokens.push(Token::Ident(text.to_owned())),
                }
            }
            other => return Err(ParseError::UnexpectedToken(other.to_string())),
        }
    }

    Ok(tokens)
}

fn reference_from_path(path: &str) -> Result<Reference, ParseError> {
    let segments: Vec<&str> = path.split('.').collect();
    match segments.as_slice() {
        ["node", id, "state"] => Ok(Reference::NodeState((*id).to_owned())),
        ["puzzle", id, "outcome"] => Ok(Reference::PuzzleOutcome((*id).to_owned())),
        ["event", "fields", key] => Ok(Reference::EventField((*key).to_owned())),
        _ => Err(ParseError::MalformedReference(path.to_owned())),
    }
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        self.position += 1;
        token
    }

    fn expect(&mut self, expected: &Token) -> Result<(), ParseError> {
        match self.advance() {
            Some(ref token) if token == expected => Ok(()),
            Some(token) => Err(ParseError::UnexpectedToken(format!("{token:?}"))),
            None => Err(ParseError::UnexpectedEnd),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_and()?;
        while matches!(self.peek(), Some(Token::OrOr)) {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;
        while matches!(self.peek(), Some(Token::AndAnd)) {
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if matches!(self.peek(), Some(Token::Bang)) {
            self.advance();
            let inner = self.parse_unary()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_compare()
    }

    fn parse_compare(&mut self) -> Result<Expr, ParseError> {
        let lhs = self.parse_atom()?;
        let comparator = match self.peek() {
            Some(Token::EqEq) => Some(Comparator::Eq),
            Some(Token::NotEq) => Some(Comparator::NotEq),
            _ => None,
        };
        let Some(comparator) = comparator else {
            return Ok(lhs);
        };
        self.advance();
        let rhs = self.parse_atom()?;
        Ok(Expr::Compare(Box::new(lhs), comparator, Box::new(rhs)))
    }

    fn parse_atom(&mut self) -> Result<Expr, ParseError> {
        match self.advance() {
            Some(Token::True) => Ok(Expr::Literal(Literal::Bool(true))),
            Some(Token::False) => Ok(Expr::Literal(Literal::Bool(false))),
            Some(Token::Int(value)) => Ok(Expr::Literal(Literal::Int(value))),
            Some(Token::Float(value)) => Ok(Expr::Literal(Literal::Float(value))),
            Some(Token::Str(value)) => Ok(Expr::Literal(Literal::Str(value))),
            Some(Token::Ident(path)) => Ok(Expr::Ref(reference_from_path(&path)?)),
            Some(Token::LParen) => {
                let inner = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(token) => Err(ParseError::UnexpectedToken(format!("{token:?}"))),
            None => Err(ParseError::UnexpectedEnd),
        }
    }
}

/// Parses a condition expression string into an [`Expr`].
///
/// # Errors
///
/// Returns [`ParseError`] when `source` is not well-formed under the
/// grammar documented on this module.
pub fn parse(source: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser { tokens, position: 0 };
    let expr = parser.parse_expr()?;
    if parser.position != parser.tokens.len() {
        let remaining = parser.tokens[parser.position..]
            .iter()
            .map(|token| format!("{token:?}"))
            .collect::<Vec<_>>()
            .join(" ");
        return Err(ParseError::TrailingInput(remaining));
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::missing_docs_in_private_items,
        reason = "test assertions favor unwrap/expect and skip doc comments"
    )]

    use super::parse;
    use crate::ast::Comparator;
    use crate::ast::Expr;
    use crate::ast::Literal;
    use crate::ast::Reference;

    #[test]
    fn parses_simple_state_comparison() {
        let expr = parse(r#"node.door.state == "completed""#).expect("parse");
        assert_eq!(
            expr,
            Expr::Compare(
                Box::new(Expr::Ref(Reference::NodeState("door".to_owned()))),
                Comparator::Eq,
                Box::new(Expr::Literal(Literal::Str("completed".to_owned()))),
            )
        );
    }

    #[test]
    fn parses_conjunction_with_parens() {
        let expr = parse(
            r#"(puzzle.lock.outcome == "solved") && event.fields.retries != 3"#,
        )
        .expect("parse");
        assert!(matches!(expr, Expr::And(_, _)));
    }

    #[test]
    fn parses_negation() {
        let expr = parse("!event.fields.armed").expect("parse");
        assert!(matches!(expr, Expr::Not(_)));
    }

    #[test]
    fn rejects_malformed_reference() {
        let err = parse("node.door.unknown_field == true").unwrap_err();
        assert!(matches!(err, super::ParseError::MalformedReference(_)));
    }

    #[test]
    fn rejects_trailing_garbage() {
        let err = parse("true true").unwrap_err();
        assert!(matches!(err, super::ParseError::TrailingInput(_)));
    }

    #[test]
    fn rejects_unterminated_string() {
        let err = parse(r#"event.fields.name == "oops"#).unwrap_err();
        assert_eq!(err, super::ParseError::UnterminatedString);
    }
}
