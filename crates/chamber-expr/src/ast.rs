// crates/chamber-expr/src/ast.rs
// ============================================================================
// Module: Expression AST
// Description: The syntax tree a condition string is parsed into.
// Purpose: Restrict the grammar to literal scalars, named state references,
//          comparisons, and boolean connectives — no calls, no loops, no
//          assignment.
// Dependencies: none
// ============================================================================

//! ## Overview
//! Every node here is data, not behavior: the tree carries no closures and
//! cannot reference anything outside the three reference kinds in
//! [`Reference`]. That is what makes evaluation sandboxed — there is no
//! way to express a call back into the host runtime even by accident.

use std::fmt;

/// A literal scalar value in a condition expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// `true` or `false`.
    Bool(bool),
    /// An integer literal, e.g. `3`.
    Int(i64),
    /// A floating point literal, e.g. `3.5`.
    Float(f64),
    /// A double-quoted string literal, e.g. `"completed"`.
    Str(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Str(value) => write!(f, "{value:?}"),
        }
    }
}

/// A named reference into runtime state. The three kinds cover everything
/// an edge condition or loop stop-condition is allowed to inspect.
#[derive(Debug, Clone, PartialEq)]
pub enum Reference {
    /// `node.<id>.state` — the lifecycle of a node in the active scene or
    /// enclosing puzzle subgraph.
    NodeState(String),
    /// `puzzle.<id>.outcome` — the resolved outcome of a puzzle node.
    PuzzleOutcome(String),
    /// `event.fields.<key>` — a field on the event that triggered this
    /// evaluation.
    EventField(String),
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodeState(id) => write!(f, "node.{id}.state"),
            Self::PuzzleOutcome(id) => write!(f, "puzzle.{id}.outcome"),
            Self::EventField(key) => write!(f, "event.fields.{key}"),
        }
    }
}

/// A comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    /// `==`
    Eq,
    /// `!=`
    NotEq,
}

/// The expression syntax tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal scalar.
    Literal(Literal),
    /// A named state reference.
    Ref(Reference),
    /// `lhs == rhs` or `lhs != rhs`.
    Compare(Box<Expr>, Comparator, Box<Expr>),
    /// `lhs && rhs`.
    And(Box<Expr>, Box<Expr>),
    /// `lhs || rhs`.
    Or(Box<Expr>, Box<Expr>),
    /// `!inner`.
    Not(Box<Expr>),
}
