// crates/chamber-expr/src/lib.rs
// ============================================================================
// Module: Chamber Expr
// Description: The sandboxed condition expression language evaluated by
//              scene-graph edges and loop stop-conditions.
// Purpose: Give edges and loops a way to branch on runtime state without
//          embedding a general-purpose interpreter in the runtime.
// Dependencies: chamber-model
// ============================================================================

//! ## Overview
//! A condition expression is parsed once (see [`parser::parse`]) and
//! evaluated any number of times against an [`context::ExprContext`] (see
//! [`eval::evaluate`]). The grammar supports only:
//!
//! - literal scalars (`true`, `3`, `3.5`, `"solved"`)
//! - three reference shapes: `node.<id>.state`, `puzzle.<id>.outcome`,
//!   `event.fields.<key>`
//! - `==`, `!=`, `&&`, `||`, `!`, and parentheses
//!
//! There is no call syntax and nothing in the AST can reach outside the
//! context it is evaluated against. An expression that mentions state that
//! does not exist yet evaluates to `false` rather than erroring; the
//! runtime is responsible for logging `system.error` the first time a
//! given expression reports an unresolved reference, using
//! [`eval::EvalOutcome::unknown_refs`].
//!
//! Internally, evaluation folds the tree through a three-valued logic
//! (see [`tristate::TriState`]) so that `unknown || true` still resolves to
//! `true` instead of short-circuiting to `false` the moment one operand
//! can't be resolved.

pub mod ast;
/// The read-only view of runtime state a condition expression is evaluated against.
pub mod context;
pub mod eval;
pub mod parser;
pub mod tristate;

pub use ast::Comparator;
pub use ast::Expr;
pub use ast::Literal;
pub use ast::Reference;
pub use context::ExprContext;
pub use context::StaticContext;
pub use eval::evaluate;
pub use eval::EvalOutcome;
pub use parser::parse;
pub use parser::ParseError;
pub use tristate::TriState;

/// Parses and immediately evaluates a condition expression in one step.
///
/// This is a convenience for call sites that do not cache the parsed
/// [`Expr`]; the graph runtime parses each edge condition once at scene
/// load and calls [`evaluate`] directly thereafter.
///
/// # Errors
///
/// Returns [`ParseError`] if `source` is not a well-formed condition
/// expression.
pub fn parse_and_evaluate(source: &str, ctx: &dyn ExprContext) -> Result<EvalOutcome, ParseError> {
    let expr = parse(source)?;
    Ok(evaluate(&expr, ctx))
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "test assertions favor unwrap/expect"
    )]

    use super::parse_and_evaluate;
    use crate::context::StaticContext;

    #[test]
    fn convenience_entry_point_parses_and_evaluates() {
        let mut ctx = StaticContext::default();
        ctx.node_states.insert("door".to_owned(), "completed".to_owned());
        let outcome = parse_and_evaluate(r#"node.door.state == "completed""#, &ctx)
            .expect("parse and evaluate");
        assert!(outcome.value);
    }

    #[test]
    fn convenience_entry_point_propagates_parse_error() {
        let ctx = StaticContext::default();
        let err = parse_and_evaluate("node.door.unknown_field == true", &ctx).unwrap_err();
        assert!(matches!(err, super::ParseError::MalformedReference(_)));
    }
}
