// crates/chamber-expr/src/eval.rs
// ============================================================================
// Module: Expression evaluator
// Description: Folds an Expr tree down to a boolean against an ExprContext,
//              using tri-state logic internally.
// Purpose: Guarantee a condition expression always produces a decision —
//          never a panic, never a propagated error — while still letting
//          the caller distinguish "evaluated false" from "could not
//          resolve".
// Dependencies: crate::ast, crate::context, crate::tristate
// ============================================================================

//! ## Overview
//! [`evaluate`] is the only entry point the rest of Chamber calls. It
//! returns an [`EvalOutcome`] rather than a bare `bool` so that the caller
//! can log `system.error` for unresolved references without re-walking the
//! tree itself.

#![allow(
    clippy::missing_docs_in_private_items,
    reason = "the internal Value type and its helpers are documented by this module overview"
)]

use chamber_model::FieldValue;

use crate::ast::Comparator;
use crate::ast::Expr;
use crate::ast::Literal;
use crate::ast::Reference;
use crate::context::ExprContext;
use crate::tristate::TriState;

/// A resolved scalar value, used internally to compare operands of
/// possibly different literal kinds without panicking on a mismatch.
#[derive(Debug, Clone, PartialEq)]
enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    fn truthy(&self) -> TriState {
        match self {
            Self::Bool(value) => TriState::from_bool(*value),
            Self::Int(value) => TriState::from_bool(*value != 0),
            Self::Float(value) => TriState::from_bool(*value != 0.0),
            Self::Str(value) => TriState::from_bool(!value.is_empty()),
        }
    }

    fn from_field(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Text(text) => Some(Self::Str(text.clone())),
            FieldValue::Int(value) => Some(Self::Int(*value)),
            FieldValue::Float(value) => Some(Self::Float(*value)),
            FieldValue::Bool(value) => Some(Self::Bool(*value)),
            // Lists and maps are not comparable scalars; a condition
            // referencing one resolves to Unknown rather than panicking.
            FieldValue::List(_) | FieldValue::Map(_) => None,
        }
    }
}

/// The result of evaluating a condition expression.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalOutcome {
    /// The resolved boolean decision. `Unknown` collapses to `false` here.
    pub value: bool,
    /// Every reference the expression mentioned that could not be
    /// resolved against the context, in the order first encountered.
    pub unknown_refs: Vec<String>,
}

/// Evaluates `expr` against `ctx`.
///
/// Unresolved references never abort evaluation: they are tracked in
/// [`EvalOutcome::unknown_refs`] and contribute
/// [`TriState::Unknown`][crate::tristate::TriState::Unknown] to the
/// surrounding logic, which [`TriState::resolve`] ultimately turns into
/// `false` if nothing else in the expression settles it.
#[must_use]
pub fn evaluate(expr: &Expr, ctx: &dyn ExprContext) -> EvalOutcome {
    let mut unknown_refs = Vec::new();
    let value = eval_logical(expr, ctx, &mut unknown_refs).resolve();
    EvalOutcome { value, unknown_refs }
}

fn resolve_reference(reference: &Reference, ctx: &dyn ExprContext) -> Option<Value> {
    match reference {
        Reference::NodeState(node_id) => {
            ctx.node_state(node_id).map(|label| Value::Str(label.to_owned()))
        }
        Reference::PuzzleOutcome(puzzle_id) => ctx
            .puzzle_outcome(puzzle_id)
            .map(|label| Value::Str(label.to_owned())),
        Reference::EventField(key) => ctx.event_field(key).and_then(Value::from_field),
    }
}

fn eval_operand(expr: &Expr, ctx: &dyn ExprContext, unknown_refs: &mut Vec<String>) -> Option<Value> {
    match expr {
        Expr::Literal(Literal::Bool(value)) => Some(Value::Bool(*value)),
        Expr::Literal(Literal::Int(value)) => Some(Value::Int(*value)),
        Expr::Literal(Literal::Float(value)) => Some(Value::Float(*value)),
        Expr::Literal(Literal::Str(value)) => Some(Value::Str(value.clone())),
        Expr::Ref(reference) => {
            let resolved = resolve_reference(reference, ctx);
            if resolved.is_none() {
                unknown_refs.push(reference.to_string());
            }
            resolved
        }
        Expr::Compare(_, _, _) | Expr::And(_, _) | Expr::Or(_, _) | Expr::Not(_) => {
            match eval_logical(expr, ctx, unknown_refs) {
                TriState::True => Some(Value::Bool(true)),
                TriState::False => Some(Value::Bool(false)),
                TriState::Unknown => None,
            }
        }
    }
}

fn eval_logical(expr: &Expr, ctx: &dyn ExprContext, unknown_refs: &mut Vec<String>) -> TriState {
    match expr {
        Expr::Literal(_) | Expr::Ref(_) => eval_operand(expr, ctx, unknown_refs)
            .map_or(TriState::Unknown, |value| value.truthy()),
        Expr::Compare(lhs, comparator, rhs) => {
            let lhs = eval_operand(lhs, ctx, unknown_refs);
            let rhs = eval_operand(rhs, ctx, unknown_refs);
            match (lhs, rhs) {
                (Some(lhs), Some(rhs)) => {
                    let equal = lhs == rhs;
                    TriState::from_bool(match comparator {
                        Comparator::Eq => equal,
                        Comparator::NotEq => !equal,
                    })
                }
                _ => TriState::Unknown,
            }
        }
        Expr::And(lhs, rhs) => {
            eval_logical(lhs, ctx, unknown_refs).and(eval_logical(rhs, ctx, unknown_refs))
        }
        Expr::Or(lhs, rhs) => {
            eval_logical(lhs, ctx, unknown_refs).or(eval_logical(rhs, ctx, unknown_refs))
        }
        Expr::Not(inner) => !eval_logical(inner, ctx, unknown_refs),
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "test assertions favor unwrap/expect"
    )]

    use super::evaluate;
    use crate::context::StaticContext;
    use crate::parser::parse;
    use chamber_model::FieldValue;

    #[test]
    fn known_state_comparison_resolves_true() {
        let mut ctx = StaticContext::default();
        ctx.node_states.insert("door".to_owned(), "completed".to_owned());
        let expr = parse(r#"node.door.state == "completed""#).expect("parse");
        let outcome = evaluate(&expr, &ctx);
        assert!(outcome.value);
        assert!(outcome.unknown_refs.is_empty());
    }

    #[test]
    fn unreached_node_is_unknown_and_resolves_false() {
        let ctx = StaticContext::default();
        let expr = parse(r#"node.door.state == "completed""#).expect("parse");
        let outcome = evaluate(&expr, &ctx);
        assert!(!outcome.value);
        assert_eq!(outcome.unknown_refs, vec!["node.door.state".to_owned()]);
    }

    #[test]
    fn unknown_or_true_still_resolves_true() {
        let mut ctx = StaticContext::default();
        ctx.event_fields.insert("armed".to_owned(), FieldValue::Bool(true));
        let expr = parse(r#"node.door.state == "completed" || event.fields.armed"#)
            .expect("parse");
        let outcome = evaluate(&expr, &ctx);
        assert!(outcome.value);
        // The unresolved left side is still reported even though the
        // overall expression resolved true via the right side.
        assert_eq!(outcome.unknown_refs, vec!["node.door.state".to_owned()]);
    }

    #[test]
    fn unknown_and_true_resolves_false_but_is_reported() {
        let mut ctx = StaticContext::default();
        ctx.puzzle_outcomes.insert("lock".to_owned(), "solved".to_owned());
        let expr = parse(r#"puzzle.lock.outcome == "solved" && event.fields.missing"#)
            .expect("parse");
        let outcome = evaluate(&expr, &ctx);
        assert!(!outcome.value);
        assert_eq!(outcome.unknown_refs, vec!["event.fields.missing".to_owned()]);
    }

    #[test]
    fn mismatched_types_compare_unequal_not_unknown() {
        let mut ctx = StaticContext::default();
        ctx.event_fields.insert("count".to_owned(), FieldValue::Int(3));
        let expr = parse(r#"event.fields.count == "three""#).expect("parse");
        let outcome = evaluate(&expr, &ctx);
        assert!(!outcome.value);
        assert!(outcome.unknown_refs.is_empty());
    }

    #[test]
    fn negation_of_unknown_is_still_unknown_and_resolves_false() {
        let ctx = StaticContext::default();
        let expr = parse("!event.fields.armed").expect("parse");
        let outcome = evaluate(&expr, &ctx);
        assert!(!outcome.value);
        assert_eq!(outcome.unknown_refs, vec!["event.fields.armed".to_owned()]);
    }
}
