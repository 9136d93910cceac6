// crates/chamber-expr/tests/tristate_properties.rs
// ============================================================================
// Suite: Algebraic properties of tri-state logic.
// ============================================================================

//! Algebraic properties of tri-state logic.
#![allow(
    clippy::missing_docs_in_private_items,
    reason = "test assertions skip doc comments"
)]

use chamber_expr::TriState;
use proptest::prelude::*;

fn any_tristate() -> impl Strategy<Value = TriState> {
    prop_oneof![
        Just(TriState::True),
        Just(TriState::False),
        Just(TriState::Unknown),
    ]
}

proptest! {
    #[test]
    fn and_is_commutative(a in any_tristate(), b in any_tristate()) {
        prop_assert_eq!(a.and(b), b.and(a));
    }

    #[test]
    fn or_is_commutative(a in any_tristate(), b in any_tristate()) {
        prop_assert_eq!(a.or(b), b.or(a));
    }

    #[test]
    fn double_negation_is_identity(a in any_tristate()) {
        prop_assert_eq!(!!a, a);
    }

    #[test]
    fn and_with_false_is_always_false(a in any_tristate()) {
        prop_assert_eq!(a.and(TriState::False), TriState::False);
    }

    #[test]
    fn or_with_true_is_always_true(a in any_tristate()) {
        prop_assert_eq!(a.or(TriState::True), TriState::True);
    }

    #[test]
    fn resolve_is_false_unless_strictly_true(a in any_tristate()) {
        let resolved = a.resolve();
        prop_assert_eq!(resolved, matches!(a, TriState::True));
    }
}
