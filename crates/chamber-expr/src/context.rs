// crates/chamber-expr/src/context.rs
// ============================================================================
// Module: Evaluation context
// Description: The read-only view of runtime state a condition expression
//              is evaluated against.
// Purpose: Decouple chamber-expr from chamber-runtime's internal state
//          representation; the runtime adapts itself to this trait rather
//          than chamber-expr depending on runtime types.
// Dependencies: chamber-model
// ============================================================================

use chamber_model::FieldValue;

/// Resolves the three reference kinds a condition expression may mention.
///
/// Implementors return `None` for anything not yet known — an unreached
/// node, an unresolved puzzle, a field absent from the triggering event —
/// rather than guessing or panicking. [`crate::eval::evaluate`] treats a
/// missing reference as [`crate::tristate::TriState::Unknown`].
pub trait ExprContext {
    /// Returns the canonical lifecycle label of `node_id` (e.g.
    /// `"completed"`, `"active"`, `"idle"`), or `None` if the node has
    /// never been reached in the current scope.
    fn node_state(&self, node_id: &str) -> Option<&str>;

    /// Returns the canonical outcome label of `puzzle_id` (`"solved"`,
    /// `"failed"`, `"overridden"`), or `None` if the puzzle has not
    /// resolved.
    fn puzzle_outcome(&self, puzzle_id: &str) -> Option<&str>;

    /// Returns the value of `key` on the event that triggered this
    /// evaluation, or `None` if the event carries no such field.
    fn event_field(&self, key: &str) -> Option<&FieldValue>;
}

/// A fixed [`ExprContext`] built from plain maps, used in tests and for
/// one-off evaluation outside a live runtime.
#[derive(Debug, Default, Clone)]
pub struct StaticContext {
    /// Node lifecycle labels by node id.
    pub node_states: std::collections::BTreeMap<String, String>,
    /// Puzzle outcome labels by puzzle id.
    pub puzzle_outcomes: std::collections::BTreeMap<String, String>,
    /// Event fields by key.
    pub event_fields: std::collections::BTreeMap<String, FieldValue>,
}

impl ExprContext for StaticContext {
    fn node_state(&self, node_id: &str) -> Option<&str> {
        self.node_states.get(node_id).map(String::as_str)
    }

    fn puzzle_outcome(&self, puzzle_id: &str) -> Option<&str> {
        self.puzzle_outcomes.get(puzzle_id).map(String::as_str)
    }

    fn event_field(&self, key: &str) -> Option<&FieldValue> {
        self.event_fields.get(key)
    }
}
