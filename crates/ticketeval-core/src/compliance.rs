//! Reproduction-steps compliance

use serde_json::Value;

use crate::rules::StepsRules;
use crate::ticket::Ticket;

/// A ticket is compliant when `steps` is a list holding at least `min_steps`
/// string entries (non-blank ones only, when `require_non_empty` is set).
pub fn steps_compliant(ticket: &Ticket, rules: &StepsRules) -> bool {
    let Some(steps) = ticket.steps() else {
        return false;
    };

    let counted = steps
        .iter()
        .filter_map(Value::as_str)
        .filter(|s| !rules.require_non_empty || !s.trim().is_empty())
        .count();

    counted >= rules.min_steps
}
