//! Update Conditions
//!
//! Boolean gates on update rules, read from the updated value and the
//! call's arguments.

use serde_json::Value;
use tracing::trace;

use crate::invocation::{ConditionMode, FieldLookup, MethodDescriptor, UpdateRule};

/// Marker that inverts a single condition.
pub const NEGATION_PREFIX: char = '!';

/// Evaluates a rule's conditions for one call.
///
/// A rule without conditions always applies. Conditions that do not resolve
/// to a boolean are left out before combining, and an empty combination is
/// false for both modes.
pub fn evaluate_conditions(
    rule: &UpdateRule,
    descriptor: &MethodDescriptor,
    args: &[Value],
    updated: Option<&Value>,
    lookup: &dyn FieldLookup,
) -> bool {
    if rule.conditions.is_empty() {
        return true;
    }

    let resolved: Vec<bool> = rule
        .conditions
        .iter()
        .filter_map(|condition| {
            let (negated, name) = match condition.strip_prefix(NEGATION_PREFIX) {
                Some(rest) => (true, rest.trim()),
                None => (false, condition.trim()),
            };
            let flag = resolve_flag(name, descriptor, args, updated, lookup);
            if flag.is_none() {
                trace!("Condition '{}' did not resolve; leaving it out", name);
            }
            flag.map(|value| value != negated)
        })
        .collect();

    if resolved.is_empty() {
        return false;
    }
    match rule.condition_mode {
        ConditionMode::All => resolved.iter().all(|&flag| flag),
        ConditionMode::Any => resolved.iter().any(|&flag| flag),
    }
}

/// Looks a flag up on the updated value, then a same-named boolean argument,
/// then the fields of each argument in order.
fn resolve_flag(
    name: &str,
    descriptor: &MethodDescriptor,
    args: &[Value],
    updated: Option<&Value>,
    lookup: &dyn FieldLookup,
) -> Option<bool> {
    if let Some(Ok(Value::Bool(flag))) = updated.map(|value| lookup.lookup(value, name)) {
        return Some(flag);
    }
    if let Some(Value::Bool(flag)) = descriptor.arg_index(name).and_then(|i| args.get(i)) {
        return Some(*flag);
    }
    args.iter().find_map(|arg| match lookup.lookup(arg, name) {
        Ok(Value::Bool(flag)) => Some(flag),
        _ => None,
    })
}
