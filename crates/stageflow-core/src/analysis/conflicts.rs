// crates/stageflow-core/src/analysis/conflicts.rs
// ============================================================================
// Module: Stageflow Lock Conflicts
// Description: Pairwise satisfiability checks over a gate's locks.
// Purpose: Detect lock lists that no element can ever satisfy.
// Dependencies: crate::core, crate::runtime::comparator
// ============================================================================

//! ## Overview
//! Locks are grouped by property path and compared pairwise. The checks are
//! conservative: a reported conflict is always unsatisfiable, but not every
//! unsatisfiable combination is reported.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;

use serde_json::Value;

use crate::core::lock::Lock;
use crate::core::lock::LockCondition;
use crate::runtime::comparator::compare_numeric;
use crate::runtime::comparator::contains_value;
use crate::runtime::comparator::display_value;
use crate::runtime::comparator::numeric_value;
use crate::runtime::comparator::values_equal;

// ============================================================================
// SECTION: Findings
// ============================================================================

/// Unsatisfiable pair of locks within one gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// Shared property path.
    pub property_path: String,
    /// Index of the first lock of the pair.
    pub first: usize,
    /// Index of the second lock of the pair.
    pub second: usize,
    /// Human-readable explanation.
    pub reason: String,
}

/// Returns every conflicting lock pair in a gate's top-level lock list.
#[must_use]
pub fn find_conflicts(locks: &[Lock]) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    for (first, lock) in locks.iter().enumerate() {
        if let Some(reason) = self_conflict(&lock.condition) {
            conflicts.push(Conflict {
                property_path: path_of(lock),
                first,
                second: first,
                reason,
            });
        }
        for (offset, other) in locks.iter().skip(first + 1).enumerate() {
            let second = first + 1 + offset;
            let (Some(left), Some(right)) = (lock.property_path(), other.property_path()) else {
                continue;
            };
            if left != right {
                continue;
            }
            if let Some(reason) = pair_conflict(&lock.condition, &other.condition)
                .or_else(|| pair_conflict(&other.condition, &lock.condition))
            {
                conflicts.push(Conflict {
                    property_path: left.as_str().to_string(),
                    first,
                    second,
                    reason,
                });
            }
        }
    }
    conflicts
}

/// Returns the lock's path text, or an empty string for compound locks.
fn path_of(lock: &Lock) -> String {
    lock.property_path().map(|path| path.as_str().to_string()).unwrap_or_default()
}

/// Checks a single lock for an unsatisfiable expectation.
fn self_conflict(condition: &LockCondition) -> Option<String> {
    match condition {
        LockCondition::Range { min, max, .. }
            if compare_numeric(min, max) == Some(Ordering::Greater) =>
        {
            Some(format!(
                "range minimum {} exceeds maximum {}",
                display_value(min),
                display_value(max)
            ))
        }
        LockCondition::InList { values, .. } if values.is_empty() => {
            Some("in_list with no allowed values can never pass".to_string())
        }
        _ => None,
    }
}

/// Checks one ordered pair of conditions on the same path.
fn pair_conflict(left: &LockCondition, right: &LockCondition) -> Option<String> {
    match (left, right) {
        (LockCondition::Absent { .. }, other) if !matches!(other, LockCondition::Absent { .. }) => {
            Some("value must be absent but another lock requires it".to_string())
        }
        (LockCondition::Equals { expected: a, .. }, LockCondition::Equals { expected: b, .. })
            if !values_equal(a, b) =>
        {
            Some(format!(
                "value must equal both '{}' and '{}'",
                display_value(a),
                display_value(b)
            ))
        }
        (
            LockCondition::GreaterThan { threshold: low, .. },
            LockCondition::LessThan { threshold: high, .. },
        ) if compare_numeric(low, high).is_some_and(Ordering::is_ge) => Some(format!(
            "value must be greater than {} and less than {}",
            display_value(low),
            display_value(high)
        )),
        (LockCondition::GreaterThan { threshold, .. }, LockCondition::Range { max, .. })
            if compare_numeric(threshold, max).is_some_and(Ordering::is_ge) =>
        {
            Some(format!(
                "value must be greater than {} but at most {}",
                display_value(threshold),
                display_value(max)
            ))
        }
        (LockCondition::LessThan { threshold, .. }, LockCondition::Range { min, .. })
            if compare_numeric(threshold, min).is_some_and(Ordering::is_le) =>
        {
            Some(format!(
                "value must be less than {} but at least {}",
                display_value(threshold),
                display_value(min)
            ))
        }
        (
            LockCondition::Range { min: min_a, max: max_a, .. },
            LockCondition::Range { min: min_b, max: max_b, .. },
        ) if compare_numeric(min_a, max_b) == Some(Ordering::Greater)
            || compare_numeric(min_b, max_a) == Some(Ordering::Greater) =>
        {
            Some("value ranges do not overlap".to_string())
        }
        (LockCondition::Equals { expected, .. }, bound) => equals_against(expected, bound),
        (LockCondition::InList { values: allowed, .. }, LockCondition::NotInList { values: rejected, .. })
            if !allowed.is_empty() && allowed.iter().all(|value| contains_value(rejected, value)) =>
        {
            Some("every allowed value is also rejected".to_string())
        }
        _ => None,
    }
}

/// Checks an `equals` expectation against another condition on the same path.
fn equals_against(expected: &Value, other: &LockCondition) -> Option<String> {
    let shown = display_value(expected);
    let numeric = numeric_value(expected).is_some();
    match other {
        LockCondition::GreaterThan { threshold, .. }
            if !numeric || compare_numeric(expected, threshold).is_some_and(Ordering::is_le) =>
        {
            Some(format!("value must equal '{shown}' but be greater than {}", display_value(threshold)))
        }
        LockCondition::LessThan { threshold, .. }
            if !numeric || compare_numeric(expected, threshold).is_some_and(Ordering::is_ge) =>
        {
            Some(format!("value must equal '{shown}' but be less than {}", display_value(threshold)))
        }
        LockCondition::Range { min, max, .. }
            if !numeric
                || compare_numeric(expected, min) == Some(Ordering::Less)
                || compare_numeric(expected, max) == Some(Ordering::Greater) =>
        {
            Some(format!(
                "value must equal '{shown}' but lie between {} and {}",
                display_value(min),
                display_value(max)
            ))
        }
        LockCondition::InList { values, .. } if !contains_value(values, expected) => {
            Some(format!("value must equal '{shown}' which is not an allowed value"))
        }
        LockCondition::NotInList { values, .. } if contains_value(values, expected) => {
            Some(format!("value must equal '{shown}' which is a rejected value"))
        }
        _ => None,
    }
}

// ============================================================================
// SECTION: Termination Heuristic
// ============================================================================

/// Returns true when a lock suggests a loop can terminate.
///
/// Numeric bounds and comparisons against finite literal sets count; nested
/// locks of compound kinds are inspected as well.
#[must_use]
pub fn suggests_termination(lock: &Lock) -> bool {
    match &lock.condition {
        LockCondition::GreaterThan { threshold, .. } | LockCondition::LessThan { threshold, .. } => {
            numeric_value(threshold).is_some()
        }
        LockCondition::Range { min, max, .. } => {
            numeric_value(min).is_some() && numeric_value(max).is_some()
        }
        LockCondition::Length { .. } => true,
        LockCondition::Equals { expected, .. } => is_literal(expected),
        LockCondition::InList { values, .. } | LockCondition::NotInList { values, .. } => {
            !values.is_empty() && values.iter().all(is_literal)
        }
        LockCondition::Conditional { when, then, otherwise } => {
            when.iter().chain(then).chain(otherwise).any(suggests_termination)
        }
        LockCondition::OrLogic { groups } => groups.iter().flatten().any(suggests_termination),
        LockCondition::Exists { .. }
        | LockCondition::Absent { .. }
        | LockCondition::NotEmpty { .. }
        | LockCondition::Contains { .. }
        | LockCondition::Regex { .. }
        | LockCondition::TypeCheck { .. } => false,
    }
}

/// Scalar literal suitable for an enumerated comparison.
const fn is_literal(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}
