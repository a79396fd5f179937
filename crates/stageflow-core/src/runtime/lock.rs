// crates/stageflow-core/src/runtime/lock.rs
// ============================================================================
// Module: Stageflow Lock Evaluation
// Description: Evaluates one lock against an element.
// Purpose: Produce pass/fail plus the diagnostics used for action derivation.
// Dependencies: crate::core, crate::runtime::{comparator, resolver}
// ============================================================================

//! ## Overview
//! Lock evaluation is a single exhaustive match over [`LockCondition`]. Every
//! single-path kind first requires the value to exist; a missing value fails
//! with [`FailureReason::MissingValue`] so the stage evaluator can ask for
//! data instead of a correction. Evaluation is pure: the same lock and
//! element always produce the same [`LockResult`]. The absence lock inverts
//! the presence check and passes only on a missing or null value.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::borrow::Cow;
use std::cmp::Ordering;

use serde_json::Value;

use crate::core::lock::LengthBound;
use crate::core::lock::Lock;
use crate::core::lock::LockCondition;
use crate::core::lock::ValueKind;
use crate::core::path::PathAccessor;
use crate::core::path::PropertyPath;
use crate::core::results::FailureReason;
use crate::core::results::LockResult;
use crate::runtime::comparator::compare_numeric;
use crate::runtime::comparator::contains_value;
use crate::runtime::comparator::display_value;
use crate::runtime::comparator::is_empty_value;
use crate::runtime::comparator::value_size;
use crate::runtime::comparator::values_equal;
use crate::runtime::resolver::resolve;

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Evaluates a lock against an element.
#[must_use]
pub fn evaluate_lock(lock: &Lock, element: &Value) -> LockResult {
    match &lock.condition {
        LockCondition::Conditional { when, then, otherwise } => {
            evaluate_conditional(lock, when, then, otherwise, element)
        }
        LockCondition::OrLogic { groups } => evaluate_or(lock, groups, element),
        _ => evaluate_single(lock, element),
    }
}

/// Evaluates every lock in order, without short-circuiting.
#[must_use]
pub fn evaluate_all(locks: &[Lock], element: &Value) -> Vec<LockResult> {
    locks.iter().map(|lock| evaluate_lock(lock, element)).collect()
}

/// Evaluates a single-path lock.
fn evaluate_single(lock: &Lock, element: &Value) -> LockResult {
    let Some(path) = lock.property_path() else {
        return fail(lock, FailureReason::CheckFailed, None, String::new());
    };
    let observed = match &lock.condition {
        LockCondition::Length { .. } => resolve_length_target(element, path),
        _ => resolve(element, path),
    };
    let present = observed.filter(|value| !value.is_null());
    if matches!(lock.condition, LockCondition::Absent { .. }) {
        return match present {
            None => pass(lock, None),
            Some(value) => {
                let message =
                    format!("Property '{path}' must not be present but is '{}'", display_value(&value));
                fail(lock, FailureReason::CheckFailed, Some(value.into_owned()), message)
            }
        };
    }
    let Some(observed) = present else {
        return fail(lock, FailureReason::MissingValue, None, missing_message(path));
    };
    match check(&lock.condition, path, &observed) {
        Ok(()) => pass(lock, Some(observed.into_owned())),
        Err(message) => fail(lock, FailureReason::CheckFailed, Some(observed.into_owned()), message),
    }
}

/// Resolves the value a `length` lock measures, ignoring any accessor wrapper.
fn resolve_length_target<'a>(element: &'a Value, path: &PropertyPath) -> Option<Cow<'a, Value>> {
    match path.accessor() {
        PathAccessor::Length => resolve(element, &path.to_value()),
        PathAccessor::Value => resolve(element, path),
    }
}

/// Applies the kind-specific check to a present value.
fn check(condition: &LockCondition, path: &PropertyPath, observed: &Value) -> Result<(), String> {
    let shown = display_value(observed);
    match condition {
        LockCondition::Exists { .. }
        | LockCondition::Absent { .. }
        | LockCondition::Conditional { .. }
        | LockCondition::OrLogic { .. } => Ok(()),
        LockCondition::NotEmpty { .. } => {
            ensure(!is_empty_value(observed), || missing_message(path))
        }
        LockCondition::Equals { expected, .. } => ensure(values_equal(observed, expected), || {
            format!(
                "Property '{path}' should equal '{}' but is '{shown}'",
                display_value(expected)
            )
        }),
        LockCondition::GreaterThan { threshold, .. } => {
            ensure(compare_numeric(observed, threshold) == Some(Ordering::Greater), || {
                format!(
                    "Property '{path}' should be greater than {} but is {shown}",
                    display_value(threshold)
                )
            })
        }
        LockCondition::LessThan { threshold, .. } => {
            ensure(compare_numeric(observed, threshold) == Some(Ordering::Less), || {
                format!(
                    "Property '{path}' should be less than {} but is {shown}",
                    display_value(threshold)
                )
            })
        }
        LockCondition::Range { min, max, .. } => {
            let above_min = compare_numeric(observed, min).is_some_and(Ordering::is_ge);
            let below_max = compare_numeric(observed, max).is_some_and(Ordering::is_le);
            ensure(above_min && below_max, || {
                format!(
                    "Property '{path}' should be between {} and {} but is {shown}",
                    display_value(min),
                    display_value(max)
                )
            })
        }
        LockCondition::InList { values, .. } => ensure(contains_value(values, observed), || {
            format!("Property '{path}' should be one of {} but is '{shown}'", Value::from(values.clone()))
        }),
        LockCondition::NotInList { values, .. } => {
            ensure(!contains_value(values, observed), || {
                format!(
                    "Property '{path}' should not be one of {} but is '{shown}'",
                    Value::from(values.clone())
                )
            })
        }
        LockCondition::Contains { needle, .. } => ensure(value_contains(observed, needle), || {
            format!("Property '{path}' should contain '{}' but is '{shown}'", display_value(needle))
        }),
        LockCondition::Regex { pattern, .. } => {
            let matched = observed.as_str().is_some_and(|text| pattern.is_match(text));
            ensure(matched, || {
                format!("Property '{path}' should match pattern '{}' but is '{shown}'", pattern.source())
            })
        }
        LockCondition::Length { bound, .. } => check_length(path, *bound, observed),
        LockCondition::TypeCheck { expected, .. } => ensure(expected.matches(observed), || {
            format!(
                "Property '{path}' should be of type '{expected}' but is '{}' with value '{shown}'",
                ValueKind::of(observed)
            )
        }),
    }
}

/// Checks a size expectation against a string or collection.
fn check_length(path: &PropertyPath, bound: LengthBound, observed: &Value) -> Result<(), String> {
    match value_size(observed) {
        Some(size) => ensure(bound.accepts(size), || {
            format!("Property '{path}' should have length {bound} but has {size}")
        }),
        None => Err(format!(
            "Property '{path}' should have length {bound} but is not a string or collection"
        )),
    }
}

/// Membership for lists (by value, then by string form), keys for maps, substring for strings.
fn value_contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::Array(items) => {
            let rendered = display_value(needle);
            contains_value(items, needle) || items.iter().any(|item| display_value(item) == rendered)
        }
        Value::Object(map) => map.contains_key(&display_value(needle)),
        Value::String(text) => text.contains(&display_value(needle)),
        _ => false,
    }
}

/// Returns `Ok(())` when `passed`, else the lazily built message.
fn ensure(passed: bool, message: impl FnOnce() -> String) -> Result<(), String> {
    if passed { Ok(()) } else { Err(message()) }
}

/// Default message for a missing or empty value.
fn missing_message(path: &PropertyPath) -> String {
    format!("Property '{path}' is required but missing or empty")
}

// ============================================================================
// SECTION: Compound Locks
// ============================================================================

/// Evaluates a conditional lock: guard, then the matching branch.
fn evaluate_conditional(
    lock: &Lock,
    when: &[Lock],
    then: &[Lock],
    otherwise: &[Lock],
    element: &Value,
) -> LockResult {
    let guard = evaluate_all(when, element);
    let guard_passed = guard.iter().all(|result| result.passed);
    let branch = if guard_passed { evaluate_all(then, element) } else { evaluate_all(otherwise, element) };
    let passed = branch.iter().all(|result| result.passed);
    let mut nested = guard;
    nested.extend(branch);
    if passed {
        return LockResult {
            nested,
            ..pass(lock, None)
        };
    }
    let failing: Vec<&LockResult> = nested
        .iter()
        .skip(when.len())
        .filter(|result| !result.passed)
        .collect();
    let reason = combined_reason(&failing);
    let detail = failing
        .iter()
        .filter_map(|result| result.error_message.as_deref())
        .collect::<Vec<_>>()
        .join("; ");
    let branch_name = if guard_passed { "then" } else { "else" };
    let message = format!("Conditional requirement ({branch_name} branch) failed: {detail}");
    LockResult {
        nested,
        ..fail(lock, reason, None, message)
    }
}

/// Evaluates an OR lock: any group whose locks all pass satisfies it.
fn evaluate_or(lock: &Lock, groups: &[Vec<Lock>], element: &Value) -> LockResult {
    let group_results: Vec<Vec<LockResult>> =
        groups.iter().map(|group| evaluate_all(group, element)).collect();
    let passed = group_results.iter().any(|results| results.iter().all(|result| result.passed));
    let summaries: Vec<String> = group_results
        .iter()
        .map(|results| {
            results
                .iter()
                .filter(|result| !result.passed)
                .filter_map(|result| result.error_message.clone())
                .collect::<Vec<_>>()
                .join(" and ")
        })
        .collect();
    let nested: Vec<LockResult> = group_results.into_iter().flatten().collect();
    if passed {
        return LockResult {
            nested,
            ..pass(lock, None)
        };
    }
    let failing: Vec<&LockResult> = nested.iter().filter(|result| !result.passed).collect();
    let reason = combined_reason(&failing);
    let message = format!("None of the alternative conditions passed: {}", summaries.join(" OR "));
    LockResult {
        nested,
        ..fail(lock, reason, None, message)
    }
}

/// Missing only when every failing nested lock is missing data.
fn combined_reason(failing: &[&LockResult]) -> FailureReason {
    if !failing.is_empty() && failing.iter().all(|result| result.is_missing_value()) {
        FailureReason::MissingValue
    } else {
        FailureReason::CheckFailed
    }
}

// ============================================================================
// SECTION: Result Builders
// ============================================================================

/// Builds a passing result.
fn pass(lock: &Lock, observed: Option<Value>) -> LockResult {
    LockResult {
        lock_type: lock.lock_type(),
        property_path: lock.property_path().map(|path| path.as_str().to_string()),
        passed: true,
        failure: None,
        error_message: None,
        observed_value: observed,
        expected_value: lock.expected_value(),
        nested: Vec::new(),
    }
}

/// Builds a failing result; the lock's custom message wins over `message`.
fn fail(lock: &Lock, reason: FailureReason, observed: Option<Value>, message: String) -> LockResult {
    let message = lock.error_message.clone().unwrap_or(message);
    LockResult {
        lock_type: lock.lock_type(),
        property_path: lock.property_path().map(|path| path.as_str().to_string()),
        passed: false,
        failure: Some(reason),
        error_message: Some(message),
        observed_value: observed,
        expected_value: lock.expected_value(),
        nested: Vec::new(),
    }
}
