// crates/stageflow-core/src/runtime/comparator.rs
// ============================================================================
// Module: Stageflow Value Comparison
// Description: Decimal-aware equality, ordering, and sizing of element values.
// Purpose: Give every lock kind one consistent notion of equality and order.
// Dependencies: bigdecimal, serde_json
// ============================================================================

//! ## Overview
//! Numbers are compared as `BigDecimal`, so `10` equals `10.0` and large
//! integers compare exactly. Ordering locks additionally coerce numeric
//! strings; equality never coerces across types. Booleans are never numeric.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde_json::Number;
use serde_json::Value;

// ============================================================================
// SECTION: Numeric Coercion
// ============================================================================

/// Parses a JSON number into `BigDecimal` through its stable string form.
fn decimal_from_number(number: &Number) -> Option<BigDecimal> {
    BigDecimal::from_str(&number.to_string()).ok()
}

/// Coerces a value to a decimal: numbers directly, strings when they parse.
#[must_use]
pub fn numeric_value(value: &Value) -> Option<BigDecimal> {
    match value {
        Value::Number(number) => decimal_from_number(number),
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return None;
            }
            BigDecimal::from_str(trimmed).ok()
        }
        _ => None,
    }
}

/// Orders two values numerically; `None` when either is not numeric.
#[must_use]
pub fn compare_numeric(left: &Value, right: &Value) -> Option<Ordering> {
    let left = numeric_value(left)?;
    let right = numeric_value(right)?;
    Some(left.cmp(&right))
}

// ============================================================================
// SECTION: Equality
// ============================================================================

/// Deep equality with decimal-aware number handling at every level.
#[must_use]
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => {
            match (decimal_from_number(left), decimal_from_number(right)) {
                (Some(left), Some(right)) => left == right,
                _ => left == right,
            }
        }
        (Value::Array(left), Value::Array(right)) => {
            left.len() == right.len()
                && left.iter().zip(right).all(|(left, right)| values_equal(left, right))
        }
        (Value::Object(left), Value::Object(right)) => {
            left.len() == right.len()
                && left
                    .iter()
                    .all(|(key, value)| right.get(key).is_some_and(|other| values_equal(value, other)))
        }
        _ => left == right,
    }
}

/// Returns true when `candidates` holds a value equal to `value`.
#[must_use]
pub fn contains_value(candidates: &[Value], value: &Value) -> bool {
    candidates.iter().any(|candidate| values_equal(candidate, value))
}

// ============================================================================
// SECTION: Size and Display
// ============================================================================

/// Returns the size of a string (in characters), list, or map.
#[must_use]
pub fn value_size(value: &Value) -> Option<usize> {
    match value {
        Value::String(text) => Some(text.chars().count()),
        Value::Array(items) => Some(items.len()),
        Value::Object(map) => Some(map.len()),
        _ => None,
    }
}

/// Returns true for empty strings (after trimming), lists, and maps.
#[must_use]
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Renders a value for messages: strings unquoted, everything else as JSON.
#[must_use]
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
