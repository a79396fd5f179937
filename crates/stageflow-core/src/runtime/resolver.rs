// crates/stageflow-core/src/runtime/resolver.rs
// ============================================================================
// Module: Stageflow Property Resolver
// Description: Reads values out of nested elements by property path.
// Purpose: Resolve paths softly so caller data never causes evaluation errors.
// Dependencies: crate::core, serde_json
// ============================================================================

//! ## Overview
//! Resolution walks a parsed [`PropertyPath`] through an element. Any missing
//! key, out-of-range index, or scalar-where-collection-expected step yields
//! `None`. The length accessor returns the size of the resolved string,
//! list, or map; sizing a scalar or a missing value is also `None`, never zero.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::borrow::Cow;

use serde_json::Value;

use crate::core::path::PathAccessor;
use crate::core::path::PathSegment;
use crate::core::path::PropertyPath;
use crate::runtime::comparator::value_size;
use crate::runtime::comparator::values_equal;

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Resolves a parsed path against an element.
///
/// A trailing `.length` segment falls back to the size of its parent when the
/// parent has no literal `length` key.
#[must_use]
pub fn resolve<'a>(root: &'a Value, path: &PropertyPath) -> Option<Cow<'a, Value>> {
    let segments = path.segments();
    match path.accessor() {
        PathAccessor::Length => {
            let target = walk(root, segments)?;
            value_size(target).map(|size| Cow::Owned(Value::from(size)))
        }
        PathAccessor::Value => {
            if let Some(found) = walk(root, segments) {
                return Some(Cow::Borrowed(found));
            }
            match segments.split_last() {
                Some((PathSegment::Field(last), parent))
                    if last == "length" && !parent.is_empty() =>
                {
                    let target = walk(root, parent)?;
                    value_size(target).map(|size| Cow::Owned(Value::from(size)))
                }
                _ => None,
            }
        }
    }
}

/// Parses and resolves an ad-hoc path; unparseable paths resolve to `None`.
#[must_use]
pub fn resolve_str(root: &Value, path: &str) -> Option<Value> {
    let parsed = PropertyPath::parse(path).ok()?;
    resolve(root, &parsed).map(Cow::into_owned)
}

/// Returns true when the path resolves to a non-null value.
#[must_use]
pub fn has_property(root: &Value, path: &PropertyPath) -> bool {
    resolve(root, path).is_some_and(|value| !value.is_null())
}

/// Walks segments from `root`, returning the addressed value.
fn walk<'a>(root: &'a Value, segments: &[PathSegment]) -> Option<&'a Value> {
    segments.iter().try_fold(root, |current, segment| step(current, segment))
}

/// Applies one segment to the current value.
fn step<'a>(current: &'a Value, segment: &PathSegment) -> Option<&'a Value> {
    match (segment, current) {
        (PathSegment::Field(name), Value::Object(map)) => map.get(name),
        (PathSegment::Field(name), Value::Array(items)) => {
            name.parse::<usize>().ok().and_then(|index| items.get(index))
        }
        (PathSegment::Index(index), Value::Array(items)) => items.get(*index),
        (PathSegment::Index(index), Value::Object(map)) => map.get(&index.to_string()),
        (PathSegment::Filter(filter), Value::Array(items)) => items.iter().find(|item| {
            walk(item, &filter.property).is_some_and(|value| values_equal(value, &filter.expected))
        }),
        _ => None,
    }
}
