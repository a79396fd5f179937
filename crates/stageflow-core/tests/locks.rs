// crates/stageflow-core/tests/locks.rs
// ============================================================================
// Module: Lock Evaluation Tests
// Description: Per-kind lock semantics, compound locks, and purity.
// Purpose: Ensure every lock kind passes and fails exactly as documented.
// ============================================================================

//! Lock building and evaluation tests.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use proptest::prelude::*;
use serde_json::Value;
use serde_json::json;
use stageflow_core::DEFAULT_MAX_LOCK_DEPTH;
use stageflow_core::DefinitionError;
use stageflow_core::FailureReason;
use stageflow_core::Lock;
use stageflow_core::LockDefinition;
use stageflow_core::LockResult;
use stageflow_core::LockType;
use stageflow_core::RegexAnchoring;
use stageflow_core::loader::locks::LockBuilder;
use stageflow_core::runtime::evaluate_lock;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn try_build(anchoring: RegexAnchoring, definition: Value) -> Result<Lock, DefinitionError> {
    let definition: LockDefinition = serde_json::from_value(definition).unwrap();
    LockBuilder::new(anchoring, DEFAULT_MAX_LOCK_DEPTH).build(&definition)
}

fn build(definition: Value) -> Lock {
    try_build(RegexAnchoring::Start, definition).unwrap()
}

fn eval(definition: Value, element: &Value) -> LockResult {
    evaluate_lock(&build(definition), element)
}

fn passes(definition: &Value, element: &Value) -> bool {
    eval(definition.clone(), element).passed
}

// ============================================================================
// SECTION: Single-Path Kinds
// ============================================================================

/// Verifies exists accepts falsy values and reports missing data distinctly.
#[test]
fn exists_accepts_falsy_values() {
    let element = json!({"flag": false, "count": 0, "text": "", "gone": null});
    for path in ["flag", "count", "text"] {
        assert!(passes(&json!({"exists": path}), &element), "{path} should exist");
    }
    for path in ["gone", "absent"] {
        let result = eval(json!({"exists": path}), &element);
        assert!(!result.passed);
        assert_eq!(result.failure, Some(FailureReason::MissingValue));
        assert!(result.error_message.unwrap().contains("is required"));
    }
}

/// Verifies exists with a false expectation passes only on missing or null values.
#[test]
fn exists_false_requires_absence() {
    let forbidden = json!({"type": "exists", "property_path": "blocker", "expected_value": false});
    let lock = build(forbidden.clone());
    assert_eq!(lock.lock_type(), LockType::Exists);
    assert!(!lock.implies_existence());
    assert!(passes(&forbidden, &json!({})));
    assert!(passes(&forbidden, &json!({"blocker": null})));

    let present = eval(forbidden, &json!({"blocker": "legal hold"}));
    assert!(!present.passed);
    assert_eq!(present.failure, Some(FailureReason::CheckFailed));
    assert_eq!(present.observed_value, Some(json!("legal hold")));
    assert_eq!(present.expected_value, Some(json!(false)));
    assert!(present.error_message.unwrap().contains("must not be present"));

    let required = json!({"type": "exists", "property_path": "owner", "expected_value": true});
    assert!(build(required.clone()).implies_existence());
    assert!(!passes(&required, &json!({})));
    assert!(passes(&required, &json!({"owner": "ana"})));
}

/// Verifies not_empty rejects blank strings and empty collections as check failures.
#[test]
fn not_empty_rejects_blank_values() {
    let element = json!({"blank": "   ", "list": [], "map": {}, "text": "x", "zero": 0});
    for path in ["blank", "list", "map"] {
        let result = eval(json!({"not_empty": path}), &element);
        assert!(!result.passed, "{path} should be empty");
        assert_eq!(result.failure, Some(FailureReason::CheckFailed));
    }
    assert!(passes(&json!({"not_empty": "text"}), &element));
    assert!(passes(&json!({"not_empty": "zero"}), &element));
    assert_eq!(
        eval(json!({"not_empty": "absent"}), &element).failure,
        Some(FailureReason::MissingValue)
    );
}

/// Verifies equals compares numbers by value at every nesting level.
#[test]
fn equals_is_deep_and_decimal_aware() {
    let lock = json!({"type": "equals", "property_path": "a", "expected_value": 1});
    assert!(passes(&lock, &json!({"a": 1.0})));
    assert!(!passes(&lock, &json!({"a": "1"})));

    let nested = json!({"type": "EQUALS", "property": "a", "expected_value": {"x": [1, 2]}});
    assert!(passes(&nested, &json!({"a": {"x": [1.0, 2]}})));
    assert!(!passes(&nested, &json!({"a": {"x": [2, 1]}})));

    assert!(passes(&json!({"is_true": "ok"}), &json!({"ok": true})));
    assert!(!passes(&json!({"is_true": "ok"}), &json!({"ok": "true"})));
    assert!(passes(&json!({"is_false": "ok"}), &json!({"ok": false})));
}

/// Verifies strict numeric comparisons coerce numeric strings.
#[test]
fn numeric_comparisons_are_strict() {
    let gt = json!({"type": "greater_than", "property_path": "n", "expected_value": 10});
    assert!(passes(&gt, &json!({"n": 11})));
    assert!(passes(&gt, &json!({"n": "10.5"})));
    assert!(!passes(&gt, &json!({"n": 10})));
    let non_numeric = eval(gt, &json!({"n": "ten"}));
    assert_eq!(non_numeric.failure, Some(FailureReason::CheckFailed));
    assert_eq!(non_numeric.observed_value, Some(json!("ten")));

    let lt = json!({"type": "less_than", "property_path": "n", "expected_value": "0.1"});
    assert!(passes(&lt, &json!({"n": 0.05})));
    assert!(!passes(&lt, &json!({"n": 0.1})));
}

/// Verifies range bounds are inclusive in every accepted form.
#[test]
fn range_bounds_are_inclusive() {
    let forms = [
        json!({"type": "range", "property_path": "n", "expected_value": [1, 5]}),
        json!({"type": "range", "property_path": "n", "expected_value": {"min": 1, "max": 5}}),
        json!({"type": "range", "property_path": "n", "metadata": {"min_value": 1, "max_value": 5}}),
    ];
    for lock in &forms {
        assert!(passes(lock, &json!({"n": 1})));
        assert!(passes(lock, &json!({"n": 5})));
        assert!(!passes(lock, &json!({"n": 5.01})));
        assert!(!passes(lock, &json!({"n": 0})));
    }
    assert_eq!(build(forms[0].clone()).expected_value(), Some(json!([1, 5])));
}

/// Verifies list membership in both directions.
#[test]
fn membership_locks_use_value_equality() {
    let in_list =
        json!({"type": "in_list", "property_path": "s", "expected_value": ["open", "closed", 3]});
    assert!(passes(&in_list, &json!({"s": "open"})));
    assert!(passes(&in_list, &json!({"s": 3.0})));
    assert!(!passes(&in_list, &json!({"s": "pending"})));

    let not_in = json!({"type": "not_in_list", "property_path": "s", "expected_value": ["banned"]});
    assert!(passes(&not_in, &json!({"s": "ok"})));
    assert!(!passes(&not_in, &json!({"s": "banned"})));
    assert_eq!(
        eval(not_in, &json!({})).failure,
        Some(FailureReason::MissingValue)
    );
}

/// Verifies contains on lists, strings, and maps.
#[test]
fn contains_inspects_collections_and_strings() {
    let lock = json!({"type": "contains", "property_path": "v", "expected_value": "ab"});
    assert!(passes(&lock, &json!({"v": ["x", "ab"]})));
    assert!(passes(&lock, &json!({"v": "xaby"})));
    assert!(passes(&lock, &json!({"v": {"ab": 1}})));
    assert!(!passes(&lock, &json!({"v": ["abc"]})));
    assert!(!passes(&lock, &json!({"v": 12})));

    let numeric = json!({"type": "contains", "property_path": "v", "expected_value": 2});
    assert!(passes(&numeric, &json!({"v": [1, 2.0]})));
    assert!(passes(&numeric, &json!({"v": ["2"]})));
}

/// Verifies regex anchoring modes.
#[test]
fn regex_respects_anchoring() {
    let lock = json!({"type": "regex", "property_path": "code", "expected_value": "ab[0-9]"});
    let element = json!({"code": "xab1"});
    let start = try_build(RegexAnchoring::Start, lock.clone()).unwrap();
    let search = try_build(RegexAnchoring::Search, lock.clone()).unwrap();
    let full = try_build(RegexAnchoring::Full, lock).unwrap();

    assert!(!evaluate_lock(&start, &element).passed);
    assert!(evaluate_lock(&search, &element).passed);
    assert!(evaluate_lock(&start, &json!({"code": "ab1-extra"})).passed);
    assert!(!evaluate_lock(&full, &json!({"code": "ab1-extra"})).passed);
    assert!(evaluate_lock(&full, &json!({"code": "ab1"})).passed);
    assert!(!evaluate_lock(&search, &json!({"code": 123})).passed);
}

/// Verifies length accepts exact and bounded forms on strings and collections.
#[test]
fn length_checks_sizes() {
    let exact = json!({"type": "length", "property_path": "s", "expected_value": 3});
    assert!(passes(&exact, &json!({"s": "abc"})));
    assert!(!passes(&exact, &json!({"s": "ab"})));

    let bounded = json!({"type": "length", "property_path": "length(items)", "expected_value": {"min": 1, "max": 2}});
    assert!(passes(&bounded, &json!({"items": [1, 2]})));
    assert!(!passes(&bounded, &json!({"items": [1, 2, 3]})));
    assert!(!passes(&bounded, &json!({"items": []})));

    let pair = json!({"type": "length", "property_path": "items", "expected_value": [2, null]});
    assert!(passes(&pair, &json!({"items": {"a": 1, "b": 2, "c": 3}})));

    let scalar = eval(exact, &json!({"s": 123}));
    assert_eq!(scalar.failure, Some(FailureReason::CheckFailed));
    assert!(scalar.error_message.unwrap().contains("not a string or collection"));
}

/// Verifies runtime type tags and their aliases.
#[test]
fn type_check_matches_runtime_tags() {
    let cases = [
        ("int", json!(3), true),
        ("integer", json!(3.5), false),
        ("float", json!(3), true),
        ("number", json!(3.5), true),
        ("string", json!("x"), true),
        ("bool", json!(0), false),
        ("list", json!([]), true),
        ("dict", json!({}), true),
        ("object", json!([]), false),
    ];
    for (tag, value, expected) in cases {
        let lock = json!({"type": "type_check", "property_path": "v", "expected_value": tag});
        assert_eq!(passes(&lock, &json!({"v": value})), expected, "type {tag}");
    }
}

/// Verifies the custom error message replaces the generated one.
#[test]
fn custom_error_message_wins() {
    let result = eval(
        json!({"exists": "email", "error_message": "Email is mandatory"}),
        &json!({}),
    );
    assert_eq!(result.error_message.as_deref(), Some("Email is mandatory"));
    assert_eq!(result.failure, Some(FailureReason::MissingValue));
}

// ============================================================================
// SECTION: Compound Kinds
// ============================================================================

/// Verifies a conditional lock passes vacuously when its guard fails.
#[test]
fn conditional_applies_consequence_only_when_guard_passes() {
    let lock = json!({
        "type": "conditional",
        "if": {"type": "equals", "property_path": "kind", "expected_value": "company"},
        "then": [{"exists": "vat_id"}]
    });
    assert!(passes(&lock, &json!({"kind": "person"})));
    assert!(passes(&lock, &json!({"kind": "company", "vat_id": "PT1"})));

    let result = eval(lock, &json!({"kind": "company"}));
    assert!(!result.passed);
    assert_eq!(result.lock_type, LockType::Conditional);
    assert_eq!(result.failure, Some(FailureReason::MissingValue));
    assert!(result.error_message.unwrap().contains("then branch"));
    assert_eq!(result.nested.len(), 2);
}

/// Verifies the else branch is evaluated when the guard fails.
#[test]
fn conditional_else_branch() {
    let lock = json!({
        "if": [{"is_true": "express"}],
        "then": [{"type": "less_than", "property_path": "weight", "expected_value": 5}],
        "else": [{"type": "less_than", "property_path": "weight", "expected_value": 50}]
    });
    assert!(!passes(&lock, &json!({"express": true, "weight": 10})));
    assert!(passes(&lock, &json!({"express": false, "weight": 10})));
    let result = eval(lock, &json!({"express": false, "weight": 60}));
    assert_eq!(result.failure, Some(FailureReason::CheckFailed));
    assert!(result.error_message.unwrap().contains("else branch"));
}

/// Verifies or_logic passes when any group fully passes.
#[test]
fn or_logic_requires_one_complete_group() {
    let lock = json!({
        "type": "or_logic",
        "conditions": [
            {"locks": [{"exists": "email"}, {"not_empty": "email"}]},
            [{"exists": "phone"}]
        ]
    });
    assert!(passes(&lock, &json!({"phone": "123"})));
    assert!(passes(&lock, &json!({"email": "a@b.c"})));

    let missing = eval(lock.clone(), &json!({}));
    assert!(!missing.passed);
    assert_eq!(missing.failure, Some(FailureReason::MissingValue));
    assert!(missing.error_message.unwrap().contains(" OR "));

    let blank = eval(lock, &json!({"email": ""}));
    assert_eq!(blank.failure, Some(FailureReason::CheckFailed));
}

// ============================================================================
// SECTION: Definition Errors
// ============================================================================

/// Verifies malformed lock definitions are rejected with specific errors.
#[test]
fn builder_rejects_malformed_locks() {
    let build_err = |definition: Value| try_build(RegexAnchoring::Start, definition).unwrap_err();

    assert_eq!(build_err(json!({})), DefinitionError::MissingType);
    assert_eq!(
        build_err(json!({"type": "bigger", "property_path": "a"})),
        DefinitionError::UnknownLockType("bigger".to_string())
    );
    assert!(matches!(
        build_err(json!({"type": "exists", "property_path": "a", "expected_value": "no"})),
        DefinitionError::InvalidExpectedValue { kind: LockType::Exists, .. }
    ));
    assert_eq!(
        build_err(json!({"type": "equals", "expected_value": 1})),
        DefinitionError::MissingPropertyPath(LockType::Equals)
    );
    assert!(matches!(
        build_err(json!({"type": "equals", "property_path": "a"})),
        DefinitionError::InvalidExpectedValue { kind: LockType::Equals, .. }
    ));
    assert!(matches!(
        build_err(json!({"type": "greater_than", "property_path": "a", "expected_value": "x"})),
        DefinitionError::InvalidExpectedValue { .. }
    ));
    assert!(matches!(
        build_err(json!({"type": "range", "property_path": "a", "expected_value": [1]})),
        DefinitionError::InvalidExpectedValue { .. }
    ));
    assert!(matches!(
        build_err(json!({"type": "type_check", "property_path": "a", "expected_value": "tuple"})),
        DefinitionError::InvalidExpectedValue { .. }
    ));
    assert!(matches!(
        build_err(json!({"type": "regex", "property_path": "a", "expected_value": "("})),
        DefinitionError::InvalidPattern { .. }
    ));
    assert!(matches!(
        build_err(json!({"exists": "a..b"})),
        DefinitionError::InvalidPath { .. }
    ));
    assert_eq!(
        build_err(json!({"type": "or_logic", "conditions": []})),
        DefinitionError::EmptyCompound(LockType::OrLogic)
    );
    assert_eq!(
        build_err(json!({"type": "conditional", "if": [{"exists": "a"}]})),
        DefinitionError::EmptyCompound(LockType::Conditional)
    );
}

/// Verifies nesting beyond the configured depth is rejected.
#[test]
fn builder_enforces_nesting_depth() {
    let mut definition = json!({"exists": "leaf"});
    for _ in 0 .. 3 {
        definition = json!({"if": [{"exists": "guard"}], "then": [definition]});
    }
    let parsed: LockDefinition = serde_json::from_value(definition).unwrap();
    assert!(LockBuilder::new(RegexAnchoring::Start, 4).build(&parsed).is_ok());
    assert_eq!(
        LockBuilder::new(RegexAnchoring::Start, 3).build(&parsed).unwrap_err(),
        DefinitionError::TooDeep(3)
    );
}

// ============================================================================
// SECTION: Property Tests
// ============================================================================

fn element_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[a-z0-9 ]{0,8}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0 .. 4).prop_map(Value::Array),
            prop::collection::btree_map("[a-c]", inner, 0 .. 4)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

fn lock_catalogue() -> Vec<Lock> {
    [
        json!({"exists": "a"}),
        json!({"type": "exists", "property_path": "c", "expected_value": false}),
        json!({"not_empty": "a.b"}),
        json!({"type": "equals", "property_path": "a", "expected_value": {"b": 1}}),
        json!({"type": "greater_than", "property_path": "a.c", "expected_value": 0}),
        json!({"type": "range", "property_path": "b", "expected_value": [-5, 5]}),
        json!({"type": "in_list", "property_path": "c", "expected_value": [true, "x", 1]}),
        json!({"type": "contains", "property_path": "a", "expected_value": "b"}),
        json!({"type": "regex", "property_path": "c", "expected_value": "[a-z]+"}),
        json!({"type": "length", "property_path": "length(a)", "expected_value": {"max": 2}}),
        json!({"type": "type_check", "property_path": "b", "expected_value": "list"}),
        json!({"if": [{"exists": "a"}], "then": [{"not_empty": "b"}]}),
        json!({"conditions": [[{"exists": "a.a"}], [{"exists": "c"}]]}),
    ]
    .into_iter()
    .map(build)
    .collect()
}

proptest! {
    /// Verifies lock evaluation is a pure function of lock and element.
    #[test]
    fn lock_evaluation_is_pure(element in element_strategy()) {
        for lock in lock_catalogue() {
            let first = evaluate_lock(&lock, &element);
            let second = evaluate_lock(&lock, &element);
            prop_assert_eq!(first, second);
        }
    }

    /// Verifies a passing lock never carries failure details.
    #[test]
    fn passing_locks_carry_no_failure(element in element_strategy()) {
        for lock in lock_catalogue() {
            let result = evaluate_lock(&lock, &element);
            prop_assert_eq!(result.passed, result.failure.is_none());
            prop_assert_eq!(result.passed, result.error_message.is_none());
        }
    }
}
