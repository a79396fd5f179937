// crates/stageflow-core/tests/schema.rs
// ============================================================================
// Module: Schema Generator Tests
// Description: Cumulative and stage-specific JSON Schema generation.
// Purpose: Ensure generated schemas describe exactly what each stage needs.
// ============================================================================

//! JSON Schema generation tests.

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

use std::collections::BTreeSet;

use proptest::prelude::*;
use serde_json::Value;
use serde_json::json;
use stageflow_core::Process;
use stageflow_core::ProcessParts;
use stageflow_core::SchemaError;
use stageflow_core::Stage;
use stageflow_core::StageId;
use stageflow_core::canonical_digest;
use stageflow_core::cumulative_schema;
use stageflow_core::schema;
use stageflow_core::stage_specific_schema;

mod common;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn property_names(schema: &Value) -> BTreeSet<String> {
    schema["properties"].as_object().unwrap().keys().cloned().collect()
}

fn required(schema: &Value) -> BTreeSet<String> {
    schema["required"]
        .as_array()
        .unwrap()
        .iter()
        .map(|value| value.as_str().unwrap().to_string())
        .collect()
}

fn names(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(ToString::to_string).collect()
}

/// Invoice process where the review stage redeclares `amount` with a new type.
fn invoice() -> Process {
    common::load_process(&json!({
        "name": "invoice",
        "initial_stage": "draft",
        "final_stage": "paid",
        "stages": {
            "draft": {
                "name": "Draft",
                "fields": {
                    "amount": "string",
                    "customer": {"type": "string", "format": "email", "description": "Billing contact"}
                },
                "gates": {
                    "submit": {
                        "target_stage": "review",
                        "locks": [
                            {"exists": "customer"},
                            {"type": "greater_than", "property_path": "amount", "expected_value": 0}
                        ]
                    }
                }
            },
            "review": {
                "name": "Review",
                "fields": {"amount": {"type": "int", "minimum": 1}},
                "gates": {
                    "approve": {
                        "target_stage": "paid",
                        "locks": [
                            {"type": "type_check", "property_path": "approved", "expected_value": "bool"},
                            {
                                "type": "conditional",
                                "if": {"type": "greater_than", "property_path": "amount", "expected_value": 1000},
                                "then": {"exists": "second_approver"}
                            }
                        ]
                    }
                }
            },
            "paid": {"name": "Paid", "fields": ["paid_at"]}
        }
    }))
}

// ============================================================================
// SECTION: Document Shape
// ============================================================================

/// Verifies titles, descriptions, and the meta-schema header.
#[test]
fn schema_documents_carry_titles() {
    let process = invoice();
    let cumulative = cumulative_schema(&process, "review").unwrap();
    assert_eq!(cumulative["$schema"], json!("http://json-schema.org/draft-07/schema#"));
    assert_eq!(cumulative["title"], json!("invoice - review (cumulative)"));
    assert_eq!(cumulative["description"], json!("Schema for stage: Review"));
    assert_eq!(cumulative["type"], json!("object"));

    let specific = stage_specific_schema(&process, "review").unwrap();
    assert_eq!(specific["title"], json!("invoice - review"));
    assert_eq!(schema(&process, "review", false).unwrap(), specific);
    assert_eq!(schema(&process, "review", true).unwrap(), cumulative);
}

/// Verifies a later declaration of a field overrides an earlier one.
#[test]
fn later_stage_field_type_wins() {
    let process = invoice();
    let cumulative = cumulative_schema(&process, "review").unwrap();
    assert_eq!(cumulative["properties"]["amount"], json!({"type": "integer", "minimum": 1}));
    assert_eq!(
        cumulative["properties"]["customer"],
        json!({"type": "string", "format": "email", "description": "Billing contact"})
    );

    let draft = stage_specific_schema(&process, "draft").unwrap();
    assert_eq!(draft["properties"]["amount"], json!({"type": "string"}));
}

/// Verifies lock-inferred types fill gaps without overriding declarations.
#[test]
fn lock_paths_are_inferred() {
    let process = invoice();
    let review = stage_specific_schema(&process, "review").unwrap();
    assert_eq!(review["properties"]["approved"], json!({"type": "boolean"}));
    assert_eq!(review["properties"]["second_approver"], json!({"type": "string"}));
    assert_eq!(property_names(&review), names(&["amount", "approved", "second_approver"]));
}

/// Verifies only top-level existence-implying locks make properties required.
#[test]
fn required_comes_from_gate_locks() {
    let process = invoice();
    let review = stage_specific_schema(&process, "review").unwrap();
    assert_eq!(required(&review), names(&["approved"]));

    let cumulative = cumulative_schema(&process, "review").unwrap();
    assert_eq!(required(&cumulative), names(&["amount", "approved", "customer"]));

    let paid = stage_specific_schema(&process, "paid").unwrap();
    assert!(required(&paid).is_empty());
    assert_eq!(property_names(&paid), names(&["paid_at"]));
}

/// Verifies a property that must be absent is never required.
#[test]
fn forbidden_property_is_not_required() {
    let process = common::load_process(&common::single_gate(json!([
        {"type": "exists", "property_path": "blocker", "expected_value": false},
        {"exists": "owner"}
    ])));
    let specific = stage_specific_schema(&process, "start").unwrap();
    assert_eq!(required(&specific), names(&["owner"]));
}

/// Verifies generated schemas accept and reject elements as expected.
#[test]
fn generated_schema_validates_elements() {
    let process = invoice();
    let validator = jsonschema::validator_for(&cumulative_schema(&process, "review").unwrap()).unwrap();
    assert!(validator.is_valid(&json!({"customer": "a@b.co", "amount": 12, "approved": true})));
    assert!(!validator.is_valid(&json!({"customer": "a@b.co", "amount": 12})));
    assert!(!validator.is_valid(&json!({"customer": "a@b.co", "amount": "12", "approved": true})));
}

// ============================================================================
// SECTION: Path Selection
// ============================================================================

/// Verifies the cumulative schema follows the shortest path only.
#[test]
fn cumulative_schema_uses_shortest_path() {
    let process = common::load_process(&json!({
        "name": "routes",
        "initial_stage": "start",
        "final_stage": "done",
        "stages": {
            "start": {
                "gates": {
                    "short": {"target_stage": "done", "locks": [{"exists": "quick"}]},
                    "long": {"target_stage": "detour", "locks": [{"exists": "slow"}]}
                }
            },
            "detour": {
                "fields": ["scenic"],
                "gates": {"finish": {"target_stage": "done", "locks": [{"exists": "arrived"}]}}
            },
            "done": {"fields": ["closed_at"]}
        }
    }));
    let done = cumulative_schema(&process, "done").unwrap();
    assert_eq!(property_names(&done), names(&["closed_at", "quick", "slow"]));
    assert!(!property_names(&done).contains("scenic"));
}

/// Verifies unknown and unreachable stages are errors.
#[test]
fn unknown_and_unreachable_stages_are_errors() {
    let loaded = common::load_process(&common::single_gate(json!([{"exists": "a"}])));
    assert_eq!(
        cumulative_schema(&loaded, "missing"),
        Err(SchemaError::UnknownStage("missing".to_string()))
    );

    let mut stages = loaded.stages().to_vec();
    stages.push(Stage {
        id: StageId::new("island"),
        name: "island".to_string(),
        description: String::new(),
        fields: Vec::new(),
        expected_actions: Vec::new(),
        gates: Vec::new(),
        is_final: false,
    });
    let process = Process::new(ProcessParts {
        name: loaded.name().clone(),
        description: String::new(),
        initial_stage: loaded.initial_stage().clone(),
        final_stage: loaded.final_stage().clone(),
        stage_prop: None,
        regression_policy: loaded.regression_policy(),
        stages,
        digest: canonical_digest(&json!({"name": "island"})).unwrap(),
    });
    assert_eq!(
        stage_specific_schema(&process, "island"),
        Err(SchemaError::Unreachable("island".to_string()))
    );
}

// ============================================================================
// SECTION: Property Tests
// ============================================================================

/// Linear process `s0 -> s1 -> ... -> sN` with generated fields and lock paths.
fn chain(fields: &[BTreeSet<String>], locks: &[String]) -> Value {
    let last = fields.len() - 1;
    let mut stages = serde_json::Map::new();
    for (index, stage_fields) in fields.iter().enumerate() {
        let mut stage = json!({"fields": stage_fields.iter().collect::<Vec<_>>()});
        if index < last {
            stage["gates"] = json!({
                "next": {"target_stage": format!("s{}", index + 1), "locks": [{"exists": locks[index]}]}
            });
        }
        stages.insert(format!("s{index}"), stage);
    }
    json!({
        "name": "chain",
        "initial_stage": "s0",
        "final_stage": format!("s{last}"),
        "stages": stages
    })
}

fn chain_strategy() -> impl Strategy<Value = (Vec<BTreeSet<String>>, Vec<String>)> {
    (2usize .. 6).prop_flat_map(|count| {
        (
            prop::collection::vec(prop::collection::btree_set("[a-f]{1,2}", 0 .. 4), count),
            prop::collection::vec("[a-f]{1,2}", count - 1),
        )
    })
}

proptest! {
    /// Verifies cumulative schemas contain every stage-specific property and requirement.
    #[test]
    fn cumulative_contains_stage_specific((fields, locks) in chain_strategy()) {
        let process = common::load_process(&chain(&fields, &locks));
        for stage in process.stages() {
            let specific = stage_specific_schema(&process, stage.id.as_str()).unwrap();
            let cumulative = cumulative_schema(&process, stage.id.as_str()).unwrap();
            prop_assert!(property_names(&specific).is_subset(&property_names(&cumulative)));
            prop_assert!(required(&specific).is_subset(&required(&cumulative)));
        }
    }
}
