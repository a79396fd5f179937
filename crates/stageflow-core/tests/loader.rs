// crates/stageflow-core/tests/loader.rs
// ============================================================================
// Module: Loader Tests
// Description: Structural validation, unwrapping, and digests of definitions.
// Purpose: Ensure malformed definitions never produce a usable process.
// ============================================================================

//! Loader structural validation tests.

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

use serde_json::json;
use stageflow_core::IssueType;
use stageflow_core::LoadOptions;
use stageflow_core::ProcessDefinition;
use stageflow_core::RegressionPolicy;
use stageflow_core::Severity;
use stageflow_core::StageId;
use stageflow_core::load;
use stageflow_core::load_value;

mod common;

// ============================================================================
// SECTION: Structure
// ============================================================================

/// Verifies a well-formed definition loads with no fatal issues.
#[test]
fn well_formed_definition_loads() {
    let result = common::load_json(&common::document_review());
    assert!(result.success);
    assert!(result.issues_with(Severity::Fatal).is_empty());
    let process = result.process.unwrap();
    assert_eq!(process.name().as_str(), "document_review");
    assert_eq!(process.initial_stage(), &StageId::new("draft"));
    assert_eq!(process.final_stage(), &StageId::new("published"));
    let ids: Vec<&str> = process.stages().iter().map(|stage| stage.id.as_str()).collect();
    assert_eq!(ids, vec!["draft", "review", "published"]);
    assert!(process.stage("published").unwrap().is_final);
}

/// Verifies missing top-level fields are each reported.
#[test]
fn missing_required_fields_are_reported() {
    let result = common::load_json(&json!({"stages": {"a": {}, "b": {}}}));
    assert!(!result.success);
    assert!(result.process.is_none());
    assert_eq!(
        common::issue_types(&result),
        vec![
            IssueType::MissingRequiredField,
            IssueType::MissingRequiredField,
            IssueType::MissingRequiredField,
        ]
    );
    assert!(result.issues[2].message.contains("'name'"));
}

/// Verifies one stage is not enough.
#[test]
fn single_stage_is_insufficient() {
    let result = common::load_json(&json!({
        "name": "solo",
        "initial_stage": "only",
        "final_stage": "only",
        "stages": {"only": {}}
    }));
    assert!(!result.success);
    assert!(result.has_issue(IssueType::InsufficientStages));
}

/// Verifies the initial and final stages must be declared.
#[test]
fn undeclared_terminal_stages_are_reported() {
    let mut definition = common::document_review();
    definition["initial_stage"] = json!("intake");
    let result = common::load_json(&definition);
    assert!(!result.success);
    assert!(result.has_issue(IssueType::MissingStage));
    assert!(result.issues.iter().any(|issue| issue.message.contains("'intake'")));
}

/// Verifies gates must target declared stages.
#[test]
fn unknown_gate_target_is_invalid_transition() {
    let mut definition = common::document_review();
    definition["stages"]["draft"]["gates"]["submit"]["target_stage"] = json!("archive");
    let result = common::load_json(&definition);
    assert!(!result.success);
    let issue = result
        .issues
        .iter()
        .find(|issue| issue.issue_type == IssueType::InvalidTransition)
        .unwrap();
    assert_eq!(issue.location.stages, vec![StageId::new("draft")]);
    assert_eq!(issue.location.gate.as_ref().map(|gate| gate.as_str()), Some("submit"));
}

/// Verifies unknown lock kinds and bad paths map to distinct issue kinds.
#[test]
fn malformed_locks_are_reported() {
    let unknown = common::load_json(&common::single_gate(json!([
        {"type": "looks_like", "property_path": "a"}
    ])));
    assert!(!unknown.success);
    assert!(unknown.has_issue(IssueType::InvalidLockDefinition));

    let bad_path = common::load_json(&common::single_gate(json!([{"exists": "a..b"}])));
    assert!(!bad_path.success);
    assert!(bad_path.has_issue(IssueType::InvalidPropertyPath));
    assert_eq!(bad_path.issues[0].location.lock_index, Some(0));

    let bad_regex = common::load_json(&common::single_gate(json!([
        {"type": "regex", "property_path": "code", "expected_value": "(unclosed"}
    ])));
    assert!(bad_regex.has_issue(IssueType::InvalidLockDefinition));

    let untyped = common::load_json(&common::single_gate(json!([{"property_path": "a"}])));
    assert!(untyped.has_issue(IssueType::InvalidLockDefinition));
}

/// Verifies configured actions require a description.
#[test]
fn action_without_description_is_invalid() {
    let mut definition = common::document_review();
    definition["stages"]["draft"]["expected_actions"] = json!([{"name": "write"}]);
    let result = common::load_json(&definition);
    assert!(!result.success);
    assert!(result.has_issue(IssueType::InvalidActionDefinition));
}

/// Verifies list-form gates must carry a name.
#[test]
fn unnamed_list_gate_is_malformed() {
    let result = common::load_json(&json!({
        "name": "list_gates",
        "initial_stage": "start",
        "final_stage": "done",
        "stages": {
            "start": {"gates": [{"target_stage": "done", "locks": [{"exists": "a"}]}]},
            "done": {}
        }
    }));
    assert!(!result.success);
    assert!(result.has_issue(IssueType::MalformedDefinition));
}

/// Verifies definitions of the wrong shape are reported without a digest.
#[test]
fn wrong_shape_is_malformed() {
    let result = common::load_json(&json!({"name": 5, "stages": []}));
    assert!(!result.success);
    assert_eq!(common::issue_types(&result), vec![IssueType::MalformedDefinition]);
    assert!(result.digest.is_none());
}

// ============================================================================
// SECTION: Authoring Forms
// ============================================================================

/// Verifies a single top-level `process` key is unwrapped.
#[test]
fn process_key_is_unwrapped() {
    let wrapped = json!({"process": common::document_review()});
    let result = common::load_json(&wrapped);
    assert!(result.success);
    assert_eq!(result.digest, common::load_json(&common::document_review()).digest);
}

/// Verifies alias keys and the expected_properties spelling are accepted.
#[test]
fn alias_keys_are_accepted() {
    let process = common::load_process(&json!({
        "name": "aliases",
        "initial_stage": "start",
        "final_stage": "done",
        "stages": {
            "start": {
                "expected_properties": ["email"],
                "gates": {
                    "go": {"target": "done", "locks": [{"type": "EXISTS", "property": "email"}]}
                }
            },
            "done": {}
        }
    }));
    let start = process.stage("start").unwrap();
    assert_eq!(start.fields[0].path.as_str(), "email");
    assert_eq!(start.gates[0].target_stage, StageId::new("done"));
}

// ============================================================================
// SECTION: Options and Digests
// ============================================================================

/// Verifies the load default applies only when no policy is declared.
#[test]
fn default_regression_policy_applies_when_absent() {
    let options = LoadOptions {
        default_regression_policy: RegressionPolicy::Warn,
        ..LoadOptions::default()
    };
    let inherited = common::load_process_with(&common::document_review(), &options);
    assert_eq!(inherited.regression_policy(), RegressionPolicy::Warn);

    let mut definition = common::document_review();
    definition["regression_policy"] = json!("block");
    let declared = common::load_process_with(&definition, &options);
    assert_eq!(declared.regression_policy(), RegressionPolicy::Block);

    let plain = common::load_process(&common::document_review());
    assert_eq!(plain.regression_policy(), RegressionPolicy::Ignore);
}

/// Verifies the digest ignores key order and tracks content.
#[test]
fn digest_is_canonical() {
    let definition: ProcessDefinition = serde_json::from_value(common::document_review()).unwrap();
    let first = load(&definition, &LoadOptions::default());
    let second = load(&definition, &LoadOptions::default());
    assert_eq!(first.digest, second.digest);
    assert_eq!(first.process.unwrap().digest(), second.digest.as_ref().unwrap());

    let reordered = json!({
        "stages": common::document_review()["stages"].clone(),
        "final_stage": "published",
        "initial_stage": "draft",
        "description": "Draft, review, and publish a document",
        "name": "document_review"
    });
    let reordered = load_value(&reordered, &LoadOptions::default());
    assert_eq!(reordered.digest, first.digest);

    let mut changed = common::document_review();
    changed["description"] = json!("Something else");
    assert_ne!(common::load_json(&changed).digest, first.digest);
}
