// crates/stageflow-core/tests/engine.rs
// ============================================================================
// Module: Engine Tests
// Description: Regression detection, policies, registry, and audit events.
// Purpose: Validate the orchestration around stage evaluation.
// ============================================================================

//! Engine orchestration tests.

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

use std::sync::Arc;
use std::sync::Mutex;

use serde_json::Value;
use serde_json::json;
use stageflow_core::ActionType;
use stageflow_core::ElementEvaluationEvent;
use stageflow_core::Engine;
use stageflow_core::EngineOptions;
use stageflow_core::EvaluationAuditSink;
use stageflow_core::EvaluationError;
use stageflow_core::EvaluationRequest;
use stageflow_core::FileAuditSink;
use stageflow_core::InMemoryProcessRegistry;
use stageflow_core::LoadOptions;
use stageflow_core::Process;
use stageflow_core::ProcessDefinition;
use stageflow_core::ProcessLoadEvent;
use stageflow_core::ProcessName;
use stageflow_core::ProcessRegistry;
use stageflow_core::RegistryError;
use stageflow_core::RegressionDetector;
use stageflow_core::RegressionKind;
use stageflow_core::StageId;
use stageflow_core::StageStatus;
use tempfile::NamedTempFile;

mod common;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Audit sink collecting serialized events in memory.
#[derive(Default)]
struct RecordingSink {
    /// Serialized events in arrival order.
    events: Mutex<Vec<Value>>,
}

impl RecordingSink {
    /// Returns a snapshot of the recorded events.
    fn events(&self) -> Vec<Value> {
        self.events.lock().unwrap().clone()
    }
}

impl EvaluationAuditSink for RecordingSink {
    fn record_load(&self, event: &ProcessLoadEvent) {
        self.events.lock().unwrap().push(serde_json::to_value(event).unwrap());
    }

    fn record_evaluation(&self, event: &ElementEvaluationEvent) {
        self.events.lock().unwrap().push(serde_json::to_value(event).unwrap());
    }
}

fn review_process(policy: &str) -> Process {
    let mut definition = common::document_review();
    definition["regression_policy"] = json!(policy);
    common::load_process(&definition)
}

fn ready_draft() -> Value {
    json!({"title": "Doc", "content": "Body"})
}

// ============================================================================
// SECTION: Regression Detection
// ============================================================================

/// Verifies stage depths follow BFS distance from the initial stage.
#[test]
fn detector_reports_depths() {
    let process = common::load_process(&common::document_review());
    let detector = RegressionDetector::new(&process);
    assert_eq!(detector.depth("draft"), Some(0));
    assert_eq!(detector.depth("review"), Some(1));
    assert_eq!(detector.depth("published"), Some(2));
    assert_eq!(detector.depth("unknown"), None);

    let details = detector.detect(&StageId::new("draft"), &StageId::new("published")).unwrap();
    assert_eq!(details.kind, RegressionKind::StageDepth);
    assert_eq!(details.regressed_from, StageId::new("published"));
    assert_eq!(details.failing_stage, StageId::new("draft"));
    assert_eq!((details.previous_depth, details.current_depth), (Some(2), Some(0)));
    assert!(detector.detect(&StageId::new("review"), &StageId::new("draft")).is_none());
    assert!(detector.detect(&StageId::new("review"), &StageId::new("review")).is_none());
}

/// Verifies the ignore policy flags a regression without changing the status.
#[test]
fn ignore_policy_only_flags() {
    let process = review_process("ignore");
    let request = EvaluationRequest::at("draft").with_previous("review");
    let result = Engine::default().evaluate(&process, &ready_draft(), &request).unwrap();
    assert!(result.regression);
    assert!(result.regression_warning.is_none());
    assert_eq!(result.stage_result.status, StageStatus::Ready);
    assert_eq!(result.regression_details.unwrap().kind, RegressionKind::StageDepth);
}

/// Verifies the warn policy adds a warning message.
#[test]
fn warn_policy_adds_warning() {
    let process = review_process("warn");
    let request = EvaluationRequest::at("draft").with_previous("review");
    let result = Engine::default().evaluate(&process, &ready_draft(), &request).unwrap();
    assert!(result.regression);
    assert_eq!(
        result.regression_warning.as_deref(),
        Some("Element regressed from stage 'review' to earlier stage 'draft'")
    );
    assert_eq!(result.stage_result.status, StageStatus::Ready);
}

/// Verifies the block policy replaces transitions with a regression action.
#[test]
fn block_policy_blocks_transitions() {
    let process = review_process("block");
    let request = EvaluationRequest::at("draft").with_previous("published");
    let result = Engine::default().evaluate(&process, &ready_draft(), &request).unwrap();
    assert!(result.regression);
    assert_eq!(result.stage_result.status, StageStatus::Blocked);
    assert!(result.stage_result.ready_gates.is_empty());
    let first = &result.stage_result.actions[0];
    assert_eq!(first.action_type, ActionType::ResolveRegression);
    assert_eq!(first.target_stage, Some(StageId::new("draft")));
    assert!(
        result
            .stage_result
            .actions
            .iter()
            .all(|action| action.action_type != ActionType::Transition)
    );
    assert!(result.stage_result.gate_results.values().all(|gate| gate.passed));
}

/// Verifies forward movement is never a regression.
#[test]
fn forward_movement_is_not_regression() {
    let process = review_process("block");
    let request = EvaluationRequest::at("review").with_previous("draft");
    let result = Engine::default().evaluate(&process, &json!({"reviewer": "ana"}), &request).unwrap();
    assert!(!result.regression);
    assert!(result.regression_details.is_none());
}

/// Verifies an unknown previous stage is an evaluation error.
#[test]
fn unknown_previous_stage_is_error() {
    let process = review_process("ignore");
    let request = EvaluationRequest::at("draft").with_previous("archived");
    assert_eq!(
        Engine::default().evaluate(&process, &ready_draft(), &request),
        Err(EvaluationError::UnknownStage("archived".to_string()))
    );
}

/// Verifies prior stages are re-checked only when enabled.
#[test]
fn revalidation_detects_lost_prior_data() {
    let process = review_process("warn");
    let element = json!({"content": "Body", "reviewer": "ana"});
    let request = EvaluationRequest::at("review");

    let plain = Engine::default().evaluate(&process, &element, &request).unwrap();
    assert!(!plain.regression);

    let engine = Engine::new(
        EngineOptions {
            revalidate_prior_stages: true,
        },
        Arc::new(stageflow_core::NoopAuditSink),
    );
    let result = engine.evaluate(&process, &element, &request).unwrap();
    assert!(result.regression);
    let details = result.regression_details.unwrap();
    assert_eq!(details.kind, RegressionKind::PriorStageFailure);
    assert_eq!(details.regressed_from, StageId::new("review"));
    assert_eq!(details.failing_stage, StageId::new("draft"));
    assert!(result.regression_warning.unwrap().contains("earlier stage 'draft'"));

    let intact = json!({"title": "Doc", "content": "Body", "reviewer": "ana"});
    assert!(!engine.evaluate(&process, &intact, &request).unwrap().regression);
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Verifies register, lookup, listing, and removal.
#[test]
fn registry_round_trip() {
    let registry = InMemoryProcessRegistry::new();
    let review = common::load_process(&common::document_review());
    let gate = common::load_process(&common::single_gate(json!([{"exists": "a"}])));

    registry.register(review.clone()).unwrap();
    registry.register(gate).unwrap();
    assert!(matches!(
        registry.register(review),
        Err(RegistryError::Conflict(name)) if name == "document_review"
    ));

    let names: Vec<String> = registry.list().unwrap().iter().map(ToString::to_string).collect();
    assert_eq!(names, vec!["document_review", "single_gate"]);

    let name = ProcessName::new("document_review");
    assert!(registry.get(&name).unwrap().is_some());
    registry.remove(&name).unwrap();
    assert!(registry.get(&name).unwrap().is_none());
    assert!(matches!(registry.remove(&name), Err(RegistryError::NotFound(_))));
}

/// Verifies registry clones share state across threads.
#[test]
fn registry_is_shared_across_threads() {
    let registry = InMemoryProcessRegistry::new();
    let handles: Vec<_> = ["alpha", "beta", "gamma"]
        .into_iter()
        .map(|name| {
            let registry = registry.clone();
            let mut definition = common::document_review();
            definition["name"] = json!(name);
            std::thread::spawn(move || {
                registry.register(common::load_process(&definition)).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(registry.list().unwrap().len(), 3);
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Verifies one audit event per load and per evaluation.
#[test]
fn engine_records_audit_events() {
    let sink = Arc::new(RecordingSink::default());
    let engine = Engine::new(EngineOptions::default(), sink.clone());
    let definition: ProcessDefinition = serde_json::from_value(common::document_review()).unwrap();

    let loaded = engine.load(&definition, &LoadOptions::default());
    let process = loaded.process.unwrap();
    engine.evaluate(&process, &json!({}), &EvaluationRequest::default()).unwrap();

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["event"], json!("process_load"));
    assert_eq!(events[0]["process"], json!("document_review"));
    assert_eq!(events[0]["success"], json!(true));
    assert_eq!(events[0]["fatal_issues"], json!(0));
    assert_eq!(events[1]["event"], json!("element_evaluation"));
    assert_eq!(events[1]["stage"], json!("draft"));
    assert_eq!(events[1]["status"], json!("incomplete"));
    assert_eq!(events[1]["actions"], json!(2));
    assert_eq!(events[1]["digest"], serde_json::to_value(process.digest()).unwrap());
}

/// Verifies the file sink appends one JSON line per event.
#[test]
fn file_sink_appends_json_lines() {
    let file = NamedTempFile::new().unwrap();
    let sink = Arc::new(FileAuditSink::new(file.path()).unwrap());
    let engine = Engine::new(EngineOptions::default(), sink);
    let process = common::load_process(&common::document_review());

    let elements = vec![json!({}), ready_draft()];
    for result in engine.evaluate_batch(&process, &elements, &EvaluationRequest::default()) {
        result.unwrap();
    }

    let contents = std::fs::read_to_string(file.path()).unwrap();
    let lines: Vec<Value> =
        contents.lines().map(|line| serde_json::from_str(line).unwrap()).collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["status"], json!("incomplete"));
    assert_eq!(lines[1]["status"], json!("ready"));
    assert_eq!(lines[1]["ready_gates"], json!(1));
    assert!(!contents.contains("Body"));
}
