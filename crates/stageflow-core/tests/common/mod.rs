// crates/stageflow-core/tests/common/mod.rs
// ============================================================================
// Module: Core Test Helpers
// Description: Shared process fixtures and load helpers.
// Purpose: Reduce duplication across stageflow-core integration tests.
// ============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]
#![allow(clippy::panic, reason = "Fixture helpers fail tests on invalid setup.")]

use serde_json::Value;
use serde_json::json;
use stageflow_core::IssueType;
use stageflow_core::LoadOptions;
use stageflow_core::LoadResult;
use stageflow_core::Process;
use stageflow_core::load_value;

/// Loads a JSON definition with default options.
pub fn load_json(definition: &Value) -> LoadResult {
    load_value(definition, &LoadOptions::default())
}

/// Loads a JSON definition and returns the process, failing the test otherwise.
pub fn load_process(definition: &Value) -> Process {
    load_process_with(definition, &LoadOptions::default())
}

/// Loads a JSON definition with explicit options, failing the test on error.
pub fn load_process_with(definition: &Value, options: &LoadOptions) -> Process {
    let result = load_value(definition, options);
    match result.process {
        Some(process) if result.success => process,
        _ => {
            let issues: Vec<String> = result.issues.iter().map(ToString::to_string).collect();
            panic!("expected a successful load, got: {}", issues.join("; "))
        }
    }
}

/// Returns the issue kinds of a load result, in order.
pub fn issue_types(result: &LoadResult) -> Vec<IssueType> {
    result.issues.iter().map(|issue| issue.issue_type).collect()
}

/// Three-stage document workflow: draft, review, published.
pub fn document_review() -> Value {
    json!({
        "name": "document_review",
        "description": "Draft, review, and publish a document",
        "initial_stage": "draft",
        "final_stage": "published",
        "stages": {
            "draft": {
                "name": "Draft",
                "fields": ["title", "content"],
                "gates": {
                    "submit": {
                        "target_stage": "review",
                        "locks": [
                            {"exists": "title"},
                            {"not_empty": "title"}
                        ]
                    }
                }
            },
            "review": {
                "name": "Review",
                "fields": {"reviewer": "string"},
                "gates": {
                    "approve": {
                        "target_stage": "published",
                        "locks": [
                            {
                                "type": "equals",
                                "property_path": "review.decision",
                                "expected_value": "approved"
                            }
                        ]
                    }
                }
            },
            "published": {
                "name": "Published",
                "fields": ["published_at"]
            }
        }
    })
}

/// Two-stage process whose single gate carries the given locks.
pub fn single_gate(locks: Value) -> Value {
    json!({
        "name": "single_gate",
        "initial_stage": "start",
        "final_stage": "done",
        "stages": {
            "start": {
                "gates": {
                    "finish": {"target_stage": "done", "locks": locks}
                }
            },
            "done": {}
        }
    })
}
