// crates/stageflow-core/src/runtime/stage.rs
// ============================================================================
// Module: Stageflow Stage Evaluation
// Description: Stage status computation and action derivation.
// Purpose: Tell callers where an element stands and what to do next.
// Dependencies: crate::core, crate::runtime::{gate, resolver, comparator}
// ============================================================================

//! ## Overview
//! Status follows a fixed order:
//! - any declared field missing: `incomplete`, with one `provide_data` action per field;
//! - any gate passing: `ready`, with one `transition` action per passing gate;
//! - otherwise: `blocked`, with the stage's configured actions, or one computed
//!   action per failing lock when none are configured.
//!
//! The final stage has no gates; once its fields are present it reports
//! `ready` with no actions.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde_json::Value;

use crate::core::process::ActionSpec;
use crate::core::process::FieldSpec;
use crate::core::process::Gate;
use crate::core::process::Stage;
use crate::core::results::Action;
use crate::core::results::ActionSource;
use crate::core::results::ActionType;
use crate::core::results::GateResult;
use crate::core::results::LockResult;
use crate::core::results::StageResult;
use crate::core::results::StageStatus;
use crate::runtime::comparator::display_value;
use crate::runtime::gate::contextualize;
use crate::runtime::gate::evaluate_gate;
use crate::runtime::resolver::has_property;

// ============================================================================
// SECTION: Stage Evaluation
// ============================================================================

/// Evaluates an element at a stage.
#[must_use]
pub fn evaluate_stage(stage: &Stage, element: &Value) -> StageResult {
    let missing: Vec<&FieldSpec> =
        stage.fields.iter().filter(|field| !has_property(element, &field.path)).collect();
    if !missing.is_empty() {
        return StageResult {
            stage: stage.id.clone(),
            status: StageStatus::Incomplete,
            missing_properties: missing.iter().map(|field| field.path.as_str().to_string()).collect(),
            gate_results: BTreeMap::new(),
            actions: missing.into_iter().map(provide_data_action).collect(),
            ready_gates: Vec::new(),
        };
    }

    let evaluated: Vec<(&Gate, GateResult)> =
        stage.gates.iter().map(|gate| (gate, evaluate_gate(gate, element))).collect();
    let ready: Vec<&Gate> =
        evaluated.iter().filter(|(_, result)| result.passed).map(|(gate, _)| *gate).collect();

    let (status, actions) = if !ready.is_empty() {
        (StageStatus::Ready, ready.iter().copied().map(transition_action).collect())
    } else if stage.gates.is_empty() && stage.is_final {
        (StageStatus::Ready, Vec::new())
    } else if stage.expected_actions.is_empty() {
        (StageStatus::Blocked, computed_actions(&evaluated))
    } else {
        (StageStatus::Blocked, stage.expected_actions.iter().map(configured_action).collect())
    };

    StageResult {
        stage: stage.id.clone(),
        status,
        missing_properties: Vec::new(),
        ready_gates: ready.iter().map(|gate| gate.name.clone()).collect(),
        gate_results: evaluated
            .into_iter()
            .map(|(gate, result)| (gate.name.clone(), result))
            .collect(),
        actions,
    }
}

// ============================================================================
// SECTION: Action Derivation
// ============================================================================

/// Builds the action asking for a missing declared field.
fn provide_data_action(field: &FieldSpec) -> Action {
    let path = field.path.as_str();
    let description = field.default.as_ref().map_or_else(
        || format!("Add missing property '{path}'"),
        |default| {
            format!("Add missing property '{path}' with suggested default '{}'", display_value(default))
        },
    );
    Action {
        related_properties: vec![path.to_string()],
        suggested_value: field.default.clone(),
        ..Action::computed(ActionType::ProvideData, description)
    }
}

/// Builds the action for a passing gate.
fn transition_action(gate: &Gate) -> Action {
    Action {
        target_stage: Some(gate.target_stage.clone()),
        gate_name: Some(gate.name.clone()),
        ..Action::computed(
            ActionType::Transition,
            format!(
                "Element is ready to transition to {} via gate '{}'",
                gate.target_stage, gate.name
            ),
        )
    }
}

/// Converts an author-configured action.
fn configured_action(spec: &ActionSpec) -> Action {
    Action {
        action_type: ActionType::ExecuteAction,
        source: ActionSource::Configured,
        name: spec.name.clone(),
        description: spec.description.clone(),
        instructions: spec.instructions.clone(),
        related_properties: spec.related_properties.clone(),
        target_properties: spec.target_properties.clone(),
        target_stage: None,
        gate_name: None,
        suggested_value: None,
    }
}

/// One action per failing lock across all gates, deduplicated by property.
fn computed_actions(evaluated: &[(&Gate, GateResult)]) -> Vec<Action> {
    let mut seen = BTreeSet::new();
    let mut actions = Vec::new();
    for (gate, result) in evaluated {
        for lock in result.lock_results.iter().filter(|lock| !lock.passed) {
            let properties = failing_properties(lock);
            let key = properties.join("|");
            if !seen.insert(key) {
                continue;
            }
            let action_type = if lock.is_missing_value() {
                ActionType::ProvideData
            } else {
                ActionType::ResolveValidation
            };
            let message = lock.error_message.as_deref().unwrap_or("lock failed");
            actions.push(Action {
                related_properties: properties,
                target_stage: Some(gate.target_stage.clone()),
                gate_name: Some(gate.name.clone()),
                ..Action::computed(action_type, contextualize(gate, message))
            });
        }
    }
    actions
}

/// Property paths behind a failing lock, descending into compound locks.
fn failing_properties(lock: &LockResult) -> Vec<String> {
    if let Some(path) = &lock.property_path {
        return vec![path.clone()];
    }
    let mut paths: Vec<String> = Vec::new();
    for nested in lock.nested.iter().filter(|nested| !nested.passed) {
        for path in failing_properties(nested) {
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    }
    paths
}
