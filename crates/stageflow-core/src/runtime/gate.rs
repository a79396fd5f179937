// crates/stageflow-core/src/runtime/gate.rs
// ============================================================================
// Module: Stageflow Gate Evaluation
// Description: AND-combination of a gate's locks.
// Purpose: Produce a gate verdict with the full per-lock diagnostic set.
// Dependencies: crate::core, crate::runtime::lock
// ============================================================================

//! ## Overview
//! A gate passes iff every lock passes. All locks are evaluated even after a
//! failure so action derivation sees every unmet requirement at once.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;

use crate::core::process::Gate;
use crate::core::results::GateResult;
use crate::runtime::lock::evaluate_all;

// ============================================================================
// SECTION: Gate Evaluation
// ============================================================================

/// Evaluates a gate against an element.
#[must_use]
pub fn evaluate_gate(gate: &Gate, element: &Value) -> GateResult {
    let lock_results = evaluate_all(&gate.locks, element);
    let passed = lock_results.iter().all(|result| result.passed);
    let failure_messages = lock_results
        .iter()
        .filter(|result| !result.passed)
        .filter_map(|result| result.error_message.as_deref())
        .map(|message| contextualize(gate, message))
        .collect();
    GateResult {
        gate_name: gate.name.clone(),
        target_stage: gate.target_stage.clone(),
        passed,
        lock_results,
        failure_messages,
    }
}

/// Prefixes a lock failure message with the gate and its target.
#[must_use]
pub fn contextualize(gate: &Gate, message: &str) -> String {
    format!("To transition via '{}' to stage '{}': {message}", gate.name, gate.target_stage)
}
