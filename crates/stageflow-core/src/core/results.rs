// crates/stageflow-core/src/core/results.rs
// ============================================================================
// Module: Stageflow Evaluation Results
// Description: Result payloads for lock, gate, stage, and process evaluation.
// Purpose: Define the serializable output contract of an evaluation call.
// Dependencies: crate::core, serde, serde_json
// ============================================================================

//! ## Overview
//! Results are built fresh for every evaluation call and never persisted by
//! the engine. All collections are ordered deterministically so identical
//! inputs serialize identically.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::GateName;
use crate::core::identifiers::ProcessName;
use crate::core::identifiers::StageId;
use crate::core::lock::LockType;

// ============================================================================
// SECTION: Lock Results
// ============================================================================

/// Why a lock failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The property was absent or null.
    MissingValue,
    /// The property was present but did not satisfy the check.
    CheckFailed,
}

/// Outcome of one lock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockResult {
    /// Lock kind.
    pub lock_type: LockType,
    /// Property path for single-path kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_path: Option<String>,
    /// True when the lock passed.
    pub passed: bool,
    /// Failure reason; `None` when passed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureReason>,
    /// Failure message; `None` when passed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Value observed at the path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_value: Option<Value>,
    /// Kind-specific expectation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_value: Option<Value>,
    /// Results of nested locks for compound kinds.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nested: Vec<LockResult>,
}

impl LockResult {
    /// Returns true when the failure stems from missing data anywhere in the lock.
    #[must_use]
    pub fn is_missing_value(&self) -> bool {
        self.failure == Some(FailureReason::MissingValue)
    }
}

// ============================================================================
// SECTION: Gate Results
// ============================================================================

/// Outcome of one gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateResult {
    /// Gate name.
    pub gate_name: GateName,
    /// Gate target.
    pub target_stage: StageId,
    /// True when every lock passed.
    pub passed: bool,
    /// Per-lock results in declaration order.
    pub lock_results: Vec<LockResult>,
    /// Failure messages prefixed with the gate and target.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failure_messages: Vec<String>,
}

// ============================================================================
// SECTION: Actions
// ============================================================================

/// Kind of recommended next step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Supply a missing property.
    ProvideData,
    /// Change a property so a failing lock passes.
    ResolveValidation,
    /// Perform an author-configured action.
    ExecuteAction,
    /// Move the element through a passing gate.
    Transition,
    /// Restore data required by an earlier stage.
    ResolveRegression,
}

/// Who produced an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionSource {
    /// Derived by the engine.
    Computed,
    /// Declared by the process author.
    Configured,
}

/// Recommended next step. The engine never executes actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Action kind.
    pub action_type: ActionType,
    /// Producer.
    pub source: ActionSource,
    /// Optional name (configured actions).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Human-readable description.
    pub description: String,
    /// Ordered instructions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instructions: Vec<String>,
    /// Properties the action relates to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_properties: Vec<String>,
    /// Properties the action produces.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_properties: Vec<String>,
    /// Transition target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_stage: Option<StageId>,
    /// Transition gate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate_name: Option<GateName>,
    /// Suggested value for `provide_data` actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_value: Option<Value>,
}

impl Action {
    /// Creates a computed action with only a description.
    #[must_use]
    pub fn computed(action_type: ActionType, description: impl Into<String>) -> Self {
        Self {
            action_type,
            source: ActionSource::Computed,
            name: None,
            description: description.into(),
            instructions: Vec::new(),
            related_properties: Vec::new(),
            target_properties: Vec::new(),
            target_stage: None,
            gate_name: None,
            suggested_value: None,
        }
    }
}

// ============================================================================
// SECTION: Stage Results
// ============================================================================

/// Stage status for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Declared fields are missing.
    Incomplete,
    /// Fields are present but no gate passes.
    Blocked,
    /// At least one gate passes, or the final stage is satisfied.
    Ready,
}

/// Outcome of evaluating one element at one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    /// Evaluated stage.
    pub stage: StageId,
    /// Status.
    pub status: StageStatus,
    /// Declared fields that failed existence resolution.
    pub missing_properties: Vec<String>,
    /// Gate results keyed by gate name.
    pub gate_results: BTreeMap<GateName, GateResult>,
    /// Recommended actions.
    pub actions: Vec<Action>,
    /// Passing gates in declaration order.
    pub ready_gates: Vec<GateName>,
}

// ============================================================================
// SECTION: Process Results
// ============================================================================

/// How a regression was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegressionKind {
    /// Current stage is shallower than the previously recorded stage.
    StageDepth,
    /// A stage on the path to the current stage no longer passes.
    PriorStageFailure,
}

/// Regression diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegressionDetails {
    /// Detection mode.
    pub kind: RegressionKind,
    /// Stage the element regressed from.
    pub regressed_from: StageId,
    /// Stage whose requirements are no longer met.
    pub failing_stage: StageId,
    /// BFS depth of the previous stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_depth: Option<usize>,
    /// BFS depth of the current stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_depth: Option<usize>,
}

/// Outcome of evaluating one element against a process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Process name.
    pub process: ProcessName,
    /// Resolved current stage.
    pub stage: StageId,
    /// Stage outcome.
    pub stage_result: StageResult,
    /// True when a regression was detected.
    pub regression: bool,
    /// Regression diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regression_details: Option<RegressionDetails>,
    /// Warning surfaced under the `warn` policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regression_warning: Option<String>,
}
