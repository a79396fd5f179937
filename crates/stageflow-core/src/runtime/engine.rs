// crates/stageflow-core/src/runtime/engine.rs
// ============================================================================
// Module: Stageflow Evaluation Engine
// Description: Orchestrates stage resolution, evaluation, and regression policy.
// Purpose: Provide the single evaluation path every caller goes through.
// Dependencies: crate::{core, audit, loader, runtime}, serde, thiserror
// ============================================================================

//! ## Overview
//! [`Engine::evaluate`] resolves the element's stage (explicit override, then
//! the process's stage property, then the initial stage), evaluates it,
//! applies regression detection and policy, and records one audit event.
//! The engine holds no per-element state; one engine may evaluate many
//! elements against many processes concurrently.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::audit::ElementEvaluationEvent;
use crate::audit::ElementEvaluationEventParams;
use crate::audit::EvaluationAuditSink;
use crate::audit::NoopAuditSink;
use crate::core::definition::ProcessDefinition;
use crate::core::identifiers::StageId;
use crate::core::process::Process;
use crate::core::process::RegressionPolicy;
use crate::core::process::Stage;
use crate::core::results::Action;
use crate::core::results::ActionType;
use crate::core::results::EvaluationResult;
use crate::core::results::RegressionDetails;
use crate::core::results::RegressionKind;
use crate::core::results::StageResult;
use crate::core::results::StageStatus;
use crate::loader::LoadOptions;
use crate::loader::LoadResult;
use crate::loader::load_with_audit;
use crate::runtime::regression::RegressionDetector;
use crate::runtime::resolver::resolve;
use crate::runtime::stage::evaluate_stage;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Engine options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Re-evaluate stages before the current one on its shortest path.
    pub revalidate_prior_stages: bool,
}

/// Per-call evaluation inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationRequest {
    /// Explicit stage override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<StageId>,
    /// Previously known stage, for regression detection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_stage: Option<StageId>,
}

impl EvaluationRequest {
    /// Request evaluating at an explicit stage.
    #[must_use]
    pub fn at(stage: impl Into<StageId>) -> Self {
        Self {
            stage: Some(stage.into()),
            previous_stage: None,
        }
    }

    /// Adds the previously known stage.
    #[must_use]
    pub fn with_previous(mut self, stage: impl Into<StageId>) -> Self {
        self.previous_stage = Some(stage.into());
        self
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Evaluation errors; raised only for unresolvable stages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    /// Stage identifier is not declared in the process.
    #[error("unknown stage identifier: {0}")]
    UnknownStage(String),
    /// The stage property is absent from the element.
    #[error("stage property {0} is missing from the element")]
    StagePropMissing(String),
    /// The stage property does not hold a string.
    #[error("stage property {0} must hold a string stage identifier")]
    StagePropNotString(String),
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Evaluation engine.
#[derive(Clone)]
pub struct Engine {
    /// Engine options.
    options: EngineOptions,
    /// Audit sink receiving one event per load and evaluation.
    audit: Arc<dyn EvaluationAuditSink>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineOptions::default(), Arc::new(NoopAuditSink))
    }
}

impl Engine {
    /// Creates an engine.
    #[must_use]
    pub fn new(options: EngineOptions, audit: Arc<dyn EvaluationAuditSink>) -> Self {
        Self {
            options,
            audit,
        }
    }

    /// Returns the engine options.
    #[must_use]
    pub const fn options(&self) -> EngineOptions {
        self.options
    }

    /// Loads a definition, recording a load audit event.
    #[must_use]
    pub fn load(&self, definition: &ProcessDefinition, options: &LoadOptions) -> LoadResult {
        load_with_audit(definition, options, self.audit.as_ref())
    }

    /// Evaluates one element against a process.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluationError`] when the stage cannot be resolved.
    pub fn evaluate(
        &self,
        process: &Process,
        element: &Value,
        request: &EvaluationRequest,
    ) -> Result<EvaluationResult, EvaluationError> {
        self.evaluate_with(&RegressionDetector::new(process), process, element, request)
    }

    /// Evaluates many elements against one process, one result per element.
    #[must_use]
    pub fn evaluate_batch(
        &self,
        process: &Process,
        elements: &[Value],
        request: &EvaluationRequest,
    ) -> Vec<Result<EvaluationResult, EvaluationError>> {
        let detector = RegressionDetector::new(process);
        elements
            .iter()
            .map(|element| self.evaluate_with(&detector, process, element, request))
            .collect()
    }

    /// Evaluates with a detector shared across a batch.
    fn evaluate_with(
        &self,
        detector: &RegressionDetector<'_>,
        process: &Process,
        element: &Value,
        request: &EvaluationRequest,
    ) -> Result<EvaluationResult, EvaluationError> {
        let stage = resolve_stage(process, element, request.stage.as_ref())?;
        let previous = request
            .previous_stage
            .as_ref()
            .map(|previous| lookup(process, previous.as_str()))
            .transpose()?;
        let mut stage_result = evaluate_stage(stage, element);

        let details = previous
            .and_then(|previous| detector.detect(&stage.id, &previous.id))
            .or_else(|| {
                self.options
                    .revalidate_prior_stages
                    .then(|| detector.revalidate_prior_stages(element, &stage.id))
                    .flatten()
            });

        let policy = process.regression_policy();
        let mut regression_warning = None;
        if let Some(details) = &details {
            match policy {
                RegressionPolicy::Ignore => {}
                RegressionPolicy::Warn => regression_warning = Some(regression_message(details)),
                RegressionPolicy::Block => block(&mut stage_result, details),
            }
        }

        let result = EvaluationResult {
            process: process.name().clone(),
            stage: stage.id.clone(),
            regression: details.is_some(),
            regression_details: details,
            regression_warning,
            stage_result,
        };
        self.audit.record_evaluation(&ElementEvaluationEvent::new(ElementEvaluationEventParams {
            process: process.name().to_string(),
            digest: process.digest().clone(),
            stage: result.stage.to_string(),
            status: result.stage_result.status,
            ready_gates: result.stage_result.ready_gates.len(),
            actions: result.stage_result.actions.len(),
            regression: result.regression,
        }));
        Ok(result)
    }
}

// ============================================================================
// SECTION: Stage Resolution
// ============================================================================

/// Resolves the stage: override, then stage property, then initial stage.
fn resolve_stage<'a>(
    process: &'a Process,
    element: &Value,
    requested: Option<&StageId>,
) -> Result<&'a Stage, EvaluationError> {
    if let Some(stage) = requested {
        return lookup(process, stage.as_str());
    }
    if let Some(path) = process.stage_prop() {
        let value = resolve(element, path)
            .filter(|value| !value.is_null())
            .ok_or_else(|| EvaluationError::StagePropMissing(path.to_string()))?;
        let name =
            value.as_str().ok_or_else(|| EvaluationError::StagePropNotString(path.to_string()))?;
        return lookup(process, name);
    }
    lookup(process, process.initial_stage().as_str())
}

/// Looks up a stage or reports it as unknown.
fn lookup<'a>(process: &'a Process, stage: &str) -> Result<&'a Stage, EvaluationError> {
    process.stage(stage).ok_or_else(|| EvaluationError::UnknownStage(stage.to_string()))
}

// ============================================================================
// SECTION: Regression Policy
// ============================================================================

/// Human-readable regression summary.
fn regression_message(details: &RegressionDetails) -> String {
    match details.kind {
        RegressionKind::StageDepth => format!(
            "Element regressed from stage '{}' to earlier stage '{}'",
            details.regressed_from, details.failing_stage
        ),
        RegressionKind::PriorStageFailure => format!(
            "Element at stage '{}' no longer meets the requirements of earlier stage '{}'",
            details.regressed_from, details.failing_stage
        ),
    }
}

/// Forces a blocked status and swaps transitions for a regression action.
fn block(result: &mut StageResult, details: &RegressionDetails) {
    result.status = StageStatus::Blocked;
    result.ready_gates.clear();
    result.actions.retain(|action| action.action_type != ActionType::Transition);
    result.actions.insert(
        0,
        Action {
            target_stage: Some(details.failing_stage.clone()),
            ..Action::computed(ActionType::ResolveRegression, regression_message(details))
        },
    );
}
