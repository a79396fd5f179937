// crates/stageflow-core/src/core/issues.rs
// ============================================================================
// Module: Stageflow Load Issues
// Description: Severity-tagged diagnostics produced while loading a process.
// Purpose: Give callers a stable, machine-readable view of load failures.
// Dependencies: crate::core, serde
// ============================================================================

//! ## Overview
//! Every structural or consistency problem found at load time becomes an
//! [`Issue`]. A load succeeds iff no issue is [`Severity::Fatal`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::GateName;
use crate::core::identifiers::StageId;

// ============================================================================
// SECTION: Severity
// ============================================================================

/// Issue severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Load fails.
    Fatal,
    /// Process is usable but likely misconfigured.
    Warning,
    /// Informational only.
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fatal => "fatal",
            Self::Warning => "warning",
            Self::Info => "info",
        })
    }
}

// ============================================================================
// SECTION: Issue Types
// ============================================================================

/// Closed set of load-time issue kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueType {
    /// Source does not deserialize into a definition.
    MalformedDefinition,
    /// A required process field is missing or empty.
    MissingRequiredField,
    /// Fewer than two stages are declared.
    InsufficientStages,
    /// Initial or final stage is not declared.
    MissingStage,
    /// A gate targets an undeclared stage.
    InvalidTransition,
    /// A lock is malformed.
    InvalidLockDefinition,
    /// A property path does not parse.
    InvalidPropertyPath,
    /// A configured action is malformed.
    InvalidActionDefinition,
    /// A stage cannot be reached from the initial stage.
    UnreachableStage,
    /// A cycle has no exit toward the final stage.
    InfiniteCycle,
    /// A gate targets its own stage.
    SelfReferencingGate,
    /// Two gates in one stage share a target.
    MultipleGatesSameTarget,
    /// Two gates in one stage have identical conditions.
    DuplicateGateSchemas,
    /// A gate's locks cannot all pass together.
    LogicalConflict,
    /// The final stage declares gates.
    FinalStageHasGates,
    /// A stage cannot reach the final stage.
    DeadEndStage,
    /// A cycle exits but nothing suggests it terminates.
    UncontrolledCycle,
    /// A cycle with termination-suggestive locks.
    ControlledCycle,
    /// A stage with no gates that nothing targets.
    OrphanedStage,
    /// A gate requires nothing beyond the stage's own fields.
    EmptyStageTransformation,
    /// An action names a property no lock validates.
    UnvalidatedRelatedProperty,
    /// Two configured actions share a name.
    DuplicateActionName,
    /// `is_final` is set on a stage other than the final stage.
    FinalStageFlagMismatch,
}

impl IssueType {
    /// Returns the severity this issue kind always carries.
    #[must_use]
    pub const fn severity(self) -> Severity {
        match self {
            Self::MalformedDefinition
            | Self::MissingRequiredField
            | Self::InsufficientStages
            | Self::MissingStage
            | Self::InvalidTransition
            | Self::InvalidLockDefinition
            | Self::InvalidPropertyPath
            | Self::InvalidActionDefinition
            | Self::UnreachableStage
            | Self::InfiniteCycle
            | Self::SelfReferencingGate
            | Self::MultipleGatesSameTarget
            | Self::DuplicateGateSchemas
            | Self::LogicalConflict
            | Self::FinalStageHasGates => Severity::Fatal,
            Self::DeadEndStage
            | Self::UncontrolledCycle
            | Self::OrphanedStage
            | Self::EmptyStageTransformation
            | Self::UnvalidatedRelatedProperty
            | Self::DuplicateActionName
            | Self::FinalStageFlagMismatch => Severity::Warning,
            Self::ControlledCycle => Severity::Info,
        }
    }

    /// Returns the wire name, such as `UNREACHABLE_STAGE`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MalformedDefinition => "MALFORMED_DEFINITION",
            Self::MissingRequiredField => "MISSING_REQUIRED_FIELD",
            Self::InsufficientStages => "INSUFFICIENT_STAGES",
            Self::MissingStage => "MISSING_STAGE",
            Self::InvalidTransition => "INVALID_TRANSITION",
            Self::InvalidLockDefinition => "INVALID_LOCK_DEFINITION",
            Self::InvalidPropertyPath => "INVALID_PROPERTY_PATH",
            Self::InvalidActionDefinition => "INVALID_ACTION_DEFINITION",
            Self::UnreachableStage => "UNREACHABLE_STAGE",
            Self::InfiniteCycle => "INFINITE_CYCLE",
            Self::SelfReferencingGate => "SELF_REFERENCING_GATE",
            Self::MultipleGatesSameTarget => "MULTIPLE_GATES_SAME_TARGET",
            Self::DuplicateGateSchemas => "DUPLICATE_GATE_SCHEMAS",
            Self::LogicalConflict => "LOGICAL_CONFLICT",
            Self::FinalStageHasGates => "FINAL_STAGE_HAS_GATES",
            Self::DeadEndStage => "DEAD_END_STAGE",
            Self::UncontrolledCycle => "UNCONTROLLED_CYCLE",
            Self::ControlledCycle => "CONTROLLED_CYCLE",
            Self::OrphanedStage => "ORPHANED_STAGE",
            Self::EmptyStageTransformation => "EMPTY_STAGE_TRANSFORMATION",
            Self::UnvalidatedRelatedProperty => "UNVALIDATED_RELATED_PROPERTY",
            Self::DuplicateActionName => "DUPLICATE_ACTION_NAME",
            Self::FinalStageFlagMismatch => "FINAL_STAGE_FLAG_MISMATCH",
        }
    }
}

// ============================================================================
// SECTION: Issue
// ============================================================================

/// Where an issue was found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueLocation {
    /// Stages involved, in discovery order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stages: Vec<StageId>,
    /// Gate, when the issue is gate-scoped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate: Option<GateName>,
    /// Lock index within the gate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_index: Option<usize>,
    /// Property path involved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_path: Option<String>,
}

impl IssueLocation {
    /// Location naming a single stage.
    #[must_use]
    pub fn stage(stage: &StageId) -> Self {
        Self {
            stages: vec![stage.clone()],
            ..Self::default()
        }
    }

    /// Location naming a gate within a stage.
    #[must_use]
    pub fn gate(stage: &StageId, gate: &GateName) -> Self {
        Self {
            stages: vec![stage.clone()],
            gate: Some(gate.clone()),
            ..Self::default()
        }
    }

    /// Adds a lock index.
    #[must_use]
    pub const fn with_lock(mut self, index: usize) -> Self {
        self.lock_index = Some(index);
        self
    }

    /// Adds a property path.
    #[must_use]
    pub fn with_property(mut self, path: impl Into<String>) -> Self {
        self.property_path = Some(path.into());
        self
    }
}

/// Load-time diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Severity.
    pub severity: Severity,
    /// Issue kind.
    pub issue_type: IssueType,
    /// Human-readable message.
    pub message: String,
    /// Location.
    pub location: IssueLocation,
    /// Remediation hints.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl Issue {
    /// Creates an issue with the kind's fixed severity.
    #[must_use]
    pub fn new(issue_type: IssueType, message: impl Into<String>, location: IssueLocation) -> Self {
        Self {
            severity: issue_type.severity(),
            issue_type,
            message: message.into(),
            location,
            suggestions: Vec::new(),
        }
    }

    /// Appends a remediation hint.
    #[must_use]
    pub fn suggest(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Returns true for fatal issues.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Fatal
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.issue_type.as_str(), self.message)
    }
}
