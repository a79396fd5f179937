// crates/stageflow-core/src/core/process.rs
// ============================================================================
// Module: Stageflow Process Graph
// Description: Immutable process model of stages, gates, and locks.
// Purpose: Provide the arena every analysis and evaluation pass reads from.
// Dependencies: crate::core, serde, serde_json
// ============================================================================

//! ## Overview
//! A [`Process`] stores its stages in an arena ordered by declaration. Gates
//! reference target stages by [`StageId`], so cycles in the workflow are plain
//! edges rather than ownership cycles. A process is constructed once by the
//! loader and never mutated afterwards; evaluation borrows it immutably.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::hashing::HashDigest;
use crate::core::identifiers::GateName;
use crate::core::identifiers::ProcessName;
use crate::core::identifiers::StageId;
use crate::core::lock::Lock;
use crate::core::path::PropertyPath;

// ============================================================================
// SECTION: Policies
// ============================================================================

/// Consequence of a detected regression.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegressionPolicy {
    /// Flag only.
    #[default]
    Ignore,
    /// Flag and surface a warning message.
    Warn,
    /// Flag and force the stage status to blocked.
    Block,
}

impl RegressionPolicy {
    /// Parses a policy name case-insensitively.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "ignore" => Some(Self::Ignore),
            "warn" => Some(Self::Warn),
            "block" => Some(Self::Block),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Stage Components
// ============================================================================

/// Declared property expected on elements occupying a stage.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Property path.
    pub path: PropertyPath,
    /// Declared type tag, as written.
    pub type_tag: Option<String>,
    /// Optional string format hint.
    pub format: Option<String>,
    /// Suggested default reported when the property is missing.
    pub default: Option<Value>,
    /// Optional description.
    pub description: Option<String>,
    /// Remaining schema constraints passed through to generated schemas.
    pub constraints: BTreeMap<String, Value>,
}

impl FieldSpec {
    /// Creates a bare field spec with no type information.
    #[must_use]
    pub const fn bare(path: PropertyPath) -> Self {
        Self {
            path,
            type_tag: None,
            format: None,
            default: None,
            description: None,
            constraints: BTreeMap::new(),
        }
    }
}

/// Author-configured action recommended when a stage is blocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpec {
    /// Optional action name.
    pub name: Option<String>,
    /// Human-readable description.
    pub description: String,
    /// Ordered instructions; may be empty.
    pub instructions: Vec<String>,
    /// Input properties the action relates to.
    pub related_properties: Vec<String>,
    /// Output properties the action produces.
    pub target_properties: Vec<String>,
}

/// Directed edge to a target stage, guarded by AND-combined locks.
#[derive(Debug, Clone, PartialEq)]
pub struct Gate {
    /// Gate name, unique within its stage.
    pub name: GateName,
    /// Target stage.
    pub target_stage: StageId,
    /// Optional description.
    pub description: Option<String>,
    /// Ordered lock list.
    pub locks: Vec<Lock>,
}

/// Checkpoint an element can occupy.
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    /// Stage identifier.
    pub id: StageId,
    /// Display name; defaults to the identifier.
    pub name: String,
    /// Description.
    pub description: String,
    /// Declared fields, in declaration order.
    pub fields: Vec<FieldSpec>,
    /// Configured actions.
    pub expected_actions: Vec<ActionSpec>,
    /// Outgoing gates, in declaration order.
    pub gates: Vec<Gate>,
    /// True for the process's final stage.
    pub is_final: bool,
}

impl Stage {
    /// Looks up a gate by name.
    #[must_use]
    pub fn gate(&self, name: &str) -> Option<&Gate> {
        self.gates.iter().find(|gate| gate.name.as_str() == name)
    }

    /// Returns every lock path evaluated by this stage's gates.
    #[must_use]
    pub fn evaluated_paths(&self) -> Vec<&PropertyPath> {
        self.gates
            .iter()
            .flat_map(|gate| gate.locks.iter())
            .flat_map(Lock::referenced_paths)
            .collect()
    }
}

// ============================================================================
// SECTION: Process
// ============================================================================

/// Loaded, immutable workflow definition.
///
/// # Invariants
/// - `initial_stage` and `final_stage` name stages in the arena.
/// - Every gate target names a stage in the arena.
/// - Stage identifiers are unique.
#[derive(Debug, Clone, PartialEq)]
pub struct Process {
    /// Process name.
    name: ProcessName,
    /// Description.
    description: String,
    /// Entry stage.
    initial_stage: StageId,
    /// Terminal stage.
    final_stage: StageId,
    /// Optional path used to read the current stage from elements.
    stage_prop: Option<PropertyPath>,
    /// Regression policy.
    regression_policy: RegressionPolicy,
    /// Stage arena in declaration order.
    stages: Vec<Stage>,
    /// Stage identifier to arena index.
    index: BTreeMap<StageId, usize>,
    /// Digest of the source definition.
    digest: HashDigest,
}

/// Constructor inputs for [`Process::new`].
pub struct ProcessParts {
    /// Process name.
    pub name: ProcessName,
    /// Description.
    pub description: String,
    /// Entry stage.
    pub initial_stage: StageId,
    /// Terminal stage.
    pub final_stage: StageId,
    /// Optional stage property path.
    pub stage_prop: Option<PropertyPath>,
    /// Regression policy.
    pub regression_policy: RegressionPolicy,
    /// Stages in declaration order.
    pub stages: Vec<Stage>,
    /// Digest of the source definition.
    pub digest: HashDigest,
}

impl Process {
    /// Assembles a process from validated parts.
    ///
    /// Callers outside the loader are responsible for upholding the type
    /// invariants; the loader checks them before calling this.
    #[must_use]
    pub fn new(parts: ProcessParts) -> Self {
        let index = parts
            .stages
            .iter()
            .enumerate()
            .map(|(position, stage)| (stage.id.clone(), position))
            .collect();
        Self {
            name: parts.name,
            description: parts.description,
            initial_stage: parts.initial_stage,
            final_stage: parts.final_stage,
            stage_prop: parts.stage_prop,
            regression_policy: parts.regression_policy,
            stages: parts.stages,
            index,
            digest: parts.digest,
        }
    }

    /// Returns the process name.
    #[must_use]
    pub const fn name(&self) -> &ProcessName {
        &self.name
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the entry stage identifier.
    #[must_use]
    pub const fn initial_stage(&self) -> &StageId {
        &self.initial_stage
    }

    /// Returns the terminal stage identifier.
    #[must_use]
    pub const fn final_stage(&self) -> &StageId {
        &self.final_stage
    }

    /// Returns the stage property path, if configured.
    #[must_use]
    pub const fn stage_prop(&self) -> Option<&PropertyPath> {
        self.stage_prop.as_ref()
    }

    /// Returns the regression policy.
    #[must_use]
    pub const fn regression_policy(&self) -> RegressionPolicy {
        self.regression_policy
    }

    /// Returns all stages in declaration order.
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Looks up a stage by identifier.
    #[must_use]
    pub fn stage(&self, id: &str) -> Option<&Stage> {
        self.index.get(id).and_then(|position| self.stages.get(*position))
    }

    /// Returns the arena index of a stage.
    #[must_use]
    pub fn stage_index(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Returns the digest of the source definition.
    #[must_use]
    pub const fn digest(&self) -> &HashDigest {
        &self.digest
    }
}
