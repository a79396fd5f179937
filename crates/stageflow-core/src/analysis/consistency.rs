// crates/stageflow-core/src/analysis/consistency.rs
// ============================================================================
// Module: Stageflow Consistency Analyzer
// Description: Load-time graph and lock checks over a process.
// Purpose: Reject processes that strand elements or cannot be decided.
// Dependencies: crate::core, crate::analysis, crate::schema
// ============================================================================

//! ## Overview
//! The analyzer runs once per load, after structural validation. Checks run
//! in a fixed order and visit stages in declaration order, so the issue list
//! is deterministic:
//! 1. final stage constraints
//! 2. per-gate determinism (self references, shared targets, duplicate
//!    conditions, logical conflicts)
//! 3. reachability from the initial stage
//! 4. completability toward the final stage
//! 5. orphaned stages and cycle termination
//! 6. transformation and action hygiene

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::analysis::conflicts::find_conflicts;
use crate::analysis::conflicts::suggests_termination;
use crate::analysis::graph::StageGraph;
use crate::core::identifiers::StageId;
use crate::core::issues::Issue;
use crate::core::issues::IssueLocation;
use crate::core::issues::IssueType;
use crate::core::lock::Lock;
use crate::core::lock::LockCondition;
use crate::core::process::Gate;
use crate::core::process::Process;
use crate::core::path::PropertyPath;
use crate::core::process::Stage;

// ============================================================================
// SECTION: Options
// ============================================================================

/// Analyzer options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisOptions {
    /// Emit informational issues for cycles that appear to terminate.
    pub report_controlled_cycles: bool,
}

// ============================================================================
// SECTION: Analyzer
// ============================================================================

/// Consistency analyzer bound to one process.
#[derive(Debug)]
pub struct ConsistencyAnalyzer<'a> {
    /// Process under analysis.
    process: &'a Process,
    /// Gate graph of the process.
    graph: StageGraph,
    /// Analyzer options.
    options: AnalysisOptions,
}

/// Runs every consistency check over a process.
#[must_use]
pub fn analyze(process: &Process, options: AnalysisOptions) -> Vec<Issue> {
    ConsistencyAnalyzer::new(process, options).analyze()
}

impl<'a> ConsistencyAnalyzer<'a> {
    /// Creates an analyzer for a process.
    #[must_use]
    pub fn new(process: &'a Process, options: AnalysisOptions) -> Self {
        Self {
            process,
            graph: StageGraph::new(process),
            options,
        }
    }

    /// Runs every check and returns the issues in check order.
    #[must_use]
    pub fn analyze(&self) -> Vec<Issue> {
        let mut issues = Vec::new();
        self.check_final_stage(&mut issues);
        for stage in self.process.stages() {
            check_gate_targets(stage, &mut issues);
            check_duplicate_conditions(stage, &mut issues);
            check_conflicts(stage, &mut issues);
        }
        self.check_reachability(&mut issues);
        self.check_completability(&mut issues);
        self.check_orphans(&mut issues);
        self.check_cycles(&mut issues);
        for stage in self.process.stages() {
            check_transformations(stage, &mut issues);
            check_actions(stage, &mut issues);
        }
        issues
    }

    /// Returns the arena index of a stage identifier.
    fn index_of(&self, stage: &str) -> Option<usize> {
        self.process.stage_index(stage)
    }

    /// Flags gates on the final stage and stray `is_final` flags.
    fn check_final_stage(&self, issues: &mut Vec<Issue>) {
        let final_stage = self.process.final_stage();
        for stage in self.process.stages() {
            if &stage.id == final_stage && !stage.gates.is_empty() {
                issues.push(
                    Issue::new(
                        IssueType::FinalStageHasGates,
                        format!(
                            "Final stage '{}' declares {} gate(s); the final stage must be terminal",
                            stage.id,
                            stage.gates.len()
                        ),
                        IssueLocation::stage(&stage.id),
                    )
                    .suggest(format!("Remove the gates from '{}'", stage.id))
                    .suggest("Move the outgoing transitions into a new final stage"),
                );
            }
            if stage.is_final && &stage.id != final_stage {
                issues.push(
                    Issue::new(
                        IssueType::FinalStageFlagMismatch,
                        format!(
                            "Stage '{}' is marked final but the process final stage is '{final_stage}'",
                            stage.id
                        ),
                        IssueLocation::stage(&stage.id),
                    )
                    .suggest(format!("Set final_stage to '{}' or remove its is_final flag", stage.id)),
                );
            }
        }
    }

    /// Flags stages the initial stage cannot reach.
    fn check_reachability(&self, issues: &mut Vec<Issue>) {
        let initial = self.process.initial_stage();
        let Some(start) = self.index_of(initial.as_str()) else {
            return;
        };
        let depths = self.graph.depths_from(start);
        for (index, stage) in self.process.stages().iter().enumerate() {
            if depths.get(index).copied().flatten().is_none() {
                issues.push(
                    Issue::new(
                        IssueType::UnreachableStage,
                        format!("Stage '{}' is not reachable from initial stage '{initial}'", stage.id),
                        IssueLocation::stage(&stage.id),
                    )
                    .suggest(format!("Add a gate targeting '{}' from a reachable stage", stage.id))
                    .suggest(format!("Remove stage '{}' if it is no longer used", stage.id)),
                );
            }
        }
    }

    /// Flags stages that cannot reach the final stage.
    ///
    /// Stages inside a multi-stage component that never reaches the final
    /// stage are grouped into one infinite-cycle issue per component.
    fn check_completability(&self, issues: &mut Vec<Issue>) {
        let final_stage = self.process.final_stage();
        let Some(target) = self.index_of(final_stage.as_str()) else {
            return;
        };
        let reaching = self.graph.reaching(target);
        let stranded = |index: &usize| !reaching.get(*index).copied().unwrap_or(false);
        let mut in_cycle = BTreeSet::new();

        for component in self.graph.strongly_connected_components() {
            if component.len() < 2 || !component.iter().all(stranded) {
                continue;
            }
            let ids = self.stage_ids(&component);
            let names = ids.iter().map(|id| format!("'{id}'")).collect::<Vec<_>>().join(" -> ");
            in_cycle.extend(component.iter().copied());
            issues.push(
                Issue::new(
                    IssueType::InfiniteCycle,
                    format!("Stages {names} form a cycle with no path to final stage '{final_stage}'"),
                    IssueLocation {
                        stages: ids,
                        ..IssueLocation::default()
                    },
                )
                .suggest(format!("Add a gate leading out of the cycle toward '{final_stage}'")),
            );
        }

        for (index, stage) in self.process.stages().iter().enumerate() {
            if index == target || in_cycle.contains(&index) || !stranded(&index) {
                continue;
            }
            issues.push(
                Issue::new(
                    IssueType::DeadEndStage,
                    format!("Stage '{}' has no path to final stage '{final_stage}'", stage.id),
                    IssueLocation::stage(&stage.id),
                )
                .suggest(format!(
                    "Add a gate from '{}' toward a stage that reaches '{final_stage}'",
                    stage.id
                )),
            );
        }
    }

    /// Returns true for a gateless, non-final stage that nothing targets.
    fn is_orphan(&self, stage: &Stage) -> bool {
        stage.gates.is_empty()
            && &stage.id != self.process.final_stage()
            && !self
                .process
                .stages()
                .iter()
                .flat_map(|other| other.gates.iter())
                .any(|gate| gate.target_stage == stage.id)
    }

    /// Flags orphaned stages.
    fn check_orphans(&self, issues: &mut Vec<Issue>) {
        for stage in self.process.stages().iter().filter(|stage| self.is_orphan(stage)) {
            issues.push(
                Issue::new(
                    IssueType::OrphanedStage,
                    format!("Stage '{}' has no gates and no gate targets it", stage.id),
                    IssueLocation::stage(&stage.id),
                )
                .suggest(format!("Target '{}' from another stage or remove it", stage.id)),
            );
        }
    }

    /// Classifies cycles that can exit toward the final stage.
    fn check_cycles(&self, issues: &mut Vec<Issue>) {
        let Some(target) = self.index_of(self.process.final_stage().as_str()) else {
            return;
        };
        let reaching = self.graph.reaching(target);
        for component in self.graph.strongly_connected_components() {
            if component.len() < 2
                || !component.iter().any(|index| reaching.get(*index).copied().unwrap_or(false))
            {
                continue;
            }
            // Every gate of a member stage is either internal or an exit edge.
            let controlled = component
                .iter()
                .filter_map(|index| self.process.stages().get(*index))
                .flat_map(|stage| stage.gates.iter())
                .flat_map(|gate| gate.locks.iter())
                .any(suggests_termination);
            let ids = self.stage_ids(&component);
            let names = ids.iter().map(|id| format!("'{id}'")).collect::<Vec<_>>().join(", ");
            let location = IssueLocation {
                stages: ids,
                ..IssueLocation::default()
            };
            if !controlled {
                issues.push(
                    Issue::new(
                        IssueType::UncontrolledCycle,
                        format!(
                            "Cycle through stages {names} has no lock suggesting it terminates"
                        ),
                        location,
                    )
                    .suggest("Add a counter property with a less_than lock to bound the loop")
                    .suggest("Guard the loop with an equals lock over a status property"),
                );
            } else if self.options.report_controlled_cycles {
                issues.push(Issue::new(
                    IssueType::ControlledCycle,
                    format!("Cycle through stages {names} is bounded by its gate locks"),
                    location,
                ));
            }
        }
    }

    /// Returns stage identifiers for arena indices.
    fn stage_ids(&self, indices: &[usize]) -> Vec<StageId> {
        indices
            .iter()
            .filter_map(|index| self.process.stages().get(*index))
            .map(|stage| stage.id.clone())
            .collect()
    }
}

// ============================================================================
// SECTION: Per-Stage Checks
// ============================================================================

/// Flags self-referencing gates and gates sharing a target.
fn check_gate_targets(stage: &Stage, issues: &mut Vec<Issue>) {
    for (position, gate) in stage.gates.iter().enumerate() {
        if gate.target_stage == stage.id {
            issues.push(
                Issue::new(
                    IssueType::SelfReferencingGate,
                    format!("Gate '{}' in stage '{}' targets its own stage", gate.name, stage.id),
                    IssueLocation::gate(&stage.id, &gate.name),
                )
                .suggest(format!("Point gate '{}' at a different stage", gate.name))
                .suggest("Model retries with a separate stage guarded by a counter lock"),
            );
        }
        if let Some(earlier) =
            stage.gates.iter().take(position).find(|earlier| earlier.target_stage == gate.target_stage)
        {
            issues.push(
                Issue::new(
                    IssueType::MultipleGatesSameTarget,
                    format!(
                        "Gates '{}' and '{}' in stage '{}' both target stage '{}'",
                        earlier.name, gate.name, stage.id, gate.target_stage
                    ),
                    IssueLocation::gate(&stage.id, &gate.name),
                )
                .suggest(format!(
                    "Merge '{}' and '{}' into one gate using an or_logic lock",
                    earlier.name, gate.name
                )),
            );
        }
    }
}

/// Flags gates in one stage whose lock conditions are identical.
fn check_duplicate_conditions(stage: &Stage, issues: &mut Vec<Issue>) {
    let signatures: Vec<BTreeSet<String>> = stage.gates.iter().map(gate_signature).collect();
    for (position, gate) in stage.gates.iter().enumerate() {
        let Some(current) = signatures.get(position).filter(|set| !set.is_empty()) else {
            continue;
        };
        let duplicate = stage
            .gates
            .iter()
            .zip(&signatures)
            .take(position)
            .find(|(_, earlier)| *earlier == current);
        if let Some((earlier, _)) = duplicate {
            issues.push(
                Issue::new(
                    IssueType::DuplicateGateSchemas,
                    format!(
                        "Gates '{}' and '{}' in stage '{}' have identical lock conditions",
                        earlier.name, gate.name, stage.id
                    ),
                    IssueLocation::gate(&stage.id, &gate.name),
                )
                .suggest(format!(
                    "Make the conditions of '{}' and '{}' mutually exclusive",
                    earlier.name, gate.name
                ))
                .suggest("Merge the gates if they represent the same transition"),
            );
        }
    }
}

/// Order-independent normalized condition set of a gate.
fn gate_signature(gate: &Gate) -> BTreeSet<String> {
    gate.locks.iter().map(lock_signature).collect()
}

/// Normalized text of a lock's condition, ignoring its message.
fn lock_signature(lock: &Lock) -> String {
    let list = |locks: &[Lock]| {
        let mut parts: Vec<String> = locks.iter().map(lock_signature).collect();
        parts.sort();
        parts.join(",")
    };
    match &lock.condition {
        LockCondition::Conditional { when, then, otherwise } => {
            format!("conditional(if[{}]then[{}]else[{}])", list(when), list(then), list(otherwise))
        }
        LockCondition::OrLogic { groups } => {
            let mut parts: Vec<String> = groups.iter().map(|group| format!("[{}]", list(group))).collect();
            parts.sort();
            format!("or_logic({})", parts.join("|"))
        }
        _ => format!(
            "{}:{}:{}",
            lock.lock_type(),
            lock.property_path().map_or("", |path| path.as_str()),
            lock.expected_value().map(|value| value.to_string()).unwrap_or_default()
        ),
    }
}

/// Flags unsatisfiable lock pairs within each gate.
fn check_conflicts(stage: &Stage, issues: &mut Vec<Issue>) {
    for gate in &stage.gates {
        for conflict in find_conflicts(&gate.locks) {
            issues.push(
                Issue::new(
                    IssueType::LogicalConflict,
                    format!(
                        "Gate '{}' in stage '{}' can never pass: property '{}' {}",
                        gate.name, stage.id, conflict.property_path, conflict.reason
                    ),
                    IssueLocation::gate(&stage.id, &gate.name)
                        .with_lock(conflict.second)
                        .with_property(conflict.property_path.clone()),
                )
                .suggest(format!(
                    "Relax or remove lock {} or lock {} of gate '{}'",
                    conflict.first, conflict.second, gate.name
                )),
            );
        }
    }
}

/// Flags gates whose locks, nested ones included, read only the stage's declared fields.
fn check_transformations(stage: &Stage, issues: &mut Vec<Issue>) {
    if stage.is_final {
        return;
    }
    let fields: BTreeSet<&str> = stage.fields.iter().map(|field| field.path.base()).collect();
    for gate in &stage.gates {
        let referenced: BTreeSet<&str> = gate
            .locks
            .iter()
            .flat_map(Lock::referenced_paths)
            .map(PropertyPath::base)
            .collect();
        if referenced.is_subset(&fields) {
            issues.push(
                Issue::new(
                    IssueType::EmptyStageTransformation,
                    format!(
                        "Gate '{}' in stage '{}' requires nothing beyond the stage's own fields",
                        gate.name, stage.id
                    ),
                    IssueLocation::gate(&stage.id, &gate.name),
                )
                .suggest("Add a lock on a property the stage does not already declare"),
            );
        }
    }
}

/// Flags unvalidated related properties and duplicate action names.
fn check_actions(stage: &Stage, issues: &mut Vec<Issue>) {
    let evaluated: BTreeSet<&str> = stage
        .evaluated_paths()
        .into_iter()
        .flat_map(|path| [path.as_str(), path.base()])
        .collect();
    let mut names = BTreeSet::new();
    for action in &stage.expected_actions {
        for property in &action.related_properties {
            if !evaluated.contains(property.as_str()) {
                issues.push(
                    Issue::new(
                        IssueType::UnvalidatedRelatedProperty,
                        format!(
                            "Action '{}' in stage '{}' relates to property '{property}' which no lock validates",
                            action.name.as_deref().unwrap_or(&action.description),
                            stage.id
                        ),
                        IssueLocation::stage(&stage.id).with_property(property.clone()),
                    )
                    .suggest(format!("Add a lock validating '{property}' to one of the stage's gates")),
                );
            }
        }
        if let Some(name) = &action.name
            && !names.insert(name.as_str())
        {
            issues.push(
                Issue::new(
                    IssueType::DuplicateActionName,
                    format!("Stage '{}' declares more than one action named '{name}'", stage.id),
                    IssueLocation::stage(&stage.id),
                )
                .suggest("Give each action a distinct name"),
            );
        }
    }
}
