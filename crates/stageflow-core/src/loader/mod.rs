// crates/stageflow-core/src/loader/mod.rs
// ============================================================================
// Module: Stageflow Process Loader
// Description: Validates definitions and assembles immutable processes.
// Purpose: Single entry point from raw definitions to analyzed processes.
// Dependencies: crate::{core, analysis, audit}, serde, serde_json
// ============================================================================

//! ## Overview
//! Loading runs in two phases. Structural validation checks required fields,
//! stage references, paths, locks, and actions; any failure there aborts the
//! load before a [`Process`] exists. The assembled process then goes through
//! consistency analysis. A load succeeds iff no issue is fatal, and only a
//! successful load returns the process.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod locks;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::analysis::AnalysisOptions;
use crate::analysis::analyze;
use crate::audit::EvaluationAuditSink;
use crate::audit::ProcessLoadEvent;
use crate::audit::ProcessLoadEventParams;
use crate::core::definition::ActionDefinition;
use crate::core::definition::FieldAttributes;
use crate::core::definition::FieldEntry;
use crate::core::definition::FieldShape;
use crate::core::definition::FieldsDefinition;
use crate::core::definition::GateDefinition;
use crate::core::definition::ProcessDefinition;
use crate::core::definition::StageDefinition;
use crate::core::hashing::HashDigest;
use crate::core::hashing::canonical_digest;
use crate::core::identifiers::GateName;
use crate::core::identifiers::ProcessName;
use crate::core::identifiers::StageId;
use crate::core::issues::Issue;
use crate::core::issues::IssueLocation;
use crate::core::issues::IssueType;
use crate::core::issues::Severity;
use crate::core::process::ActionSpec;
use crate::core::process::FieldSpec;
use crate::core::process::Gate;
use crate::core::process::Process;
use crate::core::process::ProcessParts;
use crate::core::process::RegressionPolicy;
use crate::core::process::Stage;
use crate::loader::locks::LockBuilder;
use crate::loader::locks::parse_path;

pub use locks::DefinitionError;

// ============================================================================
// SECTION: Options
// ============================================================================

/// Default maximum nesting depth of compound locks.
pub const DEFAULT_MAX_LOCK_DEPTH: usize = 16;

/// How `regex` lock patterns are anchored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegexAnchoring {
    /// Pattern must match at the start of the value.
    #[default]
    Start,
    /// Pattern must match the whole value.
    Full,
    /// Pattern may match anywhere in the value.
    Search,
}

impl RegexAnchoring {
    /// Parses an anchoring mode name case-insensitively.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "start" => Some(Self::Start),
            "full" => Some(Self::Full),
            "search" => Some(Self::Search),
            _ => None,
        }
    }
}

/// Load options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadOptions {
    /// Regex anchoring mode.
    pub regex_anchoring: RegexAnchoring,
    /// Policy used when a definition declares none.
    pub default_regression_policy: RegressionPolicy,
    /// Maximum compound lock nesting depth.
    pub max_lock_depth: usize,
    /// Consistency analyzer options.
    pub analysis: AnalysisOptions,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            regex_anchoring: RegexAnchoring::default(),
            default_regression_policy: RegressionPolicy::default(),
            max_lock_depth: DEFAULT_MAX_LOCK_DEPTH,
            analysis: AnalysisOptions::default(),
        }
    }
}

// ============================================================================
// SECTION: Load Result
// ============================================================================

/// Outcome of a load.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadResult {
    /// True when no issue is fatal.
    pub success: bool,
    /// Loaded process; present only on success.
    pub process: Option<Process>,
    /// Every issue found, in check order.
    pub issues: Vec<Issue>,
    /// Canonical digest of the definition, when it could be computed.
    pub digest: Option<HashDigest>,
}

impl LoadResult {
    /// Builds a failed result from structural issues.
    fn failed(issues: Vec<Issue>, digest: Option<HashDigest>) -> Self {
        Self {
            success: false,
            process: None,
            issues,
            digest,
        }
    }

    /// Returns issues of one severity.
    #[must_use]
    pub fn issues_with(&self, severity: Severity) -> Vec<&Issue> {
        self.issues.iter().filter(|issue| issue.severity == severity).collect()
    }

    /// Returns true when any issue has the given kind.
    #[must_use]
    pub fn has_issue(&self, issue_type: IssueType) -> bool {
        self.issues.iter().any(|issue| issue.issue_type == issue_type)
    }

    /// Counts issues of one severity.
    fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|issue| issue.severity == severity).count()
    }
}

// ============================================================================
// SECTION: Entry Points
// ============================================================================

/// Loads a typed definition.
#[must_use]
pub fn load(definition: &ProcessDefinition, options: &LoadOptions) -> LoadResult {
    let digest = match canonical_digest(definition) {
        Ok(digest) => digest,
        Err(err) => {
            let issue =
                Issue::new(IssueType::MalformedDefinition, err.to_string(), IssueLocation::default());
            return LoadResult::failed(vec![issue], None);
        }
    };

    let mut issues = Vec::new();
    let parts = Assembler::new(options, &mut issues).assemble(definition, digest.clone());
    let Some(parts) = parts.filter(|_| !issues.iter().any(Issue::is_fatal)) else {
        return LoadResult::failed(issues, Some(digest));
    };

    let process = Process::new(parts);
    issues.extend(analyze(&process, options.analysis));
    let success = !issues.iter().any(Issue::is_fatal);
    LoadResult {
        success,
        process: success.then_some(process),
        issues,
        digest: Some(digest),
    }
}

/// Loads a definition from a JSON value.
///
/// A top-level object with a single `process` key is unwrapped first.
#[must_use]
pub fn load_value(source: &Value, options: &LoadOptions) -> LoadResult {
    let inner = match source.as_object() {
        Some(map) if map.len() == 1 => map.get("process").filter(|inner| inner.is_object()),
        _ => None,
    };
    match ProcessDefinition::deserialize(inner.unwrap_or(source)) {
        Ok(definition) => load(&definition, options),
        Err(err) => LoadResult::failed(
            vec![Issue::new(
                IssueType::MalformedDefinition,
                format!("Process definition is malformed: {err}"),
                IssueLocation::default(),
            )],
            None,
        ),
    }
}

/// Loads a typed definition and records a load audit event.
#[must_use]
pub fn load_with_audit(
    definition: &ProcessDefinition,
    options: &LoadOptions,
    audit: &dyn EvaluationAuditSink,
) -> LoadResult {
    let result = load(definition, options);
    audit.record_load(&ProcessLoadEvent::new(ProcessLoadEventParams {
        process: Some(definition.name.clone()).filter(|name| !name.is_empty()),
        digest: result.digest.clone(),
        success: result.success,
        fatal_issues: result.count(Severity::Fatal),
        warning_issues: result.count(Severity::Warning),
        info_issues: result.count(Severity::Info),
    }));
    result
}

// ============================================================================
// SECTION: Structural Validation
// ============================================================================

/// Accumulates structural issues while converting a definition.
struct Assembler<'a> {
    /// Lock builder configured from the load options.
    locks: LockBuilder,
    /// Policy used when the definition declares none.
    default_policy: RegressionPolicy,
    /// Issue sink.
    issues: &'a mut Vec<Issue>,
}

impl<'a> Assembler<'a> {
    /// Creates an assembler writing into `issues`.
    fn new(options: &LoadOptions, issues: &'a mut Vec<Issue>) -> Self {
        Self {
            locks: LockBuilder::new(options.regex_anchoring, options.max_lock_depth),
            default_policy: options.default_regression_policy,
            issues,
        }
    }

    /// Records an issue.
    fn report(&mut self, issue_type: IssueType, message: String, location: IssueLocation) {
        self.issues.push(Issue::new(issue_type, message, location));
    }

    /// Converts the definition; `None` when a required piece is missing.
    fn assemble(mut self, definition: &ProcessDefinition, digest: HashDigest) -> Option<ProcessParts> {
        let initial = self.required_field("initial_stage", definition.initial_stage.as_deref());
        let terminal = self.required_field("final_stage", definition.final_stage.as_deref());
        if definition.name.trim().is_empty() {
            self.report(
                IssueType::MissingRequiredField,
                "Process is missing required field 'name'".to_string(),
                IssueLocation::default(),
            );
        }
        match definition.stages.len() {
            0 => self.report(
                IssueType::MissingRequiredField,
                "Process is missing required field 'stages'".to_string(),
                IssueLocation::default(),
            ),
            1 => self.report(
                IssueType::InsufficientStages,
                "Process must declare at least two stages".to_string(),
                IssueLocation::default(),
            ),
            _ => {}
        }

        let declared: BTreeSet<&str> = definition.stages.iter().map(|(id, _)| id).collect();
        self.ensure_unique_stage_ids(definition);
        for (role, stage) in [("initial", initial), ("final", terminal)] {
            if let Some(stage) = stage
                && !declared.contains(stage)
            {
                self.report(
                    IssueType::MissingStage,
                    format!("The {role} stage '{stage}' is not declared in stages"),
                    IssueLocation::default(),
                );
            }
        }

        let stage_prop = definition.stage_prop.as_deref().and_then(|text| {
            parse_path(text)
                .map_err(|err| {
                    self.report(err.issue_type(), format!("stage_prop: {err}"), IssueLocation::default());
                })
                .ok()
        });

        let stages: Vec<Stage> = definition
            .stages
            .iter()
            .map(|(id, stage)| self.stage(id, stage, &declared, terminal))
            .collect();

        Some(ProcessParts {
            name: ProcessName::new(definition.name.trim()),
            description: definition.description.clone(),
            initial_stage: StageId::new(initial?),
            final_stage: StageId::new(terminal?),
            stage_prop,
            regression_policy: definition.regression_policy.unwrap_or(self.default_policy),
            stages,
            digest,
        })
    }

    /// Reports a missing or blank required process field.
    fn required_field<'d>(&mut self, field: &str, value: Option<&'d str>) -> Option<&'d str> {
        let value = value.map(str::trim).filter(|value| !value.is_empty());
        if value.is_none() {
            self.report(
                IssueType::MissingRequiredField,
                format!("Process is missing required field '{field}'"),
                IssueLocation::default(),
            );
        }
        value
    }

    /// Reports stage identifiers declared more than once.
    fn ensure_unique_stage_ids(&mut self, definition: &ProcessDefinition) {
        let ids: Vec<&str> = definition.stages.iter().map(|(id, _)| id).collect();
        for (index, id) in ids.iter().enumerate() {
            if ids.iter().skip(index + 1).any(|other| other == id) {
                self.report(
                    IssueType::MalformedDefinition,
                    format!("Stage '{id}' is declared more than once"),
                    IssueLocation::stage(&StageId::new(*id)),
                );
            }
        }
    }

    /// Converts one stage.
    fn stage(
        &mut self,
        id: &str,
        definition: &StageDefinition,
        declared: &BTreeSet<&str>,
        terminal: Option<&str>,
    ) -> Stage {
        let stage_id = StageId::new(id);
        let fields = self.fields(&stage_id, definition.fields.as_ref());
        let expected_actions = definition
            .expected_actions
            .iter()
            .enumerate()
            .filter_map(|(index, action)| self.action(&stage_id, index, action))
            .collect();
        let gates = self.gates(&stage_id, definition, declared);
        Stage {
            name: definition.name.clone().unwrap_or_else(|| id.to_string()),
            description: definition.description.clone().unwrap_or_default(),
            fields,
            expected_actions,
            gates,
            is_final: definition.is_final || terminal == Some(id),
            id: stage_id,
        }
    }

    /// Converts a stage's field declarations.
    fn fields(&mut self, stage: &StageId, fields: Option<&FieldsDefinition>) -> Vec<FieldSpec> {
        let entries: Vec<(&str, Option<&str>, Option<&FieldAttributes>)> = match fields {
            None => Vec::new(),
            Some(FieldsDefinition::List(list)) => list
                .iter()
                .map(|entry| match entry {
                    FieldEntry::Path(path) => (path.as_str(), None, None),
                    FieldEntry::Detailed(spec) => (spec.path.as_str(), None, Some(&spec.attributes)),
                })
                .collect(),
            Some(FieldsDefinition::Map(map)) => map
                .iter()
                .map(|(path, shape)| match shape {
                    Some(FieldShape::Detailed(attributes)) => (path, None, Some(attributes)),
                    Some(FieldShape::Type(tag)) => (path, Some(tag.as_str()), None),
                    None => (path, None, None),
                })
                .collect(),
        };

        let mut specs = Vec::with_capacity(entries.len());
        for (raw, type_tag, attributes) in entries {
            let path = match parse_path(raw) {
                Ok(path) => path,
                Err(err) => {
                    self.report(
                        err.issue_type(),
                        format!("Field in stage '{stage}': {err}"),
                        IssueLocation::stage(stage).with_property(raw),
                    );
                    continue;
                }
            };
            let mut spec = FieldSpec::bare(path);
            spec.type_tag = type_tag.map(str::to_string);
            if let Some(attributes) = attributes {
                spec.type_tag = attributes.type_tag.clone().or(spec.type_tag);
                spec.format = attributes.format.clone();
                spec.default = attributes.default.clone();
                spec.description = attributes.description.clone();
                spec.constraints = attributes.constraints.clone();
            }
            specs.push(spec);
        }
        specs
    }

    /// Converts a configured action; `None` when it is malformed.
    fn action(
        &mut self,
        stage: &StageId,
        index: usize,
        action: &ActionDefinition,
    ) -> Option<ActionSpec> {
        let Some(description) = action.description.as_deref().filter(|text| !text.trim().is_empty())
        else {
            self.report(
                IssueType::InvalidActionDefinition,
                format!("Action #{index} in stage '{stage}' is missing a description"),
                IssueLocation::stage(stage),
            );
            return None;
        };
        Some(ActionSpec {
            name: action.name.clone(),
            description: description.to_string(),
            instructions: action.instructions.clone(),
            related_properties: action.related_properties.clone(),
            target_properties: action.target_properties.clone(),
        })
    }

    /// Converts a stage's gates, in declaration order.
    fn gates(
        &mut self,
        stage: &StageId,
        definition: &StageDefinition,
        declared: &BTreeSet<&str>,
    ) -> Vec<Gate> {
        let Some(gates) = &definition.gates else {
            return Vec::new();
        };
        let mut seen = BTreeSet::new();
        let mut built = Vec::new();
        for (index, (name, gate)) in gates.entries().into_iter().enumerate() {
            let Some(name) = name.map(str::trim).filter(|name| !name.is_empty()) else {
                self.report(
                    IssueType::MalformedDefinition,
                    format!("Gate #{index} in stage '{stage}' has no name"),
                    IssueLocation::stage(stage),
                );
                continue;
            };
            let gate_name = GateName::new(name);
            if !seen.insert(name) {
                self.report(
                    IssueType::MalformedDefinition,
                    format!("Gate '{name}' is declared more than once in stage '{stage}'"),
                    IssueLocation::gate(stage, &gate_name),
                );
                continue;
            }
            if let Some(gate) = self.gate(stage, gate_name, gate, declared) {
                built.push(gate);
            }
        }
        built
    }

    /// Converts one gate; `None` when it is malformed.
    fn gate(
        &mut self,
        stage: &StageId,
        name: GateName,
        definition: &GateDefinition,
        declared: &BTreeSet<&str>,
    ) -> Option<Gate> {
        let target = definition.target_stage.as_deref().map(str::trim).unwrap_or_default();
        if !declared.contains(target) {
            let message = if target.is_empty() {
                format!("Gate '{name}' in stage '{stage}' has no target_stage")
            } else {
                format!("Gate '{name}' in stage '{stage}' targets unknown stage '{target}'")
            };
            self.report(IssueType::InvalidTransition, message, IssueLocation::gate(stage, &name));
            return None;
        }
        let mut locks = Vec::with_capacity(definition.locks.len());
        let mut valid = true;
        for (index, lock) in definition.locks.iter().enumerate() {
            match self.locks.build(lock) {
                Ok(lock) => locks.push(lock),
                Err(err) => {
                    valid = false;
                    let location = IssueLocation::gate(stage, &name).with_lock(index);
                    let location = match lock.property_path.as_deref() {
                        Some(path) => location.with_property(path),
                        None => location,
                    };
                    self.report(
                        err.issue_type(),
                        format!("Lock #{index} of gate '{name}' in stage '{stage}': {err}"),
                        location,
                    );
                }
            }
        }
        valid.then(|| Gate {
            name,
            target_stage: StageId::new(target),
            description: definition.description.clone(),
            locks,
        })
    }
}
