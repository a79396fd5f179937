// crates/stageflow-core/src/schema/mod.rs
// ============================================================================
// Module: Stageflow Schema Generator
// Description: JSON Schema draft-07 documents for stage data requirements.
// Purpose: Tell producers what an element must carry to reach or leave a stage.
// Dependencies: crate::core, crate::analysis::graph, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A stage's own schema combines its declared fields with every path its
//! gates' locks read. The cumulative schema folds stage schemas along the
//! shortest path from the initial stage, later stages overriding earlier
//! declarations of the same path. `required` lists the paths of
//! existence-implying top-level locks, with length wrappers stripped.
//!
//! Generation is a pure function of a loaded [`Process`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::analysis::graph::StageGraph;
use crate::core::lock::Lock;
use crate::core::lock::LockCondition;
use crate::core::lock::ValueKind;
use crate::core::process::FieldSpec;
use crate::core::process::Gate;
use crate::core::process::Process;
use crate::core::process::Stage;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Draft-07 meta-schema identifier.
pub const JSON_SCHEMA_DRAFT_07: &str = "http://json-schema.org/draft-07/schema#";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Schema generation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// Target stage is not declared.
    #[error("unknown stage: {0}")]
    UnknownStage(String),
    /// Target stage cannot be reached from the initial stage.
    #[error("stage {0} is not reachable from the initial stage")]
    Unreachable(String),
}

// ============================================================================
// SECTION: Entry Points
// ============================================================================

/// Generates the cumulative or stage-specific schema for a stage.
///
/// # Errors
///
/// Returns [`SchemaError`] when the stage is unknown or unreachable.
pub fn schema(process: &Process, stage: &str, cumulative: bool) -> Result<Value, SchemaError> {
    if cumulative { cumulative_schema(process, stage) } else { stage_specific_schema(process, stage) }
}

/// Generates the schema of everything required to reach and leave `stage`.
///
/// # Errors
///
/// Returns [`SchemaError`] when the stage is unknown or unreachable.
pub fn cumulative_schema(process: &Process, stage: &str) -> Result<Value, SchemaError> {
    let target = lookup(process, stage)?;
    let mut merged = StageSchema::default();
    for step in schema_path(process, stage)? {
        merged.merge(final_schema(step));
    }
    Ok(merged.into_document(
        format!("{} - {} (cumulative)", process.name(), target.id),
        &target.name,
    ))
}

/// Generates the schema of `stage` alone.
///
/// # Errors
///
/// Returns [`SchemaError`] when the stage is unknown or unreachable.
pub fn stage_specific_schema(process: &Process, stage: &str) -> Result<Value, SchemaError> {
    let target = lookup(process, stage)?;
    schema_path(process, stage)?;
    Ok(final_schema(target)
        .into_document(format!("{} - {}", process.name(), target.id), &target.name))
}

/// Returns the required property paths of a gate's top-level locks.
#[must_use]
pub fn gate_required_paths(gate: &Gate) -> BTreeSet<String> {
    gate.locks
        .iter()
        .filter(|lock| lock.implies_existence())
        .filter_map(Lock::property_path)
        .map(|path| path.base().to_string())
        .collect()
}

// ============================================================================
// SECTION: Stage Schema
// ============================================================================

/// Properties and required paths of one or more stages.
#[derive(Debug, Default)]
struct StageSchema {
    /// Property schemas in first-seen order.
    properties: Vec<PropertyEntry>,
    /// Required paths.
    required: BTreeSet<String>,
}

/// One property schema and whether a field declared it.
#[derive(Debug)]
struct PropertyEntry {
    /// Property path text.
    path: String,
    /// Property schema body.
    schema: Map<String, Value>,
    /// True when declared by a field rather than inferred from a lock.
    declared: bool,
}

impl StageSchema {
    /// Adds a property; declared entries replace anything, inferred ones only fill gaps.
    fn insert(&mut self, entry: PropertyEntry) {
        match self.properties.iter_mut().find(|existing| existing.path == entry.path) {
            Some(existing) if entry.declared || !existing.declared => *existing = entry,
            Some(_) => {}
            None => self.properties.push(entry),
        }
    }

    /// Folds a later stage's schema into this one.
    fn merge(&mut self, later: Self) {
        for entry in later.properties {
            self.insert(entry);
        }
        self.required.extend(later.required);
    }

    /// Renders the draft-07 document.
    fn into_document(self, title: String, stage_name: &str) -> Value {
        let properties: Map<String, Value> = self
            .properties
            .into_iter()
            .map(|entry| (entry.path, Value::Object(entry.schema)))
            .collect();
        let required: Vec<Value> = self.required.into_iter().map(Value::from).collect();
        json!({
            "$schema": JSON_SCHEMA_DRAFT_07,
            "title": title,
            "description": format!("Schema for stage: {stage_name}"),
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// Builds the schema of one stage: fields, then lock paths, then required set.
fn final_schema(stage: &Stage) -> StageSchema {
    let mut schema = StageSchema::default();
    for field in &stage.fields {
        schema.insert(field_entry(field));
    }
    for lock in stage.gates.iter().flat_map(|gate| gate.locks.iter()) {
        collect_lock_entries(lock, &mut schema);
    }
    for gate in &stage.gates {
        schema.required.extend(gate_required_paths(gate));
    }
    schema
}

/// Converts a declared field into a property schema.
fn field_entry(field: &FieldSpec) -> PropertyEntry {
    let mut body = Map::new();
    body.insert("type".to_string(), Value::from(schema_type(field.type_tag.as_deref())));
    if let Some(format) = &field.format {
        body.insert("format".to_string(), Value::from(format.clone()));
    }
    if let Some(default) = &field.default {
        body.insert("default".to_string(), default.clone());
    }
    if let Some(description) = &field.description {
        body.insert("description".to_string(), Value::from(description.clone()));
    }
    for (key, value) in &field.constraints {
        body.entry(key.clone()).or_insert_with(|| value.clone());
    }
    PropertyEntry {
        path: field.path.base().to_string(),
        schema: body,
        declared: true,
    }
}

/// Adds inferred entries for every path a lock reads.
fn collect_lock_entries(lock: &Lock, schema: &mut StageSchema) {
    match &lock.condition {
        LockCondition::Conditional { when, then, otherwise } => {
            for nested in when.iter().chain(then).chain(otherwise) {
                collect_lock_entries(nested, schema);
            }
        }
        LockCondition::OrLogic { groups } => {
            for nested in groups.iter().flatten() {
                collect_lock_entries(nested, schema);
            }
        }
        condition => {
            if let Some(path) = lock.property_path() {
                let mut body = Map::new();
                body.insert("type".to_string(), Value::from(inferred_type(condition)));
                schema.insert(PropertyEntry {
                    path: path.base().to_string(),
                    schema: body,
                    declared: false,
                });
            }
        }
    }
}

/// Maps a declared type tag to a JSON Schema type; unknown tags map to `string`.
fn schema_type(tag: Option<&str>) -> &'static str {
    tag.and_then(ValueKind::parse).map_or("string", ValueKind::json_schema_type)
}

/// Infers a JSON Schema type from the lock kind reading a path.
const fn inferred_type(condition: &LockCondition) -> &'static str {
    match condition {
        LockCondition::GreaterThan { .. }
        | LockCondition::LessThan { .. }
        | LockCondition::Range { .. } => "number",
        LockCondition::TypeCheck { expected, .. } => expected.json_schema_type(),
        _ => "string",
    }
}

// ============================================================================
// SECTION: Path Selection
// ============================================================================

/// Looks up a stage or reports it as unknown.
fn lookup<'a>(process: &'a Process, stage: &str) -> Result<&'a Stage, SchemaError> {
    process.stage(stage).ok_or_else(|| SchemaError::UnknownStage(stage.to_string()))
}

/// Returns the stages on the shortest path from the initial stage to `stage`.
fn schema_path<'a>(process: &'a Process, stage: &str) -> Result<Vec<&'a Stage>, SchemaError> {
    let unreachable = || SchemaError::Unreachable(stage.to_string());
    let from = process.stage_index(process.initial_stage().as_str()).ok_or_else(unreachable)?;
    let to = process.stage_index(stage).ok_or_else(|| SchemaError::UnknownStage(stage.to_string()))?;
    let path = StageGraph::new(process).shortest_path(from, to).ok_or_else(unreachable)?;
    Ok(path.into_iter().filter_map(|index| process.stages().get(index)).collect())
}
