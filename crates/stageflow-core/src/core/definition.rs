// crates/stageflow-core/src/core/definition.rs
// ============================================================================
// Module: Stageflow Definitions
// Description: Serde model of unvalidated process definitions.
// Purpose: Accept every supported authoring shape before the loader validates it.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Definitions mirror what authors write in process files after text parsing.
//! They are deliberately permissive: shorthands, alias keys, and both map and
//! list forms deserialize here, and the loader turns them into the strict
//! [`crate::Process`] model. Map-shaped sections keep their declaration order
//! through [`OrderedMap`] so gate tie-breaks stay deterministic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde::de::MapAccess;
use serde::de::Visitor;
use serde::ser::SerializeMap;
use serde_json::Value;

use crate::core::process::RegressionPolicy;

// ============================================================================
// SECTION: Ordered Map
// ============================================================================

/// String-keyed map that preserves declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedMap<T>(pub Vec<(String, T)>);

impl<T> Default for OrderedMap<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> OrderedMap<T> {
    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }
}

impl<T> FromIterator<(String, T)> for OrderedMap<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<T: Serialize> Serialize for OrderedMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Visitor collecting map entries in order.
struct OrderedMapVisitor<T>(PhantomData<T>);

impl<'de, T: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<T> {
    type Value = OrderedMap<T>;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a map with string keys")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, T>()? {
            entries.push((key, value));
        }
        Ok(OrderedMap(entries))
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for OrderedMap<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

// ============================================================================
// SECTION: Process Definition
// ============================================================================

/// Unvalidated process definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessDefinition {
    /// Process name.
    #[serde(default)]
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Entry stage identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_stage: Option<String>,
    /// Terminal stage identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_stage: Option<String>,
    /// Optional path used to read the current stage from elements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_prop: Option<String>,
    /// Regression policy; falls back to the load default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regression_policy: Option<RegressionPolicy>,
    /// Stages keyed by identifier, in declaration order.
    #[serde(default)]
    pub stages: OrderedMap<StageDefinition>,
}

/// Unvalidated stage definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageDefinition {
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Declared fields.
    #[serde(default, alias = "expected_properties", skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldsDefinition>,
    /// Configured actions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expected_actions: Vec<ActionDefinition>,
    /// Outgoing gates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gates: Option<GatesDefinition>,
    /// Final-stage marker.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_final: bool,
}

// ============================================================================
// SECTION: Fields
// ============================================================================

/// Field section: a list of entries or a path-keyed map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldsDefinition {
    /// List of bare paths or detailed specs.
    List(Vec<FieldEntry>),
    /// Path-keyed map of optional shapes.
    Map(OrderedMap<Option<FieldShape>>),
}

/// One entry of a list-form field section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldEntry {
    /// Bare property path.
    Path(String),
    /// Path with attributes.
    Detailed(FieldSpecDefinition),
}

/// Field entry carrying its own path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpecDefinition {
    /// Property path.
    #[serde(alias = "property_path", alias = "name")]
    pub path: String,
    /// Remaining attributes.
    #[serde(flatten)]
    pub attributes: FieldAttributes,
}

/// Field shape in map form: a type shorthand or attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldShape {
    /// Type shorthand, such as `"int"`.
    Type(String),
    /// Full attributes.
    Detailed(FieldAttributes),
}

/// Field attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldAttributes {
    /// Type tag.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_tag: Option<String>,
    /// Format hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Suggested default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Remaining constraints such as `minimum` or `pattern`.
    #[serde(flatten)]
    pub constraints: BTreeMap<String, Value>,
}

// ============================================================================
// SECTION: Actions
// ============================================================================

/// Unvalidated configured action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDefinition {
    /// Optional name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Description; required by the loader.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Ordered instructions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instructions: Vec<String>,
    /// Input properties.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_properties: Vec<String>,
    /// Output properties.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_properties: Vec<String>,
}

// ============================================================================
// SECTION: Gates
// ============================================================================

/// Gate section: a name-keyed map or a list of named gates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GatesDefinition {
    /// Name-keyed gates.
    Map(OrderedMap<GateDefinition>),
    /// Gates carrying their own `name`.
    List(Vec<GateDefinition>),
}

impl GatesDefinition {
    /// Returns `(name, gate)` pairs in declaration order; list entries without a
    /// name yield `None`.
    #[must_use]
    pub fn entries(&self) -> Vec<(Option<&str>, &GateDefinition)> {
        match self {
            Self::Map(map) => map.iter().map(|(name, gate)| (Some(name), gate)).collect(),
            Self::List(list) => list.iter().map(|gate| (gate.name.as_deref(), gate)).collect(),
        }
    }
}

/// Unvalidated gate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GateDefinition {
    /// Gate name (list form only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Target stage identifier.
    #[serde(default, alias = "target", skip_serializing_if = "Option::is_none")]
    pub target_stage: Option<String>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Ordered locks.
    #[serde(default)]
    pub locks: Vec<LockDefinition>,
}

// ============================================================================
// SECTION: Locks
// ============================================================================

/// Unvalidated lock in typed, shorthand, or compound form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LockDefinition {
    /// Lock kind name (case-insensitive).
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Property path.
    #[serde(default, alias = "property", skip_serializing_if = "Option::is_none")]
    pub property_path: Option<String>,
    /// Kind-dependent expectation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_value: Option<Value>,
    /// Custom failure message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Auxiliary bounds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<LockMetadata>,
    /// Shorthand: `{exists: path}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exists: Option<String>,
    /// Shorthand: `{not_empty: path}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_empty: Option<String>,
    /// Shorthand: `{is_true: path}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_true: Option<String>,
    /// Shorthand: `{is_false: path}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_false: Option<String>,
    /// Conditional guard.
    #[serde(default, rename = "if", alias = "condition", skip_serializing_if = "Option::is_none")]
    pub when: Option<LockList>,
    /// Conditional consequence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub then: Option<LockList>,
    /// Conditional alternative.
    #[serde(default, rename = "else", skip_serializing_if = "Option::is_none")]
    pub otherwise: Option<LockList>,
    /// Disjunction groups.
    #[serde(default, alias = "paths", skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<LockGroupDefinition>>,
}

/// One lock or a list of locks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LockList {
    /// List form.
    Many(Vec<LockDefinition>),
    /// Single lock form.
    One(Box<LockDefinition>),
}

impl LockList {
    /// Returns the locks as a slice-backed list.
    #[must_use]
    pub fn as_slice(&self) -> &[LockDefinition] {
        match self {
            Self::Many(locks) => locks,
            Self::One(lock) => std::slice::from_ref(lock.as_ref()),
        }
    }
}

/// One disjunction group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LockGroupDefinition {
    /// `{locks: [...]}` form.
    Group {
        /// Locks combined with AND.
        locks: Vec<LockDefinition>,
    },
    /// Bare list form.
    Bare(Vec<LockDefinition>),
}

impl LockGroupDefinition {
    /// Returns the group's locks.
    #[must_use]
    pub fn locks(&self) -> &[LockDefinition] {
        match self {
            Self::Group { locks } | Self::Bare(locks) => locks,
        }
    }
}

/// Auxiliary lock bounds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LockMetadata {
    /// Lower bound for `range` locks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<Value>,
    /// Upper bound for `range` locks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<Value>,
}
