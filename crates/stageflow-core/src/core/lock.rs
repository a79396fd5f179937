// crates/stageflow-core/src/core/lock.rs
// ============================================================================
// Module: Stageflow Locks
// Description: Validated lock predicates attached to gates.
// Purpose: Model every lock kind as a closed variant evaluated by one match.
// Dependencies: regex, serde, serde_json
// ============================================================================

//! ## Overview
//! A [`Lock`] is a single validation predicate over one property path. Locks
//! are built by the loader from raw definitions; every kind-specific
//! expectation (numeric thresholds, compiled patterns, length bounds) is
//! checked before a [`Lock`] exists, so evaluation never sees a malformed one.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use regex::Regex;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::path::PropertyPath;

// ============================================================================
// SECTION: Lock Types
// ============================================================================

/// Lock kind tag, used for diagnostics and result payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockType {
    /// Value is present.
    Exists,
    /// Value is present and not empty.
    NotEmpty,
    /// Value deep-equals the expectation.
    Equals,
    /// Value is numerically greater than the threshold.
    GreaterThan,
    /// Value is numerically less than the threshold.
    LessThan,
    /// Value lies within inclusive numeric bounds.
    Range,
    /// Value is one of the listed values.
    InList,
    /// Value is none of the listed values.
    NotInList,
    /// Collection contains the needle, or string contains the substring.
    Contains,
    /// String matches a pattern.
    Regex,
    /// Collection or string size matches.
    Length,
    /// Runtime type tag matches.
    TypeCheck,
    /// Guarded lock list.
    Conditional,
    /// Disjunction of lock lists.
    OrLogic,
}

impl LockType {
    /// Returns the canonical snake-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exists => "exists",
            Self::NotEmpty => "not_empty",
            Self::Equals => "equals",
            Self::GreaterThan => "greater_than",
            Self::LessThan => "less_than",
            Self::Range => "range",
            Self::InList => "in_list",
            Self::NotInList => "not_in_list",
            Self::Contains => "contains",
            Self::Regex => "regex",
            Self::Length => "length",
            Self::TypeCheck => "type_check",
            Self::Conditional => "conditional",
            Self::OrLogic => "or_logic",
        }
    }

    /// Parses a lock kind name, case-insensitively, accepting known aliases.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let normalized = name.trim().to_ascii_lowercase().replace('-', "_");
        let kind = match normalized.as_str() {
            "exists" => Self::Exists,
            "not_empty" => Self::NotEmpty,
            "equals" => Self::Equals,
            "greater_than" => Self::GreaterThan,
            "less_than" => Self::LessThan,
            "range" => Self::Range,
            "in_list" => Self::InList,
            "not_in_list" => Self::NotInList,
            "contains" => Self::Contains,
            "regex" => Self::Regex,
            "length" => Self::Length,
            "type_check" => Self::TypeCheck,
            "conditional" => Self::Conditional,
            "or_logic" | "or_group" => Self::OrLogic,
            _ => return None,
        };
        Some(kind)
    }

    /// Returns true when the kind fails on a missing value.
    #[must_use]
    pub const fn implies_existence(self) -> bool {
        !matches!(self, Self::Conditional | Self::OrLogic)
    }
}

impl fmt::Display for LockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Supporting Types
// ============================================================================

/// Runtime type tags accepted by `type_check` locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// UTF-8 string.
    String,
    /// Integral number.
    Int,
    /// Any number.
    Float,
    /// Boolean.
    Bool,
    /// Sequence.
    List,
    /// Mapping.
    Dict,
    /// Explicit null.
    Null,
}

impl ValueKind {
    /// Parses a type tag, accepting common aliases.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let kind = match name.trim().to_ascii_lowercase().as_str() {
            "str" | "string" => Self::String,
            "int" | "integer" => Self::Int,
            "float" | "number" | "double" => Self::Float,
            "bool" | "boolean" => Self::Bool,
            "list" | "array" => Self::List,
            "dict" | "dictionary" | "object" | "map" => Self::Dict,
            "null" | "none" => Self::Null,
            _ => return None,
        };
        Some(kind)
    }

    /// Returns the tag describing a concrete value.
    #[must_use]
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Number(number) if number.is_i64() || number.is_u64() => Self::Int,
            Value::Number(_) => Self::Float,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::List,
            Value::Object(_) => Self::Dict,
        }
    }

    /// Returns true when `value` satisfies this tag; `float` accepts any number.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::Float => value.is_number(),
            other => other == Self::of(value),
        }
    }

    /// Returns the canonical tag name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::List => "list",
            Self::Dict => "dict",
            Self::Null => "null",
        }
    }

    /// Returns the JSON Schema type name for this tag.
    #[must_use]
    pub const fn json_schema_type(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "integer",
            Self::Float => "number",
            Self::Bool => "boolean",
            Self::List => "array",
            Self::Dict => "object",
            Self::Null => "null",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Size expectation for `length` locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthBound {
    /// Size must equal the value.
    Exact(usize),
    /// Size must fall within the optional inclusive bounds.
    Between {
        /// Inclusive lower bound.
        min: Option<usize>,
        /// Inclusive upper bound.
        max: Option<usize>,
    },
}

impl LengthBound {
    /// Returns true when `size` satisfies the bound.
    #[must_use]
    pub fn accepts(self, size: usize) -> bool {
        match self {
            Self::Exact(expected) => size == expected,
            Self::Between { min, max } => {
                min.is_none_or(|min| size >= min) && max.is_none_or(|max| size <= max)
            }
        }
    }

    /// Returns the bound as a JSON value for diagnostics.
    #[must_use]
    pub fn to_value(self) -> Value {
        match self {
            Self::Exact(expected) => Value::from(expected),
            Self::Between { min, max } => serde_json::json!({ "min": min, "max": max }),
        }
    }
}

impl fmt::Display for LengthBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(expected) => write!(f, "{expected}"),
            Self::Between { min: Some(min), max: Some(max) } => write!(f, "between {min} and {max}"),
            Self::Between { min: Some(min), max: None } => write!(f, "at least {min}"),
            Self::Between { min: None, max: Some(max) } => write!(f, "at most {max}"),
            Self::Between { min: None, max: None } => f.write_str("any"),
        }
    }
}

/// Compiled regular expression with its source text.
#[derive(Debug, Clone)]
pub struct LockPattern {
    /// Pattern as written in the definition.
    source: String,
    /// Compiled pattern, anchored per load options.
    compiled: Regex,
}

impl LockPattern {
    /// Wraps a compiled pattern with its source text.
    #[must_use]
    pub const fn new(source: String, compiled: Regex) -> Self {
        Self {
            source,
            compiled,
        }
    }

    /// Returns the pattern as written.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns true when the text matches.
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.compiled.is_match(text)
    }
}

impl PartialEq for LockPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.compiled.as_str() == other.compiled.as_str()
    }
}

// ============================================================================
// SECTION: Lock
// ============================================================================

/// Kind-specific lock predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum LockCondition {
    /// Value is present (not null).
    Exists {
        /// Property path.
        path: PropertyPath,
    },
    /// Value is missing or null; `exists` with `expected_value: false`.
    Absent {
        /// Property path.
        path: PropertyPath,
    },
    /// Value is present and not an empty string or collection.
    NotEmpty {
        /// Property path.
        path: PropertyPath,
    },
    /// Value deep-equals `expected`.
    Equals {
        /// Property path.
        path: PropertyPath,
        /// Expected value.
        expected: Value,
    },
    /// Value is strictly greater than `threshold`.
    GreaterThan {
        /// Property path.
        path: PropertyPath,
        /// Numeric threshold.
        threshold: Value,
    },
    /// Value is strictly less than `threshold`.
    LessThan {
        /// Property path.
        path: PropertyPath,
        /// Numeric threshold.
        threshold: Value,
    },
    /// Value lies within `[min, max]`.
    Range {
        /// Property path.
        path: PropertyPath,
        /// Inclusive lower bound.
        min: Value,
        /// Inclusive upper bound.
        max: Value,
    },
    /// Value is one of `values`.
    InList {
        /// Property path.
        path: PropertyPath,
        /// Allowed values.
        values: Vec<Value>,
    },
    /// Value is none of `values`.
    NotInList {
        /// Property path.
        path: PropertyPath,
        /// Rejected values.
        values: Vec<Value>,
    },
    /// Collection contains `needle`, or string contains it as a substring.
    Contains {
        /// Property path.
        path: PropertyPath,
        /// Member or substring to look for.
        needle: Value,
    },
    /// String matches `pattern`.
    Regex {
        /// Property path.
        path: PropertyPath,
        /// Compiled pattern.
        pattern: LockPattern,
    },
    /// Size of the value satisfies `bound`.
    Length {
        /// Property path (evaluated through the length accessor).
        path: PropertyPath,
        /// Size expectation.
        bound: LengthBound,
    },
    /// Runtime type tag equals `expected`.
    TypeCheck {
        /// Property path.
        path: PropertyPath,
        /// Expected type tag.
        expected: ValueKind,
    },
    /// Evaluates `then` when every `when` lock passes, else `otherwise`.
    Conditional {
        /// Guard locks (AND).
        when: Vec<Lock>,
        /// Locks applied when the guard passes.
        then: Vec<Lock>,
        /// Locks applied when the guard fails; empty means vacuous pass.
        otherwise: Vec<Lock>,
    },
    /// Passes when any group's locks all pass.
    OrLogic {
        /// Alternative lock lists.
        groups: Vec<Vec<Lock>>,
    },
}

/// Validated lock with an optional author-supplied failure message.
#[derive(Debug, Clone, PartialEq)]
pub struct Lock {
    /// Kind-specific predicate.
    pub condition: LockCondition,
    /// Message reported instead of the default on failure.
    pub error_message: Option<String>,
}

impl Lock {
    /// Creates a lock without a custom error message.
    #[must_use]
    pub const fn new(condition: LockCondition) -> Self {
        Self {
            condition,
            error_message: None,
        }
    }

    /// Attaches a custom failure message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Returns the kind tag.
    #[must_use]
    pub const fn lock_type(&self) -> LockType {
        match &self.condition {
            LockCondition::Exists { .. } | LockCondition::Absent { .. } => LockType::Exists,
            LockCondition::NotEmpty { .. } => LockType::NotEmpty,
            LockCondition::Equals { .. } => LockType::Equals,
            LockCondition::GreaterThan { .. } => LockType::GreaterThan,
            LockCondition::LessThan { .. } => LockType::LessThan,
            LockCondition::Range { .. } => LockType::Range,
            LockCondition::InList { .. } => LockType::InList,
            LockCondition::NotInList { .. } => LockType::NotInList,
            LockCondition::Contains { .. } => LockType::Contains,
            LockCondition::Regex { .. } => LockType::Regex,
            LockCondition::Length { .. } => LockType::Length,
            LockCondition::TypeCheck { .. } => LockType::TypeCheck,
            LockCondition::Conditional { .. } => LockType::Conditional,
            LockCondition::OrLogic { .. } => LockType::OrLogic,
        }
    }

    /// Returns the property path for single-path kinds.
    #[must_use]
    pub const fn property_path(&self) -> Option<&PropertyPath> {
        match &self.condition {
            LockCondition::Exists { path }
            | LockCondition::Absent { path }
            | LockCondition::NotEmpty { path }
            | LockCondition::Equals { path, .. }
            | LockCondition::GreaterThan { path, .. }
            | LockCondition::LessThan { path, .. }
            | LockCondition::Range { path, .. }
            | LockCondition::InList { path, .. }
            | LockCondition::NotInList { path, .. }
            | LockCondition::Contains { path, .. }
            | LockCondition::Regex { path, .. }
            | LockCondition::Length { path, .. }
            | LockCondition::TypeCheck { path, .. } => Some(path),
            LockCondition::Conditional { .. } | LockCondition::OrLogic { .. } => None,
        }
    }

    /// Returns the kind-specific expectation as JSON, if any.
    #[must_use]
    pub fn expected_value(&self) -> Option<Value> {
        match &self.condition {
            LockCondition::Exists { .. }
            | LockCondition::NotEmpty { .. }
            | LockCondition::Conditional { .. }
            | LockCondition::OrLogic { .. } => None,
            LockCondition::Absent { .. } => Some(Value::Bool(false)),
            LockCondition::Equals { expected, .. } => Some(expected.clone()),
            LockCondition::GreaterThan { threshold, .. }
            | LockCondition::LessThan { threshold, .. } => Some(threshold.clone()),
            LockCondition::Range { min, max, .. } => {
                Some(Value::Array(vec![min.clone(), max.clone()]))
            }
            LockCondition::InList { values, .. } | LockCondition::NotInList { values, .. } => {
                Some(Value::Array(values.clone()))
            }
            LockCondition::Contains { needle, .. } => Some(needle.clone()),
            LockCondition::Regex { pattern, .. } => Some(Value::from(pattern.source())),
            LockCondition::Length { bound, .. } => Some(bound.to_value()),
            LockCondition::TypeCheck { expected, .. } => Some(Value::from(expected.as_str())),
        }
    }

    /// Returns true when the lock fails on a missing value.
    #[must_use]
    pub const fn implies_existence(&self) -> bool {
        self.lock_type().implies_existence()
            && !matches!(self.condition, LockCondition::Absent { .. })
    }

    /// Returns every property path this lock reads, including nested locks.
    #[must_use]
    pub fn referenced_paths(&self) -> Vec<&PropertyPath> {
        let mut paths = Vec::new();
        self.collect_paths(&mut paths);
        paths
    }

    /// Appends referenced paths in declaration order.
    fn collect_paths<'a>(&'a self, out: &mut Vec<&'a PropertyPath>) {
        match &self.condition {
            LockCondition::Conditional { when, then, otherwise } => {
                for lock in when.iter().chain(then).chain(otherwise) {
                    lock.collect_paths(out);
                }
            }
            LockCondition::OrLogic { groups } => {
                for lock in groups.iter().flatten() {
                    lock.collect_paths(out);
                }
            }
            _ => {
                if let Some(path) = self.property_path() {
                    out.push(path);
                }
            }
        }
    }
}
