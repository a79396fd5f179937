// crates/stageflow-core/src/loader/locks.rs
// ============================================================================
// Module: Stageflow Lock Builder
// Description: Converts raw lock definitions into validated locks.
// Purpose: Reject malformed locks at load time so evaluation never sees one.
// Dependencies: crate::core, crate::runtime::comparator, regex, thiserror
// ============================================================================

//! ## Overview
//! Each raw [`LockDefinition`] is checked against its kind: paths must parse,
//! numeric kinds need numeric expectations, regex patterns must compile, and
//! compound kinds need non-empty nested lists within the configured depth.
//! Shorthand forms (`exists`, `not_empty`, `is_true`, `is_false`) expand to
//! their typed equivalents. An `exists` lock with `expected_value: false`
//! builds an absence check.

// ============================================================================
// SECTION: Imports
// ============================================================================

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::core::definition::LockDefinition;
use crate::core::issues::IssueType;
use crate::core::lock::LengthBound;
use crate::core::lock::Lock;
use crate::core::lock::LockCondition;
use crate::core::lock::LockPattern;
use crate::core::lock::LockType;
use crate::core::lock::ValueKind;
use crate::core::path::PathError;
use crate::core::path::PropertyPath;
use crate::loader::RegexAnchoring;
use crate::runtime::comparator::compare_numeric;
use crate::runtime::comparator::numeric_value;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Definition errors raised while building locks and paths.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    /// Lock has neither a type nor a recognized shorthand.
    #[error("lock declares no type")]
    MissingType,
    /// Lock type name is not recognized.
    #[error("unknown lock type: {0}")]
    UnknownLockType(String),
    /// Single-path lock has no property path.
    #[error("{0} lock requires a property_path")]
    MissingPropertyPath(LockType),
    /// Property path does not parse.
    #[error("invalid property path '{path}': {source}")]
    InvalidPath {
        /// Path text as written.
        path: String,
        /// Parse failure.
        source: PathError,
    },
    /// Expected value does not fit the lock kind.
    #[error("invalid expected_value for {kind} lock: {reason}")]
    InvalidExpectedValue {
        /// Lock kind.
        kind: LockType,
        /// Failure description.
        reason: String,
    },
    /// Regex pattern does not compile.
    #[error("invalid regex pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// Pattern as written.
        pattern: String,
        /// Compiler message.
        reason: String,
    },
    /// Compound lock has an empty nested list.
    #[error("{0} lock requires at least one nested lock")]
    EmptyCompound(LockType),
    /// Nested locks exceed the configured depth.
    #[error("lock nesting exceeds the maximum depth of {0}")]
    TooDeep(usize),
}

impl DefinitionError {
    /// Returns the issue kind reported for this error.
    #[must_use]
    pub const fn issue_type(&self) -> IssueType {
        match self {
            Self::InvalidPath { .. } => IssueType::InvalidPropertyPath,
            _ => IssueType::InvalidLockDefinition,
        }
    }
}

/// Parses a property path, attaching the original text to failures.
///
/// # Errors
///
/// Returns [`DefinitionError::InvalidPath`] when the path does not parse.
pub fn parse_path(text: &str) -> Result<PropertyPath, DefinitionError> {
    PropertyPath::parse(text).map_err(|source| DefinitionError::InvalidPath {
        path: text.to_string(),
        source,
    })
}

// ============================================================================
// SECTION: Lock Builder
// ============================================================================

/// Builds validated locks under fixed load options.
#[derive(Debug, Clone, Copy)]
pub struct LockBuilder {
    /// How regex patterns are anchored.
    anchoring: RegexAnchoring,
    /// Maximum compound nesting depth; top-level locks are depth 1.
    max_depth: usize,
}

impl LockBuilder {
    /// Creates a builder.
    #[must_use]
    pub const fn new(anchoring: RegexAnchoring, max_depth: usize) -> Self {
        Self {
            anchoring,
            max_depth,
        }
    }

    /// Builds a top-level lock.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError`] when the definition is malformed.
    pub fn build(&self, definition: &LockDefinition) -> Result<Lock, DefinitionError> {
        self.build_at(definition, 1)
    }

    /// Builds a lock at a nesting depth.
    fn build_at(&self, definition: &LockDefinition, depth: usize) -> Result<Lock, DefinitionError> {
        if depth > self.max_depth {
            return Err(DefinitionError::TooDeep(self.max_depth));
        }
        let condition = match definition.kind.as_deref() {
            Some(name) => {
                let kind = LockType::parse(name)
                    .ok_or_else(|| DefinitionError::UnknownLockType(name.to_string()))?;
                self.typed_condition(kind, definition, depth)?
            }
            None => self.untyped_condition(definition, depth)?,
        };
        let lock = Lock::new(condition);
        Ok(match &definition.error_message {
            Some(message) => lock.with_message(message.clone()),
            None => lock,
        })
    }

    /// Builds a nested lock list.
    fn build_list(
        &self,
        definitions: &[LockDefinition],
        depth: usize,
    ) -> Result<Vec<Lock>, DefinitionError> {
        definitions.iter().map(|definition| self.build_at(definition, depth + 1)).collect()
    }

    /// Expands shorthand forms and type-less compound forms.
    fn untyped_condition(
        &self,
        definition: &LockDefinition,
        depth: usize,
    ) -> Result<LockCondition, DefinitionError> {
        if let Some(path) = &definition.exists {
            return Ok(LockCondition::Exists {
                path: parse_path(path)?,
            });
        }
        if let Some(path) = &definition.not_empty {
            return Ok(LockCondition::NotEmpty {
                path: parse_path(path)?,
            });
        }
        if let Some(path) = &definition.is_true {
            return Ok(LockCondition::Equals {
                path: parse_path(path)?,
                expected: Value::Bool(true),
            });
        }
        if let Some(path) = &definition.is_false {
            return Ok(LockCondition::Equals {
                path: parse_path(path)?,
                expected: Value::Bool(false),
            });
        }
        if definition.when.is_some() {
            return self.typed_condition(LockType::Conditional, definition, depth);
        }
        if definition.conditions.is_some() {
            return self.typed_condition(LockType::OrLogic, definition, depth);
        }
        Err(DefinitionError::MissingType)
    }

    /// Builds the condition for an explicit kind.
    fn typed_condition(
        &self,
        kind: LockType,
        definition: &LockDefinition,
        depth: usize,
    ) -> Result<LockCondition, DefinitionError> {
        match kind {
            LockType::Conditional => {
                let when = definition.when.as_ref().map(|list| list.as_slice()).unwrap_or_default();
                let then = definition.then.as_ref().map(|list| list.as_slice()).unwrap_or_default();
                if when.is_empty() || then.is_empty() {
                    return Err(DefinitionError::EmptyCompound(kind));
                }
                let otherwise =
                    definition.otherwise.as_ref().map(|list| list.as_slice()).unwrap_or_default();
                Ok(LockCondition::Conditional {
                    when: self.build_list(when, depth)?,
                    then: self.build_list(then, depth)?,
                    otherwise: self.build_list(otherwise, depth)?,
                })
            }
            LockType::OrLogic => {
                let groups = definition.conditions.as_deref().unwrap_or_default();
                if groups.is_empty() || groups.iter().any(|group| group.locks().is_empty()) {
                    return Err(DefinitionError::EmptyCompound(kind));
                }
                let groups = groups
                    .iter()
                    .map(|group| self.build_list(group.locks(), depth))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(LockCondition::OrLogic {
                    groups,
                })
            }
            _ => self.single_condition(kind, definition),
        }
    }

    /// Builds a single-path condition.
    fn single_condition(
        &self,
        kind: LockType,
        definition: &LockDefinition,
    ) -> Result<LockCondition, DefinitionError> {
        let raw_path =
            definition.property_path.as_deref().ok_or(DefinitionError::MissingPropertyPath(kind))?;
        let path = parse_path(raw_path)?;
        let expected = definition.expected_value.as_ref();
        let condition = match kind {
            LockType::Exists => match expected {
                None | Some(Value::Bool(true)) => LockCondition::Exists {
                    path,
                },
                Some(Value::Bool(false)) => LockCondition::Absent {
                    path,
                },
                Some(_) => return Err(invalid(kind, "expected_value must be a boolean")),
            },
            LockType::NotEmpty => LockCondition::NotEmpty {
                path,
            },
            LockType::Equals => LockCondition::Equals {
                path,
                expected: required(kind, expected)?.clone(),
            },
            LockType::GreaterThan => LockCondition::GreaterThan {
                path,
                threshold: numeric(kind, required(kind, expected)?)?,
            },
            LockType::LessThan => LockCondition::LessThan {
                path,
                threshold: numeric(kind, required(kind, expected)?)?,
            },
            LockType::Range => {
                let (min, max) = range_bounds(definition)?;
                LockCondition::Range {
                    path,
                    min,
                    max,
                }
            }
            LockType::InList => LockCondition::InList {
                path,
                values: list(kind, required(kind, expected)?)?,
            },
            LockType::NotInList => LockCondition::NotInList {
                path,
                values: list(kind, required(kind, expected)?)?,
            },
            LockType::Contains => LockCondition::Contains {
                path,
                needle: required(kind, expected)?.clone(),
            },
            LockType::Regex => {
                let source = required(kind, expected)?.as_str().ok_or_else(|| {
                    invalid(kind, "pattern must be a string")
                })?;
                LockCondition::Regex {
                    path,
                    pattern: self.compile(source)?,
                }
            }
            LockType::Length => LockCondition::Length {
                path,
                bound: length_bound(required(kind, expected)?)?,
            },
            LockType::TypeCheck => {
                let name = required(kind, expected)?
                    .as_str()
                    .ok_or_else(|| invalid(kind, "type name must be a string"))?;
                LockCondition::TypeCheck {
                    path,
                    expected: ValueKind::parse(name)
                        .ok_or_else(|| invalid(kind, format!("unknown type '{name}'")))?,
                }
            }
            LockType::Conditional | LockType::OrLogic => {
                return Err(DefinitionError::EmptyCompound(kind));
            }
        };
        Ok(condition)
    }

    /// Compiles a pattern with the configured anchoring.
    fn compile(&self, source: &str) -> Result<LockPattern, DefinitionError> {
        let anchored = match self.anchoring {
            RegexAnchoring::Start => format!("^(?:{source})"),
            RegexAnchoring::Full => format!("^(?:{source})$"),
            RegexAnchoring::Search => source.to_string(),
        };
        let compiled = Regex::new(&anchored).map_err(|err| DefinitionError::InvalidPattern {
            pattern: source.to_string(),
            reason: err.to_string(),
        })?;
        Ok(LockPattern::new(source.to_string(), compiled))
    }
}

// ============================================================================
// SECTION: Expected Values
// ============================================================================

/// Builds an invalid-expectation error.
fn invalid(kind: LockType, reason: impl Into<String>) -> DefinitionError {
    DefinitionError::InvalidExpectedValue {
        kind,
        reason: reason.into(),
    }
}

/// Requires an expected value to be present.
fn required(kind: LockType, expected: Option<&Value>) -> Result<&Value, DefinitionError> {
    expected.ok_or_else(|| invalid(kind, "expected_value is required"))
}

/// Requires a numeric (or numeric string) expectation.
fn numeric(kind: LockType, value: &Value) -> Result<Value, DefinitionError> {
    if numeric_value(value).is_some() {
        Ok(value.clone())
    } else {
        Err(invalid(kind, format!("'{value}' is not numeric")))
    }
}

/// Requires a list expectation.
fn list(kind: LockType, value: &Value) -> Result<Vec<Value>, DefinitionError> {
    value.as_array().cloned().ok_or_else(|| invalid(kind, "expected a list of values"))
}

/// Reads range bounds from `[min, max]`, `{min, max}`, or metadata.
fn range_bounds(definition: &LockDefinition) -> Result<(Value, Value), DefinitionError> {
    let kind = LockType::Range;
    let (min, max) = match definition.expected_value.as_ref() {
        Some(Value::Array(items)) if items.len() == 2 => (items.first(), items.get(1)),
        Some(Value::Object(map)) => (map.get("min"), map.get("max")),
        Some(_) => return Err(invalid(kind, "expected [min, max] or {min, max}")),
        None => {
            let metadata = definition.metadata.as_ref();
            (
                metadata.and_then(|meta| meta.min_value.as_ref()),
                metadata.and_then(|meta| meta.max_value.as_ref()),
            )
        }
    };
    let (Some(min), Some(max)) = (min, max) else {
        return Err(invalid(kind, "both min and max bounds are required"));
    };
    let min = numeric(kind, min)?;
    let max = numeric(kind, max)?;
    if compare_numeric(&min, &max).is_none() {
        return Err(invalid(kind, "bounds are not comparable"));
    }
    Ok((min, max))
}

/// Reads a length expectation from an integer, `[min, max]`, or `{min?, max?}`.
fn length_bound(value: &Value) -> Result<LengthBound, DefinitionError> {
    let kind = LockType::Length;
    let size = |value: &Value| {
        value
            .as_u64()
            .and_then(|size| usize::try_from(size).ok())
            .ok_or_else(|| invalid(kind, format!("'{value}' is not a non-negative integer")))
    };
    let optional = |value: Option<&Value>| match value {
        None | Some(Value::Null) => Ok(None),
        Some(value) => size(value).map(Some),
    };
    match value {
        Value::Number(_) => size(value).map(LengthBound::Exact),
        Value::Array(items) if items.len() == 2 => Ok(LengthBound::Between {
            min: optional(items.first())?,
            max: optional(items.get(1))?,
        }),
        Value::Object(map) => Ok(LengthBound::Between {
            min: optional(map.get("min"))?,
            max: optional(map.get("max"))?,
        }),
        _ => Err(invalid(kind, "expected an integer, [min, max], or {min, max}")),
    }
}
