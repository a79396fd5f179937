// crates/stageflow-core/src/core/path.rs
// ============================================================================
// Module: Stageflow Property Paths
// Description: Parsed property-path expressions used by locks and fields.
// Purpose: Validate path syntax once so evaluation never re-parses strings.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A property path addresses a value inside an element:
//!
//! ```text
//! path     := accessor | chain
//! accessor := ("length" | "count") "(" chain ")"
//! chain    := segment ("." segment | "[" bracket "]")*
//! bracket  := digits | quoted-key | "?" chain "==" literal
//! ```
//!
//! Parsing is strict: malformed paths are rejected with a [`PathError`] at
//! load time. Resolution against element data lives in
//! [`crate::runtime::resolver`] and never fails loudly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Number;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum accepted path length in bytes.
pub const MAX_PATH_LENGTH: usize = 1024;

// ============================================================================
// SECTION: Path Types
// ============================================================================

/// Top-level accessor applied to the resolved chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathAccessor {
    /// Return the resolved value itself.
    Value,
    /// Return the size of the resolved collection or string.
    Length,
}

/// One access step within a path chain.
#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    /// Object key lookup.
    Field(String),
    /// Zero-based list index.
    Index(usize),
    /// First list element whose nested property equals a literal.
    Filter(PathFilter),
}

/// Filter step selecting a list element by property equality.
#[derive(Debug, Clone, PartialEq)]
pub struct PathFilter {
    /// Chain resolved relative to each candidate element.
    pub property: Vec<PathSegment>,
    /// Literal the property must equal.
    pub expected: Value,
}

/// Parsed property path.
///
/// # Invariants
/// - `segments` is non-empty.
/// - `raw` is the trimmed source text and round-trips through [`PropertyPath::parse`].
#[derive(Debug, Clone)]
pub struct PropertyPath {
    /// Trimmed source text.
    raw: String,
    /// Source text of the chain without any accessor wrapper.
    base: String,
    /// Accessor applied after the chain resolves.
    accessor: PathAccessor,
    /// Access steps.
    segments: Vec<PathSegment>,
}

impl PropertyPath {
    /// Parses a property path.
    ///
    /// # Errors
    ///
    /// Returns [`PathError`] when the path is empty, too long, or malformed.
    pub fn parse(input: &str) -> Result<Self, PathError> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(PathError::Empty);
        }
        if raw.len() > MAX_PATH_LENGTH {
            return Err(PathError::TooLong(raw.len()));
        }
        let (accessor, base) = split_accessor(raw)?;
        let segments = parse_chain(base, raw.find(base).unwrap_or_default())?;
        Ok(Self {
            raw: raw.to_string(),
            base: base.to_string(),
            accessor,
            segments,
        })
    }

    /// Returns the path source text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the chain text with any `length(...)`/`count(...)` wrapper removed.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Returns the top-level accessor.
    #[must_use]
    pub const fn accessor(&self) -> PathAccessor {
        self.accessor
    }

    /// Returns the parsed access steps.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Returns the same chain without any accessor wrapper.
    #[must_use]
    pub fn to_value(&self) -> Self {
        Self {
            raw: self.base.clone(),
            base: self.base.clone(),
            accessor: PathAccessor::Value,
            segments: self.segments.clone(),
        }
    }

    /// Returns the same chain wrapped in the length accessor.
    #[must_use]
    pub fn to_length(&self) -> Self {
        Self {
            raw: format!("length({})", self.base),
            base: self.base.clone(),
            accessor: PathAccessor::Length,
            segments: self.segments.clone(),
        }
    }
}

impl PartialEq for PropertyPath {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for PropertyPath {}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.raw.fmt(f)
    }
}

impl Serialize for PropertyPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for PropertyPath {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Property path syntax errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// Path text is empty.
    #[error("property path is empty")]
    Empty,
    /// Path text exceeds [`MAX_PATH_LENGTH`].
    #[error("property path is too long ({0} bytes)")]
    TooLong(usize),
    /// A dot-separated segment is empty.
    #[error("empty path segment at offset {0}")]
    EmptySegment(usize),
    /// A bracket was opened and never closed.
    #[error("unterminated bracket at offset {0}")]
    UnterminatedBracket(usize),
    /// Bracket content is not an index, quoted key, or filter.
    #[error("invalid bracket expression '{0}'")]
    InvalidBracket(String),
    /// Filter expression is malformed.
    #[error("invalid filter expression '{0}'")]
    InvalidFilter(String),
    /// Unexpected character after a bracket.
    #[error("unexpected character '{0}' at offset {1}")]
    UnexpectedCharacter(char, usize),
    /// Accessor wrapper is malformed or nested.
    #[error("invalid accessor expression '{0}'")]
    InvalidAccessor(String),
}

// ============================================================================
// SECTION: Parser
// ============================================================================

/// Splits an optional `length(...)`/`count(...)` wrapper from the chain.
fn split_accessor(raw: &str) -> Result<(PathAccessor, &str), PathError> {
    for prefix in ["length(", "count("] {
        if let Some(rest) = raw.strip_prefix(prefix) {
            let inner = rest
                .strip_suffix(')')
                .ok_or_else(|| PathError::InvalidAccessor(raw.to_string()))?
                .trim();
            if inner.is_empty() || inner.starts_with("length(") || inner.starts_with("count(") {
                return Err(PathError::InvalidAccessor(raw.to_string()));
            }
            return Ok((PathAccessor::Length, inner));
        }
    }
    Ok((PathAccessor::Value, raw))
}

/// Parses a dotted/bracketed chain into segments.
fn parse_chain(text: &str, base_offset: usize) -> Result<Vec<PathSegment>, PathError> {
    let bytes = text.as_bytes();
    let mut segments = Vec::new();
    let mut pos = 0;
    let mut expect_field = true;
    while pos < bytes.len() {
        match bytes[pos] {
            b'[' => {
                if expect_field && !segments.is_empty() {
                    return Err(PathError::EmptySegment(base_offset + pos));
                }
                let close = find_bracket_close(text, pos)
                    .ok_or(PathError::UnterminatedBracket(base_offset + pos))?;
                segments.push(parse_bracket(&text[pos + 1 .. close])?);
                pos = close + 1;
                expect_field = false;
                if let Some(&next) = bytes.get(pos) {
                    match next {
                        b'.' => {
                            pos += 1;
                            expect_field = true;
                            if pos == bytes.len() {
                                return Err(PathError::EmptySegment(base_offset + pos));
                            }
                        }
                        b'[' => {}
                        other => {
                            return Err(PathError::UnexpectedCharacter(
                                char::from(other),
                                base_offset + pos,
                            ));
                        }
                    }
                }
            }
            b']' => return Err(PathError::UnexpectedCharacter(']', base_offset + pos)),
            _ => {
                if !expect_field {
                    return Err(PathError::UnexpectedCharacter(
                        char::from(bytes[pos]),
                        base_offset + pos,
                    ));
                }
                let end = text[pos ..].find(['.', '[', ']']).map_or(bytes.len(), |idx| pos + idx);
                let name = text[pos .. end].trim();
                if name.is_empty() {
                    return Err(PathError::EmptySegment(base_offset + pos));
                }
                segments.push(PathSegment::Field(name.to_string()));
                pos = end;
                expect_field = false;
                if bytes.get(pos) == Some(&b'.') {
                    pos += 1;
                    expect_field = true;
                    if pos == bytes.len() {
                        return Err(PathError::EmptySegment(base_offset + pos));
                    }
                }
            }
        }
        if expect_field && bytes.get(pos) == Some(&b'.') {
            return Err(PathError::EmptySegment(base_offset + pos));
        }
    }
    if segments.is_empty() {
        return Err(PathError::Empty);
    }
    Ok(segments)
}

/// Finds the closing bracket for the bracket opened at `open`, skipping quoted text.
fn find_bracket_close(text: &str, open: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (idx, byte) in text.bytes().enumerate().skip(open + 1) {
        match (quote, byte) {
            (Some(q), b) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'\'' | b'"') => quote = Some(byte),
            (None, b']') => return Some(idx),
            (None, _) => {}
        }
    }
    None
}

/// Parses the inside of a bracket expression.
fn parse_bracket(inner: &str) -> Result<PathSegment, PathError> {
    let trimmed = inner.trim();
    if let Some(filter) = trimmed.strip_prefix('?') {
        return parse_filter(filter);
    }
    if let Some(key) = unquote(trimmed) {
        return Ok(PathSegment::Field(key.to_string()));
    }
    if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return trimmed
            .parse::<usize>()
            .map(PathSegment::Index)
            .map_err(|_| PathError::InvalidBracket(trimmed.to_string()));
    }
    Err(PathError::InvalidBracket(trimmed.to_string()))
}

/// Parses `prop==literal` filter bodies.
fn parse_filter(body: &str) -> Result<PathSegment, PathError> {
    let (property, literal) =
        body.split_once("==").ok_or_else(|| PathError::InvalidFilter(body.to_string()))?;
    let property = property.trim();
    if property.is_empty() {
        return Err(PathError::InvalidFilter(body.to_string()));
    }
    let chain = parse_chain(property, 0).map_err(|_| PathError::InvalidFilter(body.to_string()))?;
    Ok(PathSegment::Filter(PathFilter {
        property: chain,
        expected: parse_literal(literal.trim()),
    }))
}

/// Strips matching single or double quotes.
fn unquote(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        if (first == b'\'' || first == b'"') && bytes[bytes.len() - 1] == first {
            return Some(&text[1 .. text.len() - 1]);
        }
    }
    None
}

/// Parses a filter literal: quoted string, boolean, null, number, or bare text.
fn parse_literal(text: &str) -> Value {
    if let Some(quoted) = unquote(text) {
        return Value::String(quoted.to_string());
    }
    match text {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" => return Value::Null,
        _ => {}
    }
    if let Ok(int) = text.parse::<i64>() {
        return Value::Number(int.into());
    }
    if let Some(number) = text.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(number);
    }
    Value::String(text.to_string())
}
