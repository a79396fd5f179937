// crates/stageflow-core/src/core/hashing.rs
// ============================================================================
// Module: Stageflow Definition Digests
// Description: Canonical JSON digests of process definitions.
// Purpose: Identify a definition independently of key order and formatting.
// Dependencies: serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! Definitions are canonicalized with RFC 8785 (JCS) before hashing, so two
//! sources that differ only in key order or whitespace share a digest. The
//! digest travels with the loaded [`crate::Process`] and appears in audit
//! events, letting callers tie an evaluation to the exact definition used.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fmt::Write as _;

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Digest
// ============================================================================

/// Hash algorithm tag carried with every digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    /// SHA-256 over canonical JSON.
    Sha256,
}

/// Lowercase hex digest with its algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashDigest {
    /// Algorithm used.
    pub algorithm: HashAlgorithm,
    /// Lowercase hex-encoded digest.
    pub value: String,
}

impl fmt::Display for HashDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sha256:{}", self.value)
    }
}

/// Errors raised while canonicalizing a definition.
#[derive(Debug, Error)]
pub enum HashError {
    /// JCS serialization failed.
    #[error("failed to canonicalize definition: {0}")]
    Canonicalization(String),
}

// ============================================================================
// SECTION: Hashing
// ============================================================================

/// Computes the SHA-256 digest of a value's canonical JSON form.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when the value cannot be serialized.
pub fn canonical_digest<T: Serialize + ?Sized>(value: &T) -> Result<HashDigest, HashError> {
    let bytes =
        serde_jcs::to_vec(value).map_err(|err| HashError::Canonicalization(err.to_string()))?;
    let digest = Sha256::digest(&bytes);
    let value = digest.iter().fold(String::with_capacity(64), |mut out, byte| {
        let _ = write!(out, "{byte:02x}");
        out
    });
    Ok(HashDigest {
        algorithm: HashAlgorithm::Sha256,
        value,
    })
}
