// crates/stageflow-core/src/core/identifiers.rs
// ============================================================================
// Module: Stageflow Identifiers
// Description: Opaque identifiers for processes, stages, and gates.
// Purpose: Keep stage and gate references strongly typed across the graph.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Stages reference each other by [`StageId`] only; the process graph never
//! holds owning pointers between stages. Identifiers serialize as plain
//! strings on the wire.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::borrow::Borrow;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Generates a transparent string identifier with the shared accessor set.
macro_rules! string_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_identifier!(
    /// Process name used for registry lookups and diagnostics.
    ///
    /// # Invariants
    /// - Non-empty after a successful load.
    ProcessName
);

string_identifier!(
    /// Stage identifier; the key of a stage within its process.
    ///
    /// # Invariants
    /// - Unique within one process.
    StageId
);

string_identifier!(
    /// Gate name; unique within its containing stage.
    GateName
);
