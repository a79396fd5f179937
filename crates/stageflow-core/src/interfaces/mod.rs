// crates/stageflow-core/src/interfaces/mod.rs
// ============================================================================
// Module: Stageflow Interfaces
// Description: Backend-agnostic contract for process lookup.
// Purpose: Let embeddings supply loaded processes without ambient state.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! The evaluation core never reaches for a global registry. Callers that need
//! named lookup pass a [`ProcessRegistry`] by reference. Registries hand out
//! shared, immutable processes so concurrent evaluations need no locking
//! beyond the lookup itself.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use thiserror::Error;

use crate::core::identifiers::ProcessName;
use crate::core::process::Process;

// ============================================================================
// SECTION: Process Registry
// ============================================================================

/// Process registry errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A process with the same name is already registered.
    #[error("process registry conflict: {0}")]
    Conflict(String),
    /// No process is registered under the name.
    #[error("process not found: {0}")]
    NotFound(String),
    /// Registry backend error.
    #[error("process registry error: {0}")]
    Store(String),
}

/// Named collection of loaded processes.
pub trait ProcessRegistry {
    /// Registers a process under its own name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Conflict`] when the name is taken.
    fn register(&self, process: Process) -> Result<Arc<Process>, RegistryError>;

    /// Looks up a process by name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the backend fails.
    fn get(&self, name: &ProcessName) -> Result<Option<Arc<Process>>, RegistryError>;

    /// Lists registered process names in sorted order.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the backend fails.
    fn list(&self) -> Result<Vec<ProcessName>, RegistryError>;

    /// Removes a process by name, returning it.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when nothing is registered under the name.
    fn remove(&self, name: &ProcessName) -> Result<Arc<Process>, RegistryError>;
}
