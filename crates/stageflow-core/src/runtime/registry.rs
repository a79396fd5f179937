// crates/stageflow-core/src/runtime/registry.rs
// ============================================================================
// Module: Stageflow In-Memory Registry
// Description: Mutex-guarded map of loaded processes.
// Purpose: Provide a deterministic registry without external storage.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! [`InMemoryProcessRegistry`] stores `Arc<Process>` values in a sorted map.
//! Clones share the same map. Lookups return an `Arc`, so a process removed
//! while an evaluation holds it stays valid for that evaluation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::core::identifiers::ProcessName;
use crate::core::process::Process;
use crate::interfaces::ProcessRegistry;
use crate::interfaces::RegistryError;

// ============================================================================
// SECTION: In-Memory Registry
// ============================================================================

/// Process map keyed by name.
type ProcessMap = BTreeMap<ProcessName, Arc<Process>>;

/// In-memory process registry.
#[derive(Debug, Default, Clone)]
pub struct InMemoryProcessRegistry {
    /// Process map protected by a mutex.
    processes: Arc<Mutex<ProcessMap>>,
}

impl InMemoryProcessRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            processes: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// Acquires the map, mapping poisoning to a registry error.
    fn guard(&self) -> Result<MutexGuard<'_, ProcessMap>, RegistryError> {
        self.processes
            .lock()
            .map_err(|_| RegistryError::Store("process registry mutex poisoned".to_string()))
    }
}

impl ProcessRegistry for InMemoryProcessRegistry {
    fn register(&self, process: Process) -> Result<Arc<Process>, RegistryError> {
        let mut guard = self.guard()?;
        let name = process.name().clone();
        if guard.contains_key(&name) {
            return Err(RegistryError::Conflict(name.to_string()));
        }
        let shared = Arc::new(process);
        guard.insert(name, Arc::clone(&shared));
        Ok(shared)
    }

    fn get(&self, name: &ProcessName) -> Result<Option<Arc<Process>>, RegistryError> {
        Ok(self.guard()?.get(name).cloned())
    }

    fn list(&self) -> Result<Vec<ProcessName>, RegistryError> {
        Ok(self.guard()?.keys().cloned().collect())
    }

    fn remove(&self, name: &ProcessName) -> Result<Arc<Process>, RegistryError> {
        self.guard()?.remove(name).ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }
}
