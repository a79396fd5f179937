// crates/stageflow-config/src/lib.rs
// ============================================================================
// Module: Stageflow Config Library
// Description: Canonical config model and validation for stageflow.toml.
// Purpose: Single source of truth for engine configuration semantics.
// Dependencies: stageflow-core, serde, toml
// ============================================================================

//! ## Overview
//! `stageflow-config` defines the configuration model for the Stageflow
//! engine. It provides strict, fail-closed validation and resolves into the
//! option types consumed by `stageflow-core`.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
