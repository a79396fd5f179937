// crates/stageflow-core/src/lib.rs
// ============================================================================
// Module: Stageflow Core Library
// Description: Public API surface for the Stageflow workflow engine.
// Purpose: Expose the process model, loader, analysis, schemas, and runtime.
// Dependencies: crate::{core, analysis, audit, interfaces, loader, runtime, schema}
// ============================================================================

//! ## Overview
//! Stageflow validates data elements against multi-stage workflow
//! definitions. A definition is loaded once into an immutable [`Process`],
//! checked for reachability, completability, and determinism, and then used
//! to evaluate any number of elements. Each evaluation reports where the
//! element stands, which gates it passes, and what it still needs.
//!
//! The four entry points are [`load`], [`Engine::evaluate`], [`schema`], and
//! [`ProcessRegistry`] lookup.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod analysis;
pub mod audit;
pub mod core;
pub mod interfaces;
pub mod loader;
pub mod runtime;
pub mod schema;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use analysis::AnalysisOptions;
pub use analysis::ConsistencyAnalyzer;
pub use analysis::StageGraph;
pub use audit::ElementEvaluationEvent;
pub use audit::EvaluationAuditSink;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::ProcessLoadEvent;
pub use audit::StderrAuditSink;
pub use interfaces::ProcessRegistry;
pub use interfaces::RegistryError;
pub use loader::DEFAULT_MAX_LOCK_DEPTH;
pub use loader::DefinitionError;
pub use loader::LoadOptions;
pub use loader::LoadResult;
pub use loader::RegexAnchoring;
pub use loader::load;
pub use loader::load_value;
pub use loader::load_with_audit;
pub use runtime::Engine;
pub use runtime::EngineOptions;
pub use runtime::EvaluationError;
pub use runtime::EvaluationRequest;
pub use runtime::InMemoryProcessRegistry;
pub use runtime::RegressionDetector;
pub use schema::SchemaError;
pub use schema::cumulative_schema;
pub use schema::schema;
pub use schema::stage_specific_schema;
