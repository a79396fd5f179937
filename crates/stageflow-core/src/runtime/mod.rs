// crates/stageflow-core/src/runtime/mod.rs
// ============================================================================
// Module: Stageflow Runtime
// Description: Element evaluation, regression detection, and registry.
// Purpose: Evaluate elements against loaded processes.
// Dependencies: crate::{core, analysis, audit, interfaces, loader}
// ============================================================================

//! ## Overview
//! Runtime modules evaluate elements bottom-up: the resolver reads values,
//! locks check them, gates combine locks, and stages derive status and
//! actions. [`Engine`] ties these together with stage resolution, regression
//! policy, and audit emission. Every function here is pure over an immutable
//! process, apart from the audit sink and registry.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod comparator;
pub mod engine;
pub mod gate;
pub mod lock;
pub mod regression;
pub mod registry;
pub mod resolver;
pub mod stage;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use engine::Engine;
pub use engine::EngineOptions;
pub use engine::EvaluationError;
pub use engine::EvaluationRequest;
pub use gate::evaluate_gate;
pub use lock::evaluate_lock;
pub use regression::RegressionDetector;
pub use registry::InMemoryProcessRegistry;
pub use resolver::has_property;
pub use resolver::resolve;
pub use resolver::resolve_str;
pub use stage::evaluate_stage;
