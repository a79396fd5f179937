// crates/stageflow-core/src/analysis/mod.rs
// ============================================================================
// Module: Stageflow Analysis
// Description: Load-time graph model and consistency checks.
// Purpose: Group the passes that run once per process load.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Analysis never runs during evaluation. [`StageGraph`] is also reused by the
//! schema generator and regression detector for path and depth queries.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod conflicts;
pub mod consistency;
pub mod graph;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use conflicts::Conflict;
pub use conflicts::find_conflicts;
pub use conflicts::suggests_termination;
pub use consistency::AnalysisOptions;
pub use consistency::ConsistencyAnalyzer;
pub use consistency::analyze;
pub use graph::StageGraph;
