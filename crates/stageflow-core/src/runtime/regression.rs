// crates/stageflow-core/src/runtime/regression.rs
// ============================================================================
// Module: Stageflow Regression Detector
// Description: Detects elements moving backwards through a process.
// Purpose: Compare stage depths and optionally revalidate earlier stages.
// Dependencies: crate::core, crate::analysis::graph, crate::runtime::stage
// ============================================================================

//! ## Overview
//! Stage depth is the BFS distance from the initial stage. An element whose
//! current stage is shallower than its previously known stage has regressed.
//! Stages the initial stage cannot reach have no depth and never regress.
//!
//! Prior-stage revalidation re-evaluates every stage on the shortest path to
//! the current stage; the first one that no longer reports `ready` is the
//! failing stage.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;

use crate::analysis::graph::StageGraph;
use crate::core::identifiers::StageId;
use crate::core::process::Process;
use crate::core::results::RegressionDetails;
use crate::core::results::RegressionKind;
use crate::core::results::StageStatus;
use crate::runtime::stage::evaluate_stage;

// ============================================================================
// SECTION: Detector
// ============================================================================

/// Regression detector bound to one process.
#[derive(Debug)]
pub struct RegressionDetector<'a> {
    /// Process being evaluated.
    process: &'a Process,
    /// Gate graph of the process.
    graph: StageGraph,
    /// Arena index of the initial stage.
    initial: Option<usize>,
    /// BFS depth per arena index.
    depths: Vec<Option<usize>>,
}

impl<'a> RegressionDetector<'a> {
    /// Creates a detector, computing stage depths once.
    #[must_use]
    pub fn new(process: &'a Process) -> Self {
        let graph = StageGraph::new(process);
        let initial = process.stage_index(process.initial_stage().as_str());
        let depths = initial.map(|start| graph.depths_from(start)).unwrap_or_default();
        Self {
            process,
            graph,
            initial,
            depths,
        }
    }

    /// Returns the BFS depth of a stage from the initial stage.
    #[must_use]
    pub fn depth(&self, stage: &str) -> Option<usize> {
        let index = self.process.stage_index(stage)?;
        self.depths.get(index).copied().flatten()
    }

    /// Flags a regression when `current` is shallower than `previous`.
    #[must_use]
    pub fn detect(&self, current: &StageId, previous: &StageId) -> Option<RegressionDetails> {
        let current_depth = self.depth(current.as_str())?;
        let previous_depth = self.depth(previous.as_str())?;
        (current_depth < previous_depth).then(|| RegressionDetails {
            kind: RegressionKind::StageDepth,
            regressed_from: previous.clone(),
            failing_stage: current.clone(),
            previous_depth: Some(previous_depth),
            current_depth: Some(current_depth),
        })
    }

    /// Re-evaluates stages before `current` on its shortest path.
    ///
    /// Returns details for the first stage that is no longer `ready`.
    #[must_use]
    pub fn revalidate_prior_stages(
        &self,
        element: &Value,
        current: &StageId,
    ) -> Option<RegressionDetails> {
        let from = self.initial?;
        let to = self.process.stage_index(current.as_str())?;
        let path = self.graph.shortest_path(from, to)?;
        let prior = path.split_last().map_or(&[][..], |(_, before)| before);
        prior
            .iter()
            .filter_map(|index| self.process.stages().get(*index))
            .find(|stage| evaluate_stage(stage, element).status != StageStatus::Ready)
            .map(|stage| RegressionDetails {
                kind: RegressionKind::PriorStageFailure,
                regressed_from: current.clone(),
                failing_stage: stage.id.clone(),
                previous_depth: self.depth(current.as_str()),
                current_depth: self.depth(stage.id.as_str()),
            })
    }
}
