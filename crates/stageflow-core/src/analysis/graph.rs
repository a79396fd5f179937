// crates/stageflow-core/src/analysis/graph.rs
// ============================================================================
// Module: Stageflow Stage Graph
// Description: Adjacency view of a process with BFS and SCC helpers.
// Purpose: Share one graph substrate between analysis, schemas, and regression.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Nodes are arena indices of [`Process::stages`]; edges follow gates in
//! declaration order, which makes every traversal deterministic.
//!
//! [`Process::stages`]: crate::core::Process::stages

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::VecDeque;

use crate::core::process::Process;

// ============================================================================
// SECTION: Stage Graph
// ============================================================================

/// Directed stage graph keyed by arena index.
#[derive(Debug, Clone)]
pub struct StageGraph {
    /// Gate targets per stage, in gate declaration order.
    successors: Vec<Vec<usize>>,
    /// Source stages per stage.
    predecessors: Vec<Vec<usize>>,
}

impl StageGraph {
    /// Builds the graph for a process; gates to unknown stages are skipped.
    #[must_use]
    pub fn new(process: &Process) -> Self {
        let count = process.stages().len();
        let mut successors = vec![Vec::new(); count];
        let mut predecessors = vec![Vec::new(); count];
        for (source, stage) in process.stages().iter().enumerate() {
            for gate in &stage.gates {
                if let Some(target) = process.stage_index(gate.target_stage.as_str()) {
                    successors[source].push(target);
                    predecessors[target].push(source);
                }
            }
        }
        Self {
            successors,
            predecessors,
        }
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.successors.len()
    }

    /// Returns true when the graph has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.successors.is_empty()
    }

    /// Returns the gate targets of a stage.
    #[must_use]
    pub fn successors(&self, node: usize) -> &[usize] {
        self.successors.get(node).map_or(&[], Vec::as_slice)
    }

    /// Returns the BFS distance of every stage from `start`.
    #[must_use]
    pub fn depths_from(&self, start: usize) -> Vec<Option<usize>> {
        bfs(&self.successors, start).0
    }

    /// Returns which stages can reach `target`.
    #[must_use]
    pub fn reaching(&self, target: usize) -> Vec<bool> {
        bfs(&self.predecessors, target).0.iter().map(Option::is_some).collect()
    }

    /// Returns the shortest path from `from` to `to`, inclusive of both ends.
    ///
    /// Among equal-length paths the one found first through gate declaration
    /// order wins.
    #[must_use]
    pub fn shortest_path(&self, from: usize, to: usize) -> Option<Vec<usize>> {
        let (depths, parents) = bfs(&self.successors, from);
        depths.get(to).copied().flatten()?;
        let mut path = vec![to];
        let mut current = to;
        while current != from {
            current = parents.get(current).copied().flatten()?;
            path.push(current);
        }
        path.reverse();
        Some(path)
    }

    /// Returns strongly connected components via iterative Tarjan.
    ///
    /// Members of each component are sorted by arena index.
    #[must_use]
    pub fn strongly_connected_components(&self) -> Vec<Vec<usize>> {
        let count = self.len();
        let mut index_of: Vec<Option<usize>> = vec![None; count];
        let mut low = vec![0usize; count];
        let mut on_stack = vec![false; count];
        let mut stack: Vec<usize> = Vec::new();
        let mut next_index = 0usize;
        let mut components = Vec::new();

        for root in 0 .. count {
            if index_of[root].is_some() {
                continue;
            }
            index_of[root] = Some(next_index);
            low[root] = next_index;
            next_index += 1;
            stack.push(root);
            on_stack[root] = true;
            let mut work: Vec<(usize, usize)> = vec![(root, 0)];

            while let Some(frame) = work.last_mut() {
                let node = frame.0;
                if let Some(&next) = self.successors[node].get(frame.1) {
                    frame.1 += 1;
                    match index_of[next] {
                        None => {
                            index_of[next] = Some(next_index);
                            low[next] = next_index;
                            next_index += 1;
                            stack.push(next);
                            on_stack[next] = true;
                            work.push((next, 0));
                        }
                        Some(index) if on_stack[next] => low[node] = low[node].min(index),
                        Some(_) => {}
                    }
                    continue;
                }
                work.pop();
                if let Some(&(parent, _)) = work.last() {
                    low[parent] = low[parent].min(low[node]);
                }
                if index_of[node] == Some(low[node]) {
                    let mut component = Vec::new();
                    while let Some(member) = stack.pop() {
                        on_stack[member] = false;
                        component.push(member);
                        if member == node {
                            break;
                        }
                    }
                    component.sort_unstable();
                    components.push(component);
                }
            }
        }
        components
    }
}

// ============================================================================
// SECTION: Traversal
// ============================================================================

/// Distances and BFS-tree parents from `start` over `edges`.
type BfsTree = (Vec<Option<usize>>, Vec<Option<usize>>);

/// Breadth-first search returning distances and parents.
fn bfs(edges: &[Vec<usize>], start: usize) -> BfsTree {
    let mut depths = vec![None; edges.len()];
    let mut parents = vec![None; edges.len()];
    if start >= edges.len() {
        return (depths, parents);
    }
    depths[start] = Some(0);
    let mut queue = VecDeque::from([start]);
    while let Some(node) = queue.pop_front() {
        let depth = depths[node].unwrap_or_default();
        for &next in &edges[node] {
            if depths[next].is_none() {
                depths[next] = Some(depth + 1);
                parents[next] = Some(node);
                queue.push_back(next);
            }
        }
    }
    (depths, parents)
}
