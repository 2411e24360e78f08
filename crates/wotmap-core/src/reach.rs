//! Reachability from the strong set's representative.
//!
//! A single depth-first flood over the same `signed_by` relation the SCC
//! finder walks, marking every key the representative can reach. Only
//! marked keys are eligible for per-key analysis, and the mark count
//! normalizes the global average at the end of a run. The set is
//! computed once after the strong set is fixed and never recomputed.

use fixedbitset::FixedBitSet;
use tracing::{debug, instrument};

use crate::graph::KeyGraph;

/// The set of keys reachable from the strong set's representative.
#[derive(Debug, Clone)]
pub struct ReachableSet {
    marks: FixedBitSet,
    count: usize,
}

impl ReachableSet {
    /// Flood from `strong_rep` over the `signed_by` relation.
    ///
    /// # Panics
    ///
    /// Panics if `strong_rep` is out of range for `graph`.
    #[must_use]
    #[instrument(skip(graph), fields(keys = graph.len()))]
    pub fn mark(graph: &KeyGraph, strong_rep: usize) -> Self {
        let mut marks = FixedBitSet::with_capacity(graph.len());
        let mut count = 0usize;
        let mut stack = vec![strong_rep];

        while let Some(node) = stack.pop() {
            if marks.contains(node) {
                continue;
            }
            marks.insert(node);
            count += 1;
            for &neighbor in graph.signed_by(node) {
                if !marks.contains(neighbor) {
                    stack.push(neighbor);
                }
            }
        }

        debug!(reachable = count, "reachability marked");
        Self { marks, count }
    }

    /// `true` if `index` is reachable from the representative.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.marks.contains(index)
    }

    /// Number of reachable keys.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// `true` if nothing is reachable (never the case after `mark`,
    /// which always marks the representative itself).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }
}
