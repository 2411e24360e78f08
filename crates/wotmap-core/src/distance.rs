//! Per-key mean distance to the strong set.
//!
//! # Overview
//!
//! For one source key, a breadth-first search over the `signed_by`
//! relation computes shortest hop counts to every other key, then a
//! fold over the strong set's members produces:
//!
//! - the mean distance, normalized by the strong set's size — a fixed
//!   normalizer shared by every source, not the per-source reachable
//!   count;
//! - a hop histogram bounded at [`MAX_HOP_BUCKETS`];
//! - the highest finite hop count observed and the keys achieving it.
//!
//! The BFS relaxes a neighbor only when the candidate distance is
//! strictly smaller than its recorded one and enqueues on every
//! successful relaxation; relaxation only ever decreases a distance,
//! so the loop terminates bounded by graph size times max distance.

use std::collections::VecDeque;

use serde::Serialize;

use crate::graph::KeyGraph;
use crate::scc::SccForest;

/// Highest hop bucket carried in the histogram (exclusive): hop counts
/// at or above this only contribute to the mean and the farthest list.
pub const MAX_HOP_BUCKETS: usize = 30;

/// Sentinel for "not reached" — any real relaxation beats it.
const INFINITE: usize = usize::MAX;

/// Shortest hop counts from `source` to every key, over the `signed_by`
/// relation. Unreached keys hold `usize::MAX`.
///
/// # Panics
///
/// Panics if `source` is out of range for `graph`.
#[must_use]
pub fn shortest_hops(graph: &KeyGraph, source: usize) -> Vec<usize> {
    let n = graph.len();
    let mut dist = vec![INFINITE; n];
    let mut queue = VecDeque::with_capacity(n);
    dist[source] = 0;
    queue.push_back(source);

    while let Some(node) = queue.pop_front() {
        let candidate = dist[node] + 1;
        for &neighbor in graph.signed_by(node) {
            if candidate < dist[neighbor] {
                dist[neighbor] = candidate;
                queue.push_back(neighbor);
            }
        }
    }
    dist
}

/// Distance profile of one source key against the strong set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyDistances {
    /// Total strong-set hop distance divided by strong-set size.
    pub mean: f64,
    /// Count of strong-set members per hop bucket, `0..MAX_HOP_BUCKETS`.
    pub hops: Vec<u32>,
    /// Highest finite hop count observed, unclamped.
    pub hop_high: usize,
    /// Key indices at `hop_high`, in ascending index order.
    pub farthest: Vec<usize>,
}

impl KeyDistances {
    /// Run the BFS from `source` and fold over the strong set.
    ///
    /// With no strong set (empty graph) the profile is all zeros.
    ///
    /// # Panics
    ///
    /// Panics if `source` is out of range or `scc` was computed for a
    /// different graph.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn measure(graph: &KeyGraph, scc: &SccForest, source: usize) -> Self {
        let mut hops = vec![0u32; MAX_HOP_BUCKETS];
        let mut hop_high = 0usize;
        let mut farthest: Vec<usize> = Vec::new();
        let Some(strong_rep) = scc.strong_rep else {
            return Self {
                mean: 0.0,
                hops,
                hop_high,
                farthest,
            };
        };

        let dist = shortest_hops(graph, source);

        let mut total = 0u64;
        for (index, &d) in dist.iter().enumerate() {
            if scc.component[index] != strong_rep || d == INFINITE {
                continue;
            }
            total += d as u64;
            if d < MAX_HOP_BUCKETS {
                hops[d] += 1;
            }
            if d > hop_high {
                hop_high = d;
                farthest.clear();
            }
            if d == hop_high {
                farthest.push(index);
            }
        }

        Self {
            mean: total as f64 / scc.strong_size as f64,
            hops,
            hop_high,
            farthest,
        }
    }

    /// Hop count clamped to the histogram bound, for report display
    /// only — comparisons inside [`Self::measure`] use the unclamped
    /// value.
    #[must_use]
    pub fn display_hop_high(&self) -> usize {
        self.hop_high.min(MAX_HOP_BUCKETS)
    }

    /// Histogram entries `(hop, count)` for `0 ..= hop_high`, capped to
    /// the buckets that exist.
    #[must_use]
    pub fn histogram(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        let top = self.hop_high.min(MAX_HOP_BUCKETS - 1);
        (0..=top).map(|hop| (hop, self.hops[hop]))
    }
}
