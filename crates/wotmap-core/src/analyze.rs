//! Parallel per-key analysis over the reachable set.
//!
//! # Overview
//!
//! A fixed number of worker threads split the reachable keys with a
//! static partition: worker `w` takes every reachable key whose index
//! satisfies `index % workers == w`, in ascending index order. There is
//! no work queue and no rebalancing — the partition is computed from the
//! index alone, so a run is deterministic for a fixed input.
//!
//! The only shared mutable state is one accumulator (running mean total
//! plus completed-key counter) behind a single mutex, held just long
//! enough to add one float and bump the counter — never across a BFS or
//! a report emission. The graph, component labels, and reachable marks
//! are read-only during this phase.
//!
//! Workers run their partitions to completion; a failing sink or a
//! panicked worker aborts the whole run after the join barrier. The
//! global average is read only after every worker has joined.

use std::sync::{Mutex, PoisonError};
use std::thread;

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::distance::KeyDistances;
use crate::graph::KeyGraph;
use crate::keyid::KeyId;
use crate::reach::ReachableSet;
use crate::scc::SccForest;

/// Per-key output handed to the report writer.
///
/// Built fresh inside a worker for each analyzed key and dropped once
/// the sink has consumed it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyRecord {
    /// Dense key index.
    pub index: usize,
    /// The key's identifier.
    pub id: KeyId,
    /// `true` if the key belongs to the strong set.
    pub in_strong_set: bool,
    /// Mean distance, histogram, and farthest keys for this key.
    pub distances: KeyDistances,
}

/// Where per-key records go.
///
/// Implementations are called concurrently from worker threads and must
/// either tolerate interleaved calls (e.g. one file per key) or
/// serialize internally (e.g. a mutex around a shared stream).
pub trait ReportSink: Sync {
    /// Consume one per-key record.
    ///
    /// # Errors
    ///
    /// Any error is fatal to the whole run.
    fn key_report(&self, record: &KeyRecord) -> Result<()>;
}

/// Worker configuration for [`Analyzer`].
#[derive(Debug, Clone, Copy)]
pub struct AnalyzerConfig {
    /// Number of worker threads. Zero is treated as one.
    pub workers: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self { workers: 2 }
    }
}

/// End-of-run totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSummary {
    /// Average of all per-key means, normalized by the reachable count.
    pub global_mean: f64,
    /// Size of the reachable set.
    pub reachable: usize,
    /// Keys actually analyzed (equals `reachable` on a completed run).
    pub analyzed: usize,
    /// Size of the strong set.
    pub strong_size: usize,
}

/// The shared accumulator. One lock, two fields, nothing else crosses
/// worker boundaries mutably.
#[derive(Debug, Default)]
struct MeanAccumulator {
    mean_total: f64,
    keys_done: usize,
}

/// Runs the mean-distance engine over the reachable set.
#[derive(Debug, Clone, Copy, Default)]
pub struct Analyzer {
    config: AnalyzerConfig,
}

impl Analyzer {
    /// Create an analyzer with the given worker configuration.
    #[must_use]
    pub const fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    /// Analyze every reachable key and emit one record per key to
    /// `sink`.
    ///
    /// # Errors
    ///
    /// Returns the first sink error or worker panic; the run produces
    /// no summary in that case.
    #[instrument(skip_all, fields(workers = self.config.workers, reachable = reachable.len()))]
    pub fn run<S: ReportSink + ?Sized>(
        &self,
        graph: &KeyGraph,
        scc: &SccForest,
        reachable: &ReachableSet,
        sink: &S,
    ) -> Result<AnalysisSummary> {
        let workers = self.config.workers.max(1);
        let accum = Mutex::new(MeanAccumulator::default());

        thread::scope(|scope| -> Result<()> {
            let mut handles = Vec::with_capacity(workers);
            for worker in 0..workers {
                let accum = &accum;
                handles.push(scope.spawn(move || {
                    worker_partition(worker, workers, graph, scc, reachable, sink, accum)
                }));
            }
            for handle in handles {
                handle
                    .join()
                    .map_err(|_| anyhow!("analysis worker panicked"))??;
            }
            Ok(())
        })?;

        let accum = accum
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        let global_mean = if reachable.is_empty() {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let normalizer = reachable.len() as f64;
            accum.mean_total / normalizer
        };
        info!(
            analyzed = accum.keys_done,
            global_mean, "analysis complete"
        );

        Ok(AnalysisSummary {
            global_mean,
            reachable: reachable.len(),
            analyzed: accum.keys_done,
            strong_size: scc.strong_size,
        })
    }
}

/// One worker's pass over its static share of the reachable set.
fn worker_partition<S: ReportSink + ?Sized>(
    worker: usize,
    workers: usize,
    graph: &KeyGraph,
    scc: &SccForest,
    reachable: &ReachableSet,
    sink: &S,
    accum: &Mutex<MeanAccumulator>,
) -> Result<()> {
    let mut analyzed = 0usize;
    for index in 0..graph.len() {
        if !reachable.contains(index) || index % workers != worker {
            continue;
        }

        let distances = KeyDistances::measure(graph, scc, index);

        {
            let mut acc = accum.lock().unwrap_or_else(PoisonError::into_inner);
            acc.mean_total += distances.mean;
            acc.keys_done += 1;
        }

        let record = KeyRecord {
            index,
            id: graph.key_id(index),
            in_strong_set: scc.in_strong_set(index),
            distances,
        };
        sink.key_report(&record)
            .with_context(|| format!("report sink failed for key {}", record.id))?;
        analyzed += 1;
    }
    debug!(worker, analyzed, "worker finished");
    Ok(())
}
