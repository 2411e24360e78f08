#![forbid(unsafe_code)]
//! wotmap-core: trust-graph engine for web-of-trust keyring analysis.
//!
//! # Overview
//!
//! This crate turns a stream of preprocessed key/signature records into a
//! directed trust graph and measures, for every key, how far it sits from
//! the graph's largest strongly-connected component (the "strong set").
//!
//! ## Pipeline
//!
//! ```text
//! record bytes
//!        ↓  ingest::load()
//! KeyGraph (key table + signed-by / signed adjacency)
//!        ↓  SccForest::decompose()
//! SccForest (component label per key, strong set)
//!        ↓  ReachableSet::mark()
//! ReachableSet (keys eligible for per-key analysis)
//!        ↓  Analyzer::run()  — fixed worker threads, static partition
//! per-key KeyRecord → ReportSink, plus one AnalysisSummary
//! ```
//!
//! All traversals (SCC, reachability, per-key BFS) walk the `signed_by`
//! (incoming-signature) relation. SCC membership is invariant under
//! whole-graph edge reversal, so the component partition is the same as
//! for the forward graph; the directional meaning of "mean distance"
//! follows from this choice and is part of the crate's contract.
//!
//! # Conventions
//!
//! - **Errors**: `thiserror` enums at module seams, `anyhow::Result` in
//!   the orchestration layer.
//! - **Logging**: `tracing` macros (`info!`, `debug!`, `trace!`).

pub mod analyze;
pub mod distance;
pub mod graph;
pub mod ingest;
pub mod keyid;
pub mod reach;
pub mod scc;

pub use analyze::{AnalysisSummary, Analyzer, AnalyzerConfig, KeyRecord, ReportSink};
pub use distance::{KeyDistances, MAX_HOP_BUCKETS};
pub use graph::{GraphError, KeyGraph};
pub use ingest::{Ingest, IngestError};
pub use keyid::{KeyId, KeyIdError};
pub use reach::ReachableSet;
pub use scc::{Component, SccForest};
