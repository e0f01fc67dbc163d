//! # driftgate-core
//!
//! **A statistical gate for tabular data pipelines.**
//!
//! `driftgate-core` detects drift and structural instability in tabular
//! datasets and probes hash avalanche behavior under controlled
//! perturbation:
//!
//! - correlation-coherence graphs with windowed rupture detection and
//!   lagged causal-edge discovery,
//! - dataset fingerprints and a two-sample drift comparator (KS-lite),
//! - a deterministic seeded bit-flip stress tester measuring hash-output
//!   entropy,
//! - a sandboxed rule evaluator for data-quality assertions,
//! - an append-only fingerprint ledger.
//!
//! ## Quick start
//!
//! ```
//! use driftgate_core::{NumericTable, build_graph};
//!
//! let table = NumericTable::parse_str("a,b\n1,2\n2,4\n3,6\n").unwrap();
//! let graph = build_graph(&table, 0.5);
//! assert_eq!(graph.edges.len(), 1);
//! ```
//!
//! Everything here is a synchronous, single-threaded batch computation over
//! fully materialized data. All numeric outputs are rounded to 12 decimals
//! so serialized reports are bit-stable across platforms. The stress and
//! soak runners thread one explicit seeded generator sequentially through
//! every trial; given the same inputs and seed, two runs are
//! byte-identical.

pub mod coherence;
pub mod drift;
pub mod error;
pub mod fingerprint;
pub mod integrity;
pub mod ledger;
pub mod rules;
pub mod soak;
pub mod stats;
pub mod stress;
pub mod table;

pub use coherence::{
    CausalEdge, CausalScan, CoherenceGraph, Edge, GraphReport, RuptureScan, WindowSlice,
    WindowTrace, build_graph, detect_ruptures, lagged_causal_edges, scan_causal, scan_ruptures,
    windowed_edges,
};
pub use drift::{
    DEFAULT_ALPHA, DriftSignals, FingerprintReport, KsResult, MEAN_DELTA_LIMIT, compose_drift,
    ks_two_sample,
};
pub use error::{GateError, Result};
pub use fingerprint::{ColumnStats, Fingerprint, column_stats, fingerprint};
pub use integrity::{
    Decision, IntegrityConfig, IntegrityReport, ScoreMode, Violations, Weights, assess,
    drift_mean_zmax,
};
pub use ledger::{HistorySource, LedgerEntry, append, load_history};
pub use rules::{
    Env, Rule, RuleError, RuleViolation, Value, evaluate_expression, evaluate_rules, parse_rules,
};
pub use soak::{SoakConfig, SoakOutcome, SoakRecord, SoakSummary, run_soak, window_env};
pub use stats::round12;
pub use stress::{
    EntropySummary, StressConfig, StressMark, StressOutcome, StressRecord, derive_seed, flip_bits,
    read_target_bytes, run_stress, sha256_hex, shannon_entropy_bits,
};
pub use table::NumericTable;

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
