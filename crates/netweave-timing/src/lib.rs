//! Timing aggregation for SuperGraphs.
//!
//! Consumes the base graph's raw timing scalars (written during the
//! `Timing` ingest stage) and a built SuperGraph, and produces per-Super
//! statistics, a whole-graph summary, and alerts. Strictly separated from
//! structure: aggregation never writes through the updater, and metrics
//! attach as immutable bundles that replace whole.
//!
//! Statistics only — no path membership, and no claim that any Super "is
//! on the critical path".

pub mod aggregate;
pub mod metrics;

pub use aggregate::{
    aggregate_timing, compute_edge_metrics, compute_node_metrics, compute_timing_summary,
    generate_timing_alerts, percentile,
};
pub use metrics::{
    AlertEntity, AlertSeverity, AnalysisMode, TimingAlert, TimingConfig, TimingSummary,
};
