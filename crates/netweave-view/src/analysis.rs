//! Analysis bundles: keyed, immutable metric attachments.
//!
//! Analysis results are attached to SuperNodes/SuperEdges as a keyed map
//! from an [`AnalysisKind`] to a frozen metrics value. Bundles never
//! influence structure, and structure never references bundle values;
//! re-analysis replaces the whole entry for a kind, never mutates it in
//! place.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use netweave_core::FlowType;

/// The kinds of analysis a bundle may carry. `Area` and `Power` follow the
/// same attachment pattern once their aggregators exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AnalysisKind {
    Timing,
    Area,
    Power,
}

/// Aggregated timing statistics for a SuperNode.
///
/// Statistics only: no critical-path membership, no per-path data, no
/// assertion that the SuperNode "is on the critical path".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingNodeMetrics {
    /// Worst slack over members; `NaN` when no member carries slack.
    pub min_slack: f64,
    /// 5th-percentile slack (linear interpolation), the tail-risk figure.
    pub p5_slack: f64,
    pub max_arrival_time: f64,
    pub min_required_time: f64,
    /// Fraction of slack-bearing members at or below the critical threshold.
    pub critical_node_ratio: f64,
    /// Fraction of slack-bearing members below `alpha * clock_period`.
    pub near_critical_ratio: f64,
    /// Single scalar for alerting; `None` when no slack inputs existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing_risk_score: Option<f64>,
}

/// Aggregated delay statistics for a SuperEdge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingEdgeMetrics {
    pub max_delay: f64,
    pub p95_delay: f64,
    pub flow_type_histogram: BTreeMap<FlowType, usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fanout_max: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fanout_p95: Option<f64>,
}

/// A frozen metrics value of any kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnalysisValue {
    TimingNode(TimingNodeMetrics),
    TimingEdge(TimingEdgeMetrics),
}

/// The keyed attachment map.
///
/// Values are only readable through shared references; [`attach`] replaces
/// the entire entry for its kind.
///
/// [`attach`]: AnalysisBundle::attach
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisBundle {
    entries: BTreeMap<AnalysisKind, AnalysisValue>,
}

impl AnalysisBundle {
    pub fn new() -> Self {
        AnalysisBundle::default()
    }

    /// Attaches (or wholesale-replaces) the value for a kind.
    pub fn attach(&mut self, kind: AnalysisKind, value: AnalysisValue) {
        self.entries.insert(kind, value);
    }

    pub fn get(&self, kind: AnalysisKind) -> Option<&AnalysisValue> {
        self.entries.get(&kind)
    }

    /// Typed accessor for node timing metrics.
    pub fn timing_node(&self) -> Option<&TimingNodeMetrics> {
        match self.entries.get(&AnalysisKind::Timing) {
            Some(AnalysisValue::TimingNode(metrics)) => Some(metrics),
            _ => None,
        }
    }

    /// Typed accessor for edge timing metrics.
    pub fn timing_edge(&self) -> Option<&TimingEdgeMetrics> {
        match self.entries.get(&AnalysisKind::Timing) {
            Some(AnalysisValue::TimingEdge(metrics)) => Some(metrics),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
