//! Graph-external timing results.
//!
//! Summaries and alerts live outside the graph and reference entities by
//! id only; they are never folded back into structure. Per-Super metrics
//! (`TimingNodeMetrics` / `TimingEdgeMetrics`) live in `netweave-view`'s
//! analysis bundles, next to the entities they describe.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Which analysis corner the aggregation describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    Setup,
    Hold,
    Both,
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AnalysisMode::Setup => "setup",
            AnalysisMode::Hold => "hold",
            AnalysisMode::Both => "both",
        };
        f.write_str(s)
    }
}

/// Aggregation knobs, all in nanoseconds where dimensional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    pub clock_period: f64,
    /// Members with slack at or below this are critical.
    pub critical_threshold: f64,
    /// Members with slack below `alpha * clock_period` are near-critical.
    pub near_critical_alpha: f64,
    /// Warn-level alert threshold on a Super's worst slack.
    pub warn_slack_threshold: f64,
    /// Warn-level alert threshold on the risk score.
    pub risk_alert_threshold: f64,
    pub analysis_mode: AnalysisMode,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            clock_period: 10.0,
            critical_threshold: 0.0,
            near_critical_alpha: 0.1,
            warn_slack_threshold: 0.5,
            risk_alert_threshold: 10.0,
            analysis_mode: AnalysisMode::Setup,
        }
    }
}

/// Whole-graph aggregation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingSummary {
    pub worst_slack: Option<f64>,
    pub violation_count: usize,
    pub near_critical_count: usize,
    pub clock_period: f64,
    pub analysis_mode: AnalysisMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertSeverity {
    Info,
    Warn,
    Error,
}

/// What kind of entity an alert points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertEntity {
    SuperNode,
    SuperEdge,
}

/// One finding, referencing its entity by id only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingAlert {
    pub entity_ref: String,
    pub entity_kind: AlertEntity,
    pub severity: AlertSeverity,
    pub reason: String,
    /// Copy of the metric scalars at discovery time.
    pub snapshot: BTreeMap<String, f64>,
}
