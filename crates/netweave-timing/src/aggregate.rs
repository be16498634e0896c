//! Timing aggregation over a built SuperGraph.
//!
//! Pure functions: read the base graph's raw timing scalars, compute
//! per-Super statistics, and attach them as immutable analysis bundles.
//! Nothing here writes through the updater or perturbs structure, and a
//! Super with no timing data gets no bundle at all rather than an error.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use netweave_core::DesignGraph;
use netweave_view::{
    AnalysisKind, AnalysisValue, SuperEdge, SuperGraph, SuperNode, TimingEdgeMetrics,
    TimingNodeMetrics,
};

use crate::metrics::{AlertEntity, AlertSeverity, TimingAlert, TimingConfig, TimingSummary};

/// Percentile with linear interpolation between closest ranks.
/// `p` is a fraction (`0.05` = 5th percentile). Empty input gives `NaN`.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = (lower + 1).min(sorted.len() - 1);
    let weight = rank - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}

/// Computes node metrics for one SuperNode from its members' raw timing.
///
/// Returns `None` when no member carries any timing scalar. Ratios are
/// over the slack-bearing members; `min_slack` is `NaN` when no member
/// carries slack but some carry arrival/required times.
pub fn compute_node_metrics(
    supernode: &SuperNode,
    graph: &DesignGraph,
    config: &TimingConfig,
) -> Option<TimingNodeMetrics> {
    let mut slacks = Vec::new();
    let mut arrivals = Vec::new();
    let mut requireds = Vec::new();

    for &member in &supernode.member_nodes {
        let Some(node) = graph.node(member) else { continue };
        if let Some(slack) = node.slack {
            slacks.push(slack);
        }
        if let Some(arrival) = node.arrival_time {
            arrivals.push(arrival);
        }
        if let Some(required) = node.required_time {
            requireds.push(required);
        }
    }

    if slacks.is_empty() && arrivals.is_empty() && requireds.is_empty() {
        return None;
    }

    let min_slack = slacks
        .iter()
        .copied()
        .fold(f64::NAN, |acc, v| if acc.is_nan() { v } else { acc.min(v) });
    let p5_slack = if slacks.len() >= 2 {
        percentile(&slacks, 0.05)
    } else {
        min_slack
    };
    let max_arrival_time = arrivals
        .iter()
        .copied()
        .fold(f64::NAN, |acc, v| if acc.is_nan() { v } else { acc.max(v) });
    let min_required_time = requireds
        .iter()
        .copied()
        .fold(f64::NAN, |acc, v| if acc.is_nan() { v } else { acc.min(v) });

    let slack_count = slacks.len();
    let near_bound = config.near_critical_alpha * config.clock_period;
    let (critical_node_ratio, near_critical_ratio) = if slack_count > 0 {
        let critical = slacks
            .iter()
            .filter(|&&s| s <= config.critical_threshold)
            .count();
        let near = slacks.iter().filter(|&&s| s < near_bound).count();
        (
            critical as f64 / slack_count as f64,
            near as f64 / slack_count as f64,
        )
    } else {
        (0.0, 0.0)
    };

    let timing_risk_score = if slack_count > 0 {
        Some(10.0 * critical_node_ratio + 5.0 * near_critical_ratio + (-min_slack).max(0.0))
    } else {
        None
    };

    Some(TimingNodeMetrics {
        min_slack,
        p5_slack,
        max_arrival_time,
        min_required_time,
        critical_node_ratio,
        near_critical_ratio,
        timing_risk_score,
    })
}

/// Computes edge metrics for one SuperEdge from its member edges.
///
/// Fanout statistics are over the out-degrees of the member edges'
/// source endpoints. Returns `None` for an empty member set.
pub fn compute_edge_metrics(
    superedge: &SuperEdge,
    graph: &DesignGraph,
) -> Option<TimingEdgeMetrics> {
    let mut delays = Vec::new();
    let mut flow_type_histogram = BTreeMap::new();
    let mut sources = BTreeSet::new();

    for &member in &superedge.member_edges {
        let Some(edge) = graph.edge(member) else { continue };
        if let Some(delay) = edge.delay {
            delays.push(delay);
        }
        *flow_type_histogram.entry(edge.flow_type).or_insert(0) += 1;
        if let Some((src, _)) = graph.endpoints(member) {
            sources.insert(src);
        }
    }

    if flow_type_histogram.is_empty() {
        return None;
    }

    let max_delay = delays
        .iter()
        .copied()
        .fold(f64::NAN, |acc, v| if acc.is_nan() { v } else { acc.max(v) });
    let p95_delay = if delays.len() >= 2 {
        percentile(&delays, 0.95)
    } else {
        max_delay
    };

    let fanouts: Vec<f64> = sources
        .iter()
        .map(|&src| graph.out_degree(src) as f64)
        .collect();
    let fanout_max = fanouts.iter().copied().fold(None, |acc: Option<f64>, v| {
        Some(acc.map_or(v, |a| a.max(v)))
    });

    Some(TimingEdgeMetrics {
        max_delay,
        p95_delay,
        flow_type_histogram,
        fanout_max: fanout_max.map(|v| v as usize),
        fanout_p95: if fanouts.is_empty() {
            None
        } else {
            Some(percentile(&fanouts, 0.95))
        },
    })
}

/// Attaches timing bundles to every Super that has data.
///
/// Each attachment replaces the Super's previous `Timing` entry whole.
pub fn aggregate_timing(supergraph: &mut SuperGraph, graph: &DesignGraph, config: &TimingConfig) {
    let mut node_bundles = 0usize;
    for supernode in supergraph.super_nodes.values_mut() {
        if let Some(metrics) = compute_node_metrics(supernode, graph, config) {
            supernode
                .analysis
                .attach(AnalysisKind::Timing, AnalysisValue::TimingNode(metrics));
            node_bundles += 1;
        }
    }
    let mut edge_bundles = 0usize;
    for superedge in supergraph.super_edges.values_mut() {
        if let Some(metrics) = compute_edge_metrics(superedge, graph) {
            superedge
                .analysis
                .attach(AnalysisKind::Timing, AnalysisValue::TimingEdge(metrics));
            edge_bundles += 1;
        }
    }
    debug!(node_bundles, edge_bundles, "timing aggregated");
}

/// Whole-graph summary over the SuperGraph's visible members.
pub fn compute_timing_summary(
    supergraph: &SuperGraph,
    graph: &DesignGraph,
    config: &TimingConfig,
) -> TimingSummary {
    let mut worst: Option<f64> = None;
    let mut violations = 0usize;
    let mut near_critical = 0usize;
    let near_bound = config.near_critical_alpha * config.clock_period;

    for supernode in supergraph.super_nodes.values() {
        for &member in &supernode.member_nodes {
            let Some(slack) = graph.node(member).and_then(|n| n.slack) else {
                continue;
            };
            worst = Some(worst.map_or(slack, |w| w.min(slack)));
            if slack < 0.0 {
                violations += 1;
            } else if slack < near_bound {
                near_critical += 1;
            }
        }
    }

    TimingSummary {
        worst_slack: worst,
        violation_count: violations,
        near_critical_count: near_critical,
        clock_period: config.clock_period,
        analysis_mode: config.analysis_mode,
    }
}

/// Scans attached bundles and reports violations and risks.
pub fn generate_timing_alerts(supergraph: &SuperGraph, config: &TimingConfig) -> Vec<TimingAlert> {
    let mut alerts = Vec::new();

    for supernode in supergraph.super_nodes.values() {
        let Some(metrics) = supernode.analysis.timing_node() else {
            continue;
        };

        if metrics.min_slack < config.critical_threshold {
            alerts.push(TimingAlert {
                entity_ref: supernode.id.0.clone(),
                entity_kind: AlertEntity::SuperNode,
                severity: AlertSeverity::Error,
                reason: format!("timing violation: min_slack={:.3}ns", metrics.min_slack),
                snapshot: BTreeMap::from([
                    ("min_slack".to_string(), metrics.min_slack),
                    ("p5_slack".to_string(), metrics.p5_slack),
                    ("max_arrival_time".to_string(), metrics.max_arrival_time),
                ]),
            });
        } else if metrics.min_slack < config.warn_slack_threshold {
            alerts.push(TimingAlert {
                entity_ref: supernode.id.0.clone(),
                entity_kind: AlertEntity::SuperNode,
                severity: AlertSeverity::Warn,
                reason: format!("near-critical: min_slack={:.3}ns", metrics.min_slack),
                snapshot: BTreeMap::from([
                    ("min_slack".to_string(), metrics.min_slack),
                    (
                        "critical_node_ratio".to_string(),
                        metrics.critical_node_ratio,
                    ),
                ]),
            });
        }

        if let Some(risk) = metrics.timing_risk_score {
            if risk > config.risk_alert_threshold {
                alerts.push(TimingAlert {
                    entity_ref: supernode.id.0.clone(),
                    entity_kind: AlertEntity::SuperNode,
                    severity: AlertSeverity::Warn,
                    reason: format!("high timing risk: score={risk:.2}"),
                    snapshot: BTreeMap::from([
                        ("timing_risk_score".to_string(), risk),
                        (
                            "critical_node_ratio".to_string(),
                            metrics.critical_node_ratio,
                        ),
                        (
                            "near_critical_ratio".to_string(),
                            metrics.near_critical_ratio,
                        ),
                    ]),
                });
            }
        }
    }

    alerts
}
