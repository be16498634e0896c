//! Constraint projection.
//!
//! Resolves the target patterns of parsed constraint records into concrete
//! nodes and edges, then writes the projected semantics through the
//! updater at `(Declared, Constraints)`. Unresolved patterns are
//! warning-level diagnostics; the rest of the constraint set still
//! projects.

use std::collections::HashSet;

use tracing::debug;

use netweave_core::{
    CoreError, DiagnosticKind, EdgeField, EdgeId, FieldValue, FlowType, GraphUpdater, NodeField,
    NodeId, Origin, Source, Stage,
};

use crate::pattern::PatternIndex;
use crate::record::{
    ClockConstraint, ConstraintRecord, DelayBoundConstraint, FalsePathConstraint,
    IoTimingConstraint, MulticycleConstraint,
};

/// Projection knobs.
#[derive(Debug, Clone)]
pub struct ProjectorConfig {
    /// How many hops of `Combinational`/`SequentialLaunch` closure to take
    /// from the `from` set when selecting edges. `0` keeps strict
    /// direct-edge semantics.
    pub edge_hop_depth: usize,
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        ProjectorConfig { edge_hop_depth: 0 }
    }
}

/// Write counts for one projection run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectionStats {
    pub applied: usize,
    pub rejected: usize,
}

impl ProjectionStats {
    fn absorb(&mut self, other: ProjectionStats) {
        self.applied += other.applied;
        self.rejected += other.rejected;
    }

    fn count(&mut self, outcome: netweave_core::WriteOutcome) {
        if outcome.is_applied() {
            self.applied += 1;
        } else {
            self.rejected += 1;
        }
    }
}

/// Projects constraint records onto the graph through the updater.
pub struct ConstraintProjector<'g> {
    updater: GraphUpdater<'g>,
    index: PatternIndex,
    config: ProjectorConfig,
}

impl<'g> ConstraintProjector<'g> {
    /// Builds the pattern index once; reuse the projector across a whole
    /// constraint file.
    pub fn new(updater: GraphUpdater<'g>, config: ProjectorConfig) -> Self {
        let index = PatternIndex::build(updater.store());
        ConstraintProjector {
            updater,
            index,
            config,
        }
    }

    /// Projects a whole file's records, attributing writes to `origin_file`.
    pub fn project_all(
        &mut self,
        records: &[ConstraintRecord],
        origin_file: &str,
    ) -> Result<ProjectionStats, CoreError> {
        let mut stats = ProjectionStats::default();
        for record in records {
            let origin = Some(Origin::new(origin_file, None));
            stats.absorb(self.project(record, origin)?);
        }
        Ok(stats)
    }

    /// Projects one record.
    pub fn project(
        &mut self,
        record: &ConstraintRecord,
        origin: Option<Origin>,
    ) -> Result<ProjectionStats, CoreError> {
        match record {
            ConstraintRecord::Clock(clock) => self.project_clock(clock, origin),
            ConstraintRecord::FalsePath(fp) => self.project_false_path(fp, origin),
            ConstraintRecord::Multicycle(mc) => self.project_multicycle(mc, origin),
            ConstraintRecord::DelayBound(db) => self.project_delay_bound(db, origin),
            ConstraintRecord::IoTiming(io) => self.project_io_timing(io, origin),
        }
    }

    // -----------------------------------------------------------------------
    // Per-kind projections
    // -----------------------------------------------------------------------

    fn project_clock(
        &mut self,
        clock: &ClockConstraint,
        origin: Option<Origin>,
    ) -> Result<ProjectionStats, CoreError> {
        let mut stats = ProjectionStats::default();
        let targets = self.resolve_patterns(&clock.targets, &origin);
        for id in targets {
            stats.count(self.updater.update_node_field(
                id,
                NodeField::ClockDomain,
                FieldValue::Text(clock.name.clone()),
                Source::Declared,
                Stage::Constraints,
                origin.clone(),
            )?);
            stats.count(self.updater.update_node_field(
                id,
                NodeField::Attr("clock_period".into()),
                FieldValue::Real(clock.period),
                Source::Declared,
                Stage::Constraints,
                origin.clone(),
            )?);
        }
        Ok(stats)
    }

    fn project_false_path(
        &mut self,
        fp: &FalsePathConstraint,
        origin: Option<Origin>,
    ) -> Result<ProjectionStats, CoreError> {
        let exception = "false_path".to_string();
        self.project_exception(&fp.from, &fp.to, exception, origin)
    }

    fn project_multicycle(
        &mut self,
        mc: &MulticycleConstraint,
        origin: Option<Origin>,
    ) -> Result<ProjectionStats, CoreError> {
        let exception = format!("multicycle_{}_{}", mc.cycles, mc.kind.as_str());
        self.project_exception(&mc.from, &mc.to, exception, origin)
    }

    /// Shared edge-exception path for false-path and multicycle records.
    fn project_exception(
        &mut self,
        from: &[String],
        to: &[String],
        exception: String,
        origin: Option<Origin>,
    ) -> Result<ProjectionStats, CoreError> {
        let mut stats = ProjectionStats::default();
        if from.is_empty() && to.is_empty() {
            self.updater.diagnostics().warn(
                DiagnosticKind::SkippedConstraint,
                format!("`{exception}` constraint names neither -from nor -to"),
                origin,
            );
            return Ok(stats);
        }

        let edges = self.select_edges(from, to, &origin);
        debug!(exception = %exception, count = edges.len(), "projecting timing exception");
        for id in edges {
            stats.count(self.updater.update_edge_field(
                id,
                EdgeField::TimingException,
                FieldValue::Text(exception.clone()),
                Source::Declared,
                Stage::Constraints,
                origin.clone(),
            )?);
        }
        Ok(stats)
    }

    fn project_delay_bound(
        &mut self,
        db: &DelayBoundConstraint,
        origin: Option<Origin>,
    ) -> Result<ProjectionStats, CoreError> {
        let mut stats = ProjectionStats::default();
        let from = db.from.as_deref().unwrap_or(&[]);
        let to = db.to.as_deref().unwrap_or(&[]);
        if from.is_empty() && to.is_empty() {
            self.updater.diagnostics().warn(
                DiagnosticKind::SkippedConstraint,
                format!("set_{}_delay names neither -from nor -to", db.kind.as_str()),
                origin,
            );
            return Ok(stats);
        }

        let attr = format!("{}_delay", db.kind.as_str());
        for id in self.select_edges(from, to, &origin) {
            stats.count(self.updater.update_edge_field(
                id,
                EdgeField::Attr(attr.clone()),
                FieldValue::Real(db.value),
                Source::Declared,
                Stage::Constraints,
                origin.clone(),
            )?);
        }
        Ok(stats)
    }

    fn project_io_timing(
        &mut self,
        io: &IoTimingConstraint,
        origin: Option<Origin>,
    ) -> Result<ProjectionStats, CoreError> {
        let mut stats = ProjectionStats::default();
        let attr = format!("{}_delay", io.kind.as_str());
        for id in self.resolve_patterns(&io.ports, &origin) {
            stats.count(self.updater.update_node_field(
                id,
                NodeField::Attr(attr.clone()),
                FieldValue::Real(io.value),
                Source::Declared,
                Stage::Constraints,
                origin.clone(),
            )?);
            stats.count(self.updater.update_node_field(
                id,
                NodeField::Attr("io_clock".into()),
                FieldValue::Text(io.clock.clone()),
                Source::Declared,
                Stage::Constraints,
                origin.clone(),
            )?);
        }
        Ok(stats)
    }

    // -----------------------------------------------------------------------
    // Target resolution
    // -----------------------------------------------------------------------

    /// Union of matches across patterns, deduplicated, in store order.
    /// Each unmatched pattern records an `UnresolvedPattern` warning.
    fn resolve_patterns(&mut self, patterns: &[String], origin: &Option<Origin>) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::new();
        for pattern in patterns {
            let matches = self.index.resolve(self.updater.store(), pattern);
            if matches.is_empty() {
                self.updater.diagnostics().warn(
                    DiagnosticKind::UnresolvedPattern,
                    format!("no node matches constraint target `{pattern}`"),
                    origin.clone(),
                );
                continue;
            }
            for id in matches {
                if seen.insert(id) {
                    resolved.push(id);
                }
            }
        }
        resolved
    }

    /// Edges whose source lies in the (closure-expanded) `from` set and
    /// whose destination lies in the `to` set. An empty pattern list
    /// leaves that side unconstrained.
    fn select_edges(&mut self, from: &[String], to: &[String], origin: &Option<Origin>) -> Vec<EdgeId> {
        let from_set: Option<HashSet<NodeId>> = if from.is_empty() {
            None
        } else {
            let seeds: HashSet<NodeId> = self.resolve_patterns(from, origin).into_iter().collect();
            Some(self.launch_closure(seeds))
        };
        let to_set: Option<HashSet<NodeId>> = if to.is_empty() {
            None
        } else {
            Some(self.resolve_patterns(to, origin).into_iter().collect())
        };

        let graph = self.updater.store();
        graph
            .edge_ids()
            .filter(|&id| {
                let Some((src, dst)) = graph.endpoints(id) else {
                    return false;
                };
                from_set.as_ref().map_or(true, |f| f.contains(&src))
                    && to_set.as_ref().map_or(true, |t| t.contains(&dst))
            })
            .collect()
    }

    /// Expands launch seeds over `Combinational`/`SequentialLaunch` edges
    /// up to the configured hop depth.
    fn launch_closure(&self, seeds: HashSet<NodeId>) -> HashSet<NodeId> {
        let graph = self.updater.store();
        let mut closure = seeds;
        let mut frontier: Vec<NodeId> = closure.iter().copied().collect();

        for _ in 0..self.config.edge_hop_depth {
            let mut next = Vec::new();
            for id in frontier.drain(..) {
                for edge_id in graph.out_edges(id) {
                    let Some(edge) = graph.edge(edge_id) else { continue };
                    if !matches!(
                        edge.flow_type,
                        FlowType::Combinational | FlowType::SequentialLaunch
                    ) {
                        continue;
                    }
                    let Some((_, dst)) = graph.endpoints(edge_id) else {
                        continue;
                    };
                    if closure.insert(dst) {
                        next.push(dst);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }
        closure
    }
}
