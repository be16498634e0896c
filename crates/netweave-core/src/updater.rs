//! The precedence-gated graph updater.
//!
//! The updater is the *only* writer of post-creation field values. Every
//! write is gated by the precedence lattice over `(source, stage)`:
//! source rank dominates, stage rank breaks source ties, and equal ranks
//! go to the later write (monotonic ledger sequence, not wall time). Once
//! a field has been set by `UserOverride`, lower-source writes are
//! rejected regardless of stage.
//!
//! Accepted writes update the store and append to the ledger atomically
//! from the caller's point of view. Rejected writes leave the store and
//! the current record untouched; the losing attempt is retained in the
//! ledger history so nothing is silently lost.

use tracing::debug;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::CoreError;
use crate::field::{apply_to_edge, apply_to_node, EdgeField, FieldId, FieldValue, NodeField};
use crate::id::{EdgeId, NodeId};
use crate::ingest::{EdgeSpec, EntityRef, FieldUpdate, NodeSpec, TimingPathRecord};
use crate::model::{Source, Stage};
use crate::provenance::{EntityKey, Origin, ProvenanceLedger, ProvenanceRecord};
use crate::store::DesignGraph;

/// Result of a gated write.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// The write passed the precedence gate and was applied.
    Applied,
    /// The write lost to the current record, returned unchanged.
    Rejected(ProvenanceRecord),
}

impl WriteOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, WriteOutcome::Applied)
    }
}

/// A per-entity timing refinement, as produced by timing-report adapters.
#[derive(Debug, Clone, PartialEq)]
pub struct TimingUpdate {
    pub entity: EntityRef,
    pub delay: Option<f64>,
    pub slack: Option<f64>,
    pub arrival: Option<f64>,
    pub required: Option<f64>,
}

/// The single write path into the design graph.
pub struct GraphUpdater<'g> {
    store: &'g mut DesignGraph,
    ledger: &'g mut ProvenanceLedger,
    diagnostics: &'g mut Diagnostics,
}

impl<'g> GraphUpdater<'g> {
    pub fn new(
        store: &'g mut DesignGraph,
        ledger: &'g mut ProvenanceLedger,
        diagnostics: &'g mut Diagnostics,
    ) -> Self {
        GraphUpdater {
            store,
            ledger,
            diagnostics,
        }
    }

    /// Read-only view of the store, for ingestors that need to resolve uids
    /// or inspect current values while writing.
    pub fn store(&self) -> &DesignGraph {
        self.store
    }

    pub fn diagnostics(&mut self) -> &mut Diagnostics {
        self.diagnostics
    }

    // -----------------------------------------------------------------------
    // Entity creation (pass-through; creation is not precedence-gated)
    // -----------------------------------------------------------------------

    pub fn add_node(&mut self, spec: NodeSpec) -> Result<NodeId, CoreError> {
        self.store.add_node(spec)
    }

    pub fn add_edge(&mut self, spec: EdgeSpec) -> Result<EdgeId, CoreError> {
        self.store.add_edge(spec)
    }

    // -----------------------------------------------------------------------
    // Gated field writes
    // -----------------------------------------------------------------------

    /// Updates one node field through the precedence gate.
    pub fn update_node_field(
        &mut self,
        id: NodeId,
        field: NodeField,
        value: FieldValue,
        source: Source,
        stage: Stage,
        origin: Option<Origin>,
    ) -> Result<WriteOutcome, CoreError> {
        // Kind-check against a scratch copy before anything else: a
        // mismatch is a hard error, never a precedence rejection, and
        // must leave both the store and the ledger untouched.
        let mut node = self
            .store
            .node(id)
            .cloned()
            .ok_or(CoreError::NodeNotFound { id })?;
        apply_to_node(&mut node, &field, &value)?;

        let key = (EntityKey::Node(id), FieldId::Node(field.clone()));
        if let Some(current) = self.gate(&key, &value, source, stage) {
            self.record_attempt(key.0, key.1, value, source, stage, origin, false);
            return Ok(WriteOutcome::Rejected(current));
        }

        *self
            .store
            .node_mut(id)
            .ok_or(CoreError::NodeNotFound { id })? = node;

        self.commit(key.0, key.1, value, source, stage, origin);
        Ok(WriteOutcome::Applied)
    }

    /// Updates one edge field through the precedence gate.
    pub fn update_edge_field(
        &mut self,
        id: EdgeId,
        field: EdgeField,
        value: FieldValue,
        source: Source,
        stage: Stage,
        origin: Option<Origin>,
    ) -> Result<WriteOutcome, CoreError> {
        let mut edge = self
            .store
            .edge(id)
            .cloned()
            .ok_or(CoreError::EdgeNotFound { id })?;
        apply_to_edge(&mut edge, &field, &value)?;

        let key = (EntityKey::Edge(id), FieldId::Edge(field.clone()));
        if let Some(current) = self.gate(&key, &value, source, stage) {
            self.record_attempt(key.0, key.1, value, source, stage, origin, false);
            return Ok(WriteOutcome::Rejected(current));
        }

        *self
            .store
            .edge_mut(id)
            .ok_or(CoreError::EdgeNotFound { id })? = edge;

        self.commit(key.0, key.1, value, source, stage, origin);
        Ok(WriteOutcome::Applied)
    }

    /// Applies a wire-format field update, resolving the entity by uid.
    pub fn apply(&mut self, update: FieldUpdate) -> Result<WriteOutcome, CoreError> {
        match (&update.entity, update.field) {
            (EntityRef::Node(uid), FieldId::Node(field)) => {
                let id = self
                    .store
                    .node_id(uid)
                    .ok_or_else(|| CoreError::NoSuchEntity { uid: uid.clone() })?;
                self.update_node_field(
                    id,
                    field,
                    update.value,
                    update.source,
                    update.stage,
                    update.origin,
                )
            }
            (EntityRef::Edge(uid), FieldId::Edge(field)) => {
                let id = self
                    .store
                    .edge_id(uid)
                    .ok_or_else(|| CoreError::NoSuchEntity { uid: uid.clone() })?;
                self.update_edge_field(
                    id,
                    field,
                    update.value,
                    update.source,
                    update.stage,
                    update.origin,
                )
            }
            (EntityRef::Node(uid), FieldId::Edge(_)) | (EntityRef::Edge(uid), FieldId::Node(_)) => {
                Err(CoreError::TypeMismatch {
                    field: format!("update for `{uid}`"),
                    expected: "matching entity and field kinds",
                    got: "node/edge mismatch",
                })
            }
        }
    }

    // -----------------------------------------------------------------------
    // Bulk helpers
    // -----------------------------------------------------------------------

    /// Writes clock-domain labels for many nodes; returns how many applied.
    pub fn batch_update_clock_domains<I, S>(
        &mut self,
        assignments: I,
        source: Source,
        stage: Stage,
        origin: Option<Origin>,
    ) -> Result<usize, CoreError>
    where
        I: IntoIterator<Item = (NodeId, S)>,
        S: Into<String>,
    {
        let mut applied = 0;
        for (id, domain) in assignments {
            let outcome = self.update_node_field(
                id,
                NodeField::ClockDomain,
                FieldValue::Text(domain.into()),
                source,
                stage,
                origin.clone(),
            )?;
            if outcome.is_applied() {
                applied += 1;
            }
        }
        Ok(applied)
    }

    /// Writes timing scalars for many entities at `(Analyzed, Timing)`;
    /// returns how many individual field writes applied.
    pub fn batch_update_timing<I>(&mut self, updates: I) -> Result<usize, CoreError>
    where
        I: IntoIterator<Item = TimingUpdate>,
    {
        let mut applied = 0;
        for update in updates {
            match &update.entity {
                EntityRef::Node(uid) => {
                    let id = self
                        .store
                        .node_id(uid)
                        .ok_or_else(|| CoreError::NoSuchEntity { uid: uid.clone() })?;
                    let writes = [
                        (NodeField::Slack, update.slack),
                        (NodeField::ArrivalTime, update.arrival),
                        (NodeField::RequiredTime, update.required),
                    ];
                    for (field, value) in writes {
                        if let Some(v) = value {
                            let outcome = self.update_node_field(
                                id,
                                field,
                                FieldValue::Real(v),
                                Source::Analyzed,
                                Stage::Timing,
                                None,
                            )?;
                            if outcome.is_applied() {
                                applied += 1;
                            }
                        }
                    }
                }
                EntityRef::Edge(uid) => {
                    let id = self
                        .store
                        .edge_id(uid)
                        .ok_or_else(|| CoreError::NoSuchEntity { uid: uid.clone() })?;
                    let writes = [
                        (EdgeField::Delay, update.delay),
                        (EdgeField::Slack, update.slack),
                    ];
                    for (field, value) in writes {
                        if let Some(v) = value {
                            let outcome = self.update_edge_field(
                                id,
                                field,
                                FieldValue::Real(v),
                                Source::Analyzed,
                                Stage::Timing,
                                None,
                            )?;
                            if outcome.is_applied() {
                                applied += 1;
                            }
                        }
                    }
                }
            }
        }
        Ok(applied)
    }

    /// Writes timing-exception tags for many edges; returns how many applied.
    pub fn batch_update_timing_exceptions<I, S>(
        &mut self,
        exceptions: I,
        source: Source,
        stage: Stage,
        origin: Option<Origin>,
    ) -> Result<usize, CoreError>
    where
        I: IntoIterator<Item = (EdgeId, S)>,
        S: Into<String>,
    {
        let mut applied = 0;
        for (id, exception) in exceptions {
            let outcome = self.update_edge_field(
                id,
                EdgeField::TimingException,
                FieldValue::Text(exception.into()),
                source,
                stage,
                origin.clone(),
            )?;
            if outcome.is_applied() {
                applied += 1;
            }
        }
        Ok(applied)
    }

    /// Applies one analyzed timing path: every node on the path gets the
    /// path slack, the endpoint gets arrival/required, and each listed
    /// edge gets its delay contribution plus the path slack. Returns how
    /// many individual field writes applied.
    pub fn apply_timing_path(&mut self, record: &TimingPathRecord) -> Result<usize, CoreError> {
        let mut updates = Vec::with_capacity(record.nodes.len() + record.edges.len());
        for uid in &record.nodes {
            let at_endpoint = *uid == record.endpoint;
            updates.push(TimingUpdate {
                entity: EntityRef::Node(uid.clone()),
                delay: None,
                slack: Some(record.slack),
                arrival: at_endpoint.then_some(record.arrival),
                required: at_endpoint.then_some(record.required),
            });
        }
        for uid in &record.edges {
            updates.push(TimingUpdate {
                entity: EntityRef::Edge(uid.clone()),
                delay: record.delay_per_edge.get(uid).copied(),
                slack: Some(record.slack),
                arrival: None,
                required: None,
            });
        }
        self.batch_update_timing(updates)
    }

    // -----------------------------------------------------------------------
    // Gate internals
    // -----------------------------------------------------------------------

    /// Checks the precedence gate. Returns the current record when the
    /// incoming write loses.
    fn gate(
        &mut self,
        key: &(EntityKey, FieldId),
        value: &FieldValue,
        source: Source,
        stage: Stage,
    ) -> Option<ProvenanceRecord> {
        let head = self.ledger.head(key.0, &key.1)?;
        let incoming = (source.rank(), stage.rank());
        if incoming < head.rank() {
            debug!(
                field = %key.1,
                current_source = %head.source,
                current_stage = %head.stage,
                incoming_source = %source,
                incoming_stage = %stage,
                "write rejected by precedence gate"
            );
            return Some(head.clone());
        }
        // Equal-rank Declared displacement of a different value is the
        // ambiguous case: both records stay in the ledger, and the run
        // collects a diagnostic so nothing is silently lost.
        if incoming == head.rank() && source == Source::Declared && head.value != *value {
            self.diagnostics.warn(
                DiagnosticKind::ConflictingDeclaration,
                format!(
                    "field `{}` redeclared at equal precedence; keeping the later value",
                    key.1
                ),
                None,
            );
        }
        None
    }

    /// Applies the ledger side of an accepted write.
    fn commit(
        &mut self,
        entity: EntityKey,
        field: FieldId,
        value: FieldValue,
        source: Source,
        stage: Stage,
        origin: Option<Origin>,
    ) {
        self.record_attempt(entity, field, value, source, stage, origin, true);
    }

    /// Appends an attempt record. The store value never changes here; the
    /// head only moves for accepted attempts.
    fn record_attempt(
        &mut self,
        entity: EntityKey,
        field: FieldId,
        value: FieldValue,
        source: Source,
        stage: Stage,
        origin: Option<Origin>,
        accepted: bool,
    ) {
        let seq = self.ledger.next_seq();
        self.ledger.append(
            entity,
            field,
            ProvenanceRecord {
                value,
                source,
                stage,
                origin,
                seq,
                accepted,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::NodeSpec;
    use crate::model::EntityClass;
    use crate::provenance::LedgerConfig;

    struct Fixture {
        store: DesignGraph,
        ledger: ProvenanceLedger,
        diagnostics: Diagnostics,
        node: NodeId,
    }

    fn fixture() -> Fixture {
        let mut store = DesignGraph::new();
        let node = store
            .add_node(NodeSpec::new("n1", EntityClass::FlipFlop))
            .unwrap();
        Fixture {
            store,
            ledger: ProvenanceLedger::new(LedgerConfig::default()),
            diagnostics: Diagnostics::default(),
            node,
        }
    }

    fn write(
        fx: &mut Fixture,
        value: &str,
        source: Source,
        stage: Stage,
    ) -> WriteOutcome {
        let mut updater = GraphUpdater::new(&mut fx.store, &mut fx.ledger, &mut fx.diagnostics);
        updater
            .update_node_field(
                fx.node,
                NodeField::ClockDomain,
                FieldValue::Text(value.into()),
                source,
                stage,
                None,
            )
            .unwrap()
    }

    #[test]
    fn declared_overrides_inferred_and_resists_reinference() {
        let mut fx = fixture();
        assert!(write(&mut fx, "clk", Source::Inferred, Stage::Rtl).is_applied());
        assert!(write(&mut fx, "sys_clk", Source::Declared, Stage::Constraints).is_applied());

        let outcome = write(&mut fx, "clk", Source::Inferred, Stage::Rtl);
        let WriteOutcome::Rejected(record) = outcome else {
            panic!("inferred re-write should lose to declared");
        };
        assert_eq!(record.value, FieldValue::Text("sys_clk".into()));
        assert_eq!(
            fx.store.node(fx.node).unwrap().clock_domain.as_deref(),
            Some("sys_clk")
        );
    }

    #[test]
    fn user_override_is_final() {
        let mut fx = fixture();
        assert!(write(&mut fx, "clk", Source::Inferred, Stage::Rtl).is_applied());
        assert!(write(&mut fx, "my_clk", Source::UserOverride, Stage::Constraints).is_applied());

        // Declared at a *higher* stage still loses: source rank dominates.
        let outcome = write(&mut fx, "board_clk", Source::Declared, Stage::Board);
        assert!(matches!(outcome, WriteOutcome::Rejected(_)));
        assert_eq!(
            fx.store.node(fx.node).unwrap().clock_domain.as_deref(),
            Some("my_clk")
        );
    }

    #[test]
    fn equal_rank_goes_to_later_write() {
        let mut fx = fixture();
        assert!(write(&mut fx, "a_clk", Source::Declared, Stage::Constraints).is_applied());
        assert!(write(&mut fx, "b_clk", Source::Declared, Stage::Constraints).is_applied());
        assert_eq!(
            fx.store.node(fx.node).unwrap().clock_domain.as_deref(),
            Some("b_clk")
        );
        // The displaced declaration produced a conflict diagnostic.
        assert!(fx
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::ConflictingDeclaration));
    }

    #[test]
    fn stage_breaks_source_ties() {
        let mut fx = fixture();
        assert!(write(&mut fx, "late", Source::Analyzed, Stage::Timing).is_applied());
        let outcome = write(&mut fx, "early", Source::Analyzed, Stage::Synthesis);
        assert!(matches!(outcome, WriteOutcome::Rejected(_)));
    }

    #[test]
    fn rejection_leaves_value_and_head_unchanged() {
        let mut fx = fixture();
        assert!(write(&mut fx, "sys_clk", Source::Declared, Stage::Constraints).is_applied());

        let _ = write(&mut fx, "clk", Source::Inferred, Stage::Rtl);

        let key = (
            EntityKey::Node(fx.node),
            FieldId::Node(NodeField::ClockDomain),
        );
        // The head and the store value are untouched...
        let head = fx.ledger.head(key.0, &key.1).unwrap();
        assert_eq!(head.value, FieldValue::Text("sys_clk".into()));
        assert!(head.accepted);
        assert_eq!(
            fx.store.node(fx.node).unwrap().clock_domain.as_deref(),
            Some("sys_clk")
        );
        // ...while the losing attempt is retained in the history.
        let history = fx.ledger.history(key.0, &key.1).unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.records().any(|r| !r.accepted));
    }

    #[test]
    fn type_mismatch_is_hard_error_without_ledger_append() {
        let mut fx = fixture();
        let mut updater =
            GraphUpdater::new(&mut fx.store, &mut fx.ledger, &mut fx.diagnostics);
        let err = updater
            .update_node_field(
                fx.node,
                NodeField::Slack,
                FieldValue::Text("not a number".into()),
                Source::Analyzed,
                Stage::Timing,
                None,
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::TypeMismatch { .. }));
        assert!(fx
            .ledger
            .head(EntityKey::Node(fx.node), &FieldId::Node(NodeField::Slack))
            .is_none());
    }

    #[test]
    fn missing_entity_is_hard_error() {
        let mut fx = fixture();
        let mut updater =
            GraphUpdater::new(&mut fx.store, &mut fx.ledger, &mut fx.diagnostics);
        let err = updater
            .update_node_field(
                NodeId(999),
                NodeField::ClockDomain,
                "x".into(),
                Source::Inferred,
                Stage::Rtl,
                None,
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::NodeNotFound { .. }));
    }

    #[test]
    fn wire_field_update_resolves_by_uid() {
        let mut fx = fixture();
        let mut updater = GraphUpdater::new(&mut fx.store, &mut fx.ledger, &mut fx.diagnostics);
        let outcome = updater
            .apply(FieldUpdate {
                entity: EntityRef::Node("n1".into()),
                field: FieldId::Node(NodeField::ClockDomain),
                value: FieldValue::Text("sys_clk".into()),
                source: Source::Declared,
                stage: Stage::Constraints,
                origin: None,
            })
            .unwrap();
        assert!(outcome.is_applied());

        let err = updater
            .apply(FieldUpdate {
                entity: EntityRef::Node("ghost".into()),
                field: FieldId::Node(NodeField::ClockDomain),
                value: "x".into(),
                source: Source::Declared,
                stage: Stage::Constraints,
                origin: None,
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::NoSuchEntity { .. }));
    }

    #[test]
    fn timing_path_spreads_slack_and_delay() {
        let mut fx = fixture();
        fx.store
            .add_node(NodeSpec::new("n2", EntityClass::FlipFlop))
            .unwrap();
        fx.store
            .add_edge(crate::ingest::EdgeSpec::new(
                "e0",
                "n1",
                "n2",
                crate::model::RelationType::Data,
                crate::model::FlowType::SequentialLaunch,
                "q",
            ))
            .unwrap();

        let mut delay_per_edge = indexmap::IndexMap::new();
        delay_per_edge.insert("e0".to_string(), 2.4);
        let record = TimingPathRecord {
            startpoint: "n1".into(),
            endpoint: "n2".into(),
            nodes: vec!["n1".into(), "n2".into()],
            edges: vec!["e0".into()],
            slack: -0.3,
            arrival: 10.3,
            required: 10.0,
            delay_per_edge,
        };

        let mut updater = GraphUpdater::new(&mut fx.store, &mut fx.ledger, &mut fx.diagnostics);
        // n1 slack; n2 slack+arrival+required; e0 delay+slack.
        let applied = updater.apply_timing_path(&record).unwrap();
        assert_eq!(applied, 6);

        let n2 = fx.store.node_id("n2").unwrap();
        let node = fx.store.node(n2).unwrap();
        assert_eq!(node.slack, Some(-0.3));
        assert_eq!(node.arrival_time, Some(10.3));
        let n1 = fx.store.node_id("n1").unwrap();
        assert_eq!(fx.store.node(n1).unwrap().arrival_time, None);

        let e0 = fx.store.edge_id("e0").unwrap();
        assert_eq!(fx.store.edge(e0).unwrap().delay, Some(2.4));
    }

    #[test]
    fn batch_clock_domains_counts_applied_writes() {
        let mut fx = fixture();
        let n2 = fx
            .store
            .add_node(NodeSpec::new("n2", EntityClass::FlipFlop))
            .unwrap();
        // Pin n1 at Declared so the Inferred batch write to it is rejected.
        assert!(write(&mut fx, "sys_clk", Source::Declared, Stage::Constraints).is_applied());

        let mut updater =
            GraphUpdater::new(&mut fx.store, &mut fx.ledger, &mut fx.diagnostics);
        let applied = updater
            .batch_update_clock_domains(
                vec![(fx.node, "clk"), (n2, "clk")],
                Source::Inferred,
                Stage::Rtl,
                None,
            )
            .unwrap();
        assert_eq!(applied, 1);
    }
}
