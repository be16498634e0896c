//! The design graph store.
//!
//! [`DesignGraph`] owns the fused graph: one `StableGraph` for adjacency
//! plus uid interning and secondary indices (entity class, hierarchy
//! prefix, relation type). It is an explicit value passed into components,
//! never an ambient singleton.
//!
//! The store enforces creation-time invariants (unique uids, present
//! endpoints, hierarchy parents, relation/flow endpoint rules) but carries
//! no mutation policy: all post-creation field writes are mediated by the
//! [updater](crate::updater::GraphUpdater), which is the only code with
//! access to the `pub(crate)` mutable accessors.

use std::collections::HashMap;

use indexmap::IndexMap;
use petgraph::stable_graph::StableGraph;
use petgraph::visit::EdgeRef;
use petgraph::{Directed, Direction};
use serde::{Deserialize, Serialize};

use crate::edge::{edge_canonical_name, Edge};
use crate::error::CoreError;
use crate::id::{EdgeId, NodeId};
use crate::ingest::{EdgeSpec, NodeSpec};
use crate::model::{EntityClass, FlowType, RelationType};
use crate::node::{node_canonical_name, Node};

/// The fused design graph: nodes, edges, and the indices over them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DesignGraph {
    graph: StableGraph<Node, Edge, Directed, u32>,
    node_uids: IndexMap<String, NodeId>,
    edge_uids: IndexMap<String, EdgeId>,
    class_index: HashMap<EntityClass, Vec<NodeId>>,
    relation_index: HashMap<RelationType, Vec<EdgeId>>,
    /// hier-path prefix -> all nodes at or below that prefix.
    prefix_index: HashMap<String, Vec<NodeId>>,
    /// exact hier_path -> node, for parent checks.
    path_index: HashMap<String, NodeId>,
}

impl DesignGraph {
    pub fn new() -> Self {
        DesignGraph::default()
    }

    // -----------------------------------------------------------------------
    // Creation
    // -----------------------------------------------------------------------

    /// Adds a node from its spec.
    ///
    /// Fails with `DuplicateId` on a colliding uid and `MissingHierParent`
    /// when the immediate hierarchy parent is absent (inductively this
    /// guarantees every prefix of `hier_path` names a node).
    pub fn add_node(&mut self, spec: NodeSpec) -> Result<NodeId, CoreError> {
        if self.node_uids.contains_key(&spec.uid) {
            return Err(CoreError::DuplicateId { uid: spec.uid });
        }
        if let Some((parent, _)) = spec.hier_path.rsplit_once('/') {
            if !self.path_index.contains_key(parent) {
                return Err(CoreError::MissingHierParent {
                    uid: spec.uid,
                    parent: parent.to_string(),
                });
            }
        }

        let canonical_name = spec.canonical_name.clone().unwrap_or_else(|| {
            node_canonical_name(spec.entity_class, &spec.hier_path, &spec.local_name)
        });
        let node = Node {
            uid: spec.uid,
            entity_class: spec.entity_class,
            hier_path: spec.hier_path,
            local_name: spec.local_name,
            canonical_name,
            parameters: spec.parameters,
            attributes: spec.attributes,
            clock_signal: spec.clock_signal,
            reset_signal: spec.reset_signal,
            clock_domain: None,
            slack: None,
            arrival_time: None,
            required_time: None,
        };

        let uid = node.uid.clone();
        let hier_path = node.hier_path.clone();
        let class = node.entity_class;
        let id = NodeId::from(self.graph.add_node(node));

        self.node_uids.insert(uid, id);
        self.class_index.entry(class).or_default().push(id);
        self.path_index.insert(hier_path.clone(), id);
        for prefix in path_prefixes(&hier_path) {
            self.prefix_index.entry(prefix).or_default().push(id);
        }
        Ok(id)
    }

    /// Adds an edge from its spec, resolving endpoints by uid.
    ///
    /// Fails with `DanglingEndpoint` when an endpoint uid is absent and
    /// `InvalidEdge` when the relation/flow endpoint rules are violated:
    /// a `Clock` relation must terminate on a clock sink, a `Reset`
    /// relation on a reset sink, and a `SequentialLaunch` edge must leave
    /// a sequential (flip-flop-like) node.
    pub fn add_edge(&mut self, spec: EdgeSpec) -> Result<EdgeId, CoreError> {
        if self.edge_uids.contains_key(&spec.uid) {
            return Err(CoreError::DuplicateId { uid: spec.uid });
        }
        let src = self
            .node_uids
            .get(&spec.source)
            .copied()
            .ok_or_else(|| CoreError::DanglingEndpoint {
                edge: spec.uid.clone(),
                endpoint: spec.source.clone(),
            })?;
        let dst = self
            .node_uids
            .get(&spec.target)
            .copied()
            .ok_or_else(|| CoreError::DanglingEndpoint {
                edge: spec.uid.clone(),
                endpoint: spec.target.clone(),
            })?;

        let src_node = self.node(src).expect("resolved endpoint");
        let dst_node = self.node(dst).expect("resolved endpoint");

        match spec.relation_type {
            RelationType::Clock if !is_clock_sink(dst_node) => {
                return Err(CoreError::InvalidEdge {
                    edge: spec.uid,
                    reason: format!("clock relation into non-clock-sink `{}`", dst_node.uid),
                });
            }
            RelationType::Reset if !is_reset_sink(dst_node) => {
                return Err(CoreError::InvalidEdge {
                    edge: spec.uid,
                    reason: format!("reset relation into non-reset-sink `{}`", dst_node.uid),
                });
            }
            _ => {}
        }
        if spec.flow_type == FlowType::SequentialLaunch && !src_node.entity_class.is_sequential() {
            return Err(CoreError::InvalidEdge {
                edge: spec.uid,
                reason: format!(
                    "sequential launch from non-sequential `{}`",
                    src_node.uid
                ),
            });
        }

        let signal_label = match spec.bit_range {
            Some(range) => format!("{}{}", spec.signal_name, range),
            None => spec.signal_name.clone(),
        };
        let canonical_name = spec.canonical_name.clone().unwrap_or_else(|| {
            edge_canonical_name(
                &src_node.canonical_name,
                &dst_node.canonical_name,
                &signal_label,
            )
        });

        let edge = Edge {
            uid: spec.uid,
            relation_type: spec.relation_type,
            flow_type: spec.flow_type,
            signal_name: spec.signal_name,
            canonical_name,
            bit_range: spec.bit_range,
            net_id: spec.net_id,
            driver_type: spec.driver_type,
            fanout_count: spec.fanout_count,
            clock_domain: None,
            timing_exception: None,
            delay: None,
            slack: None,
            attributes: IndexMap::new(),
        };

        let uid = edge.uid.clone();
        let relation = edge.relation_type;
        let id = EdgeId::from(self.graph.add_edge(src.into(), dst.into(), edge));
        self.edge_uids.insert(uid, id);
        self.relation_index.entry(relation).or_default().push(id);
        Ok(id)
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.graph.node_weight(id.into())
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.graph.edge_weight(id.into())
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.graph.node_weight_mut(id.into())
    }

    pub(crate) fn edge_mut(&mut self, id: EdgeId) -> Option<&mut Edge> {
        self.graph.edge_weight_mut(id.into())
    }

    /// Resolves a node uid.
    pub fn node_id(&self, uid: &str) -> Option<NodeId> {
        self.node_uids.get(uid).copied()
    }

    /// Resolves an edge uid.
    pub fn edge_id(&self, uid: &str) -> Option<EdgeId> {
        self.edge_uids.get(uid).copied()
    }

    /// Resolves an exact hierarchy path.
    pub fn node_at_path(&self, hier_path: &str) -> Option<NodeId> {
        self.path_index.get(hier_path).copied()
    }

    /// The endpoints of an edge, source first.
    pub fn endpoints(&self, id: EdgeId) -> Option<(NodeId, NodeId)> {
        self.graph
            .edge_endpoints(id.into())
            .map(|(s, t)| (NodeId::from(s), NodeId::from(t)))
    }

    // -----------------------------------------------------------------------
    // Iteration
    // -----------------------------------------------------------------------

    /// All node ids in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.node_uids.values().copied()
    }

    /// All edge ids in insertion order.
    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.edge_uids.values().copied()
    }

    /// Nodes of one entity class, in insertion order.
    pub fn nodes_of_class(&self, class: EntityClass) -> &[NodeId] {
        self.class_index.get(&class).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Nodes whose `hier_path` is at or below the given prefix.
    pub fn nodes_under(&self, prefix: &str) -> &[NodeId] {
        self.prefix_index
            .get(prefix)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Edges of one relation type, in insertion order.
    pub fn edges_of_relation(&self, relation: RelationType) -> &[EdgeId] {
        self.relation_index
            .get(&relation)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Outgoing edges of a node.
    pub fn out_edges(&self, id: NodeId) -> Vec<EdgeId> {
        self.graph
            .edges_directed(id.into(), Direction::Outgoing)
            .map(|e| EdgeId::from(e.id()))
            .collect()
    }

    /// Incoming edges of a node.
    pub fn in_edges(&self, id: NodeId) -> Vec<EdgeId> {
        self.graph
            .edges_directed(id.into(), Direction::Incoming)
            .map(|e| EdgeId::from(e.id()))
            .collect()
    }

    pub fn out_degree(&self, id: NodeId) -> usize {
        self.graph
            .edges_directed(id.into(), Direction::Outgoing)
            .count()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    // -----------------------------------------------------------------------
    // Debug consistency assertion
    // -----------------------------------------------------------------------

    /// Verifies index coherence: every interned uid resolves, and every
    /// hier-path prefix of every node names a node.
    #[cfg(debug_assertions)]
    pub fn assert_consistency(&self) {
        for (uid, &id) in &self.node_uids {
            let node = self.node(id).expect("interned node exists");
            assert_eq!(&node.uid, uid, "uid index out of sync");
            if let Some(parent) = node.parent_path() {
                assert!(
                    self.path_index.contains_key(parent),
                    "node {} has dangling hierarchy parent {}",
                    uid,
                    parent
                );
            }
        }
        for (uid, &id) in &self.edge_uids {
            let edge = self.edge(id).expect("interned edge exists");
            assert_eq!(&edge.uid, uid, "edge uid index out of sync");
        }
    }
}

/// A node that a clock tree may legally terminate on.
fn is_clock_sink(node: &Node) -> bool {
    node.clock_signal.is_some()
        || matches!(
            node.entity_class,
            EntityClass::IoPort
                | EntityClass::FlipFlop
                | EntityClass::Dsp
                | EntityClass::Bram
                | EntityClass::ClockDomain
        )
}

/// A node that a reset may legally terminate on.
fn is_reset_sink(node: &Node) -> bool {
    node.reset_signal.is_some()
        || matches!(
            node.entity_class,
            EntityClass::IoPort | EntityClass::FlipFlop | EntityClass::RtlBlock | EntityClass::Fsm
        )
}

/// Every prefix of a `/`-joined path, including the path itself.
fn path_prefixes(path: &str) -> Vec<String> {
    let mut prefixes = Vec::new();
    let mut end = 0usize;
    for (i, ch) in path.char_indices() {
        if ch == '/' {
            prefixes.push(path[..i].to_string());
        }
        end = i + ch.len_utf8();
    }
    prefixes.push(path[..end].to_string());
    prefixes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{EdgeSpec, NodeSpec};

    fn graph_with_top() -> DesignGraph {
        let mut graph = DesignGraph::new();
        graph
            .add_node(NodeSpec::new("top", EntityClass::ModuleInstance))
            .unwrap();
        graph
    }

    #[test]
    fn add_node_and_resolve_uid() {
        let mut graph = graph_with_top();
        let id = graph
            .add_node(NodeSpec::new("top/ff1", EntityClass::FlipFlop))
            .unwrap();
        assert_eq!(graph.node_id("top/ff1"), Some(id));
        assert_eq!(graph.node(id).unwrap().local_name, "ff1");
    }

    #[test]
    fn duplicate_uid_rejected() {
        let mut graph = graph_with_top();
        let err = graph
            .add_node(NodeSpec::new("top", EntityClass::ModuleInstance))
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateId { .. }));
    }

    #[test]
    fn missing_hier_parent_rejected() {
        let mut graph = DesignGraph::new();
        let err = graph
            .add_node(NodeSpec::new("top/cpu/ff", EntityClass::FlipFlop))
            .unwrap_err();
        assert!(matches!(err, CoreError::MissingHierParent { .. }));
    }

    #[test]
    fn dangling_endpoint_rejected() {
        let mut graph = graph_with_top();
        let err = graph
            .add_edge(EdgeSpec::new(
                "e0",
                "top",
                "nowhere",
                RelationType::Data,
                FlowType::Combinational,
                "s",
            ))
            .unwrap_err();
        assert!(matches!(err, CoreError::DanglingEndpoint { .. }));
    }

    #[test]
    fn clock_relation_requires_clock_sink() {
        let mut graph = graph_with_top();
        graph
            .add_node(NodeSpec::new("top/clk_port", EntityClass::IoPort))
            .unwrap();
        graph
            .add_node(NodeSpec::new("top/l0", EntityClass::Lut))
            .unwrap();

        // Into a LUT: rejected.
        let err = graph
            .add_edge(EdgeSpec::new(
                "e_bad",
                "top/clk_port",
                "top/l0",
                RelationType::Clock,
                FlowType::ClockTree,
                "clk",
            ))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidEdge { .. }));

        // Into a flip-flop: accepted.
        graph
            .add_node(NodeSpec::new("top/ff", EntityClass::FlipFlop))
            .unwrap();
        graph
            .add_edge(EdgeSpec::new(
                "e_ok",
                "top/clk_port",
                "top/ff",
                RelationType::Clock,
                FlowType::ClockTree,
                "clk",
            ))
            .unwrap();
    }

    #[test]
    fn sequential_launch_requires_sequential_source() {
        let mut graph = graph_with_top();
        graph
            .add_node(NodeSpec::new("top/l0", EntityClass::Lut))
            .unwrap();
        graph
            .add_node(NodeSpec::new("top/ff", EntityClass::FlipFlop))
            .unwrap();

        let err = graph
            .add_edge(EdgeSpec::new(
                "e_bad",
                "top/l0",
                "top/ff",
                RelationType::Data,
                FlowType::SequentialLaunch,
                "d",
            ))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidEdge { .. }));

        graph
            .add_edge(EdgeSpec::new(
                "e_ok",
                "top/ff",
                "top/l0",
                RelationType::Data,
                FlowType::SequentialLaunch,
                "q",
            ))
            .unwrap();
    }

    #[test]
    fn prefix_index_covers_all_levels() {
        let mut graph = graph_with_top();
        graph
            .add_node(NodeSpec::new("top/cpu", EntityClass::ModuleInstance))
            .unwrap();
        graph
            .add_node(NodeSpec::new("top/cpu/ff1", EntityClass::FlipFlop))
            .unwrap();
        graph
            .add_node(NodeSpec::new("top/cpu/ff2", EntityClass::FlipFlop))
            .unwrap();

        assert_eq!(graph.nodes_under("top/cpu").len(), 3);
        assert_eq!(graph.nodes_under("top").len(), 4);
        assert!(graph.nodes_under("elsewhere").is_empty());
    }

    #[test]
    fn class_and_relation_indices() {
        let mut graph = graph_with_top();
        graph
            .add_node(NodeSpec::new("top/ff1", EntityClass::FlipFlop))
            .unwrap();
        graph
            .add_node(NodeSpec::new("top/ff2", EntityClass::FlipFlop))
            .unwrap();
        graph
            .add_edge(EdgeSpec::new(
                "e0",
                "top/ff1",
                "top/ff2",
                RelationType::Data,
                FlowType::Combinational,
                "q",
            ))
            .unwrap();

        assert_eq!(graph.nodes_of_class(EntityClass::FlipFlop).len(), 2);
        assert_eq!(graph.edges_of_relation(RelationType::Data).len(), 1);
        assert!(graph.edges_of_relation(RelationType::Clock).is_empty());
    }

    #[test]
    fn adjacency_follows_direction() {
        let mut graph = graph_with_top();
        let a = graph
            .add_node(NodeSpec::new("top/a", EntityClass::FlipFlop))
            .unwrap();
        let b = graph
            .add_node(NodeSpec::new("top/b", EntityClass::FlipFlop))
            .unwrap();
        let e = graph
            .add_edge(EdgeSpec::new(
                "e0",
                "top/a",
                "top/b",
                RelationType::Data,
                FlowType::Combinational,
                "q",
            ))
            .unwrap();

        assert_eq!(graph.out_edges(a), vec![e]);
        assert!(graph.out_edges(b).is_empty());
        assert_eq!(graph.in_edges(b), vec![e]);
        assert_eq!(graph.endpoints(e), Some((a, b)));

        #[cfg(debug_assertions)]
        graph.assert_consistency();
    }

    #[test]
    fn edge_canonical_name_is_derived() {
        let mut graph = graph_with_top();
        graph
            .add_node(NodeSpec::new("top/a", EntityClass::FlipFlop))
            .unwrap();
        graph
            .add_node(NodeSpec::new("top/b", EntityClass::Lut))
            .unwrap();
        let e = graph
            .add_edge(
                EdgeSpec::new(
                    "e0",
                    "top/a",
                    "top/b",
                    RelationType::Data,
                    FlowType::Combinational,
                    "q",
                )
                .with_bit_range(3, 0),
            )
            .unwrap();
        assert_eq!(
            graph.edge(e).unwrap().canonical_name,
            "top/a.reg_a -> top/b.comb : q[3:0]"
        );
    }
}
