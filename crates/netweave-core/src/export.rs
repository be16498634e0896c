//! Export wire format for query and visualization consumers.
//!
//! Flat serde structs decoupled from the in-memory records: consumers get
//! stable field names regardless of how the store evolves.

use serde::{Deserialize, Serialize};

use crate::edge::Edge;
use crate::id::{EdgeId, NodeId};
use crate::model::{BitRange, EntityClass, FlowType, RelationType};
use crate::node::Node;
use crate::store::DesignGraph;

/// Wire form of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeExport {
    pub id: String,
    pub label: String,
    pub entity_class: EntityClass,
    pub hier_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock_domain: Option<String>,
}

impl NodeExport {
    pub fn from_node(node: &Node, view: Option<&str>) -> Self {
        NodeExport {
            id: node.uid.clone(),
            label: node.canonical_name.clone(),
            entity_class: node.entity_class,
            hier_path: node.hier_path.clone(),
            view: view.map(str::to_string),
            slack: node.slack,
            arrival: node.arrival_time,
            required: node.required_time,
            clock_domain: node.clock_domain.clone(),
        }
    }
}

/// Wire form of an edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeExport {
    pub id: String,
    pub source: String,
    pub target: String,
    pub relation_type: RelationType,
    pub flow_type: FlowType,
    pub signal_name: String,
    pub canonical_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bit_range: Option<BitRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing_exception: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock_domain: Option<String>,
}

impl EdgeExport {
    pub fn from_edge(edge: &Edge, source_uid: &str, target_uid: &str) -> Self {
        EdgeExport {
            id: edge.uid.clone(),
            source: source_uid.to_string(),
            target: target_uid.to_string(),
            relation_type: edge.relation_type,
            flow_type: edge.flow_type,
            signal_name: edge.signal_name.clone(),
            canonical_name: edge.canonical_name.clone(),
            bit_range: edge.bit_range,
            net_id: edge.net_id.clone(),
            slack: edge.slack,
            delay: edge.delay,
            timing_exception: edge.timing_exception.clone(),
            clock_domain: edge.clock_domain.clone(),
        }
    }
}

/// Exports one node by id.
pub fn export_node(graph: &DesignGraph, id: NodeId, view: Option<&str>) -> Option<NodeExport> {
    graph.node(id).map(|node| NodeExport::from_node(node, view))
}

/// Exports one edge by id, resolving endpoint uids.
pub fn export_edge(graph: &DesignGraph, id: EdgeId) -> Option<EdgeExport> {
    let edge = graph.edge(id)?;
    let (src, dst) = graph.endpoints(id)?;
    let source = &graph.node(src)?.uid;
    let target = &graph.node(dst)?.uid;
    Some(EdgeExport::from_edge(edge, source, target))
}

/// Exports the whole base graph in insertion order.
pub fn export_graph(graph: &DesignGraph, view: Option<&str>) -> (Vec<NodeExport>, Vec<EdgeExport>) {
    let nodes = graph
        .node_ids()
        .filter_map(|id| export_node(graph, id, view))
        .collect();
    let edges = graph
        .edge_ids()
        .filter_map(|id| export_edge(graph, id))
        .collect();
    (nodes, edges)
}
