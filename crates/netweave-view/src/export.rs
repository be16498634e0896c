//! Export wire format for SuperGraph consumers.
//!
//! Supers export their class, member counts, and the scalar fields of the
//! current timing bundle, flattened alongside the structural fields.

use serde::{Deserialize, Serialize};

use crate::analysis::{TimingEdgeMetrics, TimingNodeMetrics};
use crate::model::{SuperClass, SuperEdge, SuperGraph, SuperNode};

/// Wire form of a SuperNode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuperNodeExport {
    pub id: String,
    pub label: String,
    pub super_class: SuperClass,
    pub member_nodes: usize,
    pub member_edges: usize,
    pub view: String,
    #[serde(flatten)]
    pub timing: Option<TimingNodeMetrics>,
}

/// Wire form of a SuperEdge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuperEdgeExport {
    pub id: String,
    pub source: String,
    pub target: String,
    pub relation_type: netweave_core::RelationType,
    pub member_edges: usize,
    #[serde(flatten)]
    pub timing: Option<TimingEdgeMetrics>,
}

impl SuperNodeExport {
    pub fn from_supernode(supernode: &SuperNode, view: &str) -> Self {
        SuperNodeExport {
            id: supernode.id.0.clone(),
            label: supernode.canonical_name.clone(),
            super_class: supernode.super_class,
            member_nodes: supernode.member_nodes.len(),
            member_edges: supernode.member_edges.len(),
            view: view.to_string(),
            timing: supernode.analysis.timing_node().cloned(),
        }
    }
}

impl SuperEdgeExport {
    pub fn from_superedge(superedge: &SuperEdge) -> Self {
        SuperEdgeExport {
            id: superedge.id.0.clone(),
            source: superedge.source.0.clone(),
            target: superedge.target.0.clone(),
            relation_type: superedge.relation_type,
            member_edges: superedge.member_edges.len(),
            timing: superedge.analysis.timing_edge().cloned(),
        }
    }
}

/// Exports a whole SuperGraph in build order.
pub fn export_supergraph(
    supergraph: &SuperGraph,
) -> (Vec<SuperNodeExport>, Vec<SuperEdgeExport>) {
    let view = supergraph.view.to_string();
    let nodes = supergraph
        .super_nodes
        .values()
        .map(|sn| SuperNodeExport::from_supernode(sn, &view))
        .collect();
    let edges = supergraph
        .super_edges
        .values()
        .map(SuperEdgeExport::from_superedge)
        .collect();
    (nodes, edges)
}
