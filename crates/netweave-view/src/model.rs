//! The SuperGraph model.
//!
//! A SuperGraph is an immutable, derived snapshot: SuperNodes partition
//! the non-eliminated nodes of the base graph, SuperEdges carry the
//! signal-level connectivity that crosses SuperNode boundaries, and both
//! reference base entities by id only (the SuperGraph never owns or
//! points into the base graph).
//!
//! Ids are deterministic: a blake3 hash over the view, context, super
//! class, and the sorted member uid set, so rebuilding the same view from
//! the same frozen graph yields byte-identical output.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use netweave_core::{AttrValue, EdgeId, FlowType, NodeId, RelationType};

use crate::analysis::AnalysisBundle;

/// Which engineering question the view answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum View {
    Structural,
    Connectivity,
    Physical,
}

impl View {
    pub const ALL: [View; 3] = [View::Structural, View::Connectivity, View::Physical];
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            View::Structural => "Structural",
            View::Connectivity => "Connectivity",
            View::Physical => "Physical",
        };
        f.write_str(s)
    }
}

/// The engineering intent that selects the active policy map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewContext {
    Design,
    Simulation,
}

impl fmt::Display for ViewContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ViewContext::Design => "Design",
            ViewContext::Simulation => "Simulation",
        };
        f.write_str(s)
    }
}

/// Abstraction class of a SuperNode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SuperClass {
    Atomic,
    ModuleCluster,
    CombinationalCloud,
    ConstraintGroup,
    /// Policy vocabulary only: eliminated nodes never materialize as
    /// SuperNodes.
    Eliminated,
}

impl fmt::Display for SuperClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SuperClass::Atomic => "Atomic",
            SuperClass::ModuleCluster => "ModuleCluster",
            SuperClass::CombinationalCloud => "CombinationalCloud",
            SuperClass::ConstraintGroup => "ConstraintGroup",
            SuperClass::Eliminated => "Eliminated",
        };
        f.write_str(s)
    }
}

/// Deterministic SuperNode identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SuperNodeId(pub String);

impl fmt::Display for SuperNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Deterministic SuperEdge identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SuperEdgeId(pub String);

impl fmt::Display for SuperEdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hashes the sorted member uid set into a SuperNode id.
pub fn super_node_id(
    view: View,
    context: ViewContext,
    super_class: SuperClass,
    member_uids: &BTreeSet<&str>,
) -> SuperNodeId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(view.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(context.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(super_class.to_string().as_bytes());
    for uid in member_uids {
        hasher.update(b"|");
        hasher.update(uid.as_bytes());
    }
    let digest = hasher.finalize().to_hex();
    SuperNodeId(format!("SN_{view}_{super_class}_{}", &digest.as_str()[..12]))
}

/// Hashes an endpoint pair into a SuperEdge id.
pub fn super_edge_id(source: &SuperNodeId, target: &SuperNodeId) -> SuperEdgeId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(source.0.as_bytes());
    hasher.update(b"->");
    hasher.update(target.0.as_bytes());
    let digest = hasher.finalize().to_hex();
    SuperEdgeId(format!("SE_{}", &digest.as_str()[..12]))
}

/// One abstracted node: a set of base members and their aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuperNode {
    pub id: SuperNodeId,
    pub super_class: SuperClass,
    pub member_nodes: BTreeSet<NodeId>,
    /// Base edges wholly inside this SuperNode.
    pub member_edges: BTreeSet<EdgeId>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub aggregated_attrs: IndexMap<String, AttrValue>,
    /// Debug label derived from a representative member.
    pub canonical_name: String,
    #[serde(default, skip_serializing_if = "AnalysisBundle::is_empty")]
    pub analysis: AnalysisBundle,
}

/// One abstracted edge: the boundary-crossing base edges between two
/// SuperNodes. Carries no signal meaning of its own; the member edges do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuperEdge {
    pub id: SuperEdgeId,
    pub source: SuperNodeId,
    pub target: SuperNodeId,
    pub member_edges: BTreeSet<EdgeId>,
    /// The non-eliminated base endpoints of the member edges.
    pub member_nodes: BTreeSet<NodeId>,
    /// Majority relation type over members, canonical order breaking ties.
    pub relation_type: RelationType,
    pub relation_histogram: BTreeMap<RelationType, usize>,
    pub flow_histogram: BTreeMap<FlowType, usize>,
    #[serde(default, skip_serializing_if = "AnalysisBundle::is_empty")]
    pub analysis: AnalysisBundle,
}

/// A built view: the (view, context) key plus the abstracted structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuperGraph {
    pub view: View,
    pub context: ViewContext,
    pub super_nodes: IndexMap<SuperNodeId, SuperNode>,
    pub super_edges: IndexMap<SuperEdgeId, SuperEdge>,
    /// Base node -> owning SuperNode, non-eliminated nodes only.
    pub node_to_super: BTreeMap<NodeId, SuperNodeId>,
    /// Nodes removed by the eliminate cycle.
    pub eliminated_nodes: BTreeSet<NodeId>,
    /// Base edges in no SuperEdge: self-loops at super level and edges
    /// whose passthrough search found no visible endpoint.
    pub dropped_edges: BTreeSet<EdgeId>,
}

impl SuperGraph {
    /// The SuperNode owning a base node, if it survived elimination.
    pub fn supernode_of(&self, node: NodeId) -> Option<&SuperNode> {
        self.node_to_super
            .get(&node)
            .and_then(|id| self.super_nodes.get(id))
    }

    /// The SuperEdge between two SuperNodes, if any member edge crosses.
    pub fn edge_between(&self, source: &SuperNodeId, target: &SuperNodeId) -> Option<&SuperEdge> {
        let id = super_edge_id(source, target);
        self.super_edges.get(&id)
    }

    pub fn supernode_count(&self) -> usize {
        self.super_nodes.len()
    }

    pub fn superedge_count(&self) -> usize {
        self.super_edges.len()
    }
}
