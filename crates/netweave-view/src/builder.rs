//! The three-cycle view builder.
//!
//! Rewrites the base graph into a SuperGraph under the active policy map:
//!
//! 1. **Promote**: each Promote-policy node becomes a single-member
//!    SuperNode.
//! 2. **Merge**: Merge-policy nodes are partitioned by their target super
//!    class (parent module for clusters, combinational components for
//!    clouds, declared group or shared pblock for constraint groups) and
//!    each non-empty group becomes one SuperNode.
//! 3. **Eliminate**: everything else is marked eliminated.
//!
//! A final edge-rewrite pass folds every base edge into the SuperEdge
//! between its endpoints' SuperNodes, following through eliminated
//! endpoints along edges of the same relation type up to a bounded depth.
//! Self-loops at the super level are dropped. The builder checks the
//! cancellation token between cycles.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use indexmap::IndexMap;
use tracing::debug;

use netweave_core::{
    AttrValue, CancelToken, DesignGraph, EdgeId, NodeId, RelationType,
};

use crate::error::ViewError;
use crate::model::{
    super_edge_id, super_node_id, SuperClass, SuperEdge, SuperEdgeId, SuperGraph, SuperNode,
    SuperNodeId, View, ViewContext,
};
use crate::policy::{node_policy, PolicyAction};

/// Builder tuning.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Maximum hops to follow through eliminated nodes when rerouting an
    /// edge whose endpoint was eliminated.
    pub passthrough_depth: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            passthrough_depth: 8,
        }
    }
}

/// Which way the passthrough search walks from an eliminated endpoint.
#[derive(Clone, Copy, PartialEq)]
enum SearchDirection {
    Predecessors,
    Successors,
}

/// Rewrites one `(view, context)` pair into a SuperGraph.
pub struct ViewBuilder<'g> {
    graph: &'g DesignGraph,
    view: View,
    context: ViewContext,
    options: BuildOptions,
    cancel: CancelToken,

    node_to_super: BTreeMap<NodeId, SuperNodeId>,
    super_nodes: IndexMap<SuperNodeId, SuperNode>,
    eliminated: BTreeSet<NodeId>,
}

impl<'g> ViewBuilder<'g> {
    pub fn new(graph: &'g DesignGraph, view: View, context: ViewContext) -> Self {
        ViewBuilder {
            graph,
            view,
            context,
            options: BuildOptions::default(),
            cancel: CancelToken::new(),
            node_to_super: BTreeMap::new(),
            super_nodes: IndexMap::new(),
            eliminated: BTreeSet::new(),
        }
    }

    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Runs the three cycles plus the edge rewrite.
    pub fn build(mut self) -> Result<SuperGraph, ViewError> {
        self.checkpoint()?;
        self.cycle_promote();
        self.checkpoint()?;
        self.cycle_merge();
        self.checkpoint()?;
        self.cycle_eliminate();
        self.checkpoint()?;
        let (super_edges, dropped_edges) = self.rewrite_edges();

        debug!(
            view = %self.view,
            context = %self.context,
            supernodes = self.super_nodes.len(),
            superedges = super_edges.len(),
            eliminated = self.eliminated.len(),
            "view built"
        );

        Ok(SuperGraph {
            view: self.view,
            context: self.context,
            super_nodes: self.super_nodes,
            super_edges,
            node_to_super: self.node_to_super,
            eliminated_nodes: self.eliminated,
            dropped_edges,
        })
    }

    fn checkpoint(&self) -> Result<(), ViewError> {
        if self.cancel.is_cancelled() {
            return Err(ViewError::Interrupted);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Cycle 1: promote
    // -----------------------------------------------------------------------

    fn cycle_promote(&mut self) {
        for id in self.graph.node_ids() {
            let Some(node) = self.graph.node(id) else { continue };
            let policy = node_policy(self.context, self.view, node);
            if policy.action != PolicyAction::Promote {
                continue;
            }
            let mut members = BTreeSet::new();
            members.insert(id);
            self.alloc_supernode(policy.super_class, members);
        }
    }

    // -----------------------------------------------------------------------
    // Cycle 2: merge
    // -----------------------------------------------------------------------

    fn cycle_merge(&mut self) {
        // Target super class for every Merge-policy node.
        let mut merge_class: BTreeMap<NodeId, SuperClass> = BTreeMap::new();
        for id in self.graph.node_ids() {
            let Some(node) = self.graph.node(id) else { continue };
            let policy = node_policy(self.context, self.view, node);
            if policy.action == PolicyAction::Merge {
                merge_class.insert(id, policy.super_class);
            }
        }

        // Keyed grouping for clusters and constraint groups, first-seen
        // order preserved for deterministic output.
        let mut groups: IndexMap<(SuperClass, String), Vec<NodeId>> = IndexMap::new();
        let mut cloud_nodes: Vec<NodeId> = Vec::new();

        for id in self.graph.node_ids() {
            let Some(&target) = merge_class.get(&id) else { continue };
            let Some(node) = self.graph.node(id) else { continue };
            match target {
                SuperClass::ModuleCluster => {
                    // One cluster per immediate parent module.
                    let key = node.parent_path().unwrap_or("").to_string();
                    groups
                        .entry((SuperClass::ModuleCluster, key))
                        .or_default()
                        .push(id);
                }
                SuperClass::ConstraintGroup => {
                    let key = node
                        .attributes
                        .get("constraint_group")
                        .and_then(AttrValue::as_text)
                        .or_else(|| node.attributes.get("pblock").and_then(AttrValue::as_text))
                        .unwrap_or(&node.uid)
                        .to_string();
                    groups
                        .entry((SuperClass::ConstraintGroup, key))
                        .or_default()
                        .push(id);
                }
                SuperClass::CombinationalCloud => cloud_nodes.push(id),
                // Policies never merge into these; a stray one becomes a
                // singleton group keyed by its own uid.
                SuperClass::Atomic | SuperClass::Eliminated => {
                    groups
                        .entry((target, node.uid.clone()))
                        .or_default()
                        .push(id);
                }
            }
        }

        for ((super_class, _key), members) in groups {
            self.alloc_supernode(super_class, members.into_iter().collect());
        }

        // Combinational clouds: maximal components over `Combinational`
        // edges whose endpoints are both cloud-merge nodes.
        let cloud_set: BTreeSet<NodeId> = cloud_nodes.iter().copied().collect();
        let mut visited: BTreeSet<NodeId> = BTreeSet::new();
        for &seed in &cloud_nodes {
            if visited.contains(&seed) {
                continue;
            }
            let mut component = BTreeSet::new();
            let mut stack = vec![seed];
            while let Some(current) = stack.pop() {
                if !visited.insert(current) {
                    continue;
                }
                component.insert(current);
                for edge_id in self
                    .graph
                    .out_edges(current)
                    .into_iter()
                    .chain(self.graph.in_edges(current))
                {
                    let Some(edge) = self.graph.edge(edge_id) else { continue };
                    if edge.flow_type != netweave_core::FlowType::Combinational {
                        continue;
                    }
                    let Some((src, dst)) = self.graph.endpoints(edge_id) else {
                        continue;
                    };
                    for neighbor in [src, dst] {
                        if cloud_set.contains(&neighbor) && !visited.contains(&neighbor) {
                            stack.push(neighbor);
                        }
                    }
                }
            }
            self.alloc_supernode(SuperClass::CombinationalCloud, component);
        }
    }

    // -----------------------------------------------------------------------
    // Cycle 3: eliminate
    // -----------------------------------------------------------------------

    fn cycle_eliminate(&mut self) {
        for id in self.graph.node_ids() {
            if self.node_to_super.contains_key(&id) {
                continue;
            }
            #[cfg(debug_assertions)]
            {
                let node = self.graph.node(id).expect("iterated node exists");
                let policy = node_policy(self.context, self.view, node);
                debug_assert_eq!(
                    policy.action,
                    PolicyAction::Eliminate,
                    "unassigned node {} must carry an Eliminate policy",
                    node.uid
                );
            }
            self.eliminated.insert(id);
        }
    }

    // -----------------------------------------------------------------------
    // Edge rewrite
    // -----------------------------------------------------------------------

    fn rewrite_edges(&mut self) -> (IndexMap<SuperEdgeId, SuperEdge>, BTreeSet<EdgeId>) {
        let mut by_pair: IndexMap<(SuperNodeId, SuperNodeId), SuperEdge> = IndexMap::new();
        let mut dropped: BTreeSet<EdgeId> = BTreeSet::new();

        for edge_id in self.graph.edge_ids() {
            let Some(edge) = self.graph.edge(edge_id) else { continue };
            let Some((u, v)) = self.graph.endpoints(edge_id) else {
                continue;
            };

            let src_resolved = self.resolve_visible(u, edge.relation_type, SearchDirection::Predecessors);
            let dst_resolved = self.resolve_visible(v, edge.relation_type, SearchDirection::Successors);
            let (Some(src), Some(dst)) = (src_resolved, dst_resolved) else {
                dropped.insert(edge_id);
                continue;
            };

            let src_super = self.node_to_super[&src].clone();
            let dst_super = self.node_to_super[&dst].clone();

            if src_super == dst_super {
                // Internal edge: recorded on the SuperNode, dropped from
                // the SuperEdge partition as a self-loop.
                if let Some(supernode) = self.super_nodes.get_mut(&src_super) {
                    supernode.member_edges.insert(edge_id);
                }
                dropped.insert(edge_id);
                continue;
            }

            let pair = (src_super.clone(), dst_super.clone());
            let superedge = by_pair.entry(pair).or_insert_with(|| SuperEdge {
                id: super_edge_id(&src_super, &dst_super),
                source: src_super.clone(),
                target: dst_super.clone(),
                member_edges: BTreeSet::new(),
                member_nodes: BTreeSet::new(),
                relation_type: edge.relation_type,
                relation_histogram: BTreeMap::new(),
                flow_histogram: BTreeMap::new(),
                analysis: Default::default(),
            });
            superedge.member_edges.insert(edge_id);
            superedge.member_nodes.insert(src);
            superedge.member_nodes.insert(dst);
            *superedge
                .relation_histogram
                .entry(edge.relation_type)
                .or_insert(0) += 1;
            *superedge.flow_histogram.entry(edge.flow_type).or_insert(0) += 1;
        }

        // Aggregate relation type: majority, canonical order breaking ties.
        let mut super_edges = IndexMap::with_capacity(by_pair.len());
        for (_, mut superedge) in by_pair {
            superedge.relation_type = majority_relation(&superedge.relation_histogram);
            super_edges.insert(superedge.id.clone(), superedge);
        }
        (super_edges, dropped)
    }

    /// Maps an endpoint to a visible (non-eliminated) node, walking
    /// through eliminated nodes along same-relation edges when needed.
    fn resolve_visible(
        &self,
        start: NodeId,
        relation: RelationType,
        direction: SearchDirection,
    ) -> Option<NodeId> {
        if !self.eliminated.contains(&start) {
            return Some(start);
        }

        let mut visited: HashMap<NodeId, usize> = HashMap::new();
        let mut queue = VecDeque::new();
        visited.insert(start, 0);
        queue.push_back((start, 0usize));

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= self.options.passthrough_depth {
                continue;
            }
            let edges = match direction {
                SearchDirection::Predecessors => self.graph.in_edges(current),
                SearchDirection::Successors => self.graph.out_edges(current),
            };
            for edge_id in edges {
                let Some(edge) = self.graph.edge(edge_id) else { continue };
                if edge.relation_type != relation {
                    continue;
                }
                let Some((src, dst)) = self.graph.endpoints(edge_id) else {
                    continue;
                };
                let next = match direction {
                    SearchDirection::Predecessors => src,
                    SearchDirection::Successors => dst,
                };
                if visited.contains_key(&next) {
                    continue;
                }
                if !self.eliminated.contains(&next) {
                    return Some(next);
                }
                visited.insert(next, depth + 1);
                queue.push_back((next, depth + 1));
            }
        }
        None
    }

    // -----------------------------------------------------------------------
    // SuperNode allocation
    // -----------------------------------------------------------------------

    fn alloc_supernode(&mut self, super_class: SuperClass, members: BTreeSet<NodeId>) {
        if members.is_empty() {
            return;
        }
        let member_uids: BTreeSet<&str> = members
            .iter()
            .filter_map(|&id| self.graph.node(id).map(|n| n.uid.as_str()))
            .collect();
        let id = super_node_id(self.view, self.context, super_class, &member_uids);

        // Representative for the debug label: lexicographically first uid.
        let canonical_name = member_uids
            .iter()
            .next()
            .map(|uid| format!("{uid} : {super_class}"))
            .unwrap_or_else(|| super_class.to_string());

        let mut aggregated_attrs = IndexMap::new();
        aggregated_attrs.insert(
            "member_count".to_string(),
            AttrValue::Int(members.len() as i64),
        );

        for &member in &members {
            self.node_to_super.insert(member, id.clone());
        }
        self.super_nodes.insert(
            id.clone(),
            SuperNode {
                id,
                super_class,
                member_nodes: members,
                member_edges: BTreeSet::new(),
                aggregated_attrs,
                canonical_name,
                analysis: Default::default(),
            },
        );
    }
}

/// Majority relation type; ties go to the canonical order
/// (`Data` strongest, `PhysicalMapping` weakest).
fn majority_relation(histogram: &BTreeMap<RelationType, usize>) -> RelationType {
    histogram
        .iter()
        .max_by(|(rel_a, count_a), (rel_b, count_b)| {
            count_a
                .cmp(count_b)
                .then_with(|| rel_b.canonical_rank().cmp(&rel_a.canonical_rank()))
        })
        .map(|(&relation, _)| relation)
        .unwrap_or(RelationType::Data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn majority_prefers_count_then_canonical_order() {
        let mut histogram = BTreeMap::new();
        histogram.insert(RelationType::Clock, 3);
        histogram.insert(RelationType::Data, 1);
        assert_eq!(majority_relation(&histogram), RelationType::Clock);

        let mut tied = BTreeMap::new();
        tied.insert(RelationType::Clock, 2);
        tied.insert(RelationType::Data, 2);
        assert_eq!(majority_relation(&tied), RelationType::Data);
    }
}
