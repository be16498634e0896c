//! Target-pattern resolution against the node table.
//!
//! Constraint targets use the shell-wildcard language from
//! `netweave_core::pattern`, matched against a node's `hier_path`,
//! `local_name`, and `canonical_name`, in that order; a match against any
//! one suffices.
//!
//! Projection may touch the full node table per pattern, so a
//! [`PatternIndex`] is built once per run: wildcard-free patterns resolve
//! through exact-name buckets instead of a scan.

use std::collections::HashMap;

use netweave_core::pattern::{is_literal, wildcard_match};
use netweave_core::{DesignGraph, NodeId};

/// Exact-name buckets over the node table, keyed lowercase.
pub struct PatternIndex {
    by_name: HashMap<String, Vec<NodeId>>,
}

impl PatternIndex {
    /// Indexes `hier_path`, `local_name`, and `canonical_name` of every node.
    pub fn build(graph: &DesignGraph) -> Self {
        let mut by_name: HashMap<String, Vec<NodeId>> = HashMap::new();
        for id in graph.node_ids() {
            let Some(node) = graph.node(id) else { continue };
            for name in [
                node.hier_path.as_str(),
                node.local_name.as_str(),
                node.canonical_name.as_str(),
            ] {
                let bucket = by_name.entry(name.to_lowercase()).or_default();
                if bucket.last() != Some(&id) {
                    bucket.push(id);
                }
            }
        }
        PatternIndex { by_name }
    }

    /// All nodes matching the pattern. Ambiguity is not an error: every
    /// match is returned.
    pub fn resolve(&self, graph: &DesignGraph, pattern: &str) -> Vec<NodeId> {
        if is_literal(pattern) {
            return self
                .by_name
                .get(&pattern.to_lowercase())
                .cloned()
                .unwrap_or_default();
        }
        graph
            .node_ids()
            .filter(|&id| {
                graph.node(id).is_some_and(|node| {
                    wildcard_match(pattern, &node.hier_path)
                        || wildcard_match(pattern, &node.local_name)
                        || wildcard_match(pattern, &node.canonical_name)
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netweave_core::{EntityClass, NodeSpec};

    #[test]
    fn index_resolves_literals_without_scanning() {
        let mut graph = DesignGraph::new();
        graph
            .add_node(NodeSpec::new("clk", EntityClass::IoPort))
            .unwrap();
        graph
            .add_node(NodeSpec::new("rst", EntityClass::IoPort))
            .unwrap();

        let index = PatternIndex::build(&graph);
        let hits = index.resolve(&graph, "clk");
        assert_eq!(hits.len(), 1);
        assert_eq!(graph.node(hits[0]).unwrap().uid, "clk");
        assert!(index.resolve(&graph, "nope").is_empty());
    }

    #[test]
    fn literal_resolution_is_case_insensitive() {
        let mut graph = DesignGraph::new();
        graph
            .add_node(NodeSpec::new("CLK", EntityClass::IoPort))
            .unwrap();
        let index = PatternIndex::build(&graph);
        assert_eq!(index.resolve(&graph, "clk").len(), 1);
    }

    #[test]
    fn index_falls_back_to_scan_for_wildcards() {
        let mut graph = DesignGraph::new();
        graph
            .add_node(NodeSpec::new("top", EntityClass::ModuleInstance))
            .unwrap();
        graph
            .add_node(NodeSpec::new("top/pc_reg", EntityClass::FlipFlop))
            .unwrap();
        graph
            .add_node(NodeSpec::new("top/sp_reg", EntityClass::FlipFlop))
            .unwrap();
        graph
            .add_node(NodeSpec::new("top/lut0", EntityClass::Lut))
            .unwrap();

        let index = PatternIndex::build(&graph);
        let hits = index.resolve(&graph, "*_reg");
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn canonical_name_is_a_match_candidate() {
        let mut graph = DesignGraph::new();
        graph
            .add_node(NodeSpec::new("din", EntityClass::IoPort))
            .unwrap();
        let index = PatternIndex::build(&graph);
        // Canonical name of an IoPort is `<path>.port_<name>`.
        assert_eq!(index.resolve(&graph, "din.port_din").len(), 1);
    }
}
