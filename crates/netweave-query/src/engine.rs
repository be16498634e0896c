//! The read-only query engine.
//!
//! Runs against a frozen `(graph, supergraph)` pair: filtered search,
//! simple-path enumeration, shortest paths by hops or delay, fan-out and
//! fan-in neighborhoods, critical sets, and SuperGraph lookups. Path
//! enumeration checks the cancellation token once per BFS layer.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use netweave_core::{
    CancelToken, DesignGraph, Edge, EdgeId, EntityClass, NodeId,
};
use netweave_view::{SuperClass, SuperGraph, SuperNodeId};

use crate::error::QueryError;
use crate::filter::{EdgeQuery, NodeQuery};

/// One simple path between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathResult {
    pub nodes: Vec<NodeId>,
    pub edges: Vec<EdgeId>,
    /// Sum of member delays; `None` when no edge on the path carries one.
    pub total_delay: Option<f64>,
    /// Worst node slack along the path.
    pub min_slack: Option<f64>,
}

impl PathResult {
    pub fn hops(&self) -> usize {
        self.edges.len()
    }
}

/// Fan-out/fan-in neighborhood of one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanResult {
    pub node: NodeId,
    pub count: usize,
    pub nodes: Vec<NodeId>,
    /// Largest edge delay observed while expanding.
    pub max_delay: Option<f64>,
}

/// Shortest-path weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathWeight {
    Hops,
    /// Edge delay, missing delays counting as zero.
    Delay,
}

/// Whole-graph statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStatistics {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub nodes_by_class: BTreeMap<EntityClass, usize>,
    pub worst_slack: Option<f64>,
    pub timing_violations: usize,
    pub max_fanout: usize,
    pub supernodes: Option<usize>,
    pub superedges: Option<usize>,
}

/// Read-only engine over a frozen graph and optional SuperGraph.
pub struct QueryEngine<'g> {
    graph: &'g DesignGraph,
    supergraph: Option<&'g SuperGraph>,
}

impl<'g> QueryEngine<'g> {
    pub fn new(graph: &'g DesignGraph) -> Self {
        QueryEngine {
            graph,
            supergraph: None,
        }
    }

    pub fn with_supergraph(graph: &'g DesignGraph, supergraph: &'g SuperGraph) -> Self {
        QueryEngine {
            graph,
            supergraph: Some(supergraph),
        }
    }

    // -----------------------------------------------------------------------
    // Filtered search
    // -----------------------------------------------------------------------

    /// Nodes passing every populated filter, in insertion order.
    pub fn find_nodes(&self, query: &NodeQuery) -> Vec<NodeId> {
        // Narrow through an index when a cheap one applies.
        if let Some(prefix) = &query.hier_prefix {
            return self
                .graph
                .nodes_under(prefix)
                .iter()
                .copied()
                .filter(|&id| self.graph.node(id).is_some_and(|n| query.matches(n)))
                .collect();
        }
        if let Some(class) = query.entity_class {
            return self
                .graph
                .nodes_of_class(class)
                .iter()
                .copied()
                .filter(|&id| self.graph.node(id).is_some_and(|n| query.matches(n)))
                .collect();
        }
        self.graph
            .node_ids()
            .filter(|&id| self.graph.node(id).is_some_and(|n| query.matches(n)))
            .collect()
    }

    /// Edges passing every populated filter, in insertion order.
    pub fn find_edges(&self, query: &EdgeQuery) -> Vec<EdgeId> {
        let candidates: Vec<EdgeId> = match query.relation_type {
            Some(relation) => self.graph.edges_of_relation(relation).to_vec(),
            None => self.graph.edge_ids().collect(),
        };
        candidates
            .into_iter()
            .filter(|&id| {
                let Some(edge) = self.graph.edge(id) else {
                    return false;
                };
                let Some((src, dst)) = self.graph.endpoints(id) else {
                    return false;
                };
                query.matches(edge, src, dst)
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Path search
    // -----------------------------------------------------------------------

    /// Enumerates all simple paths from `src` to `dst` with at most
    /// `max_depth` edges. `follow` restricts which edges are traversed.
    pub fn find_paths(
        &self,
        src: NodeId,
        dst: NodeId,
        max_depth: usize,
        follow: Option<&dyn Fn(&Edge) -> bool>,
        cancel: &CancelToken,
    ) -> Result<Vec<PathResult>, QueryError> {
        if self.graph.node(src).is_none() || self.graph.node(dst).is_none() {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        let mut queue: VecDeque<(NodeId, Vec<NodeId>, Vec<EdgeId>)> = VecDeque::new();
        queue.push_back((src, vec![src], Vec::new()));
        let mut layer_depth = 0usize;

        while let Some((current, node_path, edge_path)) = queue.pop_front() {
            // One cancellation check per BFS layer.
            if edge_path.len() > layer_depth {
                layer_depth = edge_path.len();
                if cancel.is_cancelled() {
                    return Err(QueryError::Interrupted);
                }
            }

            if current == dst && !edge_path.is_empty() {
                paths.push(self.finish_path(node_path, edge_path));
                continue;
            }
            if edge_path.len() >= max_depth {
                continue;
            }

            for edge_id in self.graph.out_edges(current) {
                let Some(edge) = self.graph.edge(edge_id) else { continue };
                if let Some(follow) = follow {
                    if !follow(edge) {
                        continue;
                    }
                }
                let Some((_, next)) = self.graph.endpoints(edge_id) else {
                    continue;
                };
                // Simple paths only: each node (hence each edge) at most
                // once per path.
                if node_path.contains(&next) {
                    continue;
                }
                let mut nodes = node_path.clone();
                nodes.push(next);
                let mut edges = edge_path.clone();
                edges.push(edge_id);
                queue.push_back((next, nodes, edges));
            }
        }

        Ok(paths)
    }

    /// Cheapest path under the chosen weight, or `None` when disconnected.
    pub fn shortest_path(
        &self,
        src: NodeId,
        dst: NodeId,
        weight: PathWeight,
    ) -> Option<PathResult> {
        if self.graph.node(src).is_none() || self.graph.node(dst).is_none() {
            return None;
        }

        // Dijkstra over non-negative weights; hops is delay with every
        // edge costing one.
        let mut dist: HashMap<NodeId, f64> = HashMap::new();
        let mut back: HashMap<NodeId, (NodeId, EdgeId)> = HashMap::new();
        let mut heap: BinaryHeap<(Reverse<OrderedCost>, NodeId)> = BinaryHeap::new();

        dist.insert(src, 0.0);
        heap.push((Reverse(OrderedCost(0.0)), src));

        while let Some((Reverse(OrderedCost(cost)), current)) = heap.pop() {
            if current == dst {
                break;
            }
            if dist.get(&current).copied().unwrap_or(f64::INFINITY) < cost {
                continue;
            }
            for edge_id in self.graph.out_edges(current) {
                let Some(edge) = self.graph.edge(edge_id) else { continue };
                let Some((_, next)) = self.graph.endpoints(edge_id) else {
                    continue;
                };
                let step = match weight {
                    PathWeight::Hops => 1.0,
                    PathWeight::Delay => edge.delay.unwrap_or(0.0).max(0.0),
                };
                let candidate = cost + step;
                if candidate < dist.get(&next).copied().unwrap_or(f64::INFINITY) {
                    dist.insert(next, candidate);
                    back.insert(next, (current, edge_id));
                    heap.push((Reverse(OrderedCost(candidate)), next));
                }
            }
        }

        if !back.contains_key(&dst) {
            return None;
        }

        // Walk the predecessor chain back to the source.
        let mut nodes = vec![dst];
        let mut edges = Vec::new();
        let mut current = dst;
        while current != src {
            let (previous, edge_id) = back.get(&current).copied()?;
            nodes.push(previous);
            edges.push(edge_id);
            current = previous;
        }
        nodes.reverse();
        edges.reverse();
        Some(self.finish_path(nodes, edges))
    }

    fn finish_path(&self, nodes: Vec<NodeId>, edges: Vec<EdgeId>) -> PathResult {
        let mut total_delay = None;
        for &edge_id in &edges {
            if let Some(delay) = self.graph.edge(edge_id).and_then(|e| e.delay) {
                total_delay = Some(total_delay.unwrap_or(0.0) + delay);
            }
        }
        let min_slack = nodes
            .iter()
            .filter_map(|&id| self.graph.node(id).and_then(|n| n.slack))
            .fold(None, |acc: Option<f64>, s| Some(acc.map_or(s, |a| a.min(s))));
        PathResult {
            nodes,
            edges,
            total_delay,
            min_slack,
        }
    }

    // -----------------------------------------------------------------------
    // Neighborhoods
    // -----------------------------------------------------------------------

    /// Nodes reachable from `src` within `depth` hops, excluding `src`.
    pub fn fanout(&self, src: NodeId, depth: usize) -> FanResult {
        self.expand(src, depth, Direction::Out)
    }

    /// Nodes reaching `dst` within `depth` hops, excluding `dst`.
    pub fn fanin(&self, dst: NodeId, depth: usize) -> FanResult {
        self.expand(dst, depth, Direction::In)
    }

    fn expand(&self, start: NodeId, depth: usize, direction: Direction) -> FanResult {
        let mut reached = Vec::new();
        let mut visited = HashSet::new();
        let mut max_delay: Option<f64> = None;
        let mut queue = VecDeque::new();
        visited.insert(start);
        queue.push_back((start, 0usize));

        while let Some((current, hops)) = queue.pop_front() {
            if hops >= depth {
                continue;
            }
            let edges = match direction {
                Direction::Out => self.graph.out_edges(current),
                Direction::In => self.graph.in_edges(current),
            };
            for edge_id in edges {
                let Some(edge) = self.graph.edge(edge_id) else { continue };
                if let Some(delay) = edge.delay {
                    max_delay = Some(max_delay.map_or(delay, |m| m.max(delay)));
                }
                let Some((src, dst)) = self.graph.endpoints(edge_id) else {
                    continue;
                };
                let next = match direction {
                    Direction::Out => dst,
                    Direction::In => src,
                };
                if visited.insert(next) {
                    reached.push(next);
                    queue.push_back((next, hops + 1));
                }
            }
        }

        FanResult {
            node: start,
            count: reached.len(),
            nodes: reached,
            max_delay,
        }
    }

    // -----------------------------------------------------------------------
    // Critical sets
    // -----------------------------------------------------------------------

    /// Nodes with slack at or below the threshold, worst first.
    pub fn critical_nodes(&self, threshold: f64, top_n: Option<usize>) -> Vec<(NodeId, f64)> {
        let mut critical: Vec<(NodeId, f64)> = self
            .graph
            .node_ids()
            .filter_map(|id| {
                let slack = self.graph.node(id)?.slack?;
                (slack <= threshold).then_some((id, slack))
            })
            .collect();
        critical.sort_by(|a, b| a.1.total_cmp(&b.1));
        if let Some(n) = top_n {
            critical.truncate(n);
        }
        critical
    }

    /// Edges with delay at or above the threshold, slowest first.
    pub fn critical_edges(
        &self,
        delay_threshold: Option<f64>,
        top_n: Option<usize>,
    ) -> Vec<(EdgeId, f64)> {
        let mut critical: Vec<(EdgeId, f64)> = self
            .graph
            .edge_ids()
            .filter_map(|id| {
                let delay = self.graph.edge(id)?.delay?;
                match delay_threshold {
                    Some(threshold) if delay < threshold => None,
                    _ => Some((id, delay)),
                }
            })
            .collect();
        critical.sort_by(|a, b| b.1.total_cmp(&a.1));
        if let Some(n) = top_n {
            critical.truncate(n);
        }
        critical
    }

    // -----------------------------------------------------------------------
    // Statistics
    // -----------------------------------------------------------------------

    pub fn statistics(&self) -> GraphStatistics {
        let mut nodes_by_class = BTreeMap::new();
        let mut worst_slack: Option<f64> = None;
        let mut violations = 0usize;
        let mut max_fanout = 0usize;

        for id in self.graph.node_ids() {
            let Some(node) = self.graph.node(id) else { continue };
            *nodes_by_class.entry(node.entity_class).or_insert(0) += 1;
            if let Some(slack) = node.slack {
                worst_slack = Some(worst_slack.map_or(slack, |w| w.min(slack)));
                if slack < 0.0 {
                    violations += 1;
                }
            }
            max_fanout = max_fanout.max(self.graph.out_degree(id));
        }

        GraphStatistics {
            total_nodes: self.graph.node_count(),
            total_edges: self.graph.edge_count(),
            nodes_by_class,
            worst_slack,
            timing_violations: violations,
            max_fanout,
            supernodes: self.supergraph.map(SuperGraph::supernode_count),
            superedges: self.supergraph.map(SuperGraph::superedge_count),
        }
    }

    // -----------------------------------------------------------------------
    // SuperGraph lookups
    // -----------------------------------------------------------------------

    /// SuperNodes filtered by class and timing-bundle presence.
    pub fn find_supernodes(
        &self,
        super_class: Option<SuperClass>,
        has_timing: bool,
    ) -> Vec<SuperNodeId> {
        let Some(supergraph) = self.supergraph else {
            return Vec::new();
        };
        supergraph
            .super_nodes
            .values()
            .filter(|sn| super_class.map_or(true, |class| sn.super_class == class))
            .filter(|sn| !has_timing || sn.analysis.timing_node().is_some())
            .map(|sn| sn.id.clone())
            .collect()
    }

    /// The SuperNode owning a base node.
    pub fn supernode_of(&self, node: NodeId) -> Option<&SuperNodeId> {
        self.supergraph?.node_to_super.get(&node)
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Out,
    In,
}

/// Total-ordered f64 for the Dijkstra heap.
#[derive(Debug, Clone, Copy, PartialEq)]
struct OrderedCost(f64);

impl Eq for OrderedCost {}

impl PartialOrd for OrderedCost {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedCost {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}
