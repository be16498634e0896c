//! Composable search filters.
//!
//! A query is a conjunction: every populated field must match. Builder
//! methods keep call sites terse; an empty query matches everything.

use netweave_core::pattern::wildcard_match;
use netweave_core::{Edge, EntityClass, FlowType, Node, NodeId, RelationType};

/// Node search filter; fields compose by intersection.
#[derive(Default)]
pub struct NodeQuery {
    pub entity_class: Option<EntityClass>,
    /// Wildcard pattern matched against hier path, local name, and
    /// canonical name; any one match suffices.
    pub name_pattern: Option<String>,
    pub hier_prefix: Option<String>,
    pub clock_domain: Option<String>,
    /// Inclusive `(min, max)` slack window; nodes without slack never match.
    pub slack_range: Option<(f64, f64)>,
    pub predicate: Option<Box<dyn Fn(&Node) -> bool>>,
}

impl NodeQuery {
    pub fn new() -> Self {
        NodeQuery::default()
    }

    pub fn entity_class(mut self, class: EntityClass) -> Self {
        self.entity_class = Some(class);
        self
    }

    pub fn name_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.name_pattern = Some(pattern.into());
        self
    }

    pub fn hier_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.hier_prefix = Some(prefix.into());
        self
    }

    pub fn clock_domain(mut self, domain: impl Into<String>) -> Self {
        self.clock_domain = Some(domain.into());
        self
    }

    pub fn slack_range(mut self, min: f64, max: f64) -> Self {
        self.slack_range = Some((min, max));
        self
    }

    pub fn predicate(mut self, predicate: impl Fn(&Node) -> bool + 'static) -> Self {
        self.predicate = Some(Box::new(predicate));
        self
    }

    /// Whether a node passes every populated filter.
    pub fn matches(&self, node: &Node) -> bool {
        if let Some(class) = self.entity_class {
            if node.entity_class != class {
                return false;
            }
        }
        if let Some(pattern) = &self.name_pattern {
            let hit = wildcard_match(pattern, &node.hier_path)
                || wildcard_match(pattern, &node.local_name)
                || wildcard_match(pattern, &node.canonical_name);
            if !hit {
                return false;
            }
        }
        if let Some(prefix) = &self.hier_prefix {
            let under = node.hier_path == *prefix
                || node
                    .hier_path
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with('/'));
            if !under {
                return false;
            }
        }
        if let Some(domain) = &self.clock_domain {
            if node.clock_domain.as_deref() != Some(domain.as_str()) {
                return false;
            }
        }
        if let Some((min, max)) = self.slack_range {
            match node.slack {
                Some(slack) if slack >= min && slack <= max => {}
                _ => return false,
            }
        }
        if let Some(predicate) = &self.predicate {
            if !predicate(node) {
                return false;
            }
        }
        true
    }
}

/// Edge search filter, symmetric to [`NodeQuery`].
#[derive(Default)]
pub struct EdgeQuery {
    pub relation_type: Option<RelationType>,
    pub flow_type: Option<FlowType>,
    pub source: Option<NodeId>,
    pub target: Option<NodeId>,
    pub signal_pattern: Option<String>,
    pub predicate: Option<Box<dyn Fn(&Edge) -> bool>>,
}

impl EdgeQuery {
    pub fn new() -> Self {
        EdgeQuery::default()
    }

    pub fn relation_type(mut self, relation: RelationType) -> Self {
        self.relation_type = Some(relation);
        self
    }

    pub fn flow_type(mut self, flow: FlowType) -> Self {
        self.flow_type = Some(flow);
        self
    }

    pub fn source(mut self, source: NodeId) -> Self {
        self.source = Some(source);
        self
    }

    pub fn target(mut self, target: NodeId) -> Self {
        self.target = Some(target);
        self
    }

    pub fn signal_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.signal_pattern = Some(pattern.into());
        self
    }

    pub fn predicate(mut self, predicate: impl Fn(&Edge) -> bool + 'static) -> Self {
        self.predicate = Some(Box::new(predicate));
        self
    }

    /// Whether an edge (with its endpoints) passes every populated filter.
    pub fn matches(&self, edge: &Edge, source: NodeId, target: NodeId) -> bool {
        if let Some(relation) = self.relation_type {
            if edge.relation_type != relation {
                return false;
            }
        }
        if let Some(flow) = self.flow_type {
            if edge.flow_type != flow {
                return false;
            }
        }
        if let Some(expected) = self.source {
            if source != expected {
                return false;
            }
        }
        if let Some(expected) = self.target {
            if target != expected {
                return false;
            }
        }
        if let Some(pattern) = &self.signal_pattern {
            if !wildcard_match(pattern, &edge.signal_name) {
                return false;
            }
        }
        if let Some(predicate) = &self.predicate {
            if !predicate(edge) {
                return false;
            }
        }
        true
    }
}
