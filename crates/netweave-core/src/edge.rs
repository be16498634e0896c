//! Edge records of the design graph.
//!
//! An [`Edge`] is a directed, typed relation between two nodes. Endpoints
//! live in the surrounding graph (petgraph owns the adjacency); the record
//! itself carries the signal identity, relation/flow typing, and the
//! timing fields refined by later stages.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::{AttrValue, BitRange, FlowType, RelationType};

/// A directed relation between two design entities.
///
/// `timing_exception`, `clock_domain`, `delay`, and `slack` are written
/// only through the updater.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub uid: String,
    pub relation_type: RelationType,
    pub flow_type: FlowType,
    pub signal_name: String,
    /// Debug label (`src -> dst : signal`). Not a persistent identifier.
    pub canonical_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bit_range: Option<BitRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fanout_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock_domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing_exception: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack: Option<f64>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, AttrValue>,
}

impl Edge {
    /// The signal label including a bus slice when present.
    pub fn signal_label(&self) -> String {
        match self.bit_range {
            Some(range) => format!("{}{}", self.signal_name, range),
            None => self.signal_name.clone(),
        }
    }
}

/// Derives the debug label for an edge from its endpoint labels and signal.
pub fn edge_canonical_name(src_canonical: &str, dst_canonical: &str, signal_label: &str) -> String {
    format!("{src_canonical} -> {dst_canonical} : {signal_label}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_edge(bit_range: Option<BitRange>) -> Edge {
        Edge {
            uid: "e0".into(),
            relation_type: RelationType::Data,
            flow_type: FlowType::Combinational,
            signal_name: "data_bus".into(),
            canonical_name: String::new(),
            bit_range,
            net_id: None,
            driver_type: None,
            fanout_count: None,
            clock_domain: None,
            timing_exception: None,
            delay: None,
            slack: None,
            attributes: IndexMap::new(),
        }
    }

    #[test]
    fn signal_label_without_slice() {
        assert_eq!(sample_edge(None).signal_label(), "data_bus");
    }

    #[test]
    fn signal_label_with_slice() {
        let edge = sample_edge(Some(BitRange { msb: 7, lsb: 0 }));
        assert_eq!(edge.signal_label(), "data_bus[7:0]");
    }

    #[test]
    fn canonical_name_format() {
        assert_eq!(
            edge_canonical_name("a.reg_a", "b.comb", "q[3:0]"),
            "a.reg_a -> b.comb : q[3:0]"
        );
    }
}
