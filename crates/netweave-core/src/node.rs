//! Node records of the design graph.
//!
//! A [`Node`] is one design entity: an RTL module instance, a synthesis
//! primitive, an I/O port, a physical placement object, or an abstract
//! control entity. `hier_path` expresses ownership only; it never carries
//! signal connectivity (edges do).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::{AttrValue, EntityClass};

/// A design entity in the fused graph.
///
/// `uid` is the ingestor-assigned stable identifier and is unique across
/// the store. Timing scalars and `clock_domain` are written only through
/// the updater.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub uid: String,
    pub entity_class: EntityClass,
    /// `/`-joined ownership path. Every proper prefix names another node.
    pub hier_path: String,
    pub local_name: String,
    /// Human-readable debug label. Not stable across views or rebuilds;
    /// never a persistent identifier or cache key.
    pub canonical_name: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub parameters: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, AttrValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock_signal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_signal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock_domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_time: Option<f64>,
}

impl Node {
    /// The immediate hierarchy parent path, or `None` for root-level nodes.
    pub fn parent_path(&self) -> Option<&str> {
        self.hier_path.rsplit_once('/').map(|(parent, _)| parent)
    }

    /// True when at least one of the timing scalars is populated.
    pub fn has_timing(&self) -> bool {
        self.slack.is_some() || self.arrival_time.is_some() || self.required_time.is_some()
    }
}

/// Derives the debug label for a node from its class and names.
pub fn node_canonical_name(class: EntityClass, hier_path: &str, local_name: &str) -> String {
    let suffix = match class {
        EntityClass::FlipFlop => format!("reg_{local_name}"),
        EntityClass::Mux => "mux".to_string(),
        EntityClass::Lut => "comb".to_string(),
        EntityClass::Bram => "bram".to_string(),
        EntityClass::Dsp => "dsp".to_string(),
        EntityClass::IoPort => format!("port_{local_name}"),
        EntityClass::ModuleInstance
        | EntityClass::RtlBlock
        | EntityClass::PackagePin
        | EntityClass::Pblock
        | EntityClass::BoardConnector
        | EntityClass::ClockDomain
        | EntityClass::Fsm => local_name.to_string(),
    };
    format!("{hier_path}.{suffix}")
}
