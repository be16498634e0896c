//! Ingest wire types.
//!
//! External parsers (netlist, constraint, timing-report, board adapters)
//! never touch the store directly; they submit [`NodeSpec`] / [`EdgeSpec`]
//! records for entity creation and [`FieldUpdate`] records for field
//! refinement, all of which flow through the updater.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::field::{FieldId, FieldValue};
use crate::model::{AttrValue, BitRange, EntityClass, FlowType, RelationType, Source, Stage};
use crate::provenance::Origin;

/// Creation payload for a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub uid: String,
    pub entity_class: EntityClass,
    pub hier_path: String,
    pub local_name: String,
    /// Derived from class and names when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_name: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub parameters: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, AttrValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock_signal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_signal: Option<String>,
}

impl NodeSpec {
    /// Spec with `uid == hier_path` and the local name taken from the last
    /// path segment, the common case for netlist ingestors.
    pub fn new(hier_path: impl Into<String>, entity_class: EntityClass) -> Self {
        let hier_path = hier_path.into();
        let local_name = hier_path
            .rsplit('/')
            .next()
            .unwrap_or(hier_path.as_str())
            .to_string();
        NodeSpec {
            uid: hier_path.clone(),
            entity_class,
            hier_path,
            local_name,
            canonical_name: None,
            parameters: IndexMap::new(),
            attributes: IndexMap::new(),
            clock_signal: None,
            reset_signal: None,
        }
    }

    pub fn with_local_name(mut self, local_name: impl Into<String>) -> Self {
        self.local_name = local_name.into();
        self
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: AttrValue) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn with_clock_signal(mut self, signal: impl Into<String>) -> Self {
        self.clock_signal = Some(signal.into());
        self
    }
}

/// Creation payload for an edge. Endpoints are node uids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSpec {
    pub uid: String,
    pub source: String,
    pub target: String,
    pub relation_type: RelationType,
    pub flow_type: FlowType,
    pub signal_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bit_range: Option<BitRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fanout_count: Option<u32>,
}

impl EdgeSpec {
    pub fn new(
        uid: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        relation_type: RelationType,
        flow_type: FlowType,
        signal_name: impl Into<String>,
    ) -> Self {
        EdgeSpec {
            uid: uid.into(),
            source: source.into(),
            target: target.into(),
            relation_type,
            flow_type,
            signal_name: signal_name.into(),
            canonical_name: None,
            bit_range: None,
            net_id: None,
            driver_type: None,
            fanout_count: None,
        }
    }

    pub fn with_net_id(mut self, net_id: impl Into<String>) -> Self {
        self.net_id = Some(net_id.into());
        self
    }

    pub fn with_bit_range(mut self, msb: u32, lsb: u32) -> Self {
        self.bit_range = Some(BitRange { msb, lsb });
        self
    }
}

/// Uid-based reference to a node or edge, as carried on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityRef {
    Node(String),
    Edge(String),
}

impl EntityRef {
    pub fn uid(&self) -> &str {
        match self {
            EntityRef::Node(uid) | EntityRef::Edge(uid) => uid,
        }
    }
}

/// One field refinement submitted by an ingestor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldUpdate {
    pub entity: EntityRef,
    pub field: FieldId,
    pub value: FieldValue,
    pub source: Source,
    pub stage: Stage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,
}

/// One analyzed path from a timing report, already resolved to uids by
/// the report adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingPathRecord {
    pub startpoint: String,
    pub endpoint: String,
    /// Node uids along the path, startpoint first.
    pub nodes: Vec<String>,
    /// Edge uids along the path.
    pub edges: Vec<String>,
    pub slack: f64,
    pub arrival: f64,
    pub required: f64,
    /// Per-edge delay contributions, keyed by edge uid.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub delay_per_edge: IndexMap<String, f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_spec_derives_local_name() {
        let spec = NodeSpec::new("top/cpu/pc_reg", EntityClass::FlipFlop);
        assert_eq!(spec.uid, "top/cpu/pc_reg");
        assert_eq!(spec.local_name, "pc_reg");
    }

    #[test]
    fn root_level_spec_local_name_is_path() {
        let spec = NodeSpec::new("clk", EntityClass::IoPort);
        assert_eq!(spec.local_name, "clk");
    }

    #[test]
    fn field_update_serde_roundtrip() {
        let update = FieldUpdate {
            entity: EntityRef::Node("top/cpu/pc_reg".into()),
            field: FieldId::Node(crate::field::NodeField::ClockDomain),
            value: FieldValue::Text("sys_clk".into()),
            source: Source::Declared,
            stage: Stage::Constraints,
            origin: Some(Origin::new("design.sdc", Some(12))),
        };
        let json = serde_json::to_string(&update).unwrap();
        let back: FieldUpdate = serde_json::from_str(&json).unwrap();
        assert_eq!(update, back);
    }
}
