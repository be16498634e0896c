//! Writable-field vocabulary for the precedence-gated updater.
//!
//! Every field the updater may touch is enumerated here, together with the
//! kind of value it accepts. A `(field, value)` kind mismatch is a hard
//! [`CoreError::TypeMismatch`], never a silent rejection.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::edge::Edge;
use crate::error::CoreError;
use crate::model::{AttrValue, FlowType};
use crate::node::Node;

/// Writable node fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeField {
    ClockDomain,
    ClockSignal,
    ResetSignal,
    Slack,
    ArrivalTime,
    RequiredTime,
    /// A named entry in the node's attribute map.
    Attr(String),
}

impl fmt::Display for NodeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeField::ClockDomain => f.write_str("clock_domain"),
            NodeField::ClockSignal => f.write_str("clock_signal"),
            NodeField::ResetSignal => f.write_str("reset_signal"),
            NodeField::Slack => f.write_str("slack"),
            NodeField::ArrivalTime => f.write_str("arrival_time"),
            NodeField::RequiredTime => f.write_str("required_time"),
            NodeField::Attr(key) => write!(f, "attr:{key}"),
        }
    }
}

/// Writable edge fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeField {
    FlowType,
    ClockDomain,
    TimingException,
    NetId,
    Delay,
    Slack,
    FanoutCount,
    /// A named entry in the edge's attribute map.
    Attr(String),
}

impl fmt::Display for EdgeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeField::FlowType => f.write_str("flow_type"),
            EdgeField::ClockDomain => f.write_str("clock_domain"),
            EdgeField::TimingException => f.write_str("timing_exception"),
            EdgeField::NetId => f.write_str("net_id"),
            EdgeField::Delay => f.write_str("delay"),
            EdgeField::Slack => f.write_str("slack"),
            EdgeField::FanoutCount => f.write_str("fanout_count"),
            EdgeField::Attr(key) => write!(f, "attr:{key}"),
        }
    }
}

/// A node or edge field, used as the ledger key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldId {
    Node(NodeField),
    Edge(EdgeField),
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldId::Node(field) => field.fmt(f),
            FieldId::Edge(field) => field.fmt(f),
        }
    }
}

/// A typed value traveling through the updater.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Text(String),
    Real(f64),
    Int(i64),
    Flag(bool),
    Flow(FlowType),
}

impl FieldValue {
    /// Short kind name for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => "text",
            FieldValue::Real(_) => "real",
            FieldValue::Int(_) => "int",
            FieldValue::Flag(_) => "flag",
            FieldValue::Flow(_) => "flow",
        }
    }

    fn expect_text(&self, field: &dyn fmt::Display) -> Result<String, CoreError> {
        match self {
            FieldValue::Text(s) => Ok(s.clone()),
            other => Err(mismatch(field, "text", other)),
        }
    }

    fn expect_real(&self, field: &dyn fmt::Display) -> Result<f64, CoreError> {
        match self {
            FieldValue::Real(v) => Ok(*v),
            FieldValue::Int(v) => Ok(*v as f64),
            other => Err(mismatch(field, "real", other)),
        }
    }

    fn expect_int(&self, field: &dyn fmt::Display) -> Result<i64, CoreError> {
        match self {
            FieldValue::Int(v) => Ok(*v),
            other => Err(mismatch(field, "int", other)),
        }
    }

    fn expect_flow(&self, field: &dyn fmt::Display) -> Result<FlowType, CoreError> {
        match self {
            FieldValue::Flow(flow) => Ok(*flow),
            other => Err(mismatch(field, "flow", other)),
        }
    }

    fn expect_attr(&self, field: &dyn fmt::Display) -> Result<AttrValue, CoreError> {
        match self {
            FieldValue::Text(s) => Ok(AttrValue::Text(s.clone())),
            FieldValue::Real(v) => Ok(AttrValue::Real(*v)),
            FieldValue::Int(v) => Ok(AttrValue::Int(*v)),
            FieldValue::Flag(v) => Ok(AttrValue::Flag(*v)),
            other @ FieldValue::Flow(_) => Err(mismatch(field, "attribute value", other)),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Real(v)
    }
}

fn mismatch(field: &dyn fmt::Display, expected: &'static str, got: &FieldValue) -> CoreError {
    CoreError::TypeMismatch {
        field: field.to_string(),
        expected,
        got: got.kind_name(),
    }
}

/// Writes a checked value into a node record. Kind mismatches fail before
/// anything is modified.
pub fn apply_to_node(node: &mut Node, field: &NodeField, value: &FieldValue) -> Result<(), CoreError> {
    match field {
        NodeField::ClockDomain => node.clock_domain = Some(value.expect_text(field)?),
        NodeField::ClockSignal => node.clock_signal = Some(value.expect_text(field)?),
        NodeField::ResetSignal => node.reset_signal = Some(value.expect_text(field)?),
        NodeField::Slack => node.slack = Some(value.expect_real(field)?),
        NodeField::ArrivalTime => node.arrival_time = Some(value.expect_real(field)?),
        NodeField::RequiredTime => node.required_time = Some(value.expect_real(field)?),
        NodeField::Attr(key) => {
            let attr = value.expect_attr(field)?;
            node.attributes.insert(key.clone(), attr);
        }
    }
    Ok(())
}

/// Writes a checked value into an edge record.
pub fn apply_to_edge(edge: &mut Edge, field: &EdgeField, value: &FieldValue) -> Result<(), CoreError> {
    match field {
        EdgeField::FlowType => edge.flow_type = value.expect_flow(field)?,
        EdgeField::ClockDomain => edge.clock_domain = Some(value.expect_text(field)?),
        EdgeField::TimingException => edge.timing_exception = Some(value.expect_text(field)?),
        EdgeField::NetId => edge.net_id = Some(value.expect_text(field)?),
        EdgeField::Delay => edge.delay = Some(value.expect_real(field)?),
        EdgeField::Slack => edge.slack = Some(value.expect_real(field)?),
        EdgeField::FanoutCount => edge.fanout_count = Some(value.expect_int(field)? as u32),
        EdgeField::Attr(key) => {
            let attr = value.expect_attr(field)?;
            edge.attributes.insert(key.clone(), attr);
        }
    }
    Ok(())
}
