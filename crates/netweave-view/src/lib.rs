//! View abstraction over the design graph.
//!
//! Builds [`SuperGraph`] snapshots from the fused base graph under a
//! `(view, context)` policy map: promote, merge, or eliminate each node,
//! then rewrite edges so signal-level connectivity survives abstraction.
//! Analysis results attach to the result through keyed, immutable
//! [`analysis`] bundles and never influence structure.

pub mod analysis;
pub mod builder;
pub mod error;
pub mod export;
pub mod model;
pub mod policy;

pub use analysis::{
    AnalysisBundle, AnalysisKind, AnalysisValue, TimingEdgeMetrics, TimingNodeMetrics,
};
pub use builder::{BuildOptions, ViewBuilder};
pub use error::ViewError;
pub use export::{export_supergraph, SuperEdgeExport, SuperNodeExport};
pub use model::{
    super_edge_id, super_node_id, SuperClass, SuperEdge, SuperEdgeId, SuperGraph, SuperNode,
    SuperNodeId, View, ViewContext,
};
pub use policy::{base_policy, node_policy, NodePolicy, PolicyAction};
