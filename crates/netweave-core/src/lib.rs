//! Core of the design knowledge graph: the fused graph store, per-field
//! provenance, the precedence-gated updater, and the stage pipeline that
//! drives ingest adapters.
//!
//! External artifact parsers live outside this crate and talk to it
//! through [`ingest`] wire types and the [`pipeline::StageIngestor`]
//! trait. Everything downstream (views, timing aggregation, queries)
//! reads the store through shared references and never mutates it.

pub mod cancel;
pub mod diagnostics;
pub mod edge;
pub mod error;
pub mod export;
pub mod field;
pub mod id;
pub mod ingest;
pub mod model;
pub mod node;
pub mod pattern;
pub mod pipeline;
pub mod provenance;
pub mod snapshot;
pub mod store;
pub mod updater;

// Re-export the working vocabulary.
pub use cancel::CancelToken;
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSeverity, Diagnostics};
pub use edge::Edge;
pub use error::CoreError;
pub use field::{EdgeField, FieldId, FieldValue, NodeField};
pub use id::{EdgeId, NodeId};
pub use ingest::{EdgeSpec, EntityRef, FieldUpdate, NodeSpec, TimingPathRecord};
pub use model::{
    AttrValue, BitRange, EntityClass, EntitySupertype, FlowType, RelationType, Source, Stage,
};
pub use node::Node;
pub use pipeline::{IngestContext, StageIngestor, StagePipeline, StageStatus};
pub use provenance::{
    EntityKey, FieldHistory, LedgerConfig, Origin, ProvenanceLedger, ProvenanceRecord,
};
pub use snapshot::Snapshot;
pub use store::DesignGraph;
pub use updater::{GraphUpdater, TimingUpdate, WriteOutcome};
