//! Core error types.
//!
//! Uses `thiserror` for structured, matchable variants. Structural errors
//! (`DuplicateId`, `NoSuchEntity`, `DanglingEndpoint`, `TypeMismatch`, ...)
//! are fatal to the offending call and never corrupt the store; precedence
//! rejections are *not* errors and travel as
//! [`WriteOutcome::Rejected`](crate::updater::WriteOutcome).

use thiserror::Error;

use crate::id::{EdgeId, NodeId};

/// Errors produced by the core graph data model.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A node or edge uid collided with one already in the store.
    #[error("duplicate id: `{uid}`")]
    DuplicateId { uid: String },

    /// No entity with the given uid exists.
    #[error("no such entity: `{uid}`")]
    NoSuchEntity { uid: String },

    /// A node id was not found in the graph.
    #[error("node not found: NodeId({id})")]
    NodeNotFound { id: NodeId },

    /// An edge id was not found in the graph.
    #[error("edge not found: EdgeId({id})")]
    EdgeNotFound { id: EdgeId },

    /// An edge referenced an endpoint that is absent from the store.
    #[error("edge `{edge}` references missing endpoint `{endpoint}`")]
    DanglingEndpoint { edge: String, endpoint: String },

    /// A node's hierarchy parent is not itself a node.
    #[error("hierarchy parent `{parent}` of `{uid}` is not in the graph")]
    MissingHierParent { uid: String, parent: String },

    /// A field write carried a value of the wrong kind.
    #[error("type mismatch on field `{field}`: expected {expected}, got {got}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        got: &'static str,
    },

    /// An edge violated a relation/flow endpoint rule.
    #[error("invalid edge `{edge}`: {reason}")]
    InvalidEdge { edge: String, reason: String },
}
