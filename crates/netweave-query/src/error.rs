//! Query errors.

use thiserror::Error;

/// Errors produced by the query engine.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Cooperative cancellation was observed between BFS layers.
    #[error("query interrupted")]
    Interrupted,
}
