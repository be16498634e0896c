//! View-building errors.

use thiserror::Error;

/// Errors produced while building a view.
#[derive(Debug, Error)]
pub enum ViewError {
    /// Cooperative cancellation was observed between build cycles.
    #[error("view build interrupted")]
    Interrupted,

    /// The base graph violated a structural assumption.
    #[error(transparent)]
    Core(#[from] netweave_core::CoreError),
}
