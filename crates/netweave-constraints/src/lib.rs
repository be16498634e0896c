//! Constraint projection onto the design graph.
//!
//! Parsers translate SDC/XDC/Tcl files into typed [`record`]s; the
//! [`projector`] resolves their target patterns against the graph and
//! writes the projected semantics through the core updater at
//! `(Declared, Constraints)`. Resolution failures are diagnostics, never
//! fatal: the rest of the constraint file still projects.

pub mod pattern;
pub mod projector;
pub mod record;

pub use netweave_core::pattern::{is_literal, wildcard_match};
pub use pattern::PatternIndex;
pub use projector::{ConstraintProjector, ProjectionStats, ProjectorConfig};
pub use record::{
    ClockConstraint, ConstraintRecord, DelayBoundConstraint, DelayKind, FalsePathConstraint,
    IoKind, IoTimingConstraint, MulticycleConstraint, PathKind,
};
