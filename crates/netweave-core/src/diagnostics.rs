//! Per-run diagnostics.
//!
//! Warning-level findings (unresolved constraint patterns, conflicting
//! declarations, partially failed stages) accumulate here instead of
//! aborting ingestion. Entries are also mirrored to `tracing` so they show
//! up in live logs.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::provenance::Origin;

/// What kind of finding a diagnostic reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// A constraint target pattern matched no node.
    UnresolvedPattern,
    /// Two equal-precedence declarations disagreed; the later one won.
    ConflictingDeclaration,
    /// A constraint record could not be projected at all.
    SkippedConstraint,
    /// An ingestor failed and its stage completed partially.
    PartialStage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticSeverity {
    Info,
    Warning,
}

/// One recorded finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: DiagnosticSeverity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,
}

/// Accumulating sink for a single ingest/projection run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    pub fn warn(&mut self, kind: DiagnosticKind, message: impl Into<String>, origin: Option<Origin>) {
        let message = message.into();
        warn!(?kind, %message, "diagnostic");
        self.entries.push(Diagnostic {
            kind,
            severity: DiagnosticSeverity::Warning,
            message,
            origin,
        });
    }

    pub fn info(&mut self, kind: DiagnosticKind, message: impl Into<String>, origin: Option<Origin>) {
        let message = message.into();
        info!(?kind, %message, "diagnostic");
        self.entries.push(Diagnostic {
            kind,
            severity: DiagnosticSeverity::Info,
            message,
            origin,
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count of entries of one kind.
    pub fn count_of(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }
}
