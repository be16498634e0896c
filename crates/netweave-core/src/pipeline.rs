//! The stage pipeline: ordered, replayable ingestion.
//!
//! Stages run one at a time; within a stage, ingestors run sequentially in
//! registration order, so the updater's sequence counter is a total order
//! over every write. Re-running a stage re-runs its ingestors, and by the
//! precedence rule that is idempotent for deterministic ingestors. Stages
//! may also run out of nominal order; the gate guarantees the same final
//! field values for any permutation of the same ingest set.
//!
//! A structural error halts the offending ingestor, marks the stage
//! partially failed, and the pipeline continues with the next ingestor.

use std::collections::BTreeMap;

use tracing::{debug, error};

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::CoreError;
use crate::model::Stage;
use crate::provenance::{LedgerConfig, ProvenanceLedger};
use crate::store::DesignGraph;
use crate::updater::GraphUpdater;

/// How a stage run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum StageStatus {
    /// All ingestors completed.
    Complete,
    /// At least one ingestor failed with a structural error.
    Partial,
}

/// Context handed to each ingestor run.
pub struct IngestContext<'g> {
    pub stage: Stage,
    pub updater: GraphUpdater<'g>,
}

/// One external artifact adapter (netlist reader, constraint translator,
/// timing-report translator, ...). Implementations must be deterministic
/// for stage re-runs to be idempotent.
pub trait StageIngestor {
    /// Short name used in logs and partial-stage diagnostics.
    fn name(&self) -> &str;

    /// Translates the artifact into creations and field updates.
    fn run(&mut self, ctx: &mut IngestContext<'_>) -> Result<(), CoreError>;
}

/// Owns the graph, ledger, and diagnostics, and drives registered
/// ingestors stage by stage.
pub struct StagePipeline {
    store: DesignGraph,
    ledger: ProvenanceLedger,
    diagnostics: Diagnostics,
    ingestors: BTreeMap<Stage, Vec<Box<dyn StageIngestor>>>,
    completed: BTreeMap<Stage, StageStatus>,
}

impl Default for StagePipeline {
    fn default() -> Self {
        StagePipeline::new()
    }
}

impl StagePipeline {
    pub fn new() -> Self {
        StagePipeline::with_ledger_config(LedgerConfig::default())
    }

    pub fn with_ledger_config(config: LedgerConfig) -> Self {
        StagePipeline {
            store: DesignGraph::new(),
            ledger: ProvenanceLedger::new(config),
            diagnostics: Diagnostics::new(),
            ingestors: BTreeMap::new(),
            completed: BTreeMap::new(),
        }
    }

    /// Rebuilds a pipeline around pre-existing state (snapshot restore).
    pub fn from_parts(
        store: DesignGraph,
        ledger: ProvenanceLedger,
        completed: BTreeMap<Stage, StageStatus>,
    ) -> Self {
        StagePipeline {
            store,
            ledger,
            diagnostics: Diagnostics::new(),
            ingestors: BTreeMap::new(),
            completed,
        }
    }

    pub fn register_ingestor(&mut self, stage: Stage, ingestor: Box<dyn StageIngestor>) {
        self.ingestors.entry(stage).or_default().push(ingestor);
    }

    /// Runs all ingestors registered for `stage`, in registration order.
    pub fn run_stage(&mut self, stage: Stage) -> StageStatus {
        let mut ingestors = self.ingestors.remove(&stage).unwrap_or_default();
        let mut status = StageStatus::Complete;

        for ingestor in ingestors.iter_mut() {
            debug!(stage = %stage, ingestor = ingestor.name(), "running ingestor");
            let mut ctx = IngestContext {
                stage,
                updater: GraphUpdater::new(
                    &mut self.store,
                    &mut self.ledger,
                    &mut self.diagnostics,
                ),
            };
            if let Err(err) = ingestor.run(&mut ctx) {
                error!(stage = %stage, ingestor = ingestor.name(), %err, "ingestor failed");
                self.diagnostics.warn(
                    DiagnosticKind::PartialStage,
                    format!("stage {stage}: ingestor `{}` failed: {err}", ingestor.name()),
                    None,
                );
                status = StageStatus::Partial;
            }
        }

        self.ingestors.insert(stage, ingestors);
        // A later clean re-run upgrades a partial stage back to complete.
        self.completed.insert(stage, status);
        status
    }

    /// Runs every stage with registered ingestors, in nominal order.
    pub fn run_all(&mut self) -> BTreeMap<Stage, StageStatus> {
        let stages: Vec<Stage> = self.ingestors.keys().copied().collect();
        for stage in stages {
            self.run_stage(stage);
        }
        self.completed.clone()
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn store(&self) -> &DesignGraph {
        &self.store
    }

    pub fn ledger(&self) -> &ProvenanceLedger {
        &self.ledger
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn completed_stages(&self) -> &BTreeMap<Stage, StageStatus> {
        &self.completed
    }

    /// Direct updater access, for drivers that write outside any ingestor
    /// (constraint projection, user overrides, tests).
    pub fn updater(&mut self) -> GraphUpdater<'_> {
        GraphUpdater::new(&mut self.store, &mut self.ledger, &mut self.diagnostics)
    }

    /// Decomposes the pipeline for snapshotting.
    pub fn into_parts(
        self,
    ) -> (
        DesignGraph,
        ProvenanceLedger,
        BTreeMap<Stage, StageStatus>,
    ) {
        (self.store, self.ledger, self.completed)
    }
}
