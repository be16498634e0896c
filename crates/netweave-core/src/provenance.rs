//! Per-field provenance ledger.
//!
//! For every `(entity, field)` pair the ledger holds the current accepted
//! record (the head) plus a bounded chronological history of *attempts*,
//! rejected ones included, so a displaced or losing value is never
//! silently lost. The ledger is a sibling of the store, not a property of
//! nodes or edges, so node and edge records stay small.
//!
//! The `seq` counter is the monotonic timestamp used as the final
//! precedence tiebreaker, making write order a total order independent of
//! wall time.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::field::{FieldId, FieldValue};
use crate::id::{EdgeId, NodeId};
use crate::model::{Source, Stage};

/// File/line origin of a field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl Origin {
    pub fn new(file: impl Into<String>, line: Option<u32>) -> Self {
        Origin {
            file: file.into(),
            line,
        }
    }
}

/// One write attempt: the value plus where, when, and how it arrived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    pub value: FieldValue,
    pub source: Source,
    pub stage: Stage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,
    /// Monotonic ledger sequence number; the deterministic timestamp.
    pub seq: u64,
    /// Whether the write passed the precedence gate.
    pub accepted: bool,
}

impl ProvenanceRecord {
    /// Precedence rank: source dominates, stage breaks source ties.
    pub fn rank(&self) -> (u8, u8) {
        (self.source.rank(), self.stage.rank())
    }
}

/// A field's head plus its bounded attempt history, oldest first.
///
/// The head is kept outside the ring so that a burst of rejected
/// attempts can never evict the authoritative record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldHistory {
    head: Option<ProvenanceRecord>,
    records: VecDeque<ProvenanceRecord>,
}

impl FieldHistory {
    /// The current record: the most recent accepted write.
    pub fn head(&self) -> Option<&ProvenanceRecord> {
        self.head.as_ref()
    }

    /// All retained attempts in chronological order, rejected included.
    pub fn records(&self) -> impl Iterator<Item = &ProvenanceRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn push(&mut self, record: ProvenanceRecord, depth: usize) {
        if record.accepted {
            self.head = Some(record.clone());
        }
        self.records.push_back(record);
        while self.records.len() > depth {
            self.records.pop_front();
        }
    }
}

/// The entity half of a ledger key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKey {
    Node(NodeId),
    Edge(EdgeId),
}

/// Ledger tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// How many attempt records to retain per field.
    pub history_depth: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig { history_depth: 16 }
    }
}

/// The per-field provenance store.
#[derive(Debug, Clone, Default)]
pub struct ProvenanceLedger {
    entries: HashMap<(EntityKey, FieldId), FieldHistory>,
    seq: u64,
    config: LedgerConfig,
}

impl ProvenanceLedger {
    pub fn new(config: LedgerConfig) -> Self {
        ProvenanceLedger {
            entries: HashMap::new(),
            seq: 0,
            config,
        }
    }

    /// Allocates the next monotonic sequence number.
    pub fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    /// The highest sequence number allocated so far.
    pub fn current_seq(&self) -> u64 {
        self.seq
    }

    /// Current head for a field, if any write was ever accepted.
    pub fn head(&self, entity: EntityKey, field: &FieldId) -> Option<&ProvenanceRecord> {
        self.entries
            .get(&(entity, field.clone()))
            .and_then(FieldHistory::head)
    }

    /// Full retained attempt history for a field.
    pub fn history(&self, entity: EntityKey, field: &FieldId) -> Option<&FieldHistory> {
        self.entries.get(&(entity, field.clone()))
    }

    /// Appends an attempt record, trimming history to the configured depth.
    pub fn append(&mut self, entity: EntityKey, field: FieldId, record: ProvenanceRecord) {
        let depth = self.config.history_depth.max(1);
        self.entries
            .entry((entity, field))
            .or_default()
            .push(record, depth);
    }

    /// Number of tracked `(entity, field)` pairs.
    pub fn tracked_fields(&self) -> usize {
        self.entries.len()
    }

    /// Iterates all tracked fields and their histories.
    pub fn iter(&self) -> impl Iterator<Item = (&(EntityKey, FieldId), &FieldHistory)> {
        self.entries.iter()
    }

    /// Restores a ledger by replaying attempt histories (snapshot load).
    /// `seq` continues from the highest sequence seen.
    pub fn from_entries(
        entries: impl IntoIterator<Item = (EntityKey, FieldId, Vec<ProvenanceRecord>)>,
        config: LedgerConfig,
    ) -> Self {
        let mut ledger = ProvenanceLedger::new(config);
        for (entity, field, records) in entries {
            for record in records {
                ledger.seq = ledger.seq.max(record.seq);
                ledger.append(entity, field.clone(), record);
            }
        }
        ledger
    }
}
