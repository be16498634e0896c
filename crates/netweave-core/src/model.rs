//! Enumerated vocabulary of the design graph.
//!
//! Entity classes, relation and flow types, ingest stages, and value sources
//! are all closed enums; every site that branches on them matches
//! exhaustively so that adding a variant surfaces every affected site at
//! compile time.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What kind of design entity a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityClass {
    ModuleInstance,
    RtlBlock,
    FlipFlop,
    Lut,
    Mux,
    Dsp,
    Bram,
    IoPort,
    PackagePin,
    Pblock,
    BoardConnector,
    ClockDomain,
    Fsm,
}

/// Coarse grouping of entity classes, derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntitySupertype {
    Logical,
    Structural,
    Physical,
    AbstractControl,
}

impl EntityClass {
    /// The supertype this class belongs to.
    pub fn supertype(self) -> EntitySupertype {
        match self {
            EntityClass::ModuleInstance | EntityClass::IoPort => EntitySupertype::Structural,
            EntityClass::RtlBlock
            | EntityClass::FlipFlop
            | EntityClass::Lut
            | EntityClass::Mux
            | EntityClass::Dsp
            | EntityClass::Bram => EntitySupertype::Logical,
            EntityClass::PackagePin | EntityClass::Pblock | EntityClass::BoardConnector => {
                EntitySupertype::Physical
            }
            EntityClass::ClockDomain | EntityClass::Fsm => EntitySupertype::AbstractControl,
        }
    }

    /// Classes that launch sequential data (valid `SequentialLaunch` sources).
    pub fn is_sequential(self) -> bool {
        matches!(
            self,
            EntityClass::FlipFlop | EntityClass::Dsp | EntityClass::Bram
        )
    }

    /// All thirteen classes, for iteration in tests and policy tables.
    pub const ALL: [EntityClass; 13] = [
        EntityClass::ModuleInstance,
        EntityClass::RtlBlock,
        EntityClass::FlipFlop,
        EntityClass::Lut,
        EntityClass::Mux,
        EntityClass::Dsp,
        EntityClass::Bram,
        EntityClass::IoPort,
        EntityClass::PackagePin,
        EntityClass::Pblock,
        EntityClass::BoardConnector,
        EntityClass::ClockDomain,
        EntityClass::Fsm,
    ];
}

/// What a directed edge means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RelationType {
    Data,
    Clock,
    Reset,
    Parameter,
    Constraint,
    PhysicalMapping,
}

impl RelationType {
    /// Canonical tie-break order for aggregated relation types:
    /// `Data` wins over `Clock` wins over `Reset`, and so on. Lower is
    /// stronger.
    pub fn canonical_rank(self) -> u8 {
        match self {
            RelationType::Data => 0,
            RelationType::Clock => 1,
            RelationType::Reset => 2,
            RelationType::Parameter => 3,
            RelationType::Constraint => 4,
            RelationType::PhysicalMapping => 5,
        }
    }
}

/// How a signal travels along an edge with respect to the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FlowType {
    Combinational,
    SequentialLaunch,
    SequentialCapture,
    ClockTree,
    AsyncReset,
}

/// Ingest stages, in nominal pipeline order.
///
/// The derived `Ord` follows declaration order and doubles as the stage
/// rank used by the precedence lattice (`Board` outranks `Timing` outranks
/// `Floorplan`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    Rtl,
    Synthesis,
    Constraints,
    Floorplan,
    Timing,
    Board,
}

impl Stage {
    /// Numeric precedence rank, ascending with trustworthiness.
    pub fn rank(self) -> u8 {
        match self {
            Stage::Rtl => 0,
            Stage::Synthesis => 1,
            Stage::Constraints => 2,
            Stage::Floorplan => 3,
            Stage::Timing => 4,
            Stage::Board => 5,
        }
    }

    /// All stages in nominal execution order.
    pub const ALL: [Stage; 6] = [
        Stage::Rtl,
        Stage::Synthesis,
        Stage::Constraints,
        Stage::Floorplan,
        Stage::Timing,
        Stage::Board,
    ];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Rtl => "rtl",
            Stage::Synthesis => "synthesis",
            Stage::Constraints => "constraints",
            Stage::Floorplan => "floorplan",
            Stage::Timing => "timing",
            Stage::Board => "board",
        };
        f.write_str(s)
    }
}

/// Where a field value came from. Higher variants override lower ones
/// regardless of stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Source {
    Inferred,
    Analyzed,
    Declared,
    UserOverride,
}

impl Source {
    /// Numeric precedence rank, ascending with trustworthiness.
    pub fn rank(self) -> u8 {
        match self {
            Source::Inferred => 0,
            Source::Analyzed => 1,
            Source::Declared => 2,
            Source::UserOverride => 3,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Source::Inferred => "inferred",
            Source::Analyzed => "analyzed",
            Source::Declared => "declared",
            Source::UserOverride => "user_override",
        };
        f.write_str(s)
    }
}

/// Free-form attribute values carried by nodes and edges.
///
/// Untagged on the wire; variant order matters so whole numbers
/// deserialize as `Int` rather than `Real`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Text(String),
    Int(i64),
    Real(f64),
    Flag(bool),
}

impl AttrValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            AttrValue::Real(v) => Some(*v),
            AttrValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Text(s.to_string())
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Real(v)
    }
}

/// A `[msb:lsb]` slice of a bus signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BitRange {
    pub msb: u32,
    pub lsb: u32,
}

impl fmt::Display for BitRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}]", self.msb, self.lsb)
    }
}
