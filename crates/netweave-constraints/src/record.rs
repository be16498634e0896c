//! Typed constraint records.
//!
//! Constraint-file parsers (SDC/XDC/Tcl translators, out of scope here)
//! hand the projector these records. Target fields are raw patterns in the
//! shell-wildcard language of [`crate::pattern`].

use serde::{Deserialize, Serialize};

/// Setup/hold side of a multicycle constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathKind {
    Setup,
    Hold,
}

impl PathKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PathKind::Setup => "setup",
            PathKind::Hold => "hold",
        }
    }
}

/// Max/min side of a delay bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelayKind {
    Max,
    Min,
}

impl DelayKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DelayKind::Max => "max",
            DelayKind::Min => "min",
        }
    }
}

/// Input/output side of an I/O timing constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IoKind {
    Input,
    Output,
}

impl IoKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IoKind::Input => "input",
            IoKind::Output => "output",
        }
    }
}

/// `create_clock`: a named clock with its period in nanoseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClockConstraint {
    pub name: String,
    pub period: f64,
    pub targets: Vec<String>,
}

/// `set_false_path`: paths to exclude from timing analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FalsePathConstraint {
    pub from: Vec<String>,
    pub to: Vec<String>,
}

/// `set_multicycle_path`: paths allowed `cycles` clock cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MulticycleConstraint {
    pub cycles: u32,
    pub kind: PathKind,
    pub from: Vec<String>,
    pub to: Vec<String>,
}

/// `set_max_delay` / `set_min_delay`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelayBoundConstraint {
    pub kind: DelayKind,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Vec<String>>,
}

/// `set_input_delay` / `set_output_delay`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IoTimingConstraint {
    pub kind: IoKind,
    pub value: f64,
    pub clock: String,
    pub ports: Vec<String>,
}

/// Any constraint the projector understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstraintRecord {
    Clock(ClockConstraint),
    FalsePath(FalsePathConstraint),
    Multicycle(MulticycleConstraint),
    DelayBound(DelayBoundConstraint),
    IoTiming(IoTimingConstraint),
}
