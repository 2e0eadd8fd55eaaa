//! Stable trace-line formatting (§6 External Interfaces).
//!
//! Only the one-line-per-issued-PC contract is implemented here. The
//! per-PC detailed dump and LC task-queue snapshot the original scripts
//! also wrote are debug-only verbosity outside any stable contract and are
//! not part of this crate's surface (see DESIGN.md).

use std::fmt;

use crate::ids::{Lc, NodeId, Pc};

/// One dispatched operation, as issued at a given PC.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Op {
    /// `U(id)` — an Update op for a Normal node.
    Update(NodeId),
    /// `E(src->id)` — an edge-accumulation op.
    Edge { src: NodeId, dst: NodeId },
    /// `F(id)` — a Fusion op.
    Fusion(NodeId),
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Update(id) => write!(f, "U({id})"),
            Op::Edge { src, dst } => write!(f, "E({src}->{dst})"),
            Op::Fusion(id) => write!(f, "F({id})"),
        }
    }
}

/// All operations dispatched in a single physical cycle.
#[derive(Clone, Debug)]
pub struct TraceLine {
    pub lc: Lc,
    pub pc: Pc,
    pub ops: Vec<Op>,
}

impl fmt::Display for TraceLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LC {} | PC {} |", self.lc, self.pc)?;
        for op in &self.ops {
            write!(f, " {op}")?;
        }
        Ok(())
    }
}

/// The full trace of a scheduler run: one line per PC at which at least one
/// op was dispatched, plus an optional timeout marker.
#[derive(Clone, Debug, Default)]
pub struct Trace {
    pub lines: Vec<TraceLine>,
    pub timed_out: bool,
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        if self.timed_out {
            writeln!(f, "# timeout")?;
        }
        Ok(())
    }
}
