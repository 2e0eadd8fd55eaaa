//! Per-stage error enums, unified at the crate root.
//!
//! Each pipeline stage gets its own small `thiserror` enum, and the crate
//! root re-exports a unifying `Error` that `#[from]`-converts any of them.
//! `IoError` additionally absorbs `std::io::Error`, `serde_json::Error`, and
//! `csv::Error` so the CLI boundary has one type to match on.

use crate::ids::{Lc, NodeId, Pc};
use crate::trace::Trace;

/// Errors raised while parsing or validating a DAG (raw or rewritten).
#[derive(Debug, thiserror::Error)]
pub enum DagError {
    /// A node's parent id does not resolve to another node in the set.
    #[error("node {child} references unknown parent {parent}")]
    DanglingParent { child: NodeId, parent: NodeId },
    /// A node's `level` is lower than one of its parents', so no topological
    /// order compatible with `level` can exist.
    #[error("node {child} has level {child_level} but parent {parent} has level {parent_level}")]
    LevelNotMonotone {
        child: NodeId,
        child_level: u32,
        parent: NodeId,
        parent_level: u32,
    },
    /// The same node id appears more than once in the input.
    #[error("duplicate node id {0}")]
    DuplicateId(NodeId),
    /// An input record is missing both spellings of a required field.
    #[error("node record missing required field `{0}` (and its legacy alias)")]
    MissingField(&'static str),
}

/// Errors raised while compiling MECs. Currently infallible given a
/// validated DAG, but kept distinct so future invariant checks (e.g. an
/// explicit cycle detector) have somewhere to report into.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// A parent id referenced during MEC lookup was never assigned a MEC,
    /// which can only happen if the DAG was not processed in level order.
    #[error("node {0} has no MEC recorded for parent {1}; DAG was not processed in level order")]
    OutOfOrder(NodeId, NodeId),
}

/// Errors raised while scheduling. `MissingMec` is deliberately absent here:
/// per spec it is a logged warning (treated as +infinity), not a hard error.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    /// The scheduler exceeded `max_lc_limit` without finishing all nodes —
    /// the only hard error the scheduler raises. Carries the partial
    /// `trace` (already stamped with its `timed_out` marker) and the
    /// `total_pc` reached, so a caller can still recover and persist
    /// whatever progress was made, per §7's "return partial trace with a
    /// timeout marker" policy.
    #[error("scheduler timed out at LC {current_lc} (limit {max_lc_limit}); {finished}/{total} nodes finished")]
    Timeout {
        current_lc: Lc,
        max_lc_limit: u64,
        finished: usize,
        total: usize,
        total_pc: Pc,
        trace: Trace,
    },
    /// `nfu_limit` other than 1 was requested; the scoreboard only models a
    /// single NFU.
    #[error("nfu_limit {0} is unsupported; the NFU scoreboard only models a single unit")]
    UnsupportedNfuLimit(u32),
    /// `pe_limit` of zero would make every edge/update task undispatchable.
    #[error("pe_limit must be at least 1")]
    ZeroPeLimit,
}

/// I/O and (de)serialization failures, surfaced immediately with no retry.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Unifying error type for the crate. The CLI converts this to
/// `anyhow::Error` at the outermost `main`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Dag(#[from] DagError),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error(transparent)]
    Io(#[from] IoError),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(IoError::Io(e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Io(IoError::Json(e))
    }
}

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        Error::Io(IoError::Csv(e))
    }
}
