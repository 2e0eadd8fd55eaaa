//! Crate root: public surface for the SpTRSV dependency-graph compiler and
//! heterogeneous scheduler.
//!
//! Three stages, each a pure function over validated data:
//!
//! 1. [`rewriter`] — splits high-fan-in nodes into `Partial` + `Fusion`
//!    nodes.
//! 2. [`mec`] — compiles a Minimum Execution Cycle for every node.
//! 3. [`scheduler`] — simulates dispatch of Edge/Update/Fusion tasks across
//!    a fixed PE pool and single NFU, on nested logical/physical clocks.
//!
//! ## Invariants
//!
//! - **Determinism.** Given the same DAG and parameters, every stage
//!   produces byte-identical output. No stage reads wall-clock time,
//!   randomness, or environment state.
//! - **Single-threaded.** Nothing here spawns threads or tasks; the
//!   simulation's correctness depends on its nested clocks advancing in a
//!   fixed order.
//! - **No unsafe.** Enforced crate-wide below.
//!
//! If any of these invariants would be violated at runtime — a dangling
//! parent, a level inversion, an unsupported NFU count — the failure mode
//! is a precise [`error::Error`] variant, never a panic.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

/// Centralized index & identifier newtypes (`NodeId`, `Lc`, `Pc`, `Mec`).
pub mod ids;
/// Per-stage error enums, unified at the crate root.
pub mod error;
/// DAG data model and the raw/rewritten JSON record shapes.
pub mod dag;
/// Graph rewriter (fixed-size fan-in splitting).
pub mod rewriter;
/// Resource-aware MEC compiler.
pub mod mec;
/// LC/PC-driven heterogeneous scheduler.
pub mod scheduler;
/// Stable trace-line formatting.
pub mod trace;
/// File-boundary glue: JSON and CSV I/O.
pub mod io;
/// CLI argument surface.
pub mod config;

pub use dag::{Dag, Node, NodeKind};
pub use error::Error;
pub use ids::{Lc, Mec, NodeId, Pc};
pub use mec::MecMap;
pub use rewriter::RewriteParams;
pub use scheduler::{ScheduleOutcome, ScheduleParams};
pub use trace::Trace;

/// Convenience: rewrite, compile, and schedule a raw-input DAG in one call,
/// the library equivalent of the `run` CLI subcommand.
pub fn run_pipeline(
    raw: Dag,
    rewrite_params: RewriteParams,
    schedule_params: ScheduleParams,
) -> Result<(Dag, MecMap, ScheduleOutcome), Error> {
    let rewritten = rewriter::rewrite(&raw, rewrite_params)?;
    let mecs = mec::compile(&rewritten)?;
    let outcome = scheduler::schedule(&rewritten, &mecs, schedule_params)?;
    Ok((rewritten, mecs, outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::Node;

    #[test]
    fn run_pipeline_on_a_simple_chain() {
        let n0 = Node::new(NodeId::new("0"), NodeKind::Normal, vec![], 0, 1);
        let n1 = Node::new(NodeId::new("1"), NodeKind::Normal, vec![NodeId::new("0")], 1, 2);
        let raw = Dag::from_nodes(vec![n0, n1]).unwrap();

        let (rewritten, mecs, outcome) =
            run_pipeline(raw, RewriteParams::default(), ScheduleParams::default()).unwrap();

        assert_eq!(rewritten.len(), 2);
        assert!(mecs.max_mec.as_u32() > 0);
        assert!(!outcome.trace.timed_out);
        assert_eq!(outcome.finished, outcome.total);
    }
}
