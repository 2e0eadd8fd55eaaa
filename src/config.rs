//! CLI argument surface (see SPEC_FULL.md §4.4).
//!
//! One binary, four subcommands: `rewrite`, `compile`, `schedule` run a
//! single pipeline stage each; `run` chains all three and is what most
//! invocations use. Tunables (`--threshold`, `--chunk-size`, `--pe-limit`,
//! `--nfu-limit`, `--max-lc-limit`) default to the values [`RewriteParams`]
//! and [`ScheduleParams`] already default to, so passing none of them
//! reproduces the fixed-chunk / 10-PE / single-NFU baseline.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::rewriter::RewriteParams;
use crate::scheduler::ScheduleParams;

/// sptrsv — SpTRSV dependency-graph compiler and heterogeneous scheduler.
#[derive(Parser, Debug)]
#[command(name = "sptrsv", version, about = "Compile and schedule SpTRSV dependency graphs")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Suppress informational logging; only warnings and errors are shown.
    #[arg(long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Split high-fan-in nodes into Partial + Fusion nodes.
    Rewrite {
        /// Raw DAG JSON (`id`/`row_index`, `parents`/`dependency_nodes`).
        #[arg(long)]
        input: PathBuf,
        /// Destination for the rewritten DAG JSON.
        #[arg(long)]
        output: PathBuf,
        #[command(flatten)]
        rewrite: RewriteArgs,
    },
    /// Compile per-node MECs for an already-rewritten DAG.
    Compile {
        /// Rewritten DAG JSON.
        #[arg(long)]
        input: PathBuf,
        /// Destination for the flat `{id: mec}` JSON map.
        #[arg(long)]
        output: PathBuf,
    },
    /// Run the LC/PC scheduler over a rewritten DAG and its MEC map.
    Schedule {
        /// Rewritten DAG JSON.
        #[arg(long)]
        dag: PathBuf,
        /// MEC map JSON produced by `compile`.
        #[arg(long)]
        mec: PathBuf,
        /// Destination for the trace text file.
        #[arg(long)]
        trace: PathBuf,
        #[command(flatten)]
        schedule: ScheduleArgs,
        /// Append a `Matrix,MEC,Cycles` row to this CSV file.
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Name recorded in the CSV `Matrix` column; defaults to `dag`'s
        /// file stem.
        #[arg(long)]
        matrix_name: Option<String>,
    },
    /// Rewrite, compile, and schedule a raw DAG in one invocation.
    Run {
        /// Raw DAG JSON.
        #[arg(long)]
        input: PathBuf,
        /// Directory the rewritten DAG, MEC map, and trace are written
        /// into (created if missing).
        #[arg(long)]
        out_dir: PathBuf,
        #[command(flatten)]
        rewrite: RewriteArgs,
        #[command(flatten)]
        schedule: ScheduleArgs,
        /// Append a `Matrix,MEC,Cycles` row to this CSV file.
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Name recorded in the CSV `Matrix` column; defaults to `input`'s
        /// file stem.
        #[arg(long)]
        matrix_name: Option<String>,
    },
}

#[derive(clap::Args, Debug, Clone, Copy)]
pub struct RewriteArgs {
    /// In-degree at or below which a node passes through as Normal.
    #[arg(long, default_value_t = RewriteParams::default().threshold)]
    pub threshold: usize,
    /// Parent-count bound for each Partial node above `threshold`.
    #[arg(long, default_value_t = RewriteParams::default().chunk_size)]
    pub chunk_size: usize,
}

impl From<RewriteArgs> for RewriteParams {
    fn from(a: RewriteArgs) -> Self {
        RewriteParams {
            threshold: a.threshold,
            chunk_size: a.chunk_size,
        }
    }
}

#[derive(clap::Args, Debug, Clone, Copy)]
pub struct ScheduleArgs {
    /// Number of PEs available for Edge/Update dispatch.
    #[arg(long, default_value_t = ScheduleParams::default().pe_limit)]
    pub pe_limit: u32,
    /// Number of NFUs; only `1` is currently supported.
    #[arg(long, default_value_t = ScheduleParams::default().nfu_limit)]
    pub nfu_limit: u32,
    /// Logical-cycle ceiling before the scheduler gives up and returns a
    /// partial trace.
    #[arg(long, default_value_t = ScheduleParams::default().max_lc_limit)]
    pub max_lc_limit: u64,
}

impl From<ScheduleArgs> for ScheduleParams {
    fn from(a: ScheduleArgs) -> Self {
        ScheduleParams {
            pe_limit: a.pe_limit,
            nfu_limit: a.nfu_limit,
            max_lc_limit: a.max_lc_limit,
        }
    }
}

/// Default output filenames for `run`, kept in one place so the three
/// artifacts it writes into `--out-dir` are named consistently.
pub const REWRITTEN_DAG_DEFAULT_NAME: &str = "rewritten_dag.json";
pub const MEC_MAP_DEFAULT_NAME: &str = "mec_map.json";
pub const TRACE_DEFAULT_NAME: &str = "trace.txt";
