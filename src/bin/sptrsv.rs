//! `sptrsv` — compile and schedule SpTRSV dependency graphs.
//!
//! Thin CLI shell: parses arguments, initializes logging, dispatches to the
//! `sptrsv_hetero_sched` library, and converts its [`Error`] into
//! `anyhow::Error` at the boundary.

use std::path::Path;

use anyhow::Context;
use clap::Parser;

use sptrsv_hetero_sched::config::{Cli, Command, REWRITTEN_DAG_DEFAULT_NAME, MEC_MAP_DEFAULT_NAME, TRACE_DEFAULT_NAME};
use sptrsv_hetero_sched::error::ScheduleError;
use sptrsv_hetero_sched::{io, mec, rewriter, scheduler};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| {
            if cli.quiet { "sptrsv=warn".into() } else { "sptrsv=info".into() }
        }))
        .with_target(false)
        .compact()
        .init();

    match cli.command {
        Command::Rewrite { input, output, rewrite } => {
            let dag = io::load_raw_dag(&input)?;
            let rewritten = rewriter::rewrite(&dag, rewrite.into())?;
            io::save_rewritten_dag(&rewritten, &output)?;
            tracing::info!(nodes = rewritten.len(), "rewrite complete");
        }
        Command::Compile { input, output } => {
            let dag = io::load_rewritten_dag(&input)?;
            let mecs = mec::compile(&dag)?;
            io::save_mec_map(&mecs, &output)?;
            tracing::info!(max_mec = mecs.max_mec.as_u32(), "compile complete");
        }
        Command::Schedule { dag: dag_path, mec: mec_path, trace, schedule, csv, matrix_name } => {
            let dag = io::load_rewritten_dag(&dag_path)?;
            let mecs = io::load_mec_map(&mec_path)?;
            let outcome = recover_schedule_outcome(scheduler::schedule(&dag, &mecs, schedule.into()))?;
            io::save_trace(&outcome.trace, &trace)?;
            if let Some(csv_path) = csv {
                let name = matrix_name.unwrap_or_else(|| stem_of(&dag_path));
                io::append_csv_summary(&csv_path, &name, mecs.max_mec, outcome.total_pc.as_u64())?;
            }
            report_outcome(&outcome)?;
        }
        Command::Run { input, out_dir, rewrite, schedule, csv, matrix_name } => {
            std::fs::create_dir_all(&out_dir)
                .with_context(|| format!("creating output directory {}", out_dir.display()))?;

            let raw = io::load_raw_dag(&input)?;
            let rewritten = rewriter::rewrite(&raw, rewrite.into())?;
            io::save_rewritten_dag(&rewritten, &out_dir.join(REWRITTEN_DAG_DEFAULT_NAME))?;

            let mecs = mec::compile(&rewritten)?;
            io::save_mec_map(&mecs, &out_dir.join(MEC_MAP_DEFAULT_NAME))?;

            let outcome =
                recover_schedule_outcome(scheduler::schedule(&rewritten, &mecs, schedule.into()))?;
            io::save_trace(&outcome.trace, &out_dir.join(TRACE_DEFAULT_NAME))?;

            if let Some(csv_path) = csv {
                let name = matrix_name.unwrap_or_else(|| stem_of(&input));
                io::append_csv_summary(&csv_path, &name, mecs.max_mec, outcome.total_pc.as_u64())?;
            }
            report_outcome(&outcome)?;
        }
    }

    Ok(())
}

/// Turn a timed-out `schedule()` call into a usable partial
/// [`scheduler::ScheduleOutcome`] instead of discarding its trace.
/// [`ScheduleError::Timeout`] carries everything a caller needs to still
/// persist progress. Any other error propagates as-is.
fn recover_schedule_outcome(
    result: Result<scheduler::ScheduleOutcome, ScheduleError>,
) -> anyhow::Result<scheduler::ScheduleOutcome> {
    match result {
        Ok(outcome) => Ok(outcome),
        Err(ScheduleError::Timeout { finished, total, total_pc, trace, .. }) => {
            Ok(scheduler::ScheduleOutcome { total_pc, trace, finished, total })
        }
        Err(other) => Err(other.into()),
    }
}

fn report_outcome(outcome: &scheduler::ScheduleOutcome) -> anyhow::Result<()> {
    if outcome.trace.timed_out {
        tracing::warn!(
            finished = outcome.finished,
            total = outcome.total,
            total_pc = outcome.total_pc.as_u64(),
            "scheduler timed out; writing partial trace"
        );
        anyhow::bail!(
            "scheduler timed out with {}/{} nodes finished",
            outcome.finished,
            outcome.total
        );
    }
    tracing::info!(total_pc = outcome.total_pc.as_u64(), "schedule complete");
    Ok(())
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("matrix")
        .to_string()
}
