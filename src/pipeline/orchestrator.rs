use anyhow::{Context, Result};
use chrono::Utc;
use crossbeam_channel::unbounded;
use log::debug;
use std::sync::Arc;
use std::time::Instant;

use crate::engine::gitlab::GitLabApi;
use crate::engine::observe::{Event, Observer};
use crate::engine::{CancelToken, Policy, PolicyOpts};
use crate::{ProjectSummary, RunReport, SweepOpts};

use super::context::{PipelineTuning, RunContext};
use super::pool::{PoolError, WorkerPool};
use super::producer::spawn_project_producer;

/// Outer pool (one task per project) and inner pool (one task per deletion), in that order.
pub fn create_pools(tuning: &PipelineTuning) -> Result<(Arc<WorkerPool>, Arc<WorkerPool>), PoolError> {
    let outer = WorkerPool::new("outer", tuning.outer_pool_size)?;
    let inner = WorkerPool::new("inner", tuning.inner_pool_size)?;
    Ok((Arc::new(outer), Arc::new(inner)))
}

/// Main orchestrator: validate options, build both pools, stream projects through them and
/// collect one summary per dispatched project.
///
/// Producer → outer pool → [job lister → filter → inner pool → executor] → merge → summary.
///
/// Only setup failures (invalid options, pool construction, producer thread spawn) are returned
/// as errors. Listing and deletion failures are reported to `observer` and the run carries on.
/// On cancellation nothing new is requested or submitted, and already dispatched work drains
/// before this returns.
pub fn run_cleanup(
    api: Arc<dyn GitLabApi>,
    opts: &SweepOpts,
    observer: Arc<dyn Observer>,
    cancel: CancelToken,
) -> Result<RunReport> {
    let start = Instant::now();
    let policy =
        Policy::new(&PolicyOpts::from(opts), Utc::now()).context("invalid cleanup options")?;
    let tuning = PipelineTuning::from(opts);
    debug!("pipeline tuning: {:?}", tuning);

    let (outer, inner) = create_pools(&tuning).context("pools initialization")?;
    let ctx = RunContext {
        api,
        policy: Arc::new(policy),
        observer,
        cancel,
        per_page: tuning.per_page,
    };

    let (summary_tx, summary_rx) = unbounded::<ProjectSummary>();
    let producer = spawn_project_producer(
        ctx.clone(),
        Arc::clone(&outer),
        Arc::clone(&inner),
        summary_tx,
    )
    .context("spawn project producer")?;

    // Ends once the producer and every project task have dropped their sender.
    let summaries: Vec<ProjectSummary> = summary_rx.iter().collect();
    debug!(
        "main: summary channel closed, {} projects done",
        summaries.len()
    );

    let stats = producer
        .join()
        .map_err(|_| anyhow::anyhow!("project producer thread panicked"))?;
    outer.shutdown();
    inner.shutdown();

    let report = RunReport {
        projects_dispatched: stats.dispatched,
        projects_skipped: stats.skipped,
        summaries,
        cancelled: ctx.is_cancelled(),
    };
    if report.cancelled {
        ctx.observe(Event::RunCancelled);
    }
    ctx.observe(Event::RunFinished {
        report: &report,
        duration: start.elapsed(),
    });
    Ok(report)
}
