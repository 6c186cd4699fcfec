//! Outer producer: streams projects, applies the inclusion filter and submits one outer pool task
//! per included project.

use crossbeam_channel::Sender;
use log::debug;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::ProjectSummary;
use crate::engine::observe::Event;

use super::context::RunContext;
use super::lister::{ListEnd, project_lister};
use super::pool::WorkerPool;
use super::project::run_project;

/// Counters returned by the producer thread.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProducerStats {
    pub dispatched: usize,
    pub skipped: usize,
    pub pages: u32,
}

/// Run [`produce_projects`] on its own thread. The summary sender is dropped when the producer
/// and every project task it submitted are done.
pub fn spawn_project_producer(
    ctx: RunContext,
    outer: Arc<WorkerPool>,
    inner: Arc<WorkerPool>,
    summary_tx: Sender<ProjectSummary>,
) -> std::io::Result<JoinHandle<ProducerStats>> {
    thread::Builder::new()
        .name("project-producer".to_string())
        .spawn(move || produce_projects(&ctx, &outer, &inner, summary_tx))
}

/// Stream every project and dispatch the included ones to `outer`. Blocks while `outer` is
/// saturated, so at most one page of projects is waiting in memory.
///
/// Excluded projects are reported and never have their jobs listed. A listing error ends the
/// stream without failing the run.
pub fn produce_projects(
    ctx: &RunContext,
    outer: &WorkerPool,
    inner: &Arc<WorkerPool>,
    summary_tx: Sender<ProjectSummary>,
) -> ProducerStats {
    let mut stats = ProducerStats::default();
    let mut projects = project_lister(ctx.api.as_ref(), ctx.per_page, ctx.cancel.clone());

    for project in projects.by_ref() {
        if !ctx.policy.includes(&project) {
            ctx.observe(Event::ProjectSkipped { project: &project });
            stats.skipped += 1;
            continue;
        }
        if ctx.is_cancelled() {
            break;
        }

        let task_ctx = ctx.clone();
        let task_inner = Arc::clone(inner);
        let task_summary_tx = summary_tx.clone();
        let task_project = project.clone();
        let submitted = outer.submit(move || {
            let summary = run_project(task_project, &task_ctx, &task_inner);
            let _ = task_summary_tx.send(summary);
        });
        if let Err(error) = submitted {
            ctx.observe(Event::SubmitFailed {
                project: &project,
                error: &error,
            });
            break;
        }
        stats.dispatched += 1;
    }

    stats.pages = projects.pages_fetched();
    if let ListEnd::Failed { page, error } = projects.finish() {
        ctx.observe(Event::ProjectsListFailed { page, error: &error });
    }
    debug!(
        "producer: {} project pages read, {} dispatched, {} skipped",
        stats.pages, stats.dispatched, stats.skipped
    );
    stats
}
