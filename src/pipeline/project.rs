//! Per-project sub-pipeline, run inside one outer pool task:
//! start → split (list + filter + dispatch to the inner pool) → drain (merge outcomes) → stop.

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::debug;
use std::thread;
use std::time::Instant;

use crate::engine::observe::Event;
use crate::{Job, Project, ProjectState, ProjectSummary};

use super::context::RunContext;
use super::executor::ActionExecutor;
use super::lister::{ListEnd, job_lister};
use super::pool::WorkerPool;

/// State of one project while its task runs.
pub struct ProjectRun {
    project: Project,
    state: ProjectState,
    started: Instant,
    jobs_dispatched: usize,
    jobs_cleaned: usize,
}

impl ProjectRun {
    /// Start the project's timer and report it.
    pub fn start(project: Project, ctx: &RunContext) -> Self {
        ctx.observe(Event::ProjectStarted { project: &project });
        Self {
            project,
            state: ProjectState::Started,
            started: Instant::now(),
            jobs_dispatched: 0,
            jobs_cleaned: 0,
        }
    }

    pub fn state(&self) -> ProjectState {
        self.state
    }

    pub fn jobs_dispatched(&self) -> usize {
        self.jobs_dispatched
    }

    fn advance(&mut self, next: ProjectState) {
        debug_assert!(next > self.state, "{:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Stream the project's jobs and submit every eligible one to `inner`. Each inner task sends
    /// its job, `cleaned` set, on `done_tx`. Blocks whenever the inner pool is saturated, which
    /// keeps the lister from running ahead of the deletions.
    ///
    /// A listing error, a cancellation or a closed pool ends the split early; whatever was already
    /// dispatched still drains.
    pub fn split(&mut self, ctx: &RunContext, inner: &WorkerPool, done_tx: Sender<Job>) {
        self.advance(ProjectState::Splitting);
        let executor = ActionExecutor::new(ctx);
        let mut jobs = job_lister(
            ctx.api.as_ref(),
            self.project.id,
            ctx.per_page,
            ctx.cancel.clone(),
        );

        for job in jobs.by_ref() {
            if !job.needs_cleanup(&ctx.policy) {
                continue;
            }
            if ctx.is_cancelled() {
                break;
            }
            let executor = executor.clone();
            let done_tx = done_tx.clone();
            let submitted = inner.submit(move || {
                let mut job = job;
                executor.execute(&mut job);
                let _ = done_tx.send(job);
            });
            if let Err(error) = submitted {
                ctx.observe(Event::SubmitFailed {
                    project: &self.project,
                    error: &error,
                });
                break;
            }
            self.jobs_dispatched += 1;
        }

        let pages = jobs.pages_fetched();
        if let ListEnd::Failed { page, error } = jobs.finish() {
            ctx.observe(Event::JobsListFailed {
                project: &self.project,
                page,
                error: &error,
            });
        }
        debug!(
            "project {}: {} job pages read, {} jobs dispatched",
            self.project.id, pages, self.jobs_dispatched
        );
    }

    /// Record the merged count once every dispatched job reported.
    fn drained(&mut self, jobs_cleaned: usize) {
        self.jobs_cleaned = jobs_cleaned;
    }

    /// Stop the timer and report the aggregated result.
    pub fn stop(&mut self, ctx: &RunContext) -> ProjectSummary {
        self.advance(ProjectState::Stopped);
        let summary = ProjectSummary {
            project_id: self.project.id,
            project_path: self.project.path_with_namespace.clone(),
            jobs_cleaned: self.jobs_cleaned,
            jobs_dispatched: self.jobs_dispatched,
            duration: self.started.elapsed(),
        };
        ctx.observe(Event::ProjectEnded { summary: &summary });
        summary
    }
}

/// Fold executed jobs into the cleaned count. Returns once every sender is dropped, i.e. when
/// the split is over and every dispatched task has reported.
pub fn merge_jobs(done_rx: Receiver<Job>) -> usize {
    done_rx.iter().filter(|job| job.cleaned).count()
}

/// Whole lifecycle of one project. Merge runs on a scoped thread alongside the split so
/// outcomes are folded as they arrive.
pub fn run_project(project: Project, ctx: &RunContext, inner: &WorkerPool) -> ProjectSummary {
    let mut run = ProjectRun::start(project, ctx);
    let (done_tx, done_rx) = unbounded::<Job>();

    let jobs_cleaned = thread::scope(|s| {
        let merger = s.spawn(move || merge_jobs(done_rx));
        run.split(ctx, inner, done_tx);
        run.advance(ProjectState::Draining);
        merger.join().unwrap_or_default()
    });
    run.drained(jobs_cleaned);
    run.stop(ctx)
}
