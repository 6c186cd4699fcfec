//! Structured run events and the sink they are reported to.
//!
//! Pipeline code never logs through a global: it reports [`Event`]s to the [`Observer`] held by
//! the run context. [`LogObserver`] forwards them to the `log` facade.

use log::Level;
use std::fmt::{self, Write as _};
use std::sync::Mutex;
use std::time::Duration;

use crate::engine::gitlab::ApiError;
use crate::pipeline::PoolError;
use crate::{Job, Project, ProjectSummary, RunReport};

/// Everything the pipeline reports.
#[derive(Debug)]
pub enum Event<'a> {
    ProjectSkipped {
        project: &'a Project,
    },
    ProjectStarted {
        project: &'a Project,
    },
    ProjectEnded {
        summary: &'a ProjectSummary,
    },
    ProjectsListFailed {
        page: u32,
        error: &'a ApiError,
    },
    JobsListFailed {
        project: &'a Project,
        page: u32,
        error: &'a ApiError,
    },
    /// Transport failure on the delete call.
    DeleteFailed {
        job: &'a Job,
        error: &'a ApiError,
    },
    /// Delete call answered with a non-2xx status.
    DeleteRejected {
        job: &'a Job,
        status: u16,
        body: &'a str,
    },
    JobCleaned {
        job: &'a Job,
    },
    DryRunSkip {
        job: &'a Job,
    },
    /// Job was dispatched but the run got cancelled before its delete call.
    DeleteCancelled {
        job: &'a Job,
    },
    SubmitFailed {
        project: &'a Project,
        error: &'a PoolError,
    },
    RunCancelled,
    RunFinished {
        report: &'a RunReport,
        duration: Duration,
    },
}

impl Event<'_> {
    pub fn level(&self) -> Level {
        match self {
            Event::ProjectsListFailed { .. }
            | Event::JobsListFailed { .. }
            | Event::DeleteFailed { .. }
            | Event::DeleteRejected { .. }
            | Event::SubmitFailed { .. }
            | Event::DeleteCancelled { .. }
            | Event::RunCancelled => Level::Warn,
            Event::JobCleaned { .. } => Level::Debug,
            _ => Level::Info,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Event::ProjectSkipped { .. } => "skipping project cleaning",
            Event::ProjectStarted { .. } => "starting project execution",
            Event::ProjectEnded { .. } => "ending project execution",
            Event::ProjectsListFailed { .. } => "failed to retrieve projects",
            Event::JobsListFailed { .. } => "failed to retrieve project jobs",
            Event::DeleteFailed { .. } | Event::DeleteRejected { .. } => {
                "failed to delete job's artifacts"
            }
            Event::JobCleaned { .. } => "deleted job's artifacts",
            Event::DryRunSkip { .. } => {
                "running in dry run mode, skipping job's artifacts deletion"
            }
            Event::SubmitFailed { .. } => "failed to dispatch job's artifacts deletion",
            Event::DeleteCancelled { .. } => "run cancelled, skipping job's artifacts deletion",
            Event::RunCancelled => "run cancelled, waiting for dispatched work to finish",
            Event::RunFinished { .. } => "artifacts cleanup finished",
        }
    }

    /// Key/value pairs, sorted by key.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        match self {
            Event::ProjectSkipped { project } | Event::ProjectStarted { project } => vec![
                ("project_id", project.id.to_string()),
                ("project_path", project.path_with_namespace.clone()),
            ],
            Event::ProjectEnded { summary } => vec![
                ("execution_duration", format!("{:?}", summary.duration)),
                ("jobs_cleaned", summary.jobs_cleaned.to_string()),
                ("jobs_dispatched", summary.jobs_dispatched.to_string()),
                ("project_id", summary.project_id.to_string()),
                ("project_path", summary.project_path.clone()),
            ],
            Event::ProjectsListFailed { page, error } => {
                vec![("error", error.to_string()), ("page", page.to_string())]
            }
            Event::JobsListFailed {
                project,
                page,
                error,
            } => vec![
                ("error", error.to_string()),
                ("page", page.to_string()),
                ("project_id", project.id.to_string()),
                ("project_path", project.path_with_namespace.clone()),
            ],
            Event::DeleteFailed { job, error } => vec![
                ("error", error.to_string()),
                ("job_id", job.id.to_string()),
                ("project_id", job.project_id.to_string()),
            ],
            Event::DeleteRejected { job, status, body } => vec![
                ("job_id", job.id.to_string()),
                ("project_id", job.project_id.to_string()),
                ("response", body.to_string()),
                ("status", status.to_string()),
            ],
            Event::JobCleaned { job }
            | Event::DryRunSkip { job }
            | Event::DeleteCancelled { job } => vec![
                ("job_id", job.id.to_string()),
                ("project_id", job.project_id.to_string()),
            ],
            Event::SubmitFailed { project, error } => vec![
                ("error", error.to_string()),
                ("project_id", project.id.to_string()),
                ("project_path", project.path_with_namespace.clone()),
            ],
            Event::RunCancelled => Vec::new(),
            Event::RunFinished { report, duration } => vec![
                ("cancelled", report.cancelled.to_string()),
                ("duration", format!("{duration:?}")),
                ("jobs_cleaned", report.jobs_cleaned().to_string()),
                ("projects_dispatched", report.projects_dispatched.to_string()),
                ("projects_skipped", report.projects_skipped.to_string()),
            ],
        }
    }
}

/// Append ` key=value`; values with whitespace, `=` or quotes are quoted.
pub fn push_field(out: &mut String, key: &str, value: &str) {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || c == '=' || c == '"');
    if needs_quotes {
        let _ = write!(out, " {key}={value:?}");
    } else {
        let _ = write!(out, " {key}={value}");
    }
}

/// `message key=value ...`
impl fmt::Display for Event<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut line = self.message().to_string();
        for (key, value) in self.fields() {
            push_field(&mut line, key, &value);
        }
        f.write_str(&line)
    }
}

/// Sink for run events. Shared by every pool thread.
pub trait Observer: Send + Sync {
    fn observe(&self, event: &Event<'_>);
}

/// Forwards events to the `log` facade (configured by [`setup_logging`](crate::utils::setup_logging)).
/// The message is the record text and the fields travel as structured key/values.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogObserver;

impl Observer for LogObserver {
    fn observe(&self, event: &Event<'_>) {
        let level = event.level();
        if !log::log_enabled!(level) {
            return;
        }
        let fields = event.fields();
        let kvs: &[(&str, String)] = &fields;
        log::logger().log(
            &log::Record::builder()
                .args(format_args!("{}", event.message()))
                .level(level)
                .target(module_path!())
                .module_path_static(Some(module_path!()))
                .file_static(Some(file!()))
                .line(Some(line!()))
                .key_values(&kvs)
                .build(),
        );
    }
}

/// Keeps rendered events in memory as `LEVEL message key=value ...` lines.
#[derive(Debug, Default)]
pub struct MemoryObserver {
    lines: Mutex<Vec<String>>,
}

impl MemoryObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.lock().unwrap().iter().any(|l| l.contains(needle))
    }

    /// Number of lines containing `needle`.
    pub fn count(&self, needle: &str) -> usize {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.contains(needle))
            .count()
    }
}

impl Observer for MemoryObserver {
    fn observe(&self, event: &Event<'_>) {
        self.lines
            .lock()
            .unwrap()
            .push(format!("{} {}", event.level(), event));
    }
}
