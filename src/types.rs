//! Public and internal types for the sweeper API and pipeline.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// A GitLab project as seen by the sweeper: only what is needed to filter and correlate logs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Project {
    pub id: u64,
    pub path_with_namespace: String,
}

impl Project {
    pub fn new(id: u64, path_with_namespace: impl Into<String>) -> Self {
        Self {
            id,
            path_with_namespace: path_with_namespace.into(),
        }
    }
}

/// One artifact attached to a job. Size is in bytes (0 when GitLab does not report it).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Artifact {
    pub size: u64,
}

/// A GitLab job with the fields used to decide whether its artifacts should be deleted.
///
/// `cleaned` is only ever set by [`ActionExecutor`](crate::pipeline::ActionExecutor), once the
/// outcome of the deletion (or dry-run skip) is known.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Job {
    pub id: u64,
    pub project_id: u64,
    pub artifacts: Vec<Artifact>,
    pub artifacts_expire_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub cleaned: bool,
}

impl Job {
    /// Job without artifacts nor timestamps. Fill the public fields for fixtures.
    pub fn new(id: u64, project_id: u64) -> Self {
        Self {
            id,
            project_id,
            artifacts: Vec::new(),
            artifacts_expire_at: None,
            created_at: None,
            cleaned: false,
        }
    }

    /// Sum of all artifact sizes, in bytes.
    pub fn artifacts_size(&self) -> u64 {
        self.artifacts.iter().map(|a| a.size).sum()
    }
}

/// Lifecycle of one project inside the outer pool. Transitions only move forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProjectState {
    Started,
    Splitting,
    Draining,
    Stopped,
}

/// Aggregated result for one project, produced when its task reaches [`ProjectState::Stopped`].
#[derive(Clone, Debug)]
pub struct ProjectSummary {
    pub project_id: u64,
    pub project_path: String,
    /// Jobs whose artifacts were deleted (or would have been, in dry-run).
    pub jobs_cleaned: usize,
    /// Eligible jobs handed to the inner pool.
    pub jobs_dispatched: usize,
    pub duration: Duration,
}

/// What a whole run did. Never encodes failure: per-entity errors only show up in logs.
#[derive(Clone, Debug, Default)]
pub struct RunReport {
    pub projects_dispatched: usize,
    pub projects_skipped: usize,
    pub summaries: Vec<ProjectSummary>,
    pub cancelled: bool,
}

impl RunReport {
    pub fn jobs_cleaned(&self) -> usize {
        self.summaries.iter().map(|s| s.jobs_cleaned).sum()
    }

    pub fn summary_for(&self, project_id: u64) -> Option<&ProjectSummary> {
        self.summaries.iter().find(|s| s.project_id == project_id)
    }
}

/// Lib-level options for [`clean_artifacts`](crate::clean_artifacts). The CLI builds the same
/// struct from flags, env and `.gitlab-sweeper.toml`.
#[derive(Clone, Debug)]
pub struct SweepOpts {
    /// Regexps matched against project `path_with_namespace` (OR-combined). Must not be empty.
    pub paths: Vec<String>,
    /// Jobs created less than this long ago are left alone.
    pub threshold_duration: Duration,
    /// Optional minimum total artifacts size (bytes) for a job to be cleaned.
    pub threshold_size: Option<u64>,
    /// Log what would be deleted without calling the delete endpoint.
    pub dry_run: bool,
    /// Number of projects processed concurrently.
    pub outer_pool_size: usize,
    /// Number of artifact deletions running concurrently across all projects.
    pub inner_pool_size: usize,
    /// Page size for every listing request.
    pub per_page: u32,
}

impl Default for SweepOpts {
    fn default() -> Self {
        use crate::utils::config::{DEFAULT_THRESHOLD_DURATION, PER_PAGE, PoolSizes};
        Self {
            paths: Vec::new(),
            threshold_duration: DEFAULT_THRESHOLD_DURATION,
            threshold_size: None,
            dry_run: false,
            outer_pool_size: PoolSizes::OUTER,
            inner_pool_size: PoolSizes::INNER,
            per_page: PER_PAGE,
        }
    }
}
