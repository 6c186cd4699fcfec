//! In-memory GitLab used by the integration tests, plus job and option fixtures.

#![allow(dead_code)]

use chrono::{TimeDelta, Utc};
use gitlab_sweeper::engine::{ApiError, CancelToken, DeleteResponse, GitLabApi, MemoryObserver};
use gitlab_sweeper::{Artifact, Job, Project, RunReport, SweepOpts};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

pub const NOT_FOUND_BODY: &str = r#"{"message":"404 Not found"}"#;

/// Paged projects and jobs, scripted failures, and a log of every call received.
#[derive(Default)]
pub struct FakeGitLab {
    project_pages: Vec<Vec<Project>>,
    projects_error: Option<(u32, u16)>,
    job_pages: HashMap<u64, Vec<Vec<Job>>>,
    jobs_errors: HashMap<u64, (u32, u16)>,
    delete_statuses: HashMap<u64, (u16, String)>,
    delete_transport_errors: HashSet<u64>,
    delete_delay: Duration,
    cancel_on_delete: Option<CancelToken>,
    deleted: Mutex<HashSet<(u64, u64)>>,
    calls: Mutex<Vec<String>>,
    active_deletes: AtomicUsize,
    peak_deletes: AtomicUsize,
}

impl FakeGitLab {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project_page(mut self, projects: Vec<Project>) -> Self {
        self.project_pages.push(projects);
        self
    }

    /// Listing projects fails with `status` from `page` on.
    pub fn fail_projects_at(mut self, page: u32, status: u16) -> Self {
        self.projects_error = Some((page, status));
        self
    }

    pub fn job_page(mut self, project_id: u64, jobs: Vec<Job>) -> Self {
        self.job_pages.entry(project_id).or_default().push(jobs);
        self
    }

    pub fn fail_jobs_at(mut self, project_id: u64, page: u32, status: u16) -> Self {
        self.jobs_errors.insert(project_id, (page, status));
        self
    }

    pub fn delete_status(mut self, job_id: u64, status: u16, body: &str) -> Self {
        self.delete_statuses.insert(job_id, (status, body.to_string()));
        self
    }

    pub fn delete_transport_error(mut self, job_id: u64) -> Self {
        self.delete_transport_errors.insert(job_id);
        self
    }

    pub fn delete_delay(mut self, delay: Duration) -> Self {
        self.delete_delay = delay;
        self
    }

    /// Cancel `token` as soon as the first delete call comes in.
    pub fn cancel_on_delete(mut self, token: CancelToken) -> Self {
        self.cancel_on_delete = Some(token);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.calls_starting_with("DELETE ")
    }

    pub fn peak_deletes(&self) -> usize {
        self.peak_deletes.load(Ordering::SeqCst)
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

fn status_error(status: u16) -> ApiError {
    ApiError::Status {
        status,
        body: "an error".to_string(),
    }
}

fn page_of<T: Clone>(pages: &[Vec<T>], page: u32) -> Vec<T> {
    pages
        .get(page as usize - 1)
        .cloned()
        .unwrap_or_default()
}

impl GitLabApi for FakeGitLab {
    fn list_projects(&self, page: u32, _per_page: u32) -> Result<Vec<Project>, ApiError> {
        self.record(format!("GET /projects?page={page}"));
        if let Some((from, status)) = self.projects_error
            && page >= from
        {
            return Err(status_error(status));
        }
        Ok(page_of(&self.project_pages, page))
    }

    fn list_jobs(&self, project_id: u64, page: u32, _per_page: u32) -> Result<Vec<Job>, ApiError> {
        self.record(format!("GET /projects/{project_id}/jobs?page={page}"));
        if let Some(&(from, status)) = self.jobs_errors.get(&project_id)
            && page >= from
        {
            return Err(status_error(status));
        }
        Ok(self
            .job_pages
            .get(&project_id)
            .map(|pages| page_of(pages, page))
            .unwrap_or_default())
    }

    fn delete_artifacts(&self, project_id: u64, job_id: u64) -> Result<DeleteResponse, ApiError> {
        self.record(format!(
            "DELETE /projects/{project_id}/jobs/{job_id}/artifacts"
        ));
        if let Some(token) = &self.cancel_on_delete {
            token.cancel();
        }

        let active = self.active_deletes.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_deletes.fetch_max(active, Ordering::SeqCst);
        if !self.delete_delay.is_zero() {
            thread::sleep(self.delete_delay);
        }
        self.active_deletes.fetch_sub(1, Ordering::SeqCst);

        if self.delete_transport_errors.contains(&job_id) {
            return Err(ApiError::Transport("connection reset".to_string()));
        }
        if let Some((status, body)) = self.delete_statuses.get(&job_id) {
            return Ok(DeleteResponse {
                status: *status,
                body: body.clone(),
            });
        }
        let first_time = self.deleted.lock().unwrap().insert((project_id, job_id));
        Ok(if first_time {
            DeleteResponse {
                status: 204,
                body: String::new(),
            }
        } else {
            DeleteResponse {
                status: 404,
                body: NOT_FOUND_BODY.to_string(),
            }
        })
    }
}

// --- fixtures ---

/// Job created `created_ago` before now, expiring `expires_in` from now (None: never).
pub fn job(
    id: u64,
    project_id: u64,
    created_ago: TimeDelta,
    expires_in: Option<TimeDelta>,
    sizes: &[u64],
) -> Job {
    let now = Utc::now();
    let mut job = Job::new(id, project_id);
    job.created_at = Some(now - created_ago);
    job.artifacts_expire_at = expires_in.map(|d| now + d);
    job.artifacts = sizes.iter().map(|&size| Artifact { size }).collect();
    job
}

/// A job eligible under the default options: 30 days old, one artifact, no expiry.
pub fn old_job(id: u64, project_id: u64) -> Job {
    job(id, project_id, TimeDelta::days(30), None, &[1024])
}

pub fn opts(paths: &[&str]) -> SweepOpts {
    SweepOpts {
        paths: paths.iter().map(|p| p.to_string()).collect(),
        outer_pool_size: 2,
        inner_pool_size: 4,
        ..Default::default()
    }
}

/// Run a cleanup against `api` with a fresh cancellation token.
pub fn run(api: &Arc<FakeGitLab>, opts: &SweepOpts) -> (RunReport, Arc<MemoryObserver>) {
    run_with_cancel(api, opts, CancelToken::new())
}

pub fn run_with_cancel(
    api: &Arc<FakeGitLab>,
    opts: &SweepOpts,
    cancel: CancelToken,
) -> (RunReport, Arc<MemoryObserver>) {
    let observer = Arc::new(MemoryObserver::new());
    let report = gitlab_sweeper::clean_artifacts(
        Arc::clone(api) as Arc<dyn GitLabApi>,
        opts,
        Arc::clone(&observer) as Arc<dyn gitlab_sweeper::engine::Observer>,
        cancel,
    )
    .unwrap();
    (report, observer)
}
