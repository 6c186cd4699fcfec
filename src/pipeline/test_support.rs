//! Scripted `GitLabApi` and run context for the pipeline unit tests.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::engine::gitlab::{ApiError, DeleteResponse, GitLabApi};
use crate::engine::{CancelToken, MemoryObserver, Observer, Policy, PolicyOpts};
use crate::{Artifact, Job, Project};

use super::context::RunContext;

/// One page of jobs per project; delete answers scripted per job id (204 otherwise).
#[derive(Default)]
pub struct StubApi {
    pub jobs: HashMap<u64, Vec<Job>>,
    pub delete_results: HashMap<u64, Result<DeleteResponse, ApiError>>,
    pub deletes: Mutex<Vec<u64>>,
}

impl GitLabApi for StubApi {
    fn list_projects(&self, _page: u32, _per_page: u32) -> Result<Vec<Project>, ApiError> {
        Ok(Vec::new())
    }

    fn list_jobs(&self, project_id: u64, page: u32, _per_page: u32) -> Result<Vec<Job>, ApiError> {
        Ok(match page {
            1 => self.jobs.get(&project_id).cloned().unwrap_or_default(),
            _ => Vec::new(),
        })
    }

    fn delete_artifacts(&self, _project_id: u64, job_id: u64) -> Result<DeleteResponse, ApiError> {
        self.deletes.lock().unwrap().push(job_id);
        self.delete_results
            .get(&job_id)
            .cloned()
            .unwrap_or(Ok(DeleteResponse {
                status: 204,
                body: String::new(),
            }))
    }
}

/// Old job with one artifact, eligible under any short threshold.
pub fn old_job(id: u64, project_id: u64) -> Job {
    let mut job = Job::new(id, project_id);
    job.created_at = Some(Utc::now() - chrono::TimeDelta::days(30));
    job.artifacts = vec![Artifact { size: 10 }];
    job
}

pub fn context(api: Arc<StubApi>, dry_run: bool) -> (RunContext, Arc<MemoryObserver>) {
    let opts = PolicyOpts {
        paths: vec![".".to_string()],
        threshold_duration: std::time::Duration::from_secs(3600),
        threshold_size: None,
        dry_run,
    };
    let observer = Arc::new(MemoryObserver::new());
    let ctx = RunContext {
        api,
        policy: Arc::new(Policy::new(&opts, Utc::now()).unwrap()),
        observer: Arc::clone(&observer) as Arc<dyn Observer>,
        cancel: CancelToken::new(),
        per_page: 100,
    };
    (ctx, observer)
}
