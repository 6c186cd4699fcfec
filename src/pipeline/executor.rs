//! Deletes the artifacts of one eligible job. Best effort: failures are reported, never raised.

use std::sync::Arc;

use crate::Job;
use crate::engine::CancelToken;
use crate::engine::gitlab::GitLabApi;
use crate::engine::observe::{Event, Observer};

use super::context::RunContext;

/// What happened to one job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// 2xx from the delete endpoint.
    Deleted,
    /// Dry-run: the delete call was skipped.
    DryRun,
    /// Non-2xx from the delete endpoint.
    Rejected,
    /// Transport failure.
    Failed,
    /// Run cancelled before the call was issued.
    Cancelled,
}

impl Outcome {
    /// Outcomes that count as cleaned in the project summary.
    pub fn is_cleaned(self) -> bool {
        matches!(self, Outcome::Deleted | Outcome::DryRun)
    }
}

#[derive(Clone)]
pub struct ActionExecutor {
    api: Arc<dyn GitLabApi>,
    observer: Arc<dyn Observer>,
    cancel: CancelToken,
    dry_run: bool,
}

impl ActionExecutor {
    pub fn new(ctx: &RunContext) -> Self {
        Self {
            api: Arc::clone(&ctx.api),
            observer: Arc::clone(&ctx.observer),
            cancel: ctx.cancel.clone(),
            dry_run: ctx.policy.dry_run(),
        }
    }

    /// Delete `job`'s artifacts (or pretend to, in dry-run) and set `job.cleaned` from the outcome.
    pub fn execute(&self, job: &mut Job) -> Outcome {
        let outcome = self.outcome_for(job);
        job.cleaned = outcome.is_cleaned();
        outcome
    }

    fn outcome_for(&self, job: &Job) -> Outcome {
        if self.dry_run {
            self.observer.observe(&Event::DryRunSkip { job });
            return Outcome::DryRun;
        }
        if self.cancel.is_cancelled() {
            self.observer.observe(&Event::DeleteCancelled { job });
            return Outcome::Cancelled;
        }
        match self.api.delete_artifacts(job.project_id, job.id) {
            Err(error) => {
                self.observer.observe(&Event::DeleteFailed { job, error: &error });
                Outcome::Failed
            }
            Ok(response) if !response.is_success() => {
                self.observer.observe(&Event::DeleteRejected {
                    job,
                    status: response.status,
                    body: &response.body,
                });
                Outcome::Rejected
            }
            Ok(_) => {
                self.observer.observe(&Event::JobCleaned { job });
                Outcome::Deleted
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::gitlab::{ApiError, DeleteResponse};
    use crate::pipeline::test_support::{StubApi, context, old_job};

    fn stub(job_id: u64, result: Result<DeleteResponse, ApiError>) -> Arc<StubApi> {
        let mut api = StubApi::default();
        api.delete_results.insert(job_id, result);
        Arc::new(api)
    }

    #[test]
    fn deleted_on_2xx() {
        let api = Arc::new(StubApi::default());
        let (ctx, observer) = context(api.clone(), false);
        let mut job = old_job(1, 7);
        assert_eq!(ActionExecutor::new(&ctx).execute(&mut job), Outcome::Deleted);
        assert!(job.cleaned);
        assert_eq!(*api.deletes.lock().unwrap(), vec![1]);
        assert!(observer.contains("DEBUG deleted job's artifacts job_id=1 project_id=7"));
    }

    #[test]
    fn dry_run_skips_the_call() {
        let api = Arc::new(StubApi::default());
        let (ctx, observer) = context(api.clone(), true);
        let mut job = old_job(1, 7);
        assert_eq!(ActionExecutor::new(&ctx).execute(&mut job), Outcome::DryRun);
        assert!(job.cleaned);
        assert!(api.deletes.lock().unwrap().is_empty());
        assert!(observer.contains("running in dry run mode"));
    }

    #[test]
    fn rejected_on_non_2xx() {
        let api = stub(
            1,
            Ok(DeleteResponse {
                status: 403,
                body: "forbidden".into(),
            }),
        );
        let (ctx, observer) = context(api, false);
        let mut job = old_job(1, 7);
        assert_eq!(ActionExecutor::new(&ctx).execute(&mut job), Outcome::Rejected);
        assert!(!job.cleaned);
        assert!(observer.contains("response=forbidden status=403"));
    }

    #[test]
    fn failed_on_transport_error() {
        let api = stub(1, Err(ApiError::Transport("timed out".into())));
        let (ctx, observer) = context(api, false);
        let mut job = old_job(1, 7);
        assert_eq!(ActionExecutor::new(&ctx).execute(&mut job), Outcome::Failed);
        assert!(!job.cleaned);
        assert!(observer.contains("timed out"));
    }

    #[test]
    fn cancelled_before_the_call_is_reported() {
        let api = Arc::new(StubApi::default());
        let (ctx, observer) = context(api.clone(), false);
        ctx.cancel.cancel();
        let mut job = old_job(1, 7);
        assert_eq!(ActionExecutor::new(&ctx).execute(&mut job), Outcome::Cancelled);
        assert!(!job.cleaned);
        assert!(api.deletes.lock().unwrap().is_empty());
        assert!(observer.contains(
            "WARN run cancelled, skipping job's artifacts deletion job_id=1 project_id=7"
        ));
    }
}
