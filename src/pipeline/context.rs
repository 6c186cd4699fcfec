//! Run context and tuning: shared handles passed into every pool task.

use std::sync::Arc;

use crate::SweepOpts;
use crate::engine::gitlab::GitLabApi;
use crate::engine::observe::{Event, Observer};
use crate::engine::{CancelToken, Policy};

/// Pool sizes and page size for one run.
#[derive(Clone, Copy, Debug)]
pub struct PipelineTuning {
    pub outer_pool_size: usize,
    pub inner_pool_size: usize,
    pub per_page: u32,
}

impl From<&SweepOpts> for PipelineTuning {
    fn from(o: &SweepOpts) -> Self {
        PipelineTuning {
            outer_pool_size: o.outer_pool_size,
            inner_pool_size: o.inner_pool_size,
            per_page: o.per_page,
        }
    }
}

/// Everything a task needs: the remote API, the policy, the event sink and the cancellation
/// scope. Cloning only bumps reference counts.
#[derive(Clone)]
pub struct RunContext {
    pub api: Arc<dyn GitLabApi>,
    pub policy: Arc<Policy>,
    pub observer: Arc<dyn Observer>,
    pub cancel: CancelToken,
    pub per_page: u32,
}

impl RunContext {
    pub fn observe(&self, event: Event<'_>) {
        self.observer.observe(&event);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
