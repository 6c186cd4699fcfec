//! Pipeline components: pools, listers, per-project fan-out, producer and orchestrator.

pub mod context;
pub mod executor;
pub mod lister;
pub mod orchestrator;
pub mod pool;
pub mod producer;
pub mod project;

#[cfg(test)]
mod test_support;

pub use context::{PipelineTuning, RunContext};
pub use executor::{ActionExecutor, Outcome};
pub use lister::{ListEnd, PagedLister, job_lister, project_lister};
pub use orchestrator::{create_pools, run_cleanup};
pub use pool::{PoolError, WorkerPool};
pub use producer::{ProducerStats, produce_projects, spawn_project_producer};
pub use project::{ProjectRun, merge_jobs, run_project};
