//! gitlab-sweeper: concurrent GitLab job artifacts cleaner

pub mod engine;
pub mod pipeline;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

use log::debug;
use std::sync::Arc;

use engine::{CancelToken, GitLabApi, Observer};

/// Result alias used by public sweeper API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Single entry point: stream the projects visible to `api`, keep those matching `opts.paths`,
/// and delete the artifacts of their eligible jobs.
///
/// - **`observer`** receives every run event ([`LogObserver`](engine::LogObserver) forwards to `log`,
///   [`MemoryObserver`](engine::MemoryObserver) keeps them in memory).
/// - **`cancel`** stops new requests and submissions; dispatched work still drains.
///
/// Returns `Err` only when the run cannot start (invalid options, pool construction). Remote
/// failures are reported to `observer` and never abort the run.
///
/// ```ignore
/// let api = Arc::new(GitLabClient::new("gitlab.example.com", &token)?);
/// let opts = SweepOpts { paths: vec!["^group/.*$".into()], ..Default::default() };
/// let report = gitlab_sweeper::clean_artifacts(api, &opts, Arc::new(LogObserver), CancelToken::new())?;
/// ```
pub fn clean_artifacts(
    api: Arc<dyn GitLabApi>,
    opts: &SweepOpts,
    observer: Arc<dyn Observer>,
    cancel: CancelToken,
) -> Result<RunReport> {
    let config_str = format!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_string().to_uppercase(),
        opts
    );
    debug!("{}", config_str);
    pipeline::run_cleanup(api, opts, observer, cancel)
}
