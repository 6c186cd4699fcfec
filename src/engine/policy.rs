//! Inclusion and eligibility rules.
//!
//! Eligibility follows the age + expiry policy. A minimum artifacts size can be layered on top
//! but is disabled unless configured.

use chrono::{DateTime, TimeDelta, Utc};
use regex::Regex;
use std::time::Duration;
use thiserror::Error;

use crate::{Job, Project, SweepOpts};

/// Raw policy inputs (CLI, env, config file or lib caller).
#[derive(Clone, Debug, Default)]
pub struct PolicyOpts {
    pub paths: Vec<String>,
    pub threshold_duration: Duration,
    pub threshold_size: Option<u64>,
    pub dry_run: bool,
}

impl From<&SweepOpts> for PolicyOpts {
    fn from(o: &SweepOpts) -> Self {
        PolicyOpts {
            paths: o.paths.clone(),
            threshold_duration: o.threshold_duration,
            threshold_size: o.threshold_size,
            dry_run: o.dry_run,
        }
    }
}

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("at least one project path regexp is required")]
    NoPaths,
    #[error("project path regexp #{0} is blank and would match every project")]
    BlankPattern(usize),
    #[error("invalid regexp '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("threshold duration must be greater than zero")]
    ZeroThresholdDuration,
    #[error("threshold duration {0:?} is out of range")]
    ThresholdDurationOutOfRange(Duration),
    #[error("threshold size must be greater than zero when set")]
    ZeroThresholdSize,
}

/// Validated, immutable policy for one run.
#[derive(Clone, Debug)]
pub struct Policy {
    patterns: Vec<Regex>,
    threshold_size: Option<u64>,
    started_at: DateTime<Utc>,
    created_before: DateTime<Utc>,
    dry_run: bool,
}

impl Policy {
    /// Compile patterns and derive the age cut-off from `now` (the run start).
    pub fn new(opts: &PolicyOpts, now: DateTime<Utc>) -> Result<Self, PolicyError> {
        if opts.paths.is_empty() {
            return Err(PolicyError::NoPaths);
        }
        if let Some(i) = opts.paths.iter().position(|p| p.trim().is_empty()) {
            return Err(PolicyError::BlankPattern(i + 1));
        }
        let patterns = opts
            .paths
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|source| PolicyError::InvalidPattern {
                    pattern: p.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if opts.threshold_duration.is_zero() {
            return Err(PolicyError::ZeroThresholdDuration);
        }
        let created_before = TimeDelta::from_std(opts.threshold_duration)
            .ok()
            .and_then(|age| now.checked_sub_signed(age))
            .ok_or(PolicyError::ThresholdDurationOutOfRange(
                opts.threshold_duration,
            ))?;

        if opts.threshold_size == Some(0) {
            return Err(PolicyError::ZeroThresholdSize);
        }

        Ok(Self {
            patterns,
            threshold_size: opts.threshold_size,
            started_at: now,
            created_before,
            dry_run: opts.dry_run,
        })
    }

    /// Run start; expiry is compared against it.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// `started_at - threshold_duration`; jobs created at or after it are too recent.
    pub fn created_before(&self) -> DateTime<Utc> {
        self.created_before
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn includes(&self, project: &Project) -> bool {
        project.matches(&self.patterns)
    }
}

/// True iff `path` matches at least one pattern. No patterns never matches.
pub fn matches_any(path: &str, patterns: &[Regex]) -> bool {
    patterns.iter().any(|r| r.is_match(path))
}

/// Whether the artifacts of `job` should be deleted under `policy`.
///
/// - no artifacts: no
/// - created at or after `created_before`: no (too recent)
/// - artifacts already expired: no (GitLab removes them itself)
/// - total size under the optional size threshold: no
///
/// Unknown creation date counts as old enough, unknown expiry as never expiring.
pub fn needs_cleanup(job: &Job, policy: &Policy) -> bool {
    if job.artifacts.is_empty() {
        return false;
    }
    if let Some(created_at) = job.created_at
        && created_at >= policy.created_before
    {
        return false;
    }
    if let Some(expire_at) = job.artifacts_expire_at
        && expire_at < policy.started_at
    {
        return false;
    }
    if let Some(min_size) = policy.threshold_size
        && job.artifacts_size() < min_size
    {
        return false;
    }
    true
}

impl Project {
    pub fn matches(&self, patterns: &[Regex]) -> bool {
        matches_any(&self.path_with_namespace, patterns)
    }
}

impl Job {
    pub fn needs_cleanup(&self, policy: &Policy) -> bool {
        needs_cleanup(self, policy)
    }
}
