use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::utils::config::EnvKeys;
pub use crate::utils::logger::LogFormat;

/// Parse a humantime duration (`72h`, `7d`, `1h 30m`).
pub fn parse_duration(s: &str) -> Result<Duration, humantime::DurationError> {
    humantime::parse_duration(s)
}

/// Concurrent GitLab job artifacts cleaner.
#[derive(Clone, Debug, Parser)]
#[command(name = "gitlab-sweeper", version)]
#[command(about = "Clean GitLab storage; use `artifacts --dry-run` to list without deleting.")]
pub struct Cli {
    /// Verbose output.
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Delete artifacts of outdated jobs in the matching projects.
    Artifacts(ArtifactsArgs),
}

/// Every value is optional here: missing ones come from `.gitlab-sweeper.toml` or defaults.
#[derive(Clone, Debug, Args)]
pub struct ArtifactsArgs {
    /// GitLab server (`https://host/api/v4` or bare host). Falls back to CI_SERVER_HOST.
    #[arg(long, env = EnvKeys::SERVER)]
    pub server: Option<String>,

    /// Token with maintainer rights. Falls back to GL_TOKEN, `.env`, then a prompt.
    #[arg(long, env = EnvKeys::TOKEN, hide_env_values = true)]
    pub token: Option<String>,

    /// Regexps matched against project paths (with namespace). Comma separated or repeated.
    #[arg(long, env = EnvKeys::PATHS, value_delimiter = ',', num_args = 1..)]
    pub paths: Vec<String>,

    /// Jobs created less than this long before the run are kept. Default: 7d.
    #[arg(long, env = EnvKeys::THRESHOLD_DURATION, value_parser = parse_duration)]
    pub threshold_duration: Option<Duration>,

    /// Only clean jobs whose artifacts total at least this many bytes.
    #[arg(long, env = EnvKeys::THRESHOLD_SIZE)]
    pub threshold_size: Option<u64>,

    /// Report what would be deleted without deleting anything.
    #[arg(long, env = EnvKeys::DRY_RUN, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub dry_run: Option<bool>,

    /// Projects processed concurrently. Default: 10.
    #[arg(long)]
    pub outer_pool_size: Option<usize>,

    /// Artifact deletions in flight across all projects. Default: 1000.
    #[arg(long)]
    pub inner_pool_size: Option<usize>,

    /// Settings file. Default: `.gitlab-sweeper.toml` in the current directory.
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,
}
