//! Application configuration constants.
//! Tuning and thresholds in one place.

use std::sync::OnceLock;
use std::time::Duration;

// ---- Package / names (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    config_filename: String,
    user_agent: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                config_filename: format!(".{pkg}.toml"),
                user_agent: format!("{pkg}/{}", env!("CARGO_PKG_VERSION")),
            }
        })
    }

    /// Optional settings file looked up in the working directory.
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

// ---- Environment ----

/// Environment variable names read by the CLI.
pub struct EnvKeys;

impl EnvKeys {
    pub const SERVER: &'static str = "CI_API_V4_URL";
    pub const SERVER_FALLBACK: &'static str = "CI_SERVER_HOST";
    pub const TOKEN: &'static str = "GITLAB_TOKEN";
    pub const TOKEN_FALLBACK: &'static str = "GL_TOKEN";
    pub const PATHS: &'static str = "CLEANER_PATHS";
    pub const DRY_RUN: &'static str = "CLEANER_DRY_RUN";
    pub const THRESHOLD_DURATION: &'static str = "CLEANER_THRESHOLD_DURATION";
    pub const THRESHOLD_SIZE: &'static str = "CLEANER_THRESHOLD_SIZE";
}

// ---- Worker pools ----

/// Default sizes of the two pools.
pub struct PoolSizes;

impl PoolSizes {
    /// Projects processed concurrently.
    pub const OUTER: usize = 10;
    /// Artifact deletions in flight across all projects.
    pub const INNER: usize = 1000;
}

// ---- Remote API ----

/// Items per listing page (GitLab maximum).
pub const PER_PAGE: u32 = 100;

/// GitLab "Maintainer" access level; only maintainers may delete job artifacts.
pub const MAINTAINER_ACCESS_LEVEL: u32 = 40;

/// Job scopes listed for cleanup: finished jobs only.
pub const JOB_SCOPES: [&str; 2] = ["failed", "success"];

/// Request timeout for every remote call.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

// ---- Policy ----

/// Jobs younger than this are never cleaned unless configured otherwise (7 days).
pub const DEFAULT_THRESHOLD_DURATION: Duration = Duration::from_secs(7 * 24 * 60 * 60);
