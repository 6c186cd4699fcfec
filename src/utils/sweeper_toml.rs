//! Load `.gitlab-sweeper.toml` (CLI only). Lib callers build [`SweepOpts`] themselves.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::SweepOpts;

#[derive(Debug, Default, Deserialize)]
pub struct SweeperToml {
    #[serde(default)]
    artifacts: ArtifactsSection,
}

#[derive(Debug, Default, Deserialize)]
struct ArtifactsSection {
    server: Option<String>,
    paths: Option<Vec<String>>,
    threshold_duration: Option<String>,
    threshold_size: Option<u64>,
    dry_run: Option<bool>,
    outer_pool_size: Option<usize>,
    inner_pool_size: Option<usize>,
}

impl SweeperToml {
    pub fn server(&self) -> Option<&str> {
        self.artifacts.server.as_deref()
    }
}

/// Parse settings from a TOML string.
pub fn parse_sweeper_toml(s: &str) -> Result<SweeperToml> {
    toml::from_str(s).context("parse settings file")
}

/// Load the settings file at `path` if present. Returns None if missing or unreadable.
pub fn load_sweeper_toml(path: &Path) -> Option<SweeperToml> {
    let s = std::fs::read_to_string(path).ok()?;
    parse_sweeper_toml(&s)
        .map_err(|e| log::warn!("{}: {:#}", path.display(), e))
        .ok()
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($section:expr, $opts:expr, $field:ident) => {
        if let Some(v) = $section.$field.clone() {
            $opts.$field = v;
        }
    };
}

/// Apply file settings to opts (only fields present in the file). Call before applying CLI/env.
pub fn apply_file_to_opts(file: &SweeperToml, opts: &mut SweepOpts) -> Result<()> {
    let section = &file.artifacts;
    apply_file_opt!(section, opts, paths);
    apply_file_opt!(section, opts, dry_run);
    apply_file_opt!(section, opts, outer_pool_size);
    apply_file_opt!(section, opts, inner_pool_size);
    if let Some(size) = section.threshold_size {
        opts.threshold_size = Some(size);
    }
    if let Some(ref d) = section.threshold_duration {
        opts.threshold_duration = humantime::parse_duration(d)
            .with_context(|| format!("invalid threshold_duration '{d}' in settings file"))?;
    }
    Ok(())
}
