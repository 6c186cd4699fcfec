//! CLI command handler: resolve settings (defaults < file < env < flags) and run the cleanup.

use anyhow::{Context, Result, bail};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::SweepOpts;
use crate::engine::arg_parser::{ArtifactsArgs, Cli, Commands};
use crate::engine::{CancelToken, GitLabClient, LogObserver};
use crate::utils::sweeper_toml::{SweeperToml, apply_file_to_opts, load_sweeper_toml};
use crate::utils::{EnvKeys, PackagePaths, get_token, setup_logging};

/// Everything the artifacts command needs once flags, env and file are merged.
#[derive(Debug)]
pub struct ArtifactsSettings {
    pub server: String,
    pub token: String,
    pub opts: SweepOpts,
}

/// Run the selected subcommand.
pub fn handle_run(cli: &Cli) -> Result<()> {
    setup_logging(cli.verbose, cli.log_format);
    match &cli.command {
        Commands::Artifacts(args) => handle_artifacts(args),
    }
}

fn handle_artifacts(args: &ArtifactsArgs) -> Result<()> {
    let cwd = std::env::current_dir().context("current directory")?;
    let file = load_settings_file(args.config.as_deref(), &cwd)?;
    let server_fallback = std::env::var(EnvKeys::SERVER_FALLBACK).ok();
    let token = match &args.token {
        Some(t) => Some(t.clone()),
        None => get_token(&cwd)?,
    };
    let settings = resolve_settings(args, file.as_ref(), server_fallback, token)?;

    if settings.opts.dry_run {
        warn!("RUNNING IN DRY-RUN MODE. NO ARTIFACTS WILL BE DELETED.");
    }
    let client = GitLabClient::new(&settings.server, &settings.token)
        .context("GitLab client initialization")?;
    debug!("Using GitLab API at {}", client.base_url());

    let cancel = CancelToken::new();
    cancel.cancel_on_ctrlc()?;
    let report = crate::clean_artifacts(
        Arc::new(client),
        &settings.opts,
        Arc::new(LogObserver),
        cancel,
    )?;
    if report.cancelled {
        warn!("Run interrupted before every project was listed");
    } else {
        info!(
            "{} job(s) cleaned across {} project(s)",
            report.jobs_cleaned(),
            report.projects_dispatched
        );
    }
    Ok(())
}

/// Explicit `--config` must exist; the default `.gitlab-sweeper.toml` is optional.
fn load_settings_file(explicit: Option<&Path>, cwd: &Path) -> Result<Option<SweeperToml>> {
    match explicit {
        Some(path) => {
            if !path.is_file() {
                bail!("settings file {} not found", path.display());
            }
            Ok(load_sweeper_toml(path))
        }
        None => {
            let path: PathBuf = cwd.join(PackagePaths::get().config_filename());
            Ok(load_sweeper_toml(&path))
        }
    }
}

/// Merge file values, then env/flags (already combined by clap), and check the required ones.
/// `server_fallback` is used when neither flag, CI_API_V4_URL nor file give a server.
pub fn resolve_settings(
    args: &ArtifactsArgs,
    file: Option<&SweeperToml>,
    server_fallback: Option<String>,
    token: Option<String>,
) -> Result<ArtifactsSettings> {
    let mut opts = SweepOpts::default();
    if let Some(f) = file {
        apply_file_to_opts(f, &mut opts)?;
    }
    if !args.paths.is_empty() {
        opts.paths = args.paths.clone();
    }
    if let Some(d) = args.threshold_duration {
        opts.threshold_duration = d;
    }
    if let Some(s) = args.threshold_size {
        opts.threshold_size = Some(s);
    }
    if let Some(d) = args.dry_run {
        opts.dry_run = d;
    }
    if let Some(n) = args.outer_pool_size {
        opts.outer_pool_size = n;
    }
    if let Some(n) = args.inner_pool_size {
        opts.inner_pool_size = n;
    }
    opts.paths.retain(|p| !p.trim().is_empty());

    let server = args
        .server
        .clone()
        .or(server_fallback)
        .or_else(|| file.and_then(|f| f.server()).map(str::to_string))
        .filter(|s| !s.trim().is_empty());
    let token = token.filter(|t| !t.trim().is_empty());

    let mut missing = Vec::new();
    if opts.paths.is_empty() {
        missing.push("\"paths\"");
    }
    if server.is_none() {
        missing.push("\"server\"");
    }
    if token.is_none() {
        missing.push("\"token\"");
    }
    match (server, token) {
        (Some(server), Some(token)) if missing.is_empty() => Ok(ArtifactsSettings {
            server,
            token,
            opts,
        }),
        _ => bail!("required option(s) {} not set", missing.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::sweeper_toml::parse_sweeper_toml;
    use clap::Parser;
    use std::time::Duration;

    fn args(extra: &[&str]) -> ArtifactsArgs {
        let mut argv = vec!["gitlab-sweeper", "artifacts"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Artifacts(a) => a,
        }
    }

    #[test]
    fn flags_override_file() {
        let file = parse_sweeper_toml(
            r#"
            [artifacts]
            server = "file.example.com"
            paths = ["^file/.*$"]
            threshold_duration = "1d"
            outer_pool_size = 3
            "#,
        )
        .unwrap();
        let a = args(&[
            "--server",
            "flag.example.com",
            "--paths",
            "^flag/.*$",
            "--inner-pool-size",
            "5",
        ]);
        let s = resolve_settings(&a, Some(&file), None, Some("tok".into())).unwrap();
        assert_eq!(s.server, "flag.example.com");
        assert_eq!(s.opts.paths, vec!["^flag/.*$"]);
        assert_eq!(s.opts.threshold_duration, Duration::from_secs(24 * 3600));
        assert_eq!(s.opts.outer_pool_size, 3);
        assert_eq!(s.opts.inner_pool_size, 5);
    }

    #[test]
    fn server_fallback_beats_file() {
        let file = parse_sweeper_toml("[artifacts]\nserver = \"file.example.com\"").unwrap();
        let mut a = args(&["--paths", "^x$"]);
        a.server = None;
        let s = resolve_settings(
            &a,
            Some(&file),
            Some("ci.example.com".into()),
            Some("tok".into()),
        )
        .unwrap();
        assert_eq!(s.server, "ci.example.com");
    }

    #[test]
    fn lists_every_missing_option() {
        let mut a = args(&[]);
        a.server = None;
        a.paths.clear();
        let err = resolve_settings(&a, None, None, None).unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"required option(s) "paths", "server", "token" not set"#
        );
    }

    #[test]
    fn explicit_settings_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = load_settings_file(Some(&missing), dir.path()).unwrap_err();
        assert!(err.to_string().contains("not found"));
        // Default file is optional.
        assert!(load_settings_file(None, dir.path()).unwrap().is_none());
    }

    #[test]
    fn blank_values_count_as_missing() {
        let a = args(&["--server", "gitlab.example.com", "--paths", " "]);
        let err = resolve_settings(&a, None, None, Some("  ".into())).unwrap_err();
        assert_eq!(err.to_string(), r#"required option(s) "paths", "token" not set"#);
    }
}
