//! GitLab token loading: env (GITLAB_TOKEN, GL_TOKEN) → .env in dir → secure prompt.

use anyhow::{Context, Result};
use colored::Colorize;
use log::{debug, info};
use std::io::IsTerminal;
use std::path::Path;

use crate::utils::config::EnvKeys;

const ENV_KEYS: [&str; 2] = [EnvKeys::TOKEN, EnvKeys::TOKEN_FALLBACK];

fn first_env_value() -> Option<String> {
    ENV_KEYS.iter().find_map(|key| {
        let s = std::env::var(key).ok()?;
        let s = s.trim().to_string();
        (!s.is_empty()).then_some(s)
    })
}

fn try_env_then_dotenv(dir: &Path) -> Option<String> {
    if let Some(s) = first_env_value() {
        return Some(s);
    }
    let env_path = dir.join(".env");
    if env_path.is_file() {
        let _ = dotenvy::from_path(&env_path);
        return first_env_value();
    }
    None
}

/// Read the token: env → `.env` in `dir` → secure prompt (only when stdin is a terminal).
/// `Ok(None)` when none of them yields a non-empty token.
pub fn get_token(dir: &Path) -> Result<Option<String>> {
    if let Some(s) = try_env_then_dotenv(dir) {
        debug!("Token found in environment");
        return Ok(Some(s));
    }
    if !std::io::stdin().is_terminal() {
        return Ok(None);
    }
    info!("No token in environment; a maintainer token is needed to delete artifacts");
    let label = format!("[{}]", env!("CARGO_PKG_NAME")).cyan().bold();
    let token = rpassword::prompt_password(format!("{} GitLab token: ", label))
        .context("read token")?;
    let token = token.trim().to_string();
    Ok((!token.is_empty()).then_some(token))
}
