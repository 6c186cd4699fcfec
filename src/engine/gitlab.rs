//! GitLab REST capability: paged listing of projects and jobs, job artifacts deletion.
//!
//! The pipeline only sees the [`GitLabApi`] trait. [`GitLabClient`] is the blocking HTTP
//! implementation used by the CLI; tests plug an in-memory fake instead.

use chrono::{DateTime, Utc};
use log::debug;
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use thiserror::Error;

use crate::utils::config::{HTTP_TIMEOUT, JOB_SCOPES, MAINTAINER_ACCESS_LEVEL, PackagePaths};
use crate::{Artifact, Job, Project};

/// Failure of a single remote call. Never retried by the pipeline.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("decode response: {0}")]
    Decode(String),
    #[error("invalid server url '{0}'")]
    InvalidUrl(String),
    #[error("invalid token: {0}")]
    InvalidToken(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

/// Raw outcome of a delete call; the caller decides what counts as success.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeleteResponse {
    pub status: u16,
    pub body: String,
}

impl DeleteResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Remote operations consumed by the pipeline. Pages are 1-based.
pub trait GitLabApi: Send + Sync {
    /// Projects the token is a maintainer of (archived and pending-delete excluded).
    fn list_projects(&self, page: u32, per_page: u32) -> Result<Vec<Project>, ApiError>;

    /// Finished jobs (failed or success) of one project.
    fn list_jobs(&self, project_id: u64, page: u32, per_page: u32) -> Result<Vec<Job>, ApiError>;

    /// Delete every artifact of a job. `Err` only for transport failures.
    fn delete_artifacts(&self, project_id: u64, job_id: u64) -> Result<DeleteResponse, ApiError>;
}

/// Normalise a configured server into the REST v4 base URL.
///
/// Accepts the shapes GitLab CI exposes: `CI_API_V4_URL` (`https://host/api/v4`) and
/// `CI_SERVER_HOST` (bare `host`).
pub fn api_base_url(server: &str) -> Result<String, ApiError> {
    let trimmed = server.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ApiError::InvalidUrl(server.to_string()));
    }
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    let base = if with_scheme.ends_with("/api/v4") {
        with_scheme
    } else {
        format!("{with_scheme}/api/v4")
    };
    reqwest::Url::parse(&base).map_err(|_| ApiError::InvalidUrl(server.to_string()))?;
    Ok(base)
}

#[derive(Debug, Deserialize)]
struct WireProject {
    id: u64,
    path_with_namespace: String,
}

#[derive(Debug, Deserialize)]
struct WireArtifact {
    #[serde(default)]
    size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct WireJob {
    id: u64,
    #[serde(default)]
    artifacts: Vec<WireArtifact>,
    #[serde(default)]
    artifacts_expire_at: Option<DateTime<Utc>>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl From<WireProject> for Project {
    fn from(p: WireProject) -> Self {
        Project::new(p.id, p.path_with_namespace)
    }
}

impl WireJob {
    fn into_job(self, project_id: u64) -> Job {
        Job {
            id: self.id,
            project_id,
            artifacts: self
                .artifacts
                .into_iter()
                .map(|a| Artifact {
                    size: a.size.unwrap_or(0),
                })
                .collect(),
            artifacts_expire_at: self.artifacts_expire_at,
            created_at: self.created_at,
            cleaned: false,
        }
    }
}

/// Decode a `GET /projects` page.
pub fn decode_projects(body: &str) -> Result<Vec<Project>, ApiError> {
    let wire: Vec<WireProject> = serde_json::from_str(body)?;
    Ok(wire.into_iter().map(Project::from).collect())
}

/// Decode a `GET /projects/:id/jobs` page. The project id is not part of the job payload.
pub fn decode_jobs(project_id: u64, body: &str) -> Result<Vec<Job>, ApiError> {
    let wire: Vec<WireJob> = serde_json::from_str(body)?;
    Ok(wire.into_iter().map(|j| j.into_job(project_id)).collect())
}

/// Blocking GitLab client authenticated with a `PRIVATE-TOKEN`. No retries.
pub struct GitLabClient {
    base_url: String,
    http: Client,
}

impl GitLabClient {
    pub fn new(server: &str, token: &str) -> Result<Self, ApiError> {
        let base_url = api_base_url(server)?;
        let mut token_value =
            HeaderValue::from_str(token).map_err(|e| ApiError::InvalidToken(e.to_string()))?;
        token_value.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert("PRIVATE-TOKEN", token_value);

        let http = Client::builder()
            .user_agent(PackagePaths::get().user_agent())
            .default_headers(headers)
            .timeout(HTTP_TIMEOUT)
            .build()?;
        debug!("GitLab API base url: {}", base_url);
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Read the body of a listing response, turning non-2xx into [`ApiError::Status`].
    fn listing_body(response: Response) -> Result<String, ApiError> {
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

impl GitLabApi for GitLabClient {
    fn list_projects(&self, page: u32, per_page: u32) -> Result<Vec<Project>, ApiError> {
        let response = self
            .http
            .get(format!("{}/projects", self.base_url))
            .query(&[
                ("archived", "false".to_string()),
                ("include_pending_delete", "false".to_string()),
                ("membership", "true".to_string()),
                ("min_access_level", MAINTAINER_ACCESS_LEVEL.to_string()),
                ("simple", "true".to_string()),
                ("page", page.to_string()),
                ("per_page", per_page.to_string()),
            ])
            .send()?;
        decode_projects(&Self::listing_body(response)?)
    }

    fn list_jobs(&self, project_id: u64, page: u32, per_page: u32) -> Result<Vec<Job>, ApiError> {
        let scopes: Vec<(&str, &str)> = JOB_SCOPES.iter().map(|s| ("scope[]", *s)).collect();
        let response = self
            .http
            .get(format!("{}/projects/{}/jobs", self.base_url, project_id))
            .query(&scopes)
            .query(&[("page", page), ("per_page", per_page)])
            .send()?;
        decode_jobs(project_id, &Self::listing_body(response)?)
    }

    fn delete_artifacts(&self, project_id: u64, job_id: u64) -> Result<DeleteResponse, ApiError> {
        let response = self
            .http
            .delete(format!(
                "{}/projects/{}/jobs/{}/artifacts",
                self.base_url, project_id, job_id
            ))
            .send()?;
        let status = response.status().as_u16();
        // A body we cannot read is not worth failing the classification for.
        let body = response.text().unwrap_or_default();
        Ok(DeleteResponse { status, body })
    }
}
