// src/index.rs

//! Package index access
//!
//! This module provides:
//! - The `IndexClient` capability used by the resolver and the search database
//! - The subset of the index's JSON project document the resolver needs
//! - `PypiClient`, a blocking HTTP implementation against a PyPI-compatible index

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use reqwest::header::IF_MODIFIED_SINCE;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

/// Default package index
pub const DEFAULT_INDEX_URL: &str = "https://pypi.org";

/// Default timeout for HTTP requests (30 seconds)
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Project document returned by the index for one package
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectInfo {
    /// Distribution files keyed by release string
    #[serde(default)]
    pub releases: BTreeMap<String, Vec<Distribution>>,
}

/// One distribution file of a release
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Distribution {
    /// Runtime compatibility constraint, e.g. `>=3.8`
    #[serde(default)]
    pub requires_python: Option<String>,

    /// Yanked files are ignored by the resolver
    #[serde(default)]
    pub yanked: bool,
}

/// Read access to a package index
///
/// Implementations must distinguish "no such project" (`PackageNotFound`)
/// from every other failure (`IndexUnavailable`).
pub trait IndexClient: Sync {
    /// Fetch the project document for `name`
    fn project(&self, name: &str) -> Result<ProjectInfo>;

    /// Fetch the simple index listing of all project names (HTML)
    fn simple_index(&self) -> Result<String>;

    /// Whether the simple index listing changed after `since`
    fn simple_index_modified_since(&self, since: DateTime<Utc>) -> Result<bool>;
}

/// Blocking HTTP client for a PyPI-compatible index
pub struct PypiClient {
    client: Client,
    base_url: String,
}

impl PypiClient {
    /// Create a client for the index at `base_url` (e.g. `https://pypi.org`)
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(format!("pirg/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn project_url(&self, name: &str) -> String {
        format!("{}/pypi/{}/json", self.base_url, name)
    }

    fn simple_url(&self) -> String {
        format!("{}/simple/", self.base_url)
    }
}

/// Map a transport failure onto `IndexUnavailable`
fn transport_error(url: &str, e: reqwest::Error) -> Error {
    Error::IndexUnavailable {
        status: e.status().map(|s| s.as_u16()),
        message: format!("Request to {} failed: {}", url, e),
    }
}

/// Map an unsuccessful status onto `IndexUnavailable`
///
/// Success and `304 Not Modified` pass through.
fn status_error(url: &str, status: StatusCode) -> Option<Error> {
    if status.is_success() || status == StatusCode::NOT_MODIFIED {
        return None;
    }

    Some(Error::IndexUnavailable {
        status: Some(status.as_u16()),
        message: format!("HTTP {} from {}", status, url),
    })
}

/// Status mapping for project documents, where 404 means no such project
fn project_status_error(name: &str, url: &str, status: StatusCode) -> Option<Error> {
    if status == StatusCode::NOT_FOUND {
        return Some(Error::PackageNotFound(name.to_string()));
    }
    status_error(url, status)
}

/// Reject unsuccessful responses
fn check_status(url: &str, response: Response) -> Result<Response> {
    match status_error(url, response.status()) {
        Some(err) => Err(err),
        None => Ok(response),
    }
}

impl IndexClient for PypiClient {
    fn project(&self, name: &str) -> Result<ProjectInfo> {
        let url = self.project_url(name);
        debug!("Querying index: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| transport_error(&url, e))?;

        if let Some(err) = project_status_error(name, &url, response.status()) {
            return Err(err);
        }

        let body = response.text().map_err(|e| transport_error(&url, e))?;
        let project: ProjectInfo = serde_json::from_str(&body)?;

        debug!("{} has {} release(s) on the index", name, project.releases.len());
        Ok(project)
    }

    fn simple_index(&self) -> Result<String> {
        let url = self.simple_url();
        info!("Downloading package listing from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| transport_error(&url, e))?;

        check_status(&url, response)?
            .text()
            .map_err(|e| transport_error(&url, e))
    }

    fn simple_index_modified_since(&self, since: DateTime<Utc>) -> Result<bool> {
        let url = self.simple_url();
        let header = since.format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        debug!("HEAD {} with If-Modified-Since: {}", url, header);

        let response = self
            .client
            .head(&url)
            .header(IF_MODIFIED_SINCE, header)
            .send()
            .map_err(|e| transport_error(&url, e))?;

        let response = check_status(&url, response)?;
        Ok(response.status() != StatusCode::NOT_MODIFIED)
    }
}
