// src/config.rs

//! Runtime configuration
//!
//! Everything the resolver, the installer and the search database need is
//! carried in an explicit `Config` value built once by the front end. Nothing
//! is read from global state.

use crate::error::{Error, Result};
use crate::index::DEFAULT_INDEX_URL;
use crate::manifest;
use crate::version::Release;
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

/// Default search database file name (inside the system temp directory)
pub const SEARCH_DB_FILENAME: &str = "pirg_pkg_db.txt";

/// Default external package manager
pub const DEFAULT_PIP: &str = "pip";

/// Default interpreter probed for the runtime version
pub const DEFAULT_PYTHON: &str = "python3";

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the package index
    pub index_url: String,
    /// Runtime version releases must be compatible with; detected from
    /// `python` when unset
    pub python_version: Option<Release>,
    /// Interpreter asked for its version
    pub python: String,
    /// External package manager program
    pub pip: String,
    /// Manifest location; discovered from the working directory when unset
    pub requirements_path: Option<PathBuf>,
    /// Location of the search database
    pub db_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            index_url: DEFAULT_INDEX_URL.to_string(),
            python_version: None,
            python: DEFAULT_PYTHON.to_string(),
            pip: DEFAULT_PIP.to_string(),
            requirements_path: None,
            db_path: default_db_path(),
        }
    }
}

impl Config {
    /// Runtime version used for release eligibility
    pub fn runtime_version(&self) -> Result<Release> {
        match &self.python_version {
            Some(version) => Ok(version.clone()),
            None => detect_python_version(&self.python),
        }
    }

    /// Manifest to read and rewrite
    pub fn manifest_path(&self) -> Result<PathBuf> {
        match &self.requirements_path {
            Some(path) => Ok(path.clone()),
            None => Ok(manifest::find_manifest(&std::env::current_dir()?)),
        }
    }
}

/// `pirg_pkg_db.txt` in the system temp directory
pub fn default_db_path() -> PathBuf {
    std::env::temp_dir().join(SEARCH_DB_FILENAME)
}

/// Parse a runtime version given on the command line
pub fn parse_python_version(text: &str) -> Result<Release> {
    Release::parse(text)
        .ok_or_else(|| Error::Config(format!("Invalid Python version: {}", text)))
}

/// Ask `python` for its version (`Python 3.12.1`)
pub fn detect_python_version(python: &str) -> Result<Release> {
    let output = Command::new(python).arg("--version").output().map_err(|e| {
        Error::Config(format!(
            "Failed to run {} --version ({}); pass --python-version",
            python, e
        ))
    })?;

    // Very old interpreters print the version on stderr
    let text = if output.stdout.is_empty() {
        String::from_utf8_lossy(&output.stderr).into_owned()
    } else {
        String::from_utf8_lossy(&output.stdout).into_owned()
    };

    let version = version_from_banner(&text).ok_or_else(|| {
        Error::Config(format!(
            "Unrecognized output from {} --version: {}",
            python,
            text.trim()
        ))
    })?;

    debug!("Detected Python {} from {}", version, python);
    Ok(version)
}

/// Extract the version from a `Python X.Y.Z` banner
fn version_from_banner(banner: &str) -> Option<Release> {
    let mut words = banner.split_whitespace();
    match (words.next(), words.next()) {
        (Some("Python"), Some(version)) => Release::parse(version),
        _ => None,
    }
}
