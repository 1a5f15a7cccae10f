// src/error.rs

use thiserror::Error;

/// Core error types for pirg
#[derive(Error, Debug)]
pub enum Error {
    /// A package token does not start with a valid package name
    #[error("Package {0} does not match pattern")]
    InvalidPackageToken(String),

    /// A specifier expression could not be parsed
    #[error("Invalid specifier: {0}")]
    InvalidSpecifier(String),

    /// The index has no project with this name
    #[error("Failed to find {0} on the package index")]
    PackageNotFound(String),

    /// Any other index failure (transport error or unexpected HTTP status)
    #[error("Package index unavailable: {message}")]
    IndexUnavailable {
        status: Option<u16>,
        message: String,
    },

    /// The requested specifier matches none of the eligible releases
    #[error("Not valid specifier set: {specifier} matches no release of {name}")]
    UnsatisfiableSpecifier { name: String, specifier: String },

    /// No release of the package supports the configured runtime
    #[error("No release of {name} supports Python {runtime}")]
    NoCompatibleRelease { name: String, runtime: String },

    /// A passthrough argument is on the deny-list
    #[error("{0} is disabled")]
    DisabledArgument(String),

    /// The external package manager exited unsuccessfully
    #[error("Package manager exited with code {code}")]
    InstallerFailed { code: i32 },

    /// The search database has no entries
    #[error("Empty DB")]
    EmptyDatabase,

    /// The search database has not been created yet
    #[error("Package names file doesn't exist at {0}. Please run `initdb` first.")]
    DatabaseNotFound(String),

    /// Configuration could not be established
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed index response
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Process exit code reported for this error
    ///
    /// Index failures surface the HTTP status, installer failures the
    /// installer's own exit code and I/O failures the OS errno.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::DisabledArgument(_) => 4001,
            Error::InvalidPackageToken(_) => 4002,
            Error::InvalidSpecifier(_)
            | Error::UnsatisfiableSpecifier { .. }
            | Error::NoCompatibleRelease { .. } => 4003,
            Error::EmptyDatabase => 4004,
            Error::DatabaseNotFound(_) => 4005,
            Error::Config(_) => 4006,
            Error::PackageNotFound(_) => 404,
            Error::IndexUnavailable { status, .. } => status.map_or(1, i32::from),
            Error::InstallerFailed { code } => *code,
            Error::Io(e) => e.raw_os_error().unwrap_or(1),
            Error::Json(_) => 1,
        }
    }
}

/// Result type alias using pirg's Error type
pub type Result<T> = std::result::Result<T, Error>;
