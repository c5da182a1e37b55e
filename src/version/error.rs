use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionParseError {
    #[error("Empty version string")]
    Empty,

    #[error("Invalid version '{0}'")]
    Invalid(String),

    #[error("Version component out of range in '{0}'")]
    Overflow(String),
}

/// Errors raised by a feed channel. Captured per source, never fatal to a resolution.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Unsupported feed: {0}")]
    Unsupported(String),

    #[error("Fetch was cancelled")]
    Cancelled,

    #[error("Fetch task failed: {0}")]
    TaskFailed(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path:?}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Failed to parse settings file {path:?}: {source}")]
    Settings {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("No prerelease versions of '{package_id}' are available on any source")]
    NoPrereleaseVersionsAvailable { package_id: String },

    #[error("Package '{package_id}' was not found on any source ({failed_sources} source(s) failed)")]
    PackageNotFound {
        package_id: String,
        failed_sources: usize,
    },

    #[error("Resolution was cancelled")]
    Cancelled,

    #[error(transparent)]
    Config(#[from] ConfigError),
}
