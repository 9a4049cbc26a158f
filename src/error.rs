use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Invalid version: {0:?}")]
    Parse(String),

    #[error("Invalid version spec: {0:?}")]
    InvalidRange(String),
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Cache lock poisoned")]
    LockPoisoned,

    #[error("Failed to create cache directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {url}: {message}")]
    InvalidResponse { url: String, message: String },

    #[error("Invalid regexp: {0}")]
    Regex(#[from] regex::Error),

    #[error("Invalid selector {0:?}")]
    Selector(String),

    #[error("Selector {selector:?} matched nothing on {url}")]
    NoElements { url: String, selector: String },

    #[error("Helm repository {0} lists no charts")]
    EmptyIndex(String),

    #[error("Chart {chart:?} not found in {repo}")]
    ChartNotFound { repo: String, chart: String },

    #[error("git ls-remote failed for {url}: {message}")]
    Git { url: String, message: String },

    #[error("No versions found")]
    NoVersions,

    #[error("No valid versions")]
    NoValidVersions,

    #[error("No compatible version for {0:?}")]
    NoCompatibleVersion(String),

    #[error(transparent)]
    Version(#[from] VersionError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("No local checkout configured for {0}")]
    UnknownRepository(String),

    #[error("Alias table does not settle while expanding {0:?}")]
    AliasCycle(String),

    #[error("No path mapping configured")]
    NotConfigured,
}

#[derive(Debug, Error)]
pub enum UsageError {
    #[error("Unsupported source {0:?}: expected an absolute path or github.com/owner/repo/blob/ref/path")]
    InvalidSource(String),

    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unsupported host {0:?}: only github.com files can be read")]
    UnsupportedHost(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("{0} requires a path mapping or a credential")]
    NoAccess(String),

    #[error("Invalid regexp: {0}")]
    Regex(#[from] regex::Error),

    #[error("Pattern {0:?} did not match")]
    NoMatch(String),

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid query {query:?}: {message}")]
    InvalidQuery { query: String, message: String },

    #[error("Query {0:?} yielded nothing")]
    EmptyQuery(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Lock file has no pinned revision for input {0:?}")]
    LockInput(String),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Version(#[from] VersionError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid config at {field}: {message}")]
    Invalid { field: String, message: String },

    #[error("Unknown dependency {0:?}")]
    UnknownDependency(String),

    #[error("Unknown usage {usage:?} for dependency {dependency:?}")]
    UnknownUsage { dependency: String, usage: String },
}
