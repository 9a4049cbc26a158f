//! Reading the version a repository currently pins
//!
//! A usage is a file (local or in a hosted repository) plus a parser that
//! pulls one version string out of it.
//!
//! # Modules
//!
//! - [`source`]: source classification and reading
//! - [`paths`]: alias and checkout-root normalization
//! - [`parser`]: regexp, YAML query and lock-file extraction
//! - [`query`]: the path query language used by the YAML parser

pub mod parser;
pub mod paths;
pub mod query;
pub mod source;

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::config::FETCH_TIMEOUT_SECS;
use crate::credentials::Credentials;
use crate::error::{PathError, UsageError};
use crate::fetch::DEFAULT_GITHUB_API;
use crate::usage::parser::Parser;
use crate::usage::paths::PathsConfig;
use crate::usage::source::Source;
use crate::version::Version;

/// One place a dependency is pinned
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct UsageSpec {
    pub source: String,
    pub parser: Parser,
}

/// Everything reading a usage needs besides its spec
#[derive(Debug, Clone)]
pub struct UsageContext {
    pub client: reqwest::Client,
    pub credentials: Credentials,
    pub paths: Option<PathsConfig>,
    pub github_api: String,
}

impl UsageContext {
    pub fn new(credentials: Credentials, paths: Option<PathsConfig>) -> Result<Self, UsageError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("version-drift/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            credentials,
            paths,
            github_api: DEFAULT_GITHUB_API.to_string(),
        })
    }

    pub fn with_github_api(mut self, base_url: &str) -> Self {
        self.github_api = base_url.trim_end_matches('/').to_string();
        self
    }
}

/// Read a usage's source and turn the extracted text into a [`Version`]
pub async fn resolve_usage(spec: &UsageSpec, ctx: &UsageContext) -> Result<Version, UsageError> {
    let source = Source::parse(&spec.source)?;
    let text = source::read(&source, ctx).await?;
    let raw = spec.parser.extract(&text)?;
    debug!("{} yielded {:?} via {}", spec.source, raw, spec.parser.kind());
    Ok(Version::parse(&raw)?)
}

/// Local path a usage resolves to
pub fn local_path(spec: &UsageSpec, paths: Option<&PathsConfig>) -> Result<String, UsageError> {
    let source = Source::parse(&spec.source)?;
    match (paths, &source) {
        (Some(paths), _) => Ok(paths::normalize(&source, paths)?),
        (None, Source::Local(path)) => Ok(path.clone()),
        (None, Source::GitHub(_)) => Err(PathError::NotConfigured.into()),
    }
}
