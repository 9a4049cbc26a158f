//! Upstream fetch adapters
//!
//! Every upstream kind turns its source into either a single [`Version`] or a
//! list of raw [`Candidate`]s. Dispatch is one exhaustive `match` over
//! [`FetchKind`].
//!
//! # Modules
//!
//! - [`http`]: cached GET helper shared by every network adapter
//! - [`github`]: releases, tags and commits from the GitHub API
//! - [`git`]: `git ls-remote` fallback for private repositories
//! - [`html`]: CSS-selector scraping of changelog pages
//! - [`helm`]: chart repository `index.yaml`
//! - [`channel`]: rolling channel snapshots from an S3-style listing

pub mod channel;
pub mod git;
pub mod github;
pub mod helm;
pub mod html;
pub mod http;

use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;

use crate::cache::SourceCache;
use crate::config::FETCH_TIMEOUT_SECS;
use crate::credentials::Credentials;
use crate::error::{FetchError, VersionError};
use crate::fetch::git::{GitCli, RefLister};
use crate::version::Version;

/// Default base URL for GitHub API
pub const DEFAULT_GITHUB_API: &str = "https://api.github.com";

/// Upstream source configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FetchSpec {
    #[serde(flatten)]
    pub kind: FetchKind,
    /// Range selecting the "current" candidate
    #[serde(default, rename = "versionSpec")]
    pub version_spec: Option<String>,
    /// Keep prerelease candidates
    #[serde(default)]
    pub prerelease: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "kind")]
pub enum FetchKind {
    #[serde(rename = "github_release")]
    GitHubRelease(GitHubRepoSpec),
    #[serde(rename = "github_tag")]
    GitHubTag(GitHubRepoSpec),
    #[serde(rename = "github_commit")]
    GitHubCommit(GitHubCommitSpec),
    #[serde(rename = "html")]
    Html(HtmlSpec),
    #[serde(rename = "helm")]
    Helm(HelmSpec),
    #[serde(rename = "channel-snapshot")]
    ChannelSnapshot(ChannelSpec),
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GitHubRepoSpec {
    pub owner: String,
    pub repo: String,
    #[serde(default)]
    pub regexp: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GitHubCommitSpec {
    pub owner: String,
    pub repo: String,
    #[serde(default = "default_ref", rename = "ref")]
    pub reference: String,
    #[serde(default)]
    pub private: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HtmlSpec {
    pub url: String,
    pub selector: String,
    #[serde(default)]
    pub regexp: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HelmSpec {
    pub repo: String,
    pub chart: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ChannelSpec {
    pub channel: String,
    #[serde(default = "channel::default_listing_url")]
    pub url: String,
    #[serde(default)]
    pub prefix: Option<String>,
}

fn default_ref() -> String {
    "HEAD".to_string()
}

impl FetchKind {
    /// The narrowing regexp, for kinds that have one
    pub fn regexp(&self) -> Option<&str> {
        match self {
            FetchKind::GitHubRelease(spec) | FetchKind::GitHubTag(spec) => spec.regexp.as_deref(),
            FetchKind::Html(spec) => spec.regexp.as_deref(),
            FetchKind::GitHubCommit(_) | FetchKind::Helm(_) | FetchKind::ChannelSnapshot(_) => None,
        }
    }
}

/// A version string produced by an adapter, before `Version` construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub main: String,
    pub app: Option<String>,
    pub prerelease: Option<bool>,
}

impl Candidate {
    pub fn new(main: impl Into<String>) -> Self {
        Self {
            main: main.into(),
            app: None,
            prerelease: None,
        }
    }

    pub fn with_app(mut self, app: Option<String>) -> Self {
        self.app = app;
        self
    }

    pub fn with_prerelease(mut self, prerelease: Option<bool>) -> Self {
        self.prerelease = prerelease;
        self
    }

    fn into_semantic(self) -> Result<Version, VersionError> {
        Version::semantic_with(&self.main, self.app, self.prerelease)
    }
}

/// Adapter output
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    /// Single-valued source (commit)
    Single(Version),
    /// Unsorted candidate list
    Candidates(Vec<Version>),
}

/// Everything a fetch needs besides its spec
#[derive(Clone)]
pub struct FetchContext {
    pub client: reqwest::Client,
    pub cache: Arc<dyn SourceCache>,
    pub credentials: Credentials,
    /// Skip cache reads and refetch everything
    pub update: bool,
    pub github_api: String,
    pub ref_lister: Arc<dyn RefLister>,
}

impl FetchContext {
    pub fn new(cache: Arc<dyn SourceCache>, credentials: Credentials) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("version-drift/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            cache,
            credentials,
            update: false,
            github_api: DEFAULT_GITHUB_API.to_string(),
            ref_lister: Arc::new(GitCli::default()),
        })
    }

    pub fn with_update(mut self, update: bool) -> Self {
        self.update = update;
        self
    }

    pub fn with_github_api(mut self, base_url: &str) -> Self {
        self.github_api = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_ref_lister(mut self, ref_lister: Arc<dyn RefLister>) -> Self {
        self.ref_lister = ref_lister;
        self
    }
}

/// Run the adapter for a spec
pub async fn fetch(spec: &FetchSpec, ctx: &FetchContext) -> Result<Fetched, FetchError> {
    let semantic = |candidates: Vec<Candidate>| -> Result<Fetched, FetchError> {
        let versions = candidates
            .into_iter()
            .map(Candidate::into_semantic)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Fetched::Candidates(versions))
    };

    match &spec.kind {
        FetchKind::GitHubRelease(repo) => semantic(github::fetch_releases(repo, ctx).await?),
        FetchKind::GitHubTag(repo) => semantic(github::fetch_tags(repo, ctx).await?),
        FetchKind::GitHubCommit(commit) => {
            Ok(Fetched::Single(github::fetch_commit(commit, ctx).await?))
        }
        FetchKind::Html(page) => semantic(html::fetch_page(page, ctx).await?),
        FetchKind::Helm(chart) => semantic(helm::fetch_chart(chart, ctx).await?),
        FetchKind::ChannelSnapshot(channel) => Ok(Fetched::Candidates(
            channel::fetch_snapshots(channel, ctx).await?,
        )),
    }
}

/// Compile an optional narrowing regexp
pub fn compile(pattern: Option<&str>) -> Result<Option<Regex>, regex::Error> {
    pattern.map(Regex::new).transpose()
}

/// Narrow text with a regexp: first capture group if present, else the whole
/// match. `None` when the pattern does not match.
pub fn narrow(re: &Regex, text: &str) -> Option<String> {
    let caps = re.captures(text)?;
    caps.get(1)
        .or_else(|| caps.get(0))
        .map(|m| m.as_str().to_string())
}

/// Apply an optional regexp to each raw string, dropping non-matching ones
pub(crate) fn narrow_all(
    re: Option<&Regex>,
    raw: impl IntoIterator<Item = Candidate>,
) -> Vec<Candidate> {
    raw.into_iter()
        .filter_map(|candidate| match re {
            Some(re) => narrow(re, &candidate.main).map(|main| Candidate { main, ..candidate }),
            None => Some(candidate),
        })
        .collect()
}
