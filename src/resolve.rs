//! Turning adapter output into current/latest versions

use serde::Serialize;
use tracing::debug;

use crate::error::FetchError;
use crate::fetch::{self, FetchContext, FetchSpec, Fetched};
use crate::version::Version;

/// Resolved upstream versions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchResult {
    /// Current version: newest candidate satisfying the version spec
    pub version: Version,
    /// Newest candidate overall
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest: Option<Version>,
    /// Every candidate after filtering, newest first
    #[serde(skip_serializing_if = "Option::is_none")]
    pub versions: Option<Vec<Version>>,
}

impl FetchResult {
    pub fn single(version: Version) -> Self {
        Self {
            version,
            latest: None,
            versions: None,
        }
    }

    /// Newest candidate, falling back to the current version
    pub fn latest(&self) -> &Version {
        self.latest.as_ref().unwrap_or(&self.version)
    }

    /// Candidate whose display string equals `main`
    pub fn candidate(&self, main: &str) -> Option<&Version> {
        self.versions
            .as_deref()
            .and_then(|versions| versions.iter().find(|v| v.main() == main))
    }
}

/// Filter, sort and select per the spec's `prerelease` and `versionSpec`
pub fn resolve(fetched: Fetched, spec: &FetchSpec) -> Result<FetchResult, FetchError> {
    resolve_with(fetched, spec.prerelease, spec.version_spec.as_deref())
}

pub fn resolve_with(
    fetched: Fetched,
    prerelease: bool,
    version_spec: Option<&str>,
) -> Result<FetchResult, FetchError> {
    let candidates = match fetched {
        Fetched::Single(version) => return Ok(FetchResult::single(version)),
        Fetched::Candidates(candidates) => candidates,
    };

    if candidates.is_empty() {
        return Err(FetchError::NoVersions);
    }

    let total = candidates.len();
    let mut versions: Vec<Version> = candidates
        .into_iter()
        .filter(|v| prerelease || !v.is_prerelease())
        .collect();
    debug!("{} of {} candidates kept", versions.len(), total);

    if versions.is_empty() {
        return Err(FetchError::NoValidVersions);
    }

    versions.sort_by(|a, b| b.compare(a));
    let latest = versions[0].clone();

    let version = match version_spec {
        Some(spec) => versions
            .iter()
            .find(|v| v.satisfies(spec))
            .cloned()
            .ok_or_else(|| FetchError::NoCompatibleVersion(spec.to_string()))?,
        None => latest.clone(),
    };

    Ok(FetchResult {
        version,
        latest: Some(latest),
        versions: Some(versions),
    })
}

/// Fetch and resolve an upstream
pub async fn fetch_upstream(
    spec: &FetchSpec,
    ctx: &FetchContext,
) -> Result<FetchResult, FetchError> {
    let fetched = fetch::fetch(spec, ctx).await?;
    resolve(fetched, spec)
}
