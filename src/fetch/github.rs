//! GitHub API adapters: releases, tags and commits

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::FetchError;
use crate::fetch::http::{RequestOptions, get_cached};
use crate::fetch::{
    Candidate, FetchContext, GitHubCommitSpec, GitHubRepoSpec, compile, git, narrow_all,
};
use crate::version::Version;

const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const SHA_MEDIA_TYPE: &str = "application/vnd.github.sha";

/// Number of releases/tags requested per listing
const PER_PAGE: u32 = 100;

/// Response from GitHub Releases API
#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
    #[serde(default)]
    prerelease: bool,
    #[serde(default)]
    draft: bool,
}

/// Response from GitHub Tags API
#[derive(Debug, Deserialize)]
struct Tag {
    name: String,
}

pub async fn fetch_releases(
    spec: &GitHubRepoSpec,
    ctx: &FetchContext,
) -> Result<Vec<Candidate>, FetchError> {
    let regexp = compile(spec.regexp.as_deref())?;
    let url = format!(
        "{}/repos/{}/{}/releases?per_page={}",
        ctx.github_api, spec.owner, spec.repo, PER_PAGE
    );
    let releases: Vec<Release> = get_json(ctx, &url, &spec.owner).await?;

    let raw = releases
        .into_iter()
        .filter(|r| !r.draft)
        .map(|r| Candidate::new(r.tag_name).with_prerelease(r.prerelease.then_some(true)));
    let candidates = narrow_all(regexp.as_ref(), raw);

    info!(
        "Found {} releases for {}/{}",
        candidates.len(),
        spec.owner,
        spec.repo
    );
    Ok(candidates)
}

pub async fn fetch_tags(
    spec: &GitHubRepoSpec,
    ctx: &FetchContext,
) -> Result<Vec<Candidate>, FetchError> {
    let regexp = compile(spec.regexp.as_deref())?;
    let url = format!(
        "{}/repos/{}/{}/tags?per_page={}",
        ctx.github_api, spec.owner, spec.repo, PER_PAGE
    );
    let tags: Vec<Tag> = get_json(ctx, &url, &spec.owner).await?;

    let candidates = narrow_all(regexp.as_ref(), tags.into_iter().map(|t| Candidate::new(t.name)));

    info!(
        "Found {} tags for {}/{}",
        candidates.len(),
        spec.owner,
        spec.repo
    );
    Ok(candidates)
}

/// Resolve a ref to its commit hash.
///
/// Private repositories without a configured token go through
/// `git ls-remote` instead of the API.
pub async fn fetch_commit(
    spec: &GitHubCommitSpec,
    ctx: &FetchContext,
) -> Result<Version, FetchError> {
    let token = ctx.credentials.token_for(&spec.owner);

    let hash = if spec.private && token.is_none() {
        debug!(
            "No token for private {}/{}, using git ls-remote",
            spec.owner, spec.repo
        );
        git::resolve_ref(ctx, &spec.owner, &spec.repo, &spec.reference).await?
    } else {
        let url = format!(
            "{}/repos/{}/{}/commits/{}",
            ctx.github_api, spec.owner, spec.repo, spec.reference
        );
        let options = RequestOptions {
            accept: Some(SHA_MEDIA_TYPE),
            token,
        };
        get_cached(ctx, &url, options).await?.trim().to_string()
    };

    Ok(Version::commit(&hash)?)
}

async fn get_json<T: DeserializeOwned>(
    ctx: &FetchContext,
    url: &str,
    owner: &str,
) -> Result<T, FetchError> {
    let options = RequestOptions {
        accept: Some(JSON_MEDIA_TYPE),
        token: ctx.credentials.token_for(owner),
    };
    let body = get_cached(ctx, url, options).await?;

    serde_json::from_str(&body).map_err(|e| FetchError::InvalidResponse {
        url: url.to_string(),
        message: e.to_string(),
    })
}
