//! Rolling channel snapshots listed from an S3-style bucket
//!
//! A channel such as `nixos-24.05` publishes one snapshot per build under
//! `nixos/24.05/<label>/`, where the label embeds the short commit hash
//! (`nixos-24.05.1234.a1b2c3d`). The whole listing is one logical fetch and
//! is cached as a single JSON array of labels.

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::fetch::http::{RequestOptions, get};
use crate::fetch::{ChannelSpec, FetchContext};
use crate::version::Version;

/// Default listing endpoint for channel snapshots
pub const DEFAULT_LISTING_URL: &str = "https://nix-releases.s3.amazonaws.com";

pub fn default_listing_url() -> String {
    DEFAULT_LISTING_URL.to_string()
}

/// One page of a ListObjectsV2 response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListBucketResult {
    #[serde(default)]
    is_truncated: bool,
    #[serde(default)]
    next_continuation_token: Option<String>,
    #[serde(default)]
    common_prefixes: Vec<CommonPrefix>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CommonPrefix {
    prefix: String,
}

/// Listing prefix for a channel: `nixos-24.05` -> `nixos/24.05/`
pub fn channel_prefix(spec: &ChannelSpec) -> String {
    if let Some(prefix) = &spec.prefix {
        return prefix.clone();
    }
    match spec.channel.split_once('-') {
        Some((project, release)) => format!("{}/{}/", project, release),
        None => format!("{}/", spec.channel),
    }
}

pub fn cache_key(spec: &ChannelSpec) -> String {
    format!(
        "channel-snapshot:{}/{}",
        spec.url.trim_end_matches('/'),
        channel_prefix(spec)
    )
}

pub async fn fetch_snapshots(
    spec: &ChannelSpec,
    ctx: &FetchContext,
) -> Result<Vec<Version>, FetchError> {
    let labels = list_labels(spec, ctx).await?;

    let versions: Vec<Version> = labels
        .iter()
        .filter_map(|label| match Version::channel(label) {
            Ok(version) => Some(version),
            Err(_) => {
                debug!("Skipping {} entry {:?}", spec.channel, label);
                None
            }
        })
        .collect();

    info!("Found {} snapshots for {}", versions.len(), spec.channel);
    Ok(versions)
}

/// All snapshot labels, from the cache or by walking every listing page
async fn list_labels(spec: &ChannelSpec, ctx: &FetchContext) -> Result<Vec<String>, FetchError> {
    let key = cache_key(spec);

    if !ctx.update {
        match ctx.cache.get(&key) {
            Ok(Some(blob)) => match serde_json::from_str::<Vec<String>>(&blob) {
                Ok(labels) => {
                    debug!("Cache hit for {}", key);
                    return Ok(labels);
                }
                Err(e) => warn!("Ignoring corrupt cache entry {}: {}", key, e),
            },
            Ok(None) => {}
            Err(e) => warn!("Failed to read cache for {}: {}", key, e),
        }
    }

    let prefix = channel_prefix(spec);
    let mut labels = Vec::new();
    let mut token: Option<String> = None;

    loop {
        let url = page_url(&spec.url, &prefix, token.as_deref())?;
        let body = get(&ctx.client, &url, RequestOptions::default()).await?;
        let page: ListBucketResult =
            quick_xml::de::from_str(&body).map_err(|e| FetchError::InvalidResponse {
                url: url.clone(),
                message: e.to_string(),
            })?;

        labels.extend(page.common_prefixes.iter().filter_map(|p| label_of(&p.prefix)));

        match page.next_continuation_token {
            Some(next) if page.is_truncated => token = Some(next),
            _ => break,
        }
    }

    match serde_json::to_string(&labels) {
        Ok(blob) => {
            if let Err(e) = ctx.cache.put(&key, &blob) {
                warn!("Failed to cache {}: {}", key, e);
            }
        }
        Err(e) => warn!("Failed to encode listing for {}: {}", key, e),
    }
    Ok(labels)
}

fn page_url(base: &str, prefix: &str, token: Option<&str>) -> Result<String, FetchError> {
    let mut params = vec![("list-type", "2"), ("delimiter", "/"), ("prefix", prefix)];
    if let Some(token) = token {
        params.push(("continuation-token", token));
    }
    let url = reqwest::Url::parse_with_params(&format!("{}/", base.trim_end_matches('/')), &params)
        .map_err(|e| FetchError::InvalidResponse {
            url: base.to_string(),
            message: e.to_string(),
        })?;
    Ok(url.into())
}

/// Last path segment of a common prefix
fn label_of(prefix: &str) -> Option<String> {
    prefix
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
