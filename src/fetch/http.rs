//! Cached GET requests

use tracing::{debug, warn};

use crate::error::FetchError;
use crate::fetch::FetchContext;

/// Request options beyond the URL
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestOptions<'a> {
    pub accept: Option<&'a str>,
    pub token: Option<&'a str>,
}

/// GET a URL through the source cache.
///
/// Returns the cached body unless `ctx.update` is set; successful responses
/// are written back under the same key. Cache I/O problems are logged and
/// otherwise ignored.
pub async fn get_cached(
    ctx: &FetchContext,
    url: &str,
    options: RequestOptions<'_>,
) -> Result<String, FetchError> {
    if !ctx.update {
        match ctx.cache.get(url) {
            Ok(Some(body)) => {
                debug!("Cache hit for {}", url);
                return Ok(body);
            }
            Ok(None) => {}
            Err(e) => warn!("Failed to read cache for {}: {}", url, e),
        }
    }

    let body = get(&ctx.client, url, options).await?;

    if let Err(e) = ctx.cache.put(url, &body) {
        warn!("Failed to cache {}: {}", url, e);
    }
    Ok(body)
}

/// GET a URL, failing on any non-200 status
pub async fn get(
    client: &reqwest::Client,
    url: &str,
    options: RequestOptions<'_>,
) -> Result<String, FetchError> {
    debug!("GET {}", url);

    let mut request = client.get(url);
    if let Some(accept) = options.accept {
        request = request.header(reqwest::header::ACCEPT, accept);
    }
    if let Some(token) = options.token {
        request = request.bearer_auth(token);
    }

    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;

    if status != reqwest::StatusCode::OK {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    Ok(body)
}
