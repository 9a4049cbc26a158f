//! Changelog page scraping

use scraper::{Html, Selector};
use tracing::info;

use crate::error::FetchError;
use crate::fetch::http::{RequestOptions, get_cached};
use crate::fetch::{Candidate, FetchContext, HtmlSpec, compile, narrow_all};

pub async fn fetch_page(spec: &HtmlSpec, ctx: &FetchContext) -> Result<Vec<Candidate>, FetchError> {
    let regexp = compile(spec.regexp.as_deref())?;

    let body = get_cached(ctx, &spec.url, RequestOptions::default()).await?;
    let texts = select_texts(&body, &parse_selector(&spec.selector)?);
    if texts.is_empty() {
        return Err(FetchError::NoElements {
            url: spec.url.clone(),
            selector: spec.selector.clone(),
        });
    }
    let candidates = narrow_all(regexp.as_ref(), texts);

    info!("Found {} candidates on {}", candidates.len(), spec.url);
    Ok(candidates)
}

pub fn parse_selector(selector: &str) -> Result<Selector, FetchError> {
    Selector::parse(selector).map_err(|e| FetchError::Selector(format!("{selector}: {e}")))
}

/// Trimmed text of every selected element
fn select_texts(body: &str, selector: &Selector) -> Vec<Candidate> {
    let document = Html::parse_document(body);
    document
        .select(selector)
        .map(|element| Candidate::new(element.text().collect::<String>().trim()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::credentials::Credentials;
    use mockito::Server;
    use std::sync::Arc;

    const PAGE: &str = r#"
        <html><body>
          <h2 class="release">Version 3.2.1 <small>2024-05-01</small></h2>
          <h2 class="release">Version 3.2.0 <small>2024-04-01</small></h2>
          <h2 class="release">Unreleased</h2>
        </body></html>
    "#;

    fn spec(url: String, selector: &str, regexp: Option<&str>) -> HtmlSpec {
        HtmlSpec {
            url,
            selector: selector.to_string(),
            regexp: regexp.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn fetch_page_narrows_selected_elements() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/changelog")
            .with_status(200)
            .with_body(PAGE)
            .create_async()
            .await;

        let ctx = FetchContext::new(Arc::new(MemoryCache::new()), Credentials::new()).unwrap();
        let spec = spec(
            format!("{}/changelog", server.url()),
            "h2.release",
            Some(r"Version (\d+\.\d+\.\d+)"),
        );
        let result = fetch_page(&spec, &ctx).await.unwrap();

        mock.assert_async().await;
        assert_eq!(result, vec![Candidate::new("3.2.1"), Candidate::new("3.2.0")]);
    }

    #[tokio::test]
    async fn fetch_page_fails_when_selector_matches_nothing() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/changelog")
            .with_status(200)
            .with_body(PAGE)
            .create_async()
            .await;

        let ctx = FetchContext::new(Arc::new(MemoryCache::new()), Credentials::new()).unwrap();
        let spec = spec(format!("{}/changelog", server.url()), "h3.release", None);
        let result = fetch_page(&spec, &ctx).await;

        assert!(matches!(result, Err(FetchError::NoElements { .. })));
    }

    #[test]
    fn parse_selector_rejects_invalid_css() {
        assert!(matches!(parse_selector("h2[["), Err(FetchError::Selector(_))));
    }

    #[test]
    fn select_texts_keeps_full_text() {
        let selector = parse_selector("h2.release small").unwrap();

        let result = select_texts(PAGE, &selector);

        assert_eq!(
            result,
            vec![Candidate::new("2024-05-01"), Candidate::new("2024-04-01")]
        );
    }
}
