//! Helm chart repository index

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::info;

use crate::error::FetchError;
use crate::fetch::http::{RequestOptions, get_cached};
use crate::fetch::{Candidate, FetchContext, HelmSpec};

/// `index.yaml` of a chart repository
#[derive(Debug, Deserialize)]
struct IndexFile {
    #[serde(default)]
    entries: IndexMap<String, Vec<ChartEntry>>,
}

#[derive(Debug, Deserialize)]
struct ChartEntry {
    version: serde_yaml::Value,
    #[serde(default, rename = "appVersion")]
    app_version: Option<serde_yaml::Value>,
}

pub fn index_url(repo: &str) -> String {
    format!("{}/index.yaml", repo.trim_end_matches('/'))
}

pub async fn fetch_chart(
    spec: &HelmSpec,
    ctx: &FetchContext,
) -> Result<Vec<Candidate>, FetchError> {
    let url = index_url(&spec.repo);
    let body = get_cached(ctx, &url, RequestOptions::default()).await?;

    let index: IndexFile =
        serde_yaml::from_str(&body).map_err(|e| FetchError::InvalidResponse {
            url: url.clone(),
            message: e.to_string(),
        })?;

    if index.entries.is_empty() {
        return Err(FetchError::EmptyIndex(spec.repo.clone()));
    }

    let entries = index
        .entries
        .get(&spec.chart)
        .filter(|entries| !entries.is_empty())
        .ok_or_else(|| FetchError::ChartNotFound {
            repo: spec.repo.clone(),
            chart: spec.chart.clone(),
        })?;

    let candidates: Vec<Candidate> = entries
        .iter()
        .filter_map(|entry| {
            let version = scalar_to_string(&entry.version)?;
            let app = entry.app_version.as_ref().and_then(scalar_to_string);
            Some(Candidate::new(version).with_app(app))
        })
        .collect();

    info!(
        "Found {} versions of chart {} in {}",
        candidates.len(),
        spec.chart,
        spec.repo
    );
    Ok(candidates)
}

/// Unquoted YAML scalars such as `appVersion: 1.9` arrive as numbers.
///
/// The number's own text is lost: `1.10` is read as `1.1`. Chart repositories
/// generated by `helm repo index` quote these fields.
fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
