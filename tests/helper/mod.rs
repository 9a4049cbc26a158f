//! Shared fixtures for end-to-end tests

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use mockito::{Mock, ServerGuard};
use tempfile::TempDir;

use version_drift::cache::{MemoryCache, SqliteCache};
use version_drift::config::Dependency;
use version_drift::credentials::Credentials;
use version_drift::fetch::{FetchContext, FetchKind, FetchSpec, HelmSpec};
use version_drift::usage::parser::Parser;
use version_drift::usage::{UsageContext, UsageSpec};

/// Helm repository index with two ingress-nginx releases
pub const HELM_INDEX: &str = r#"
apiVersion: v1
entries:
  ingress-nginx:
    - version: 4.2.0
      appVersion: "1.9"
    - version: 4.1.0
      appVersion: "1.8"
"#;

/// Fetch context backed by an in-memory cache
pub fn fetch_context() -> FetchContext {
    FetchContext::new(Arc::new(MemoryCache::new()), Credentials::new()).unwrap()
}

/// Fetch context backed by a SQLite cache in a temp directory
pub fn sqlite_fetch_context() -> (TempDir, FetchContext) {
    let temp_dir = TempDir::new().unwrap();
    let cache = SqliteCache::new(&temp_dir.path().join("versions.db")).unwrap();
    let ctx = FetchContext::new(Arc::new(cache), Credentials::new()).unwrap();
    (temp_dir, ctx)
}

pub fn usage_context() -> UsageContext {
    UsageContext::new(Credentials::new(), None).unwrap()
}

/// Serve `body` as the chart index under `/charts/index.yaml`
pub async fn mock_helm_index(server: &mut ServerGuard, body: &str) -> Mock {
    server
        .mock("GET", "/charts/index.yaml")
        .with_status(200)
        .with_body(body)
        .create_async()
        .await
}

pub fn helm_upstream(server: &ServerGuard, chart: &str) -> FetchSpec {
    FetchSpec {
        kind: FetchKind::Helm(HelmSpec {
            repo: format!("{}/charts", server.url()),
            chart: chart.to_string(),
        }),
        version_spec: None,
        prerelease: false,
    }
}

/// Write a usage file and return its absolute path
pub fn write_file(dir: &Path, name: &str, contents: &str) -> String {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, contents).unwrap();
    path.to_string_lossy().into_owned()
}

/// Usage reading `.spec.chart.spec.version` from a HelmRelease manifest
pub fn helm_release_usage(source: &str) -> UsageSpec {
    UsageSpec {
        source: source.to_string(),
        parser: Parser::Yaml {
            query: ".spec.chart.spec.version".to_string(),
            regexp: None,
        },
    }
}

pub fn helm_release(version: &str) -> String {
    format!(
        "apiVersion: helm.toolkit.fluxcd.io/v2\nkind: HelmRelease\nspec:\n  chart:\n    spec:\n      chart: ingress-nginx\n      version: \"{version}\"\n"
    )
}

pub fn dependency(upstream: FetchSpec, usages: Vec<(&str, UsageSpec)>) -> Dependency {
    Dependency {
        upstream,
        usages: usages
            .into_iter()
            .map(|(name, spec)| (name.to_string(), spec))
            .collect::<IndexMap<_, _>>(),
    }
}
