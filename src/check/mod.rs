//! Comparing upstream versions with every place a dependency is pinned
//!
//! Each dependency's upstream and usages are resolved concurrently; separate
//! dependencies run as separate tokio tasks. A failure only ever affects the
//! item that failed.

pub mod settle;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::check::settle::{Settled, settle_all};
use crate::config::Dependency;
use crate::error::{FetchError, UsageError};
use crate::fetch::{FetchContext, FetchSpec};
use crate::resolve::{FetchResult, fetch_upstream};
use crate::usage::{UsageContext, UsageSpec, resolve_usage};
use crate::version::Version;

/// Outcome of checking one dependency
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    pub name: String,
    /// `None` when the upstream could not be resolved
    pub upstream: Option<FetchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_error: Option<String>,
    /// Usages behind upstream, with the best known display version
    pub outdated: IndexMap<String, Version>,
    /// Usages that could not be resolved
    pub errored: Vec<String>,
    /// Every usage that resolved
    pub current: IndexMap<String, Version>,
}

impl CheckResult {
    pub fn is_outdated(&self) -> bool {
        !self.outdated.is_empty()
    }
}

/// Check one dependency
pub async fn check(
    name: &str,
    upstream: &FetchSpec,
    usages: &IndexMap<String, UsageSpec>,
    fetch_ctx: &FetchContext,
    usage_ctx: &UsageContext,
) -> CheckResult {
    let (upstream, usages) = tokio::join!(
        fetch_upstream(upstream, fetch_ctx),
        settle_all(
            usages
                .iter()
                .map(|(usage, spec)| (usage.clone(), resolve_usage(spec, usage_ctx)))
        ),
    );
    assess(name, upstream, usages)
}

/// Combine the settled upstream and usages into a result
fn assess(
    name: &str,
    upstream: Result<FetchResult, FetchError>,
    usages: Settled<String, Version, UsageError>,
) -> CheckResult {
    for (usage, e) in &usages.err {
        warn!("Usage {} of {} failed: {}", usage, name, e);
    }
    let errored: Vec<String> = usages.err.into_iter().map(|(usage, _)| usage).collect();
    let current: IndexMap<String, Version> = usages.ok.into_iter().collect();

    let (upstream, upstream_error) = match upstream {
        Ok(result) => (Some(result), None),
        Err(e) => {
            error!("Upstream for {} failed: {}", name, e);
            (None, Some(e.to_string()))
        }
    };

    let outdated = match &upstream {
        Some(upstream) => current
            .iter()
            .filter(|(_, version)| !upstream.version.equivalent(version))
            .map(|(usage, version)| {
                let shown = upstream.candidate(version.main()).unwrap_or(version);
                (usage.clone(), shown.clone())
            })
            .collect(),
        None => IndexMap::new(),
    };

    info!(
        "{}: {} current, {} outdated, {} errored",
        name,
        current.len(),
        outdated.len(),
        errored.len()
    );

    CheckResult {
        name: name.to_string(),
        upstream,
        upstream_error,
        outdated,
        errored,
        current,
    }
}

/// Check every dependency, each in its own task.
///
/// With `usage` set only that usage is checked, and dependencies without it
/// are skipped. A panicking task is logged and left out of the result.
pub async fn check_all(
    dependencies: &IndexMap<String, Dependency>,
    usage: Option<&str>,
    fetch_ctx: &FetchContext,
    usage_ctx: &UsageContext,
) -> Vec<CheckResult> {
    let tasks = dependencies.iter().filter_map(|(name, dependency)| {
        let usages: IndexMap<String, UsageSpec> = dependency
            .usages
            .iter()
            .filter(|(key, _)| usage.is_none_or(|u| u == key.as_str()))
            .map(|(key, spec)| (key.clone(), spec.clone()))
            .collect();
        if usage.is_some() && usages.is_empty() {
            return None;
        }

        let task_name = name.clone();
        let upstream = dependency.upstream.clone();
        let fetch_ctx = fetch_ctx.clone();
        let usage_ctx = usage_ctx.clone();
        let handle = tokio::spawn(async move {
            check(&task_name, &upstream, &usages, &fetch_ctx, &usage_ctx).await
        });
        Some((name.clone(), handle))
    });

    let settled = settle_all(tasks).await;
    for (name, e) in &settled.err {
        error!("Check for {} aborted: {}", name, e);
    }
    settled.ok.into_iter().map(|(_, result)| result).collect()
}
