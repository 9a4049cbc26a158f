//! Rendering check results for the terminal

use crate::check::CheckResult;
use crate::resolve::FetchResult;

/// Status cell of one usage row
#[derive(Debug, Clone, PartialEq, Eq)]
enum Status {
    Ok,
    /// Behind the upstream's current version
    Outdated(String),
    Unknown,
    Error,
}

impl Status {
    fn render(&self) -> String {
        match self {
            Status::Ok => "ok".to_string(),
            Status::Outdated(current) => format!("outdated -> {current}"),
            Status::Unknown => "-".to_string(),
            Status::Error => "error".to_string(),
        }
    }
}

/// Plain-text report, one block per dependency.
///
/// With `outdated_only`, up-to-date usages are hidden and dependencies with
/// nothing left to show are skipped.
pub fn render_text(results: &[CheckResult], outdated_only: bool) -> String {
    let mut out = String::new();

    for result in results {
        let rows = rows(result, outdated_only);
        if outdated_only && rows.is_empty() && result.upstream.is_some() {
            continue;
        }

        match (&result.upstream, &result.upstream_error) {
            (Some(upstream), _) => out.push_str(&format!(
                "{}  current {}  latest {}\n",
                result.name,
                upstream.version,
                upstream.latest()
            )),
            (None, error) => out.push_str(&format!(
                "{}  error: {}\n",
                result.name,
                error.as_deref().unwrap_or("upstream unavailable")
            )),
        }

        let width = rows.iter().map(|(name, ..)| name.len()).max().unwrap_or(0);
        for (name, version, status) in rows {
            out.push_str(&format!(
                "  {:<width$}  {:<20}  {}\n",
                name,
                version,
                status.render(),
                width = width
            ));
        }
    }
    out
}

fn rows(result: &CheckResult, outdated_only: bool) -> Vec<(String, String, Status)> {
    let upstream = result.upstream.as_ref().map(|u| u.version.to_string());

    let mut rows: Vec<(String, String, Status)> = result
        .current
        .iter()
        .map(|(name, version)| {
            let status = match (&upstream, result.outdated.contains_key(name)) {
                (None, _) => Status::Unknown,
                (Some(current), true) => Status::Outdated(current.clone()),
                (Some(_), false) => Status::Ok,
            };
            let shown = result.outdated.get(name).unwrap_or(version);
            (name.clone(), shown.to_string(), status)
        })
        .filter(|(_, _, status)| !outdated_only || *status != Status::Ok)
        .collect();

    rows.extend(
        result
            .errored
            .iter()
            .map(|name| (name.clone(), "-".to_string(), Status::Error)),
    );
    rows
}

/// Every candidate of a resolved upstream, newest first, marking the
/// current and latest entries
pub fn render_versions(name: &str, result: &FetchResult) -> String {
    let mut out = format!("{name}\n");
    let versions = match &result.versions {
        Some(versions) => versions.as_slice(),
        None => std::slice::from_ref(&result.version),
    };

    for version in versions {
        let mut marks = Vec::new();
        if version.main() == result.version.main() {
            marks.push("current");
        }
        if version.main() == result.latest().main() {
            marks.push("latest");
        }
        if marks.is_empty() {
            out.push_str(&format!("  {version}\n"));
        } else {
            out.push_str(&format!("  {version}  [{}]\n", marks.join(", ")));
        }
    }
    out
}

pub fn render_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}
