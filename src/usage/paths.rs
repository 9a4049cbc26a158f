//! Alias and checkout-root normalization of usage paths

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::PathError;
use crate::usage::source::Source;

/// Mapping from symbolic paths and remote repositories to local roots
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    /// Substring substitutions, applied until the path stops changing
    pub alias: IndexMap<String, String>,
    /// `owner/repo` to local checkout root
    pub github: IndexMap<String, String>,
}

/// Concrete local path for a source
pub fn normalize(source: &Source, paths: &PathsConfig) -> Result<String, PathError> {
    match source {
        Source::Local(path) => expand_aliases(path, &paths.alias),
        Source::GitHub(file) => {
            let key = format!("{}/{}", file.owner, file.repo);
            let root = paths
                .github
                .get(&key)
                .ok_or(PathError::UnknownRepository(key))?;
            let joined = format!("{}/{}", root.trim_end_matches('/'), file.path);
            expand_aliases(&joined, &paths.alias)
        }
    }
}

/// Apply every alias until a full pass changes nothing
pub fn expand_aliases(path: &str, aliases: &IndexMap<String, String>) -> Result<String, PathError> {
    let mut current = path.to_string();

    // A chain can be at most as long as the table; anything beyond is a cycle.
    for _ in 0..=aliases.len() {
        let next = aliases
            .iter()
            .filter(|(from, _)| !from.is_empty())
            .fold(current.clone(), |acc, (from, to)| acc.replace(from.as_str(), to));
        if next == current {
            return Ok(current);
        }
        current = next;
    }

    Err(PathError::AliasCycle(path.to_string()))
}
