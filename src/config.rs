use indexmap::IndexMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::fetch::{FetchKind, FetchSpec, html};
use crate::usage::UsageSpec;
use crate::usage::parser::Parser;
use crate::usage::paths::PathsConfig;
use crate::usage::query::Query;
use crate::usage::source::Source;
use crate::version::Range;

/// Config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "version-drift.yaml";

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "VERSION_DRIFT_CONFIG";

/// Timeout for a single HTTP request in seconds
pub const FETCH_TIMEOUT_SECS: u64 = 30;

/// Top-level configuration document
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub paths: Option<PathsConfig>,
    pub dependencies: IndexMap<String, Dependency>,
}

/// A tracked dependency: where it is released and where it is pinned
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Dependency {
    pub upstream: FetchSpec,
    #[serde(default)]
    pub usages: IndexMap<String, UsageSpec>,
}

impl Config {
    /// Read, parse and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check everything serde cannot: patterns, selectors, queries, ranges
    /// and source strings. Errors name the dotted field path.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, dependency) in &self.dependencies {
            let base = format!("dependencies.{name}");
            validate_upstream(&format!("{base}.upstream"), &dependency.upstream)?;
            for (usage, spec) in &dependency.usages {
                validate_usage(&format!("{base}.usages.{usage}"), spec)?;
            }
        }
        Ok(())
    }

    pub fn dependency(&self, name: &str) -> Result<&Dependency, ConfigError> {
        self.dependencies
            .get(name)
            .ok_or_else(|| ConfigError::UnknownDependency(name.to_string()))
    }

    pub fn usage(&self, dependency: &str, usage: &str) -> Result<&UsageSpec, ConfigError> {
        self.dependency(dependency)?
            .usages
            .get(usage)
            .ok_or_else(|| ConfigError::UnknownUsage {
                dependency: dependency.to_string(),
                usage: usage.to_string(),
            })
    }
}

fn invalid(field: String, message: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        field,
        message: message.to_string(),
    }
}

fn validate_upstream(field: &str, spec: &FetchSpec) -> Result<(), ConfigError> {
    if let Some(pattern) = spec.kind.regexp() {
        regex::Regex::new(pattern).map_err(|e| invalid(format!("{field}.regexp"), e))?;
    }
    if let FetchKind::Html(page) = &spec.kind {
        html::parse_selector(&page.selector)
            .map_err(|e| invalid(format!("{field}.selector"), e))?;
    }
    // Channel specs are label prefixes, not ranges
    if let Some(range) = &spec.version_spec
        && !matches!(spec.kind, FetchKind::ChannelSnapshot(_))
    {
        Range::parse(range).map_err(|e| invalid(format!("{field}.versionSpec"), e))?;
    }
    Ok(())
}

fn validate_usage(field: &str, spec: &UsageSpec) -> Result<(), ConfigError> {
    Source::parse(&spec.source).map_err(|e| invalid(format!("{field}.source"), e))?;
    match &spec.parser {
        Parser::Regexp { pattern } => {
            regex::Regex::new(pattern)
                .map_err(|e| invalid(format!("{field}.parser.pattern"), e))?;
        }
        Parser::Yaml { query, regexp } => {
            Query::parse(query).map_err(|e| invalid(format!("{field}.parser.query"), e))?;
            if let Some(pattern) = regexp {
                regex::Regex::new(pattern)
                    .map_err(|e| invalid(format!("{field}.parser.regexp"), e))?;
            }
        }
        Parser::FlakeLock { input } => {
            if input.is_empty() {
                return Err(invalid(format!("{field}.parser.input"), "must not be empty"));
            }
        }
    }
    Ok(())
}

/// Returns the path to the data directory for version-drift.
/// Uses $XDG_DATA_HOME/version-drift if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/version-drift,
/// or ./version-drift if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the source cache database.
pub fn db_path() -> PathBuf {
    data_dir().join("versions.db")
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("version-drift.log")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("version-drift")
}
