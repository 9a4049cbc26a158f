//! Extracting one version string from a file's text

use std::collections::HashMap;

use serde::Deserialize;
use serde_yaml::Value;

use crate::error::UsageError;
use crate::fetch::{compile, narrow};
use crate::usage::query::Query;

/// How to read the pinned version out of a file
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind")]
pub enum Parser {
    /// First capture group of `pattern`, else the whole match
    #[serde(rename = "regexp")]
    Regexp { pattern: String },
    /// Path query over a YAML (or JSON) document, optionally narrowed
    #[serde(rename = "yaml")]
    Yaml {
        query: String,
        #[serde(default)]
        regexp: Option<String>,
    },
    /// Pinned revision of a root input in a `flake.lock` file
    #[serde(rename = "flake-lock")]
    FlakeLock { input: String },
}

impl Parser {
    pub fn kind(&self) -> &'static str {
        match self {
            Parser::Regexp { .. } => "regexp",
            Parser::Yaml { .. } => "yaml",
            Parser::FlakeLock { .. } => "flake-lock",
        }
    }

    pub fn extract(&self, text: &str) -> Result<String, UsageError> {
        match self {
            Parser::Regexp { pattern } => narrow_required(pattern, text),
            Parser::Yaml { query, regexp } => {
                let query = Query::parse(query)?;
                let value = query
                    .evaluate(&load_yaml(text)?)?
                    .ok_or_else(|| UsageError::EmptyQuery(query.as_str().to_string()))?;
                match regexp {
                    Some(pattern) => narrow_required(pattern, &value),
                    None => Ok(value),
                }
            }
            Parser::FlakeLock { input } => locked_rev(text, input),
        }
    }
}

/// Narrowing that must match: a usage yields exactly one version
fn narrow_required(pattern: &str, text: &str) -> Result<String, UsageError> {
    let re = compile(Some(pattern))?;
    re.as_ref()
        .and_then(|re| narrow(re, text))
        .ok_or_else(|| UsageError::NoMatch(pattern.to_string()))
}

/// Parse a YAML stream; a single document stands for itself, several become
/// a sequence
fn load_yaml(text: &str) -> Result<Value, UsageError> {
    let mut documents = serde_yaml::Deserializer::from_str(text)
        .map(Value::deserialize)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(match documents.len() {
        0 => Value::Null,
        1 => documents.remove(0),
        _ => Value::Sequence(documents),
    })
}

#[derive(Debug, Deserialize)]
struct LockFile {
    nodes: HashMap<String, LockNode>,
    root: String,
}

#[derive(Debug, Deserialize)]
struct LockNode {
    #[serde(default)]
    inputs: HashMap<String, InputRef>,
    #[serde(default)]
    locked: Option<Locked>,
}

/// Either a node id or a `follows` path of input names from the root
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InputRef {
    Node(String),
    Follows(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct Locked {
    #[serde(default)]
    rev: Option<String>,
}

impl LockFile {
    fn input_node<'a>(&'a self, from: &'a str, name: &str, depth: usize) -> Option<&'a str> {
        // A follows chain longer than the node count is cyclic
        if depth > self.nodes.len() {
            return None;
        }
        match self.nodes.get(from)?.inputs.get(name)? {
            InputRef::Node(id) => Some(id),
            InputRef::Follows(path) => self.follow(path, depth + 1),
        }
    }

    fn follow<'a>(&'a self, path: &[String], depth: usize) -> Option<&'a str> {
        path.iter()
            .try_fold(self.root.as_str(), |node, name| self.input_node(node, name, depth))
    }
}

fn locked_rev(text: &str, input: &str) -> Result<String, UsageError> {
    let lock: LockFile = serde_json::from_str(text)?;
    lock.input_node(&lock.root, input, 0)
        .and_then(|id| lock.nodes.get(id))
        .and_then(|node| node.locked.as_ref())
        .and_then(|locked| locked.rev.clone())
        .ok_or_else(|| UsageError::LockInput(input.to_string()))
}
