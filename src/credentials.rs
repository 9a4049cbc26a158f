//! Bearer tokens for the repository hosting API

use std::collections::HashMap;

/// Key used for the token that applies to every owner
pub const DEFAULT_OWNER: &str = "default";

/// Environment variable holding the default token, read by the CLI
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Mapping from repository owner to bearer token
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    tokens: HashMap<String, String>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build credentials from a default token plus `owner=token` (or bare
    /// `token`) entries, the latter taking precedence.
    pub fn from_args(default_token: Option<&str>, args: &[String]) -> Self {
        let mut credentials = Self::new();
        if let Some(token) = default_token.filter(|t| !t.is_empty()) {
            credentials.insert(DEFAULT_OWNER, token);
        }
        for arg in args {
            match arg.split_once('=') {
                Some((owner, token)) => credentials.insert(owner, token),
                None => credentials.insert(DEFAULT_OWNER, arg),
            }
        }
        credentials
    }

    pub fn with_token(mut self, owner: &str, token: &str) -> Self {
        self.insert(owner, token);
        self
    }

    pub fn insert(&mut self, owner: &str, token: impl Into<String>) {
        self.tokens.insert(owner.to_string(), token.into());
    }

    /// Token for an owner, falling back to the default token
    pub fn token_for(&self, owner: &str) -> Option<&str> {
        self.tokens
            .get(owner)
            .or_else(|| self.tokens.get(DEFAULT_OWNER))
            .map(String::as_str)
    }
}
