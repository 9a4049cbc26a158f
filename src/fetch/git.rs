//! `git ls-remote` fallback for repositories the API cannot reach

#[cfg(test)]
use mockall::automock;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::fetch::FetchContext;
use crate::version::model::COMMIT_HASH_LEN;

/// Host used to build SSH remotes
const GIT_HOST: &str = "github.com";

/// Lists the refs of a remote repository
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait RefLister: Send + Sync {
    /// Raw `git ls-remote <url> <reference>` output
    async fn ls_remote(&self, url: &str, reference: &str) -> Result<String, FetchError>;
}

/// Runs the `git` executable
pub struct GitCli {
    program: String,
}

impl GitCli {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new("git")
    }
}

#[async_trait::async_trait]
impl RefLister for GitCli {
    async fn ls_remote(&self, url: &str, reference: &str) -> Result<String, FetchError> {
        let output = Command::new(&self.program)
            .arg("ls-remote")
            .arg(url)
            .arg(reference)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| FetchError::Git {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(FetchError::Git {
                url: url.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// SSH remote for a repository
pub fn remote_url(owner: &str, repo: &str) -> String {
    format!("git@{}:{}/{}.git", GIT_HOST, owner, repo)
}

/// First 40-character hash in `git ls-remote` output
pub fn parse_ls_remote(output: &str) -> Option<&str> {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .find(|hash| hash.len() == COMMIT_HASH_LEN && hash.bytes().all(|b| b.is_ascii_hexdigit()))
}

/// Resolve a ref through `git ls-remote`, cached like any other fetch
pub async fn resolve_ref(
    ctx: &FetchContext,
    owner: &str,
    repo: &str,
    reference: &str,
) -> Result<String, FetchError> {
    let url = remote_url(owner, repo);
    let key = format!("git-ls-remote:{}#{}", url, reference);

    if !ctx.update {
        match ctx.cache.get(&key) {
            Ok(Some(hash)) => {
                debug!("Cache hit for {}", key);
                return Ok(hash);
            }
            Ok(None) => {}
            Err(e) => warn!("Failed to read cache for {}: {}", key, e),
        }
    }

    let output = ctx.ref_lister.ls_remote(&url, reference).await?;
    let hash = parse_ls_remote(&output)
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| FetchError::Git {
            url: url.clone(),
            message: format!("ref {:?} not found", reference),
        })?;

    if let Err(e) = ctx.cache.put(&key, &hash) {
        warn!("Failed to cache {}: {}", key, e);
    }
    Ok(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryCache, SourceCache};
    use crate::credentials::Credentials;
    use rstest::rstest;
    use std::sync::Arc;

    const COMMIT: &str = "0123456789abcdef0123456789abcdef01234567";

    #[rstest]
    #[case("0123456789abcdef0123456789abcdef01234567\tHEAD\n", Some(COMMIT))]
    #[case(
        "warning: redirecting\n0123456789abcdef0123456789abcdef01234567\trefs/heads/main\n",
        Some(COMMIT)
    )]
    #[case("", None)]
    #[case("abc123\trefs/heads/main\n", None)]
    fn parse_ls_remote_finds_hash(#[case] output: &str, #[case] expected: Option<&str>) {
        assert_eq!(parse_ls_remote(output), expected);
    }

    fn context(lister: MockRefLister, cache: Arc<MemoryCache>) -> FetchContext {
        FetchContext::new(cache, Credentials::new())
            .unwrap()
            .with_ref_lister(Arc::new(lister))
    }

    #[tokio::test]
    async fn resolve_ref_caches_result() {
        let mut lister = MockRefLister::new();
        lister
            .expect_ls_remote()
            .times(1)
            .returning(|_, _| Ok(format!("{COMMIT}\tHEAD\n")));
        let cache = Arc::new(MemoryCache::new());
        let ctx = context(lister, cache.clone());

        let first = resolve_ref(&ctx, "acme", "secret", "HEAD").await.unwrap();
        let second = resolve_ref(&ctx, "acme", "secret", "HEAD").await.unwrap();

        assert_eq!(first, COMMIT);
        assert_eq!(second, COMMIT);
        assert_eq!(
            cache.get("git-ls-remote:git@github.com:acme/secret.git#HEAD").unwrap(),
            Some(COMMIT.to_string())
        );
    }

    #[tokio::test]
    async fn resolve_ref_fails_when_ref_is_missing() {
        let mut lister = MockRefLister::new();
        lister.expect_ls_remote().returning(|_, _| Ok(String::new()));
        let ctx = context(lister, Arc::new(MemoryCache::new()));

        let result = resolve_ref(&ctx, "acme", "secret", "nope").await;

        assert!(matches!(result, Err(FetchError::Git { .. })));
    }

    #[tokio::test]
    async fn git_cli_reports_missing_program() {
        let git = GitCli::new("definitely-not-a-real-git-binary");

        let result = git.ls_remote("git@github.com:acme/secret.git", "HEAD").await;

        assert!(matches!(result, Err(FetchError::Git { .. })));
    }
}
