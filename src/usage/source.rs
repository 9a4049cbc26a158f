//! Where a usage lives and how to read it

use std::path::PathBuf;

use tracing::debug;

use crate::error::UsageError;
use crate::fetch::http::{self, RequestOptions};
use crate::usage::UsageContext;
use crate::usage::paths;

/// Hosts whose files are read through the GitHub contents API
const GITHUB_HOSTS: &[&str] = &["github.com", "www.github.com"];

/// A file on the local disk or inside a hosted repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Absolute local path, possibly containing aliases
    Local(String),
    GitHub(GitHubFile),
}

/// `github.com/owner/repo/blob/ref/path...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubFile {
    pub owner: String,
    pub repo: String,
    pub reference: String,
    pub path: String,
}

impl Source {
    /// Classify a configured source string
    pub fn parse(raw: &str) -> Result<Self, UsageError> {
        let trimmed = raw.trim();
        if trimmed.starts_with('/') {
            return Ok(Source::Local(trimmed.to_string()));
        }

        let rest = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"))
            .unwrap_or(trimmed);

        let segments: Vec<&str> = rest.split('/').collect();
        match segments.as_slice() {
            [host, owner, repo, "blob", reference, path @ ..]
                if !path.is_empty()
                    && [host, owner, repo, reference].iter().all(|s| !s.is_empty())
                    && path.iter().all(|s| !s.is_empty()) =>
            {
                if !GITHUB_HOSTS.iter().any(|h| host.eq_ignore_ascii_case(h)) {
                    return Err(UsageError::UnsupportedHost(host.to_string()));
                }
                Ok(Source::GitHub(GitHubFile {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                    reference: reference.to_string(),
                    path: path.join("/"),
                }))
            }
            _ => Err(UsageError::InvalidSource(raw.to_string())),
        }
    }
}

/// Text content of a source
pub async fn read(source: &Source, ctx: &UsageContext) -> Result<String, UsageError> {
    match source {
        Source::Local(path) => match &ctx.paths {
            Some(paths) => read_file(&paths::normalize(source, paths)?).await,
            None => read_file(path).await,
        },
        Source::GitHub(file) => {
            if let Some(token) = ctx.credentials.token_for(&file.owner) {
                return read_remote(file, token, ctx).await;
            }
            match &ctx.paths {
                Some(paths) => read_file(&paths::normalize(source, paths)?).await,
                None => Err(UsageError::NoAccess(format!(
                    "{}/{}/{}",
                    file.owner, file.repo, file.path
                ))),
            }
        }
    }
}

async fn read_file(path: &str) -> Result<String, UsageError> {
    debug!("Reading {}", path);
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| UsageError::Io {
            path: PathBuf::from(path),
            source,
        })
}

/// Raw file content through the contents API
async fn read_remote(
    file: &GitHubFile,
    token: &str,
    ctx: &UsageContext,
) -> Result<String, UsageError> {
    let base = format!(
        "{}/repos/{}/{}/contents/{}",
        ctx.github_api, file.owner, file.repo, file.path
    );
    let url = reqwest::Url::parse_with_params(&base, &[("ref", file.reference.as_str())])
        .map_err(|_| UsageError::InvalidSource(base.clone()))?;

    let options = RequestOptions {
        accept: Some("application/vnd.github.raw"),
        token: Some(token),
    };
    Ok(http::get(&ctx.client, url.as_str(), options).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::Credentials;
    use crate::error::FetchError;
    use crate::usage::paths::PathsConfig;
    use indexmap::IndexMap;
    use mockito::{Matcher, Server};
    use rstest::rstest;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn github(path: &str) -> Source {
        Source::GitHub(GitHubFile {
            owner: "acme".to_string(),
            repo: "infra".to_string(),
            reference: "main".to_string(),
            path: path.to_string(),
        })
    }

    #[rstest]
    #[case("github.com/acme/infra/blob/main/apps/values.yaml")]
    #[case("https://github.com/acme/infra/blob/main/apps/values.yaml")]
    #[case("http://github.com/acme/infra/blob/main/apps/values.yaml")]
    #[case("https://GitHub.com/acme/infra/blob/main/apps/values.yaml")]
    fn parse_accepts_remote_references(#[case] raw: &str) {
        assert_eq!(Source::parse(raw).unwrap(), github("apps/values.yaml"));
    }

    #[test]
    fn parse_accepts_absolute_paths() {
        assert_eq!(
            Source::parse("/srv/infra/flake.lock").unwrap(),
            Source::Local("/srv/infra/flake.lock".to_string())
        );
    }

    #[rstest]
    #[case("relative/file.yaml")]
    #[case("github.com/acme/infra/tree/main/values.yaml")]
    #[case("github.com/acme/infra/blob/main")]
    #[case("github.com/acme/infra/blob/main/")]
    #[case("")]
    fn parse_rejects_other_forms(#[case] raw: &str) {
        assert!(matches!(
            Source::parse(raw),
            Err(UsageError::InvalidSource(_))
        ));
    }

    #[rstest]
    #[case("gitlab.com/acme/infra/blob/main/values.yaml", "gitlab.com")]
    #[case("https://git.example.com/acme/infra/blob/main/values.yaml", "git.example.com")]
    fn parse_rejects_hosts_other_than_github(#[case] raw: &str, #[case] expected: &str) {
        assert!(matches!(
            Source::parse(raw),
            Err(UsageError::UnsupportedHost(ref host)) if host == expected
        ));
    }

    fn context(
        server_url: &str,
        credentials: Credentials,
        paths: Option<PathsConfig>,
    ) -> UsageContext {
        UsageContext::new(credentials, paths)
            .unwrap()
            .with_github_api(server_url)
    }

    #[tokio::test]
    async fn read_fetches_raw_content_with_credential() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/acme/infra/contents/apps/values.yaml")
            .match_query(Matcher::UrlEncoded("ref".into(), "main".into()))
            .match_header("accept", "application/vnd.github.raw")
            .match_header("authorization", "Bearer t0ken")
            .with_status(200)
            .with_body("image: nginx:1.25.3\n")
            .create_async()
            .await;

        let ctx = context(
            &server.url(),
            Credentials::new().with_token("acme", "t0ken"),
            None,
        );
        let body = read(&github("apps/values.yaml"), &ctx).await.unwrap();

        mock.assert_async().await;
        assert_eq!(body, "image: nginx:1.25.3\n");
    }

    #[tokio::test]
    async fn read_fails_on_non_200_from_contents_api() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/repos/acme/infra/contents/missing.yaml")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body("Not Found")
            .create_async()
            .await;

        let ctx = context(
            &server.url(),
            Credentials::new().with_token("default", "t"),
            None,
        );
        let result = read(&github("missing.yaml"), &ctx).await;

        assert!(matches!(
            result,
            Err(UsageError::Fetch(FetchError::Status { status: 404, .. }))
        ));
    }

    #[tokio::test]
    async fn read_uses_path_mapping_without_credential() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("apps")).unwrap();
        std::fs::write(dir.path().join("apps/values.yaml"), "tag: 1.0.0\n").unwrap();

        let mut github_roots = IndexMap::new();
        github_roots.insert(
            "acme/infra".to_string(),
            dir.path().to_string_lossy().into_owned(),
        );
        let paths = PathsConfig {
            alias: IndexMap::new(),
            github: github_roots,
        };
        let ctx = context("http://127.0.0.1:1", Credentials::new(), Some(paths));

        let body = read(&github("apps/values.yaml"), &ctx).await.unwrap();

        assert_eq!(body, "tag: 1.0.0\n");
    }

    #[tokio::test]
    async fn read_without_credential_or_mapping_fails() {
        let ctx = context("http://127.0.0.1:1", Credentials::new(), None);

        let result = read(&github("apps/values.yaml"), &ctx).await;

        assert!(matches!(result, Err(UsageError::NoAccess(_))));
    }

    #[tokio::test]
    async fn read_local_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "version = \"2.0.0\"").unwrap();
        let ctx = context("http://127.0.0.1:1", Credentials::new(), None);

        let source = Source::Local(file.path().to_string_lossy().into_owned());
        let body = read(&source, &ctx).await.unwrap();

        assert_eq!(body, "version = \"2.0.0\"");
    }

    #[tokio::test]
    async fn read_missing_local_file_reports_path() {
        let ctx = context("http://127.0.0.1:1", Credentials::new(), None);

        let source = Source::Local("/nonexistent/version-drift.yaml".to_string());
        let result = read(&source, &ctx).await;

        assert!(matches!(
            result,
            Err(UsageError::Io { ref path, .. }) if path.ends_with("version-drift.yaml")
        ));
    }
}
