//! Helm upstream E2E tests

mod helper;

use indexmap::IndexMap;
use mockito::Server;

use helper::{
    HELM_INDEX, fetch_context, helm_release, helm_release_usage, helm_upstream, mock_helm_index,
    sqlite_fetch_context, usage_context, write_file,
};
use version_drift::check::check;

#[tokio::test]
async fn reports_outdated_usage_with_upstream_app_version() {
    let mut server = Server::new_async().await;
    let mock = mock_helm_index(&mut server, HELM_INDEX).await;
    let dir = tempfile::tempdir().unwrap();

    let mut usages = IndexMap::new();
    usages.insert(
        "prod".to_string(),
        helm_release_usage(&write_file(dir.path(), "prod/ingress.yaml", &helm_release("4.2.0"))),
    );
    usages.insert(
        "staging".to_string(),
        helm_release_usage(&write_file(dir.path(), "staging/ingress.yaml", &helm_release("4.1.0"))),
    );

    let result = check(
        "ingress-nginx",
        &helm_upstream(&server, "ingress-nginx"),
        &usages,
        &fetch_context(),
        &usage_context(),
    )
    .await;

    mock.assert_async().await;
    let upstream = result.upstream.as_ref().unwrap();
    assert_eq!(upstream.version.main(), "4.2.0");
    assert_eq!(upstream.version.app(), Some("1.9"));
    assert_eq!(upstream.latest().main(), "4.2.0");

    assert_eq!(result.outdated.len(), 1);
    let staging = &result.outdated["staging"];
    assert_eq!(staging.main(), "4.1.0");
    assert_eq!(staging.app(), Some("1.8"));
    assert!(result.errored.is_empty());
    assert_eq!(result.current.len(), 2);
}

#[tokio::test]
async fn second_check_is_served_from_sqlite_cache() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/charts/index.yaml")
        .with_status(200)
        .with_body(HELM_INDEX)
        .expect(1)
        .create_async()
        .await;
    let dir = tempfile::tempdir().unwrap();
    let (_db_dir, ctx) = sqlite_fetch_context();

    let mut usages = IndexMap::new();
    usages.insert(
        "prod".to_string(),
        helm_release_usage(&write_file(dir.path(), "ingress.yaml", &helm_release("4.2.0"))),
    );
    let upstream = helm_upstream(&server, "ingress-nginx");

    let first = check("ingress-nginx", &upstream, &usages, &ctx, &usage_context()).await;
    let second = check("ingress-nginx", &upstream, &usages, &ctx, &usage_context()).await;

    mock.assert_async().await;
    assert_eq!(first, second);
    assert!(!second.is_outdated());
}

#[tokio::test]
async fn failed_upstream_still_reports_usages() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/charts/index.yaml")
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;
    let dir = tempfile::tempdir().unwrap();

    let mut usages = IndexMap::new();
    usages.insert(
        "staging".to_string(),
        helm_release_usage(&write_file(dir.path(), "ingress.yaml", &helm_release("4.1.0"))),
    );
    usages.insert(
        "missing".to_string(),
        helm_release_usage("/nonexistent/version-drift/ingress.yaml"),
    );

    let result = check(
        "ingress-nginx",
        &helm_upstream(&server, "ingress-nginx"),
        &usages,
        &fetch_context(),
        &usage_context(),
    )
    .await;

    assert!(result.upstream.is_none());
    assert!(result.upstream_error.as_deref().unwrap().contains("500"));
    assert!(result.outdated.is_empty());
    assert_eq!(result.errored, vec!["missing".to_string()]);
    assert!(result.current.contains_key("staging"));
}
