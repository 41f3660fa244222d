//! End-to-end evidence aggregation against a mocked GitHub.

use std::sync::Arc;

use repo_evidence::{
    parse_references, render_evidence, EvidenceAggregator, EvidenceError, EvidenceLimits,
    FileBody, GitHubConfig, GitHubHost,
};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn limits() -> EvidenceLimits {
    EvidenceLimits {
        inter_request_delay_ms: 1,
        ..EvidenceLimits::default()
    }
}

fn aggregator_for(server: &MockServer) -> EvidenceAggregator {
    let config = GitHubConfig::new(&server.uri(), &format!("{}/raw", server.uri()));
    let host = GitHubHost::new(config).unwrap();
    EvidenceAggregator::new(Arc::new(host), limits())
}

/// `octo/public` is readable anonymously; `octo/secret` only through blobs.
async fn mount_two_repositories(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/repos/octo/public"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"default_branch": "main", "private": false})),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/public/git/trees/main"))
        .and(query_param("recursive", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "truncated": false,
            "tree": [
                {"path": "src", "type": "tree"},
                {"path": "src/index.ts", "type": "blob", "url": format!("{}/blob/p1", server.uri())},
                {"path": "README.md", "type": "blob", "url": format!("{}/blob/p2", server.uri())}
            ]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/raw/octo/public/main/README.md"))
        .respond_with(ResponseTemplate::new(200).set_body_string("# Public project"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/raw/octo/public/main/src/index.ts"))
        .respond_with(ResponseTemplate::new(200).set_body_string("export const x = 1;"))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/octo/secret"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"default_branch": "develop", "private": true})),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/secret/git/trees/develop"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tree": [
                {"path": "main.go", "type": "blob", "url": format!("{}/blob/s1", server.uri())}
            ]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/blob/s1"))
        .and(header("Authorization", "Bearer ghp_test"))
        .respond_with(
            ResponseTemplate::new(200)
                // "package main" split across lines the way the blob API wraps it
                .set_body_json(json!({"content": "cGFja2FnZS\nBtYWlu\n", "encoding": "base64"})),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_public_and_private_repositories_are_attributed() {
    let server = MockServer::start().await;
    mount_two_repositories(&server).await;
    let refs = parse_references(&[
        "https://github.com/octo/public",
        "https://github.com/octo/secret.git",
    ])
    .unwrap();

    let bundles = aggregator_for(&server)
        .aggregate(&refs, Some("ghp_test"))
        .await
        .unwrap();

    assert_eq!(bundles.len(), 2);
    assert_eq!(bundles[0].repository.is_private, Some(false));
    assert_eq!(bundles[1].repository.is_private, Some(true));
    assert_eq!(bundles[1].branch, "develop");

    assert_eq!(bundles[0].structure, vec!["src/index.ts", "README.md"]);
    assert_eq!(bundles[0].file_contents[0].path, "README.md");
    assert_eq!(
        bundles[1].file_contents[0].body,
        FileBody::Text {
            text: "package main".into()
        }
    );

    let text = render_evidence(&bundles);
    assert!(text.contains("--- START OF FILE: octo/public/README.md ---\n# Public project\n--- END OF FILE ---"));
    assert!(text.contains("--- START OF FILE: octo/secret/main.go ---\npackage main\n--- END OF FILE ---"));

    // Public bodies never go through the credentialed endpoint.
    let received = server.received_requests().await.unwrap();
    assert!(received
        .iter()
        .filter(|r| r.url.path().starts_with("/raw/"))
        .all(|r| r.headers.get("authorization").is_none()));
    assert!(!received.iter().any(|r| r.url.path().starts_with("/blob/p")));
}

#[tokio::test]
async fn test_private_repository_without_credential_fails() {
    let server = MockServer::start().await;
    mount_two_repositories(&server).await;
    let refs = parse_references(&["https://github.com/octo/public", "https://github.com/octo/secret"])
        .unwrap();

    let err = aggregator_for(&server)
        .aggregate(&refs, None)
        .await
        .unwrap_err();

    assert!(matches!(err, EvidenceError::Unauthorized { ref repo } if repo == "octo/secret"));
    assert!(err.user_message().contains("access token"));
}

#[tokio::test]
async fn test_rate_limited_metadata_is_terminal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/busy"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;
    let refs = parse_references(&["https://github.com/octo/busy"]).unwrap();

    let err = aggregator_for(&server)
        .aggregate(&refs, None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EvidenceError::RateLimited {
            authenticated: false,
            ..
        }
    ));
}

#[tokio::test]
async fn test_failed_file_becomes_marker() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"private": false})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/flaky/git/trees/main"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tree": [
                {"path": "README.md", "type": "blob", "url": "u1"},
                {"path": "src/app.py", "type": "blob", "url": "u2"}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/raw/octo/flaky/main/README.md"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/raw/octo/flaky/main/src/app.py"))
        .respond_with(ResponseTemplate::new(200).set_body_string("print('hi')"))
        .mount(&server)
        .await;
    let refs = parse_references(&["github.com/octo/flaky"]).unwrap();

    let bundles = aggregator_for(&server).aggregate(&refs, None).await.unwrap();

    let text = render_evidence(&bundles);
    assert!(text.contains("--- ERROR FETCHING: octo/flaky/README.md (Status: 500) ---"));
    assert!(text.contains("print('hi')"));
    assert_eq!(bundles[0].summary, "Repo octo/flaky: 2 files.");
}
