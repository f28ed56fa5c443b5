//! GitHub provider against a wiremock server.

use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use staleguard_core::models::classification::{Classification, InaccessibleReason};
use staleguard_core::retry::RetryPolicy;
use staleguard_host::github::GitHubProvider;
use staleguard_host::{HostProvider, Inspector, RepoLookup};

fn provider(server: &MockServer) -> GitHubProvider {
    GitHubProvider::new(&server.uri(), "ghp_test", Duration::from_secs(5)).unwrap()
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        tries: 2,
        delay: Duration::ZERO,
        backoff: 2,
    }
}

fn pushed(days_ago: i64) -> String {
    (Utc::now() - ChronoDuration::days(days_ago))
        .format("%Y-%m-%dT%H:%M:%SZ")
        .to_string()
}

#[tokio::test]
async fn test_sends_api_headers_and_parses_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets"))
        .and(header("authorization", "Bearer ghp_test"))
        .and(header("accept", "application/vnd.github+json"))
        .and(header("x-github-api-version", "2022-11-28"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "full_name": "acme/widgets",
            "pushed_at": pushed(10),
            "archived": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider(&server);
    let inspector = Inspector::new(&provider, 90, fast_retry());
    let result = inspector
        .inspect("https://github.com/acme/widgets", Utc::now())
        .await;
    assert_eq!(result, Classification::Active);
}

#[tokio::test]
async fn test_stale_and_archived() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/old"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "pushed_at": pushed(200),
            "archived": false
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/frozen"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "pushed_at": pushed(500),
            "archived": true
        })))
        .mount(&server)
        .await;

    let provider = provider(&server);
    let inspector = Inspector::new(&provider, 90, fast_retry());
    let now = Utc::now();
    assert_eq!(
        inspector.inspect("https://github.com/acme/old", now).await,
        Classification::Stale
    );
    assert_eq!(
        inspector.inspect("git@github.com:acme/frozen.git", now).await,
        Classification::Archived
    );
}

#[tokio::test]
async fn test_status_codes_map_to_lookups() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "message": "Not Found"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/locked"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "message": "Bad credentials"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/sso"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let provider = provider(&server);
    assert_eq!(
        provider.repo_metadata("acme", "gone").await.unwrap(),
        RepoLookup::NotFound
    );
    assert_eq!(
        provider.repo_metadata("acme", "locked").await.unwrap(),
        RepoLookup::BadCredentials
    );
    assert_eq!(
        provider.repo_metadata("acme", "sso").await.unwrap(),
        RepoLookup::Forbidden
    );
}

#[tokio::test]
async fn test_missing_fields_are_unknown() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/empty"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "full_name": "acme/empty",
            "pushed_at": null
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/garbled"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let provider = provider(&server);
    let inspector = Inspector::new(&provider, 90, fast_retry());
    let unknown = Classification::Inaccessible(InaccessibleReason::Unknown);
    assert_eq!(
        inspector.inspect("https://github.com/acme/empty", Utc::now()).await,
        unknown
    );
    assert_eq!(
        inspector.inspect("https://github.com/acme/garbled", Utc::now()).await,
        unknown
    );
}

#[tokio::test]
async fn test_server_errors_retry_then_fail_closed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/flaky"))
        .respond_with(ResponseTemplate::new(502))
        .expect(2)
        .mount(&server)
        .await;

    let provider = provider(&server);
    let inspector = Inspector::new(&provider, 90, fast_retry());
    assert_eq!(
        inspector.inspect("https://github.com/acme/flaky", Utc::now()).await,
        Classification::Inaccessible(InaccessibleReason::Unreachable)
    );
}

#[tokio::test]
async fn test_rate_limit_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/busy"))
        .respond_with(ResponseTemplate::new(403).insert_header("x-ratelimit-remaining", "0"))
        .mount(&server)
        .await;

    let provider = provider(&server);
    let err = provider.repo_metadata("acme", "busy").await.unwrap_err();
    assert!(err.is_transient());
}
