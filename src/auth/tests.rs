//! Tests for the auth module

use super::*;
use crate::error::Error;
use crate::transport::WireRequest;
use crate::types::Method;
use futures::future::join_all;
use reqwest::header::{HeaderMap, AUTHORIZATION};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn wire(requires_auth: bool) -> WireRequest {
    WireRequest {
        method: Method::GET,
        url: Url::parse("https://example.com/api").unwrap(),
        headers: HeaderMap::new(),
        body: None,
        requires_auth,
    }
}

/// Refresher that counts invocations and takes a little while
fn counting_refresher(count: Arc<AtomicUsize>, succeed: bool) -> impl TokenRefresher {
    refresh_fn(move |_current| {
        let count = Arc::clone(&count);
        async move {
            let n = count.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(Duration::from_millis(50)).await;
            if succeed {
                Ok(Credential::new(format!("token-{n}")))
            } else {
                Err(Error::authentication("refresh denied"))
            }
        }
    })
}

/// Refresher whose first `failures` calls are denied
fn flaky_refresher(count: Arc<AtomicUsize>, failures: usize) -> impl TokenRefresher {
    refresh_fn(move |_current| {
        let count = Arc::clone(&count);
        async move {
            let n = count.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(Duration::from_millis(20)).await;
            if n <= failures {
                Err(Error::authentication("refresh denied"))
            } else {
                Ok(Credential::new(format!("token-{n}")))
            }
        }
    })
}

fn bearer(request: &WireRequest) -> Option<&str> {
    request
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

// ============================================================================
// Decorate
// ============================================================================

#[tokio::test]
async fn test_no_auth() {
    let mut request = wire(true);
    let stamp = NoAuth.decorate(&mut request).await.unwrap();

    assert_eq!(stamp, AuthStamp::Anonymous);
    assert!(request.headers.is_empty());
    assert!(NoAuth.handle_rejection(&stamp).await.is_err());
}

#[tokio::test]
async fn test_decorate_is_noop_without_auth_requirement() {
    let count = Arc::new(AtomicUsize::new(0));
    let providers: Vec<Box<dyn AuthProvider>> = vec![
        Box::new(NoAuth),
        Box::new(StaticBearer::new("static-token")),
        Box::new(RefreshableBearer::new(counting_refresher(
            Arc::clone(&count),
            true,
        ))),
    ];

    for provider in providers {
        let mut request = wire(false);
        request
            .headers
            .insert("x-trace", "abc".parse().unwrap());
        let before = request.headers.clone();

        let stamp = provider.decorate(&mut request).await.unwrap();
        assert_eq!(stamp, AuthStamp::Anonymous);
        assert_eq!(request.headers, before);
    }
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_static_bearer() {
    let provider = StaticBearer::new("my-bearer-token");
    let mut request = wire(true);
    let stamp = provider.decorate(&mut request).await.unwrap();

    assert_eq!(bearer(&request), Some("Bearer my-bearer-token"));
    assert!(request.headers.get(AUTHORIZATION).unwrap().is_sensitive());

    let result = provider.handle_rejection(&stamp).await;
    assert!(matches!(result, Err(Error::Authentication { .. })));
}

#[tokio::test]
async fn test_invalid_token_header_value() {
    let provider = StaticBearer::new("bad\ntoken");
    let result = provider.decorate(&mut wire(true)).await;
    assert!(matches!(result, Err(Error::Authentication { .. })));
}

// ============================================================================
// Refreshable Bearer
// ============================================================================

#[tokio::test]
async fn test_refreshable_uses_current_credential() {
    let count = Arc::new(AtomicUsize::new(0));
    let provider = RefreshableBearer::with_credential(
        Credential::expires_in("valid", 3600),
        counting_refresher(Arc::clone(&count), true),
    );

    let mut request = wire(true);
    let stamp = provider.decorate(&mut request).await.unwrap();

    assert_eq!(bearer(&request), Some("Bearer valid"));
    assert_eq!(
        stamp,
        AuthStamp::Credential {
            generation: 0,
            epoch: 0
        }
    );
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_refreshable_fetches_missing_credential() {
    let count = Arc::new(AtomicUsize::new(0));
    let provider = RefreshableBearer::new(counting_refresher(Arc::clone(&count), true));

    let mut request = wire(true);
    let stamp = provider.decorate(&mut request).await.unwrap();

    assert_eq!(bearer(&request), Some("Bearer token-1"));
    assert_eq!(
        stamp,
        AuthStamp::Credential {
            generation: 1,
            epoch: 1
        }
    );
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_refreshable_refreshes_expired_credential() {
    let count = Arc::new(AtomicUsize::new(0));
    let provider = RefreshableBearer::with_credential(
        Credential::expires_in("old", -60),
        counting_refresher(Arc::clone(&count), true),
    );

    let mut request = wire(true);
    provider.decorate(&mut request).await.unwrap();

    assert_eq!(bearer(&request), Some("Bearer token-1"));
    assert_eq!(provider.generation().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_rejections_single_flight() {
    let count = Arc::new(AtomicUsize::new(0));
    let provider = Arc::new(RefreshableBearer::with_credential(
        Credential::new("stale"),
        counting_refresher(Arc::clone(&count), true),
    ));
    let stamp = provider.decorate(&mut wire(true)).await.unwrap();

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let provider = Arc::clone(&provider);
            tokio::spawn(async move { provider.handle_rejection(&stamp).await })
        })
        .collect();

    for result in join_all(handles).await {
        assert!(result.unwrap().is_ok());
    }
    assert_eq!(count.load(Ordering::SeqCst), 1);

    let mut request = wire(true);
    provider.decorate(&mut request).await.unwrap();
    assert_eq!(bearer(&request), Some("Bearer token-1"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failed_refresh_fails_all_waiters() {
    let count = Arc::new(AtomicUsize::new(0));
    let provider = Arc::new(RefreshableBearer::with_credential(
        Credential::new("stale"),
        counting_refresher(Arc::clone(&count), false),
    ));
    let stamp = provider.decorate(&mut wire(true)).await.unwrap();

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let provider = Arc::clone(&provider);
            tokio::spawn(async move { provider.handle_rejection(&stamp).await })
        })
        .collect();

    for result in join_all(handles).await {
        match result.unwrap() {
            Err(Error::Authentication { message }) => assert_eq!(message, "refresh denied"),
            other => panic!("Expected Authentication error, got {other:?}"),
        }
    }
    assert_eq!(count.load(Ordering::SeqCst), 1);

    // A late rejection of the same credential does not start another refresh
    let late = provider.handle_rejection(&stamp).await;
    assert!(matches!(late, Err(Error::Authentication { .. })));
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_new_call_retries_after_failed_refresh() {
    let count = Arc::new(AtomicUsize::new(0));
    let provider = RefreshableBearer::new(flaky_refresher(Arc::clone(&count), 1));

    let first = provider.decorate(&mut wire(true)).await;
    assert!(matches!(first, Err(Error::Authentication { .. })));
    assert_eq!(count.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_millis(200)).await;

    let mut request = wire(true);
    provider.decorate(&mut request).await.unwrap();
    assert_eq!(bearer(&request), Some("Bearer token-2"));
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_fresh_rejection_after_failed_refresh() {
    let count = Arc::new(AtomicUsize::new(0));
    let provider = RefreshableBearer::with_credential(
        Credential::new("stale"),
        flaky_refresher(Arc::clone(&count), 1),
    );

    let raced = provider.decorate(&mut wire(true)).await.unwrap();
    assert!(provider.handle_rejection(&raced).await.is_err());
    assert!(provider.handle_rejection(&raced).await.is_err());
    assert_eq!(count.load(Ordering::SeqCst), 1);

    // Decorated after the failure, so its rejection earns a new attempt
    let fresh = provider.decorate(&mut wire(true)).await.unwrap();
    provider.handle_rejection(&fresh).await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 2);
    assert_eq!(
        provider.credential().await.unwrap().access_token,
        "token-2"
    );
}

#[tokio::test]
async fn test_stale_rejection_retries_without_refresh() {
    let count = Arc::new(AtomicUsize::new(0));
    let provider = RefreshableBearer::with_credential(
        Credential::new("stale"),
        counting_refresher(Arc::clone(&count), true),
    );

    let first = provider.decorate(&mut wire(true)).await.unwrap();
    provider.handle_rejection(&first).await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);

    // Another request stamped with the old credential is answered straight away
    provider.handle_rejection(&first).await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_anonymous_rejection_fails() {
    let provider = RefreshableBearer::new(counting_refresher(Arc::new(AtomicUsize::new(0)), true));
    let result = provider.handle_rejection(&AuthStamp::Anonymous).await;
    assert!(matches!(result, Err(Error::Authentication { .. })));
}

#[tokio::test]
async fn test_set_credential_clears_failure() {
    let count = Arc::new(AtomicUsize::new(0));
    let provider = RefreshableBearer::with_credential(
        Credential::new("stale"),
        counting_refresher(Arc::clone(&count), false),
    );
    let stamp = provider.decorate(&mut wire(true)).await.unwrap();
    assert!(provider.handle_rejection(&stamp).await.is_err());

    provider.set_credential(Credential::new("manual")).await;

    let mut request = wire(true);
    let stamp = provider.decorate(&mut request).await.unwrap();
    assert_eq!(bearer(&request), Some("Bearer manual"));
    assert_eq!(
        stamp,
        AuthStamp::Credential {
            generation: 1,
            epoch: 2
        }
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancelled_waiter_does_not_affect_others() {
    let count = Arc::new(AtomicUsize::new(0));
    let provider = Arc::new(RefreshableBearer::with_credential(
        Credential::new("stale"),
        counting_refresher(Arc::clone(&count), true),
    ));
    let stamp = provider.decorate(&mut wire(true)).await.unwrap();

    // The initiator gives up long before the refresh completes
    let initiator = tokio::time::timeout(
        Duration::from_millis(5),
        provider.handle_rejection(&stamp),
    )
    .await;
    assert!(initiator.is_err());

    // A second waiter still gets the refreshed credential
    provider.handle_rejection(&stamp).await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(
        provider.credential().await.unwrap().access_token,
        "token-1"
    );
}

// ============================================================================
// OAuth2 Refresher
// ============================================================================

#[tokio::test]
async fn test_oauth2_refresher() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("client_id=my-client"))
        .and(body_string_contains("client_secret=my-secret"))
        .and(body_string_contains("refresh_token=rt-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "fresh-access",
            "expires_in": 3600,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let refresher = OAuth2Refresher::new(format!("{}/oauth/token", mock_server.uri()), "my-client")
        .client_secret("my-secret");
    let current = Credential::new("old-access").with_refresh_token("rt-1");

    let credential = refresher.refresh(Some(&current)).await.unwrap();
    assert_eq!(credential.access_token, "fresh-access");
    // Server did not rotate the refresh token
    assert_eq!(credential.refresh_token.as_deref(), Some("rt-1"));
    assert!(credential.expires_at.is_some());
}

#[tokio::test]
async fn test_oauth2_refresher_rotates_refresh_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("refresh_token=configured"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "a2",
            "refresh_token": "rt-2"
        })))
        .mount(&mock_server)
        .await;

    let refresher = OAuth2Refresher::new(format!("{}/token", mock_server.uri()), "cli")
        .refresh_token("configured");

    let credential = refresher.refresh(None).await.unwrap();
    assert_eq!(credential.access_token, "a2");
    assert_eq!(credential.refresh_token.as_deref(), Some("rt-2"));
    assert!(credential.expires_at.is_none());
}

#[tokio::test]
async fn test_oauth2_refresher_error_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
        .mount(&mock_server)
        .await;

    let refresher = OAuth2Refresher::new(format!("{}/token", mock_server.uri()), "cli")
        .refresh_token("revoked");

    match refresher.refresh(None).await {
        Err(Error::Authentication { message }) => {
            assert!(message.contains("400"));
            assert!(message.contains("invalid_grant"));
        }
        other => panic!("Expected Authentication error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_oauth2_refresher_without_refresh_token() {
    let refresher = OAuth2Refresher::new("http://127.0.0.1:9/token", "cli");
    let result = refresher.refresh(Some(&Credential::new("a"))).await;
    assert!(matches!(result, Err(Error::Authentication { .. })));
}
