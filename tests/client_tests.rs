//! API client recovery against a mock inventory API.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use integrations_fulfillment_sync::types::local_now;
use integrations_fulfillment_sync::{
    create_token_manager, ApiClient, ApiError, AesGcmCipher, CredentialStore,
    DefaultTokenManager, InMemoryCredentialStore, ReqwestHttpTransport, SyncError,
};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

use common::{seeded_rows, setup, store, Fixture};

type TestClient = ApiClient<
    ReqwestHttpTransport,
    DefaultTokenManager<ReqwestHttpTransport, InMemoryCredentialStore, AesGcmCipher>,
>;

fn client(fixture: &Fixture, credentials: Arc<InMemoryCredentialStore>) -> TestClient {
    let transport = Arc::new(ReqwestHttpTransport::with_timeout(Duration::from_secs(5)).unwrap());
    let tokens = Arc::new(
        create_token_manager(fixture.config.clone(), transport.clone(), credentials).unwrap(),
    );
    ApiClient::new(fixture.config.clone(), transport, tokens)
}

fn fresh_credentials(fixture: &Fixture) -> Arc<InMemoryCredentialStore> {
    Arc::new(InMemoryCredentialStore::with_rows(seeded_rows(
        &fixture.cipher,
        "access-1",
        "refresh-1",
        local_now() - ChronoDuration::minutes(10),
    )))
}

#[tokio::test]
async fn test_get_sends_bearer_token() {
    let fixture = setup().await;

    Mock::given(method("GET"))
        .and(path("/Api/v3/estoques/saldos"))
        .and(header("Authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&fixture.server)
        .await;

    let client = client(&fixture, fresh_credentials(&fixture));
    let url = client.url("/Api/v3/estoques/saldos");
    let body = client.get(&url, &store()).await.unwrap();

    assert_eq!(body, json!({"data": []}));
    assert_eq!(client.stats().requests_sent, 1);
}

#[tokio::test]
async fn test_unauthorized_is_retried_at_most_twice() {
    let fixture = setup().await;

    Mock::given(method("POST"))
        .and(path("/Api/v3/estoques"))
        .respond_with(ResponseTemplate::new(401))
        .expect(3)
        .mount(&fixture.server)
        .await;

    // Two consecutive 401s force one refresh before the last attempt.
    Mock::given(method("POST"))
        .and(path("/Api/v3/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-2",
            "refresh_token": "refresh-2"
        })))
        .expect(1)
        .mount(&fixture.server)
        .await;

    let client = client(&fixture, fresh_credentials(&fixture));
    let url = client.config().stock_endpoint();
    let error = client
        .post(&url, &json!({"produto": {"id": 1}}), &store())
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        SyncError::Api(ApiError::Unauthorized { attempts: 3 })
    ));
    let stats = client.stats();
    assert_eq!(stats.requests_sent, 3);
    assert_eq!(stats.auth_retries, 2);
    assert_eq!(stats.failures, 1);
}

#[tokio::test]
async fn test_rate_limited_request_is_resent() {
    let fixture = setup().await;

    Mock::given(method("POST"))
        .and(path("/Api/v3/estoques"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .expect(2)
        .mount(&fixture.server)
        .await;

    Mock::given(method("POST"))
        .and(path("/Api/v3/estoques"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"data": {"id": 42}})))
        .expect(1)
        .mount(&fixture.server)
        .await;

    let client = client(&fixture, fresh_credentials(&fixture));
    let url = client.config().stock_endpoint();
    let body = client
        .post(&url, &json!({"produto": {"id": 1}}), &store())
        .await
        .unwrap();

    assert_eq!(body["data"]["id"], 42);
    let stats = client.stats();
    assert_eq!(stats.requests_sent, 3);
    assert_eq!(stats.rate_limit_delays, 2);
    assert_eq!(stats.failures, 0);
}

#[tokio::test]
async fn test_rate_limit_gives_up_after_policy_cap() {
    let fixture = setup().await;

    Mock::given(method("POST"))
        .and(path("/Api/v3/estoques"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .expect(4)
        .mount(&fixture.server)
        .await;

    let client = client(&fixture, fresh_credentials(&fixture));
    let url = client.config().stock_endpoint();
    let error = client
        .post(&url, &json!({}), &store())
        .await
        .unwrap_err();

    match error {
        SyncError::Api(ApiError::RateLimited {
            attempts,
            retry_after,
        }) => {
            assert_eq!(attempts, 4);
            assert_eq!(retry_after, Some(Duration::from_secs(7)));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let fixture = setup().await;

    Mock::given(method("POST"))
        .and(path("/Api/v3/estoques"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&fixture.server)
        .await;

    let credentials = fresh_credentials(&fixture);
    let client = client(&fixture, credentials.clone());
    let url = client.config().stock_endpoint();
    let error = client.post(&url, &json!({}), &store()).await.unwrap_err();

    assert!(matches!(
        error,
        SyncError::Api(ApiError::Status { status: 500, .. })
    ));
    // No refresh happened, so the table still holds the seeded rows.
    assert_eq!(credentials.load_all().await.unwrap().len(), 2);
}
