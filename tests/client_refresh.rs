//! Client behaviour against a mocked API: one shared refresh per burst of 401s, a single replay,
//! and sign-out when the refresh is rejected.

use serde_json::{json, Value};
use session_gate::{ApiClient, AuthState, ClientConfig, ClientError, Credentials, RequestSpec};
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn stale_client(server: &MockServer) -> ApiClient {
    ApiClient::new(ClientConfig::new(server.uri()).credentials(Credentials {
        access_token: "stale".into(),
        refresh_token: Some("r1".into()),
    }))
    .unwrap()
}

fn unauthorized() -> ResponseTemplate {
    ResponseTemplate::new(401).set_body_json(json!({
        "success": false,
        "error": "session expired or invalid"
    }))
}

async fn mount_items(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/items/\d+$"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(unauthorized())
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/items/\d+$"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"ok": true}
        })))
        .mount(server)
        .await;
}

async fn burst(client: &ApiClient, n: usize) -> Vec<Result<Value, ClientError>> {
    let mut tasks = Vec::new();
    for i in 0..n {
        let client = client.clone();
        tasks.push(tokio::spawn(async move {
            client.get_json::<Value>(&format!("/api/items/{}", i)).await
        }));
    }
    let mut results = Vec::new();
    for t in tasks {
        results.push(t.await.unwrap());
    }
    results
}

#[tokio::test]
async fn concurrent_401s_share_one_refresh() {
    let server = MockServer::start().await;
    mount_items(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .and(body_json(json!({"refresh_token": "r1"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "success": true,
                    "data": {"access_token": "fresh", "refresh_token": "r2"}
                }))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = stale_client(&server);
    let results = burst(&client, 3).await;

    for r in &results {
        assert_eq!(r.as_ref().unwrap()["ok"], true);
    }
    assert_eq!(client.refresh_attempts(), 1);
    let creds = client.credentials().unwrap();
    assert_eq!(creds.access_token, "fresh");
    assert_eq!(creds.refresh_token.as_deref(), Some("r2"));
    assert_eq!(client.current_auth_state(), AuthState::SignedIn);
    assert!(!client.refresh_in_flight());

    // Every replay went out after the refresh call was received.
    let received = server.received_requests().await.unwrap();
    let refresh_at = received
        .iter()
        .position(|r| r.url.path() == "/api/auth/refresh")
        .unwrap();
    let replays: Vec<usize> = received
        .iter()
        .enumerate()
        .filter(|(_, r)| {
            r.headers
                .get("authorization")
                .is_some_and(|v| v.as_bytes() == b"Bearer fresh")
        })
        .map(|(i, _)| i)
        .collect();
    assert_eq!(replays.len(), 3);
    assert!(replays.iter().all(|&i| i > refresh_at));
}

#[tokio::test]
async fn rejected_refresh_signs_out_every_caller() {
    let server = MockServer::start().await;
    mount_items(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(unauthorized().set_delay(Duration::from_millis(200)))
        .expect(1)
        .mount(&server)
        .await;

    let client = stale_client(&server);
    let mut state = client.auth_state();
    let results = burst(&client, 3).await;

    for r in &results {
        assert!(r.as_ref().unwrap_err().is_unauthorized());
    }
    assert_eq!(client.refresh_attempts(), 1);
    assert!(client.credentials().is_none());
    state.changed().await.unwrap();
    assert_eq!(*state.borrow(), AuthState::SignedOut);
}

/// `/api/slow` answers the stale token with a 401 only after `delay`, so its 401 lands after a
/// refresh started by `/api/fast` has already settled.
async fn mount_slow_and_fast(server: &MockServer, delay: Duration) {
    Mock::given(method("GET"))
        .and(path("/api/slow"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(unauthorized().set_delay(delay))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/fast"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(unauthorized())
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/(slow|fast)$"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"ok": true}
        })))
        .mount(server)
        .await;
}

/// Spawns a GET to `/api/slow` and returns once the server has seen it.
async fn send_slow(
    server: &MockServer,
    client: &ApiClient,
) -> tokio::task::JoinHandle<Result<Value, ClientError>> {
    let handle = {
        let client = client.clone();
        tokio::spawn(async move { client.get_json::<Value>("/api/slow").await })
    };
    loop {
        let received = server.received_requests().await.unwrap();
        if received.iter().any(|r| r.url.path() == "/api/slow") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    handle
}

#[tokio::test]
async fn late_401_after_settled_refresh_replays_without_refreshing() {
    let server = MockServer::start().await;
    mount_slow_and_fast(&server, Duration::from_millis(500)).await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"access_token": "fresh", "refresh_token": "r2"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = stale_client(&server);
    let slow = send_slow(&server, &client).await;

    let fast = client.get_json::<Value>("/api/fast").await.unwrap();
    assert_eq!(fast["ok"], true);
    assert_eq!(client.refresh_attempts(), 1);
    assert!(!client.refresh_in_flight());

    let slow = slow.await.unwrap().unwrap();
    assert_eq!(slow["ok"], true);
    assert_eq!(client.refresh_attempts(), 1);
    assert_eq!(client.credentials().unwrap().access_token, "fresh");
}

#[tokio::test]
async fn late_401_after_failed_refresh_is_unauthorized() {
    let server = MockServer::start().await;
    mount_slow_and_fast(&server, Duration::from_millis(500)).await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(unauthorized())
        .expect(1)
        .mount(&server)
        .await;

    let client = stale_client(&server);
    let slow = send_slow(&server, &client).await;

    let err = client.get_json::<Value>("/api/fast").await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(client.current_auth_state(), AuthState::SignedOut);

    let err = slow.await.unwrap().unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(client.refresh_attempts(), 1);

    // Neither request was replayed.
    let received = server.received_requests().await.unwrap();
    assert_eq!(received.iter().filter(|r| r.url.path() == "/api/slow").count(), 1);
    assert_eq!(received.iter().filter(|r| r.url.path() == "/api/fast").count(), 1);
}

#[tokio::test]
async fn replay_that_still_fails_is_not_refreshed_again() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/locked"))
        .respond_with(unauthorized())
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"access_token": "fresh", "refresh_token": "r2"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = stale_client(&server);
    let err = client.get_json::<Value>("/api/locked").await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(client.refresh_attempts(), 1);
    // The refresh itself worked; only the resource refused.
    assert_eq!(client.current_auth_state(), AuthState::SignedIn);
}

#[tokio::test]
async fn refresh_endpoint_401_is_returned_as_is() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(unauthorized())
        .expect(1)
        .mount(&server)
        .await;

    let client = stale_client(&server);
    let response = client
        .execute(RequestSpec::post("/api/auth/refresh"))
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 401);
    assert_eq!(client.refresh_attempts(), 0);
}

#[tokio::test]
async fn opted_out_request_skips_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/items/1"))
        .respond_with(unauthorized())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(unauthorized())
        .expect(0)
        .mount(&server)
        .await;

    let client = stale_client(&server);
    let err = client
        .request_json::<Value>(RequestSpec::get("/api/items/1").without_retry())
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(client.refresh_attempts(), 0);
    assert_eq!(client.current_auth_state(), AuthState::SignedIn);
}

#[tokio::test]
async fn wrong_password_does_not_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "success": false,
            "error": "invalid email or password"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(unauthorized())
        .expect(0)
        .mount(&server)
        .await;

    let client = ApiClient::new(ClientConfig::new(server.uri())).unwrap();
    let err = client.login("a@example.com", "wrong-password").await.unwrap_err();

    match err {
        ClientError::Unauthorized(message) => assert_eq!(message, "invalid email or password"),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(client.current_auth_state(), AuthState::Unknown);
}

#[tokio::test]
async fn non_401_errors_pass_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/items/1"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "success": false,
            "error": "item not found"
        })))
        .mount(&server)
        .await;

    let client = stale_client(&server);
    let err = client.get_json::<Value>("/api/items/1").await.unwrap_err();

    assert_eq!(err.status().map(|s| s.as_u16()), Some(404));
    assert_eq!(client.refresh_attempts(), 0);
}
