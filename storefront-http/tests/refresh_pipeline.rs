//! End-to-end behaviour of the refresh pipeline against a mock backend.

use futures::future::join_all;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use storefront_auth::{
    AuthError, ChannelLogoutHandler, CredentialStore, Credentials, FileStore, LogoutReason,
    MemoryStore,
};
use storefront_http::{AuthClient, ClientConfig, RequestError};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REFRESH_PATH: &str = "/api/user/refresh-token";

async fn mount_refresh(server: &MockServer, new_token: &str, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .and(header("authorization", "Bearer r1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": true, "data": {"accessToken": new_token}})),
        )
        .expect(expected_calls)
        .mount(server)
        .await;
}

/// Responds 401 to `stale` and 200 to `fresh` on `GET route`.
async fn mount_protected(server: &MockServer, route: &str, stale: &str, fresh: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .and(header("authorization", format!("Bearer {stale}").as_str()))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Unauthorized"})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(route))
        .and(header("authorization", format!("Bearer {fresh}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": route})))
        .mount(server)
        .await;
}

fn build(
    server: &MockServer,
    store: Arc<MemoryStore>,
) -> (
    AuthClient,
    tokio::sync::mpsc::UnboundedReceiver<storefront_auth::LogoutEvent>,
) {
    let (logout, rx) = ChannelLogoutHandler::new();
    let client = AuthClient::builder()
        .config(
            ClientConfig::new()
                .base_url(server.uri())
                .public_route("/")
                .public_route("/api/product"),
        )
        .store(store)
        .logout_handler(logout)
        .build()
        .unwrap();
    (client, rx)
}

#[tokio::test]
async fn concurrent_expired_requests_share_one_refresh() {
    let server = MockServer::start().await;
    mount_refresh(&server, "a2", 1).await;
    mount_protected(&server, "/api/order/order-list", "a1", "a2").await;
    mount_protected(&server, "/api/cart/get", "a1", "a2").await;

    let store = Arc::new(MemoryStore::with_credentials(&Credentials::new("a1", "r1")));
    let (client, mut logouts) = build(&server, store.clone());

    let (orders, cart) = tokio::join!(
        client.get_json::<serde_json::Value>("/api/order/order-list"),
        client.get_json::<serde_json::Value>("/api/cart/get"),
    );

    assert_eq!(orders.unwrap(), json!({"data": "/api/order/order-list"}));
    assert_eq!(cart.unwrap(), json!({"data": "/api/cart/get"}));
    assert_eq!(store.access_token().unwrap().as_deref(), Some("a2"));
    assert_eq!(store.refresh_token().unwrap().as_deref(), Some("r1"));
    assert!(logouts.try_recv().is_err());
}

#[tokio::test]
async fn many_spawned_requests_refresh_once() {
    let server = MockServer::start().await;
    mount_refresh(&server, "a2", 1).await;
    mount_protected(&server, "/api/address/get", "a1", "a2").await;

    let store = Arc::new(MemoryStore::with_credentials(&Credentials::new("a1", "r1")));
    let (client, _logouts) = build(&server, store);

    let handles = (0..8).map(|_| {
        let client = client.clone();
        tokio::spawn(async move { client.get("/api/address/get").await })
    });
    for result in join_all(handles).await {
        assert_eq!(result.unwrap().unwrap().status(), 200);
    }
    assert!(!client.session().is_refreshing());
}

#[tokio::test]
async fn request_without_any_tokens_is_rejected_without_refresh() {
    let server = MockServer::start().await;
    mount_refresh(&server, "unused", 0).await;
    Mock::given(method("GET"))
        .and(path("/api/cart/get"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let (client, mut logouts) = build(&server, store.clone());

    let err = client.get("/api/cart/get").await.unwrap_err();
    assert!(matches!(err, RequestError::Auth(AuthError::MissingRefreshToken)));
    assert!(store.is_empty());

    let event = logouts.try_recv().unwrap();
    assert_eq!(event.reason, LogoutReason::MissingRefreshToken);
    assert_eq!(event.redirect.as_deref(), Some("/login"));
}

#[tokio::test]
async fn refreshed_token_rejected_again_is_final() {
    let server = MockServer::start().await;
    mount_refresh(&server, "a2", 1).await;
    Mock::given(method("GET"))
        .and(path("/api/order/order-list"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::with_credentials(&Credentials::new("a1", "r1")));
    let (client, _logouts) = build(&server, store);

    let err = client.get("/api/order/order-list").await.unwrap_err();
    assert!(matches!(err, RequestError::Unauthorized { .. }));
}

#[tokio::test]
async fn failed_refresh_fails_every_waiter_and_logs_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"message": "Refresh token expired"}))
                .set_delay(std::time::Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_protected(&server, "/api/order/order-list", "a1", "a2").await;

    let store = Arc::new(MemoryStore::with_credentials(&Credentials::new("a1", "r1")));
    let (client, mut logouts) = build(&server, store.clone());

    let results = join_all((0..3).map(|_| client.get("/api/order/order-list"))).await;
    for result in results {
        let err = result.unwrap_err();
        assert!(err.is_auth_failure(), "{err}");
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.message(), "Refresh token expired");
    }
    assert!(store.is_empty());
    assert_eq!(logouts.try_recv().unwrap().reason, LogoutReason::RefreshFailed);
}

#[tokio::test]
async fn public_route_clears_tokens_without_redirect() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/product/get"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::with_credentials(&Credentials::access_only("a1")));
    let (client, mut logouts) = build(&server, store.clone());

    let err = client
        .get("/api/product/get?return=https://shop.test/checkout")
        .await
        .unwrap_err();
    assert!(err.is_auth_failure());
    assert!(store.is_empty());

    let event = logouts.try_recv().unwrap();
    assert_eq!(event.request_path, "/api/product/get");
    assert!(!event.should_redirect());
}

#[tokio::test]
async fn non_auth_errors_surface_unchanged() {
    let server = MockServer::start().await;
    mount_refresh(&server, "unused", 0).await;
    Mock::given(method("POST"))
        .and(path("/api/cart/create"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"message": "Out of stock"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::with_credentials(&Credentials::new("a1", "r1")));
    let (client, _logouts) = build(&server, store.clone());

    let err = client
        .post_json("/api/cart/create", &json!({"productId": "p1"}))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert_eq!(err.message(), "Out of stock");
    assert_eq!(store.access_token().unwrap().as_deref(), Some("a1"));
}

#[tokio::test]
async fn rotated_tokens_are_persisted_to_disk() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({"data": {"accessToken": "a2", "refreshToken": "r2"}}),
        ))
        .expect(1)
        .mount(&server)
        .await;
    mount_protected(&server, "/api/user/user-details", "a1", "a2").await;

    let dir = tempfile::tempdir().unwrap();
    let token_file = dir.path().join("tokens.json");
    FileStore::open(&token_file)
        .unwrap()
        .store_credentials(&Credentials::new("a1", "r1"))
        .unwrap();

    let client = AuthClient::new(
        ClientConfig::new()
            .base_url(server.uri())
            .token_file(&token_file),
    )
    .unwrap();
    client.get("/api/user/user-details").await.unwrap();
    drop(client);

    let reopened = FileStore::open(&token_file).unwrap();
    assert_eq!(reopened.access_token().unwrap().as_deref(), Some("a2"));
    assert_eq!(reopened.refresh_token().unwrap().as_deref(), Some("r2"));
}
