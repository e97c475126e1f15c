//! Two requests fail with an expired token; one refresh recovers both.
//!
//! Runs against an in-process backend, so no server is needed:
//!
//! ```sh
//! RUST_LOG=debug cargo run -p storefront --example refresh_demo
//! ```

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use storefront::prelude::*;
use storefront::{AuthError, RefreshExchange, TokenGrant, Transport};

/// Accepts only `current` as bearer token.
struct Backend {
    current: String,
}

#[async_trait]
impl Transport for Backend {
    async fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> RequestResult<ApiResponse> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let (status, body) = if bearer == Some(self.current.as_str()) {
            (200, format!(r#"{{"data":"{}"}}"#, request.path()))
        } else {
            (401, r#"{"message":"Unauthorized"}"#.to_string())
        };
        Ok(ApiResponse::new(status, Default::default(), body))
    }
}

struct Exchange {
    calls: AtomicU32,
}

#[async_trait]
impl RefreshExchange for Exchange {
    async fn refresh(&self, _refresh_token: &str) -> Result<TokenGrant, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(TokenGrant::new("fresh-token"))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    storefront::init_tracing();

    let exchange = Arc::new(Exchange {
        calls: AtomicU32::new(0),
    });
    let (logout, mut logouts) = ChannelLogoutHandler::new();
    let client = AuthClient::builder()
        .config(ClientConfig::new().public_route("/").public_route("/product"))
        .transport(Arc::new(Backend {
            current: "fresh-token".into(),
        }))
        .exchange(exchange.clone())
        .store(Arc::new(MemoryStore::with_credentials(&Credentials::new(
            "expired-token",
            "refresh-token",
        ))))
        .logout_handler(logout)
        .build()?;

    let (orders, cart) = tokio::join!(
        client.get_json::<serde_json::Value>("/api/order/order-list"),
        client.get_json::<serde_json::Value>("/api/cart/get"),
    );
    println!("orders: {}", orders?);
    println!("cart:   {}", cart?);
    println!("refresh exchanges: {}", exchange.calls.load(Ordering::SeqCst));

    // Without a refresh token the session ends.
    client.store_credentials(&Credentials::access_only("expired-token"))?;
    if let Err(err) = client.get("/api/address/get").await {
        println!("request failed: {}", err.message());
    }
    if let Ok(event) = logouts.try_recv() {
        println!("logout: {} (redirect to {:?})", event.reason, event.redirect);
    }

    Ok(())
}
