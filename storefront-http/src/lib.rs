//! # storefront-http
//!
//! Authenticated HTTP client for the storefront backend.
//!
//! Every request carries the stored bearer token. When the server answers
//! 401, the client refreshes the access token once for the whole wave of
//! concurrent failures and replays each failed request exactly once. If the
//! session cannot be recovered, the credentials are cleared and a logout is
//! signalled.
//!
//! ## Core Concepts
//!
//! - **[`AuthClient`]**: The request pipeline
//! - **[`ClientConfig`]**: Base URL, timeout, refresh endpoint, public routes
//! - **[`ApiRequest`]** / **[`ApiResponse`]**: Replayable request and buffered response
//! - **[`Attempt`]**: A request plus its attempt number
//! - **[`Transport`]**: The seam to the network, backed by `reqwest`
//! - **[`RequestError`]**: What callers see when a request fails
//!
//! ## Example
//!
//! ```ignore
//! use storefront_http::{AuthClient, ClientConfig};
//!
//! let client = AuthClient::new(
//!     ClientConfig::from_env()?
//!         .public_route("/")
//!         .public_route("/product"),
//! )?;
//!
//! client.sign_in("/api/user/login", &credentials).await?;
//! let orders: serde_json::Value = client.get_json("/api/order/order-list").await?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod account;
pub mod builder;
pub mod client;
pub mod config;
pub mod error;
pub mod request;
pub mod transport;

// Re-exports
pub use builder::AuthClientBuilder;
pub use client::AuthClient;
pub use config::ClientConfig;
pub use error::{RequestError, RequestResult};
pub use request::{ApiRequest, ApiResponse, Attempt, RequestBody};
pub use transport::{ReqwestTransport, Transport};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        ApiRequest, ApiResponse, AuthClient, ClientConfig, RequestError, RequestResult,
    };
}
