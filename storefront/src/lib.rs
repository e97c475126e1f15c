//! # Storefront - API client for the storefront backend
//!
//! Wraps every backend call in an authenticated pipeline: the stored access
//! token is attached to each request, an expired token is refreshed once no
//! matter how many requests fail with it, and the failed requests are
//! replayed with the new token. When the session cannot be recovered the
//! stored credentials are cleared and the UI layer is told to send the user
//! to the sign-in page.
//!
//! ## Quick Start
//!
//! ```ignore
//! use storefront::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     storefront::init_tracing();
//!
//!     let (logout, mut logouts) = ChannelLogoutHandler::new();
//!     let client = AuthClient::builder()
//!         .config(ClientConfig::from_env()?.public_route("/").public_route("/product"))
//!         .logout_handler(logout)
//!         .build()?;
//!
//!     client
//!         .sign_in("/api/user/login", &serde_json::json!({"email": "a@shop.test", "password": "pw"}))
//!         .await?;
//!     let cart: serde_json::Value = client.get_json("/api/cart/get").await?;
//!     println!("{cart}");
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`storefront_auth`] - Credentials, stores, refresh exchange, single-flight session
//! - [`storefront_http`] - Requests, transport, configuration and the client pipeline
//!
//! ## Feature Flags
//!
//! | Feature | Description | Default |
//! |---------|-------------|--------|
//! | `json-logs` | [`init_tracing`] emits JSON lines | ❌ |

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

use tracing::debug;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Crate Re-exports
// ============================================================================

/// Credentials, stores and the single-flight refresh session.
pub use storefront_auth as auth;

/// The authenticated HTTP client.
pub use storefront_http as http;

// ============================================================================
// Type Re-exports (Flat)
// ============================================================================

// Auth
pub use storefront_auth::{
    AuthError, AuthSession, ChannelLogoutHandler, CredentialStore, Credentials, FileStore,
    HttpRefreshExchange, LogoutEvent, LogoutHandler, LogoutReason, MemoryStore, PublicRoutes,
    RefreshExchange, StoreError, TokenGrant, TracingLogoutHandler,
};

// Client
pub use storefront_http::{
    ApiRequest, ApiResponse, Attempt, AuthClient, AuthClientBuilder, ClientConfig, RequestBody,
    RequestError, RequestResult, ReqwestTransport, Transport,
};

// ============================================================================
// Prelude Module
// ============================================================================

/// Convenient prelude for common imports.
///
/// ```ignore
/// use storefront::prelude::*;
/// ```
pub mod prelude {
    // Client
    pub use crate::http::{
        ApiRequest, ApiResponse, AuthClient, ClientConfig, RequestError, RequestResult,
    };

    // Auth
    pub use crate::auth::{
        ChannelLogoutHandler, CredentialStore, Credentials, FileStore, LogoutEvent,
        LogoutHandler, MemoryStore,
    };
}

// ============================================================================
// Tracing
// ============================================================================

/// Default filter when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Install a global `tracing` subscriber filtered by `RUST_LOG`.
///
/// Returns `false` when a subscriber was already installed, which leaves the
/// existing one in place.
pub fn init_tracing() -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let directives = filter.to_string();

    #[cfg(feature = "json-logs")]
    let result = tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();

    #[cfg(not(feature = "json-logs"))]
    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();

    match result {
        Ok(()) => {
            debug!(filter = %directives, "Tracing initialized");
            true
        }
        Err(_) => false,
    }
}

// ============================================================================
// Version Information
// ============================================================================

/// Returns the current version of storefront.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
