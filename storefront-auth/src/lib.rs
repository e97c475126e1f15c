//! # storefront-auth
//!
//! Session plumbing for the storefront client: credential storage, the
//! single-flight token refresh and logout signalling.
//!
//! ## Core Concepts
//!
//! - **[`Credentials`]**: The access/refresh token pair
//! - **[`CredentialStore`]**: Durable key/value storage for the pair
//! - **[`AuthSession`]**: Guarantees at most one refresh in flight
//! - **[`RefreshExchange`]**: Trades a refresh token for a new access token
//! - **[`PublicRoutes`]**: Paths where a 401 does not force a sign-in redirect
//! - **[`LogoutHandler`]**: Notified when the session cannot be recovered
//!
//! ## Example
//!
//! ```ignore
//! use storefront_auth::{AuthSession, RefreshSlot};
//!
//! let session = AuthSession::new();
//! match session.acquire_refresh() {
//!     RefreshSlot::Owner(ticket) => {
//!         let token = refresh_stored_credentials(&store, &exchange).await?;
//!         ticket.resolve(token);
//!     }
//!     RefreshSlot::Waiter(waiter) => {
//!         let token = waiter.wait().await?;
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod credentials;
pub mod error;
pub mod exchange;
pub mod logout;
pub mod routes;
pub mod session;
pub mod store;

// Re-exports
pub use credentials::{Credentials, TokenGrant, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
pub use error::{AuthError, AuthResult, StoreError};
pub use exchange::{refresh_stored_credentials, HttpRefreshExchange, RefreshExchange};
pub use logout::{
    ChannelLogoutHandler, LogoutEvent, LogoutHandler, LogoutReason, TracingLogoutHandler,
};
pub use routes::PublicRoutes;
pub use session::{AuthSession, RefreshSlot, RefreshTicket, RefreshWaiter};
pub use store::{CredentialStore, FileStore, MemoryStore};
