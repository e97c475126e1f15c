//! Authentication error types.

use thiserror::Error;

/// Errors raised by a credential store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("Credential store I/O error: {0}")]
    Io(String),

    /// The backing file exists but is not a JSON object of strings.
    #[error("Malformed credential store: {0}")]
    Malformed(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

/// Errors from the refresh lifecycle.
///
/// `Clone` so a single refresh outcome can be delivered to every waiter
/// blocked behind it.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// No refresh token is stored; the session cannot be recovered.
    #[error("No refresh token available, sign in again")]
    MissingRefreshToken,

    /// The refresh endpoint answered with a non-success status.
    #[error("Token refresh rejected with HTTP {status}: {body}")]
    RefreshRejected {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The refresh call never produced a response.
    #[error("Token refresh transport error: {0}")]
    RefreshTransport(String),

    /// The refresh or sign-in response did not carry the expected tokens.
    #[error("Invalid token grant: {0}")]
    InvalidGrant(String),

    /// The task owning the refresh went away before settling it.
    #[error("Token refresh was abandoned before completing")]
    RefreshAbandoned,

    /// The credential store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AuthError {
    /// Create a rejected-refresh error.
    pub fn rejected(status: u16, body: impl Into<String>) -> Self {
        Self::RefreshRejected {
            status,
            body: body.into(),
        }
    }

    /// Create an invalid-grant error.
    pub fn invalid_grant(msg: impl Into<String>) -> Self {
        Self::InvalidGrant(msg.into())
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AuthError::InvalidGrant(err.to_string())
        } else {
            AuthError::RefreshTransport(err.to_string())
        }
    }
}

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;
