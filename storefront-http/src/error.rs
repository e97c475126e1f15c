//! Request error types.

use storefront_auth::AuthError;
use thiserror::Error;

/// Errors surfaced by the authenticated client.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Non-success HTTP status other than a recoverable 401.
    #[error("HTTP error {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// 401 on a request that already used its refresh retry.
    #[error("Unauthorized: {body}")]
    Unauthorized {
        /// Response body.
        body: String,
    },

    /// The session could not be recovered.
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// Timeout.
    #[error("Timeout")]
    Timeout,

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Response body did not match the expected type.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Other error.
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl RequestError {
    /// Create an HTTP error.
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            status,
            body: body.into(),
        }
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Get the HTTP status if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Unauthorized { .. } => Some(401),
            Self::Auth(AuthError::RefreshRejected { status, .. }) => Some(*status),
            _ => None,
        }
    }

    /// Whether the user has to sign in again.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Unauthorized { .. } | Self::Auth(_))
    }

    /// Message fit for showing to the user.
    ///
    /// Prefers the `message` field of a JSON error body, which is how the
    /// backend phrases its errors.
    pub fn message(&self) -> String {
        let body = match self {
            Self::Http { body, .. } | Self::Unauthorized { body } => body.as_str(),
            Self::Auth(AuthError::RefreshRejected { body, .. }) => body.as_str(),
            _ => return self.to_string(),
        };
        serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("message")?.as_str().map(str::to_string))
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| self.to_string())
    }
}

impl From<reqwest::Error> for RequestError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RequestError::Timeout
        } else if err.is_connect() {
            RequestError::Connection(err.to_string())
        } else if err.is_decode() {
            RequestError::Decode(err.to_string())
        } else {
            RequestError::Other(err.into())
        }
    }
}

impl From<storefront_auth::StoreError> for RequestError {
    fn from(err: storefront_auth::StoreError) -> Self {
        RequestError::Auth(err.into())
    }
}

/// Result type for client operations.
pub type RequestResult<T> = Result<T, RequestError>;
