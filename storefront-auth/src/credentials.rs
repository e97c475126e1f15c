//! Credential pair and the token payloads the backend returns.

use crate::error::{AuthError, AuthResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage key holding the access token.
pub const ACCESS_TOKEN_KEY: &str = "accesstoken";

/// Storage key holding the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// An access/refresh token pair.
///
/// Both tokens are opaque bearer strings; they are never parsed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Short-lived token attached to every request.
    pub access_token: String,
    /// Long-lived token used only for the refresh exchange.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl Credentials {
    /// Create a full credential pair.
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: Some(refresh_token.into()),
        }
    }

    /// Create credentials without a refresh token.
    pub fn access_only(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
        }
    }

    /// Parse the sign-in response body: `{"data": {"accesstoken", "refreshToken"}}`.
    pub fn from_sign_in_body(body: &[u8]) -> AuthResult<Self> {
        let envelope: Envelope<SignInData> = serde_json::from_slice(body)
            .map_err(|e| AuthError::invalid_grant(format!("sign-in response: {e}")))?;
        let data = envelope.data;
        if data.access_token.is_empty() {
            return Err(AuthError::invalid_grant("sign-in response has an empty access token"));
        }
        Ok(Self {
            access_token: data.access_token,
            refresh_token: data.refresh_token.filter(|t| !t.is_empty()),
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Tokens returned by a successful refresh exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenGrant {
    /// The new access token.
    pub access_token: String,
    /// A rotated refresh token, when the server issues one.
    pub refresh_token: Option<String>,
}

impl TokenGrant {
    /// Create a grant carrying only a new access token.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
        }
    }

    /// Attach a rotated refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }

    /// Parse the refresh response body: `{"data": {"accessToken": ...}}`.
    ///
    /// Any other shape is a contract violation and fails the refresh.
    pub fn from_refresh_body(body: &[u8]) -> AuthResult<Self> {
        let envelope: Envelope<RefreshData> = serde_json::from_slice(body)
            .map_err(|e| AuthError::invalid_grant(format!("refresh response: {e}")))?;
        let data = envelope.data;
        if data.access_token.is_empty() {
            return Err(AuthError::invalid_grant("refresh response has an empty access token"));
        }
        Ok(Self {
            access_token: data.access_token,
            refresh_token: data.refresh_token.filter(|t| !t.is_empty()),
        })
    }
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"<redacted>")
            .field("rotated", &self.refresh_token.is_some())
            .finish()
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct SignInData {
    #[serde(rename = "accesstoken")]
    access_token: String,
    #[serde(rename = "refreshToken", default)]
    refresh_token: Option<String>,
}

#[derive(Deserialize)]
struct RefreshData {
    #[serde(rename = "accessToken")]
    access_token: String,
    #[serde(rename = "refreshToken", default)]
    refresh_token: Option<String>,
}
