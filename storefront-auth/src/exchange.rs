//! The refresh exchange itself.

use crate::credentials::TokenGrant;
use crate::error::{AuthError, AuthResult};
use crate::store::CredentialStore;
use async_trait::async_trait;
use reqwest::{Client, Method};
use tracing::{debug, info};

/// Trades a refresh token for a new access token.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RefreshExchange: Send + Sync {
    /// Perform the exchange. The caller persists the result.
    async fn refresh(&self, refresh_token: &str) -> AuthResult<TokenGrant>;
}

/// Refresh exchange over HTTP.
///
/// Sends the refresh token as a bearer credential and expects
/// `{"data": {"accessToken": "..."}}` back.
#[derive(Debug, Clone)]
pub struct HttpRefreshExchange {
    client: Client,
    method: Method,
    url: String,
}

impl HttpRefreshExchange {
    /// Create an exchange posting to `url`.
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            method: Method::POST,
            url: url.into(),
        }
    }

    /// Override the HTTP method.
    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// The refresh endpoint.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RefreshExchange for HttpRefreshExchange {
    async fn refresh(&self, refresh_token: &str) -> AuthResult<TokenGrant> {
        debug!(method = %self.method, url = %self.url, "Exchanging refresh token");

        let response = self
            .client
            .request(self.method.clone(), &self.url)
            .bearer_auth(refresh_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::rejected(status.as_u16(), body));
        }

        let body = response.bytes().await?;
        TokenGrant::from_refresh_body(&body)
    }
}

/// Read the refresh token, run the exchange and persist the new tokens.
///
/// Fails with [`AuthError::MissingRefreshToken`] without touching the
/// network when no refresh token is stored. Returns the new access token.
pub async fn refresh_stored_credentials(
    store: &dyn CredentialStore,
    exchange: &dyn RefreshExchange,
) -> AuthResult<String> {
    let refresh_token = store
        .refresh_token()?
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingRefreshToken)?;

    let grant = exchange.refresh(&refresh_token).await?;

    store.set(crate::ACCESS_TOKEN_KEY, &grant.access_token)?;
    if let Some(rotated) = &grant.refresh_token {
        store.set(crate::REFRESH_TOKEN_KEY, rotated)?;
    }
    info!(rotated = grant.refresh_token.is_some(), "Access token refreshed");

    Ok(grant.access_token)
}
