//! The authenticated request pipeline.

use crate::builder::AuthClientBuilder;
use crate::config::ClientConfig;
use crate::error::{RequestError, RequestResult};
use crate::request::{ApiRequest, ApiResponse, Attempt};
use crate::transport::Transport;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use storefront_auth::{
    refresh_stored_credentials, AuthError, AuthSession, CredentialStore, LogoutEvent,
    LogoutHandler, LogoutReason, RefreshExchange, RefreshSlot,
};
use tracing::{debug, debug_span, warn, Instrument};
use uuid::Uuid;

pub(crate) struct ClientInner {
    pub(crate) config: ClientConfig,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) store: Arc<dyn CredentialStore>,
    pub(crate) exchange: Arc<dyn RefreshExchange>,
    pub(crate) logout: Arc<dyn LogoutHandler>,
    pub(crate) session: AuthSession,
}

/// HTTP client that keeps the session alive.
///
/// Every request carries the stored access token. A 401 triggers at most one
/// refresh exchange per wave of concurrent failures; the failed requests are
/// then replayed once with the new token. When the session cannot be
/// recovered the credentials are cleared and the [`LogoutHandler`] is told.
///
/// Cloning is cheap and clones share the session.
#[derive(Clone)]
pub struct AuthClient {
    pub(crate) inner: Arc<ClientInner>,
}

impl std::fmt::Debug for AuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthClient")
            .field("base_url", &self.inner.config.base_url)
            .field("refreshing", &self.inner.session.is_refreshing())
            .finish()
    }
}

impl AuthClient {
    /// Start building a client.
    pub fn builder() -> AuthClientBuilder {
        AuthClientBuilder::new()
    }

    /// Create a client from configuration, with default collaborators.
    pub fn new(config: ClientConfig) -> RequestResult<Self> {
        AuthClientBuilder::new().config(config).build()
    }

    /// Create a client configured from the environment.
    pub fn from_env() -> RequestResult<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// The credential store.
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.inner.store
    }

    /// The refresh state shared by all clones.
    pub fn session(&self) -> &AuthSession {
        &self.inner.session
    }

    /// Execute a GET request.
    pub async fn get(&self, path: &str) -> RequestResult<ApiResponse> {
        self.send(ApiRequest::get(path)).await
    }

    /// Execute a GET request and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> RequestResult<T> {
        self.get(path).await?.json()
    }

    /// Execute a POST request with a JSON body.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> RequestResult<ApiResponse> {
        self.send(ApiRequest::post(path).json(body)?).await
    }

    /// Execute a PUT request with a JSON body.
    pub async fn put_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> RequestResult<ApiResponse> {
        self.send(ApiRequest::put(path).json(body)?).await
    }

    /// Execute a PATCH request with a JSON body.
    pub async fn patch_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> RequestResult<ApiResponse> {
        self.send(ApiRequest::patch(path).json(body)?).await
    }

    /// Execute a DELETE request.
    pub async fn delete(&self, path: &str) -> RequestResult<ApiResponse> {
        self.send(ApiRequest::delete(path)).await
    }

    /// Send a request through the pipeline.
    ///
    /// Returns the response for 2xx statuses. Any other status, and every
    /// transport error, is returned as an error without retrying; only a
    /// first 401 is recovered.
    pub async fn send(&self, request: ApiRequest) -> RequestResult<ApiResponse> {
        let span = debug_span!(
            "api_request",
            request_id = %Uuid::new_v4(),
            method = %request.method(),
            path = %request.route(),
        );
        self.execute(Attempt::first(request)).instrument(span).await
    }

    async fn execute(&self, attempt: Attempt) -> RequestResult<ApiResponse> {
        let token = self.inner.store.access_token()?;
        let response = self
            .inner
            .transport
            .send(attempt.request(), token.as_deref())
            .await?;

        if response.status() != 401 {
            return check_response(response);
        }
        if !attempt.can_retry_auth() {
            return Err(unauthorized(response));
        }

        let attempt = attempt.retried();
        let fresh = self.recover(attempt.request().route(), token.as_deref()).await?;
        self.replay(attempt, &fresh).await
    }

    /// Obtain a usable access token after `stale` was rejected.
    async fn recover(&self, route: &str, stale: Option<&str>) -> RequestResult<String> {
        // A wave that already finished rotated the token; no new refresh.
        if let Some(current) = self.inner.store.access_token()? {
            if stale != Some(current.as_str()) {
                debug!("Access token already rotated, replaying");
                return Ok(current);
            }
        }

        let ticket = match self.inner.session.acquire_refresh() {
            RefreshSlot::Waiter(waiter) => {
                debug!("Waiting for in-flight token refresh");
                return Ok(waiter.wait().await?);
            }
            RefreshSlot::Owner(ticket) => ticket,
        };

        match refresh_stored_credentials(self.inner.store.as_ref(), self.inner.exchange.as_ref())
            .await
        {
            Ok(token) => {
                ticket.resolve(token.clone());
                Ok(token)
            }
            Err(err) => {
                ticket.reject(err.clone());
                let reason = match err {
                    AuthError::MissingRefreshToken => LogoutReason::MissingRefreshToken,
                    _ => LogoutReason::RefreshFailed,
                };
                warn!(error = %err, "Token refresh failed");
                self.end_session(reason, route);
                Err(err.into())
            }
        }
    }

    async fn replay(&self, attempt: Attempt, token: &str) -> RequestResult<ApiResponse> {
        debug!(attempt = attempt.number(), "Replaying request with refreshed token");
        let response = self
            .inner
            .transport
            .send(attempt.request(), Some(token))
            .await?;
        if response.status() == 401 {
            return Err(unauthorized(response));
        }
        check_response(response)
    }

    /// Clear the credentials and signal the logout.
    fn end_session(&self, reason: LogoutReason, route: &str) {
        if let Err(err) = self.inner.store.clear_credentials() {
            warn!(error = %err, "Failed to clear credentials");
        }
        let config = &self.inner.config;
        let redirect = if config.public_routes.matches(route) {
            debug!(route, "Public route, credentials cleared without redirect");
            None
        } else {
            Some(config.sign_in_path.clone())
        };
        self.inner.logout.on_logout(&LogoutEvent {
            reason,
            request_path: route.to_string(),
            redirect,
        });
    }
}

/// Convert a non-2xx response into an error.
fn check_response(response: ApiResponse) -> RequestResult<ApiResponse> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(RequestError::http(response.status(), response.text()))
    }
}

fn unauthorized(response: ApiResponse) -> RequestError {
    debug!("Unauthorized after refresh, giving up");
    RequestError::Unauthorized {
        body: response.text(),
    }
}
