//! Starting and ending a session.

use crate::client::AuthClient;
use crate::error::{RequestError, RequestResult};
use crate::request::ApiRequest;
use serde::Serialize;
use storefront_auth::Credentials;
use tracing::{debug, info, warn};

impl AuthClient {
    /// Sign in and persist the returned tokens.
    ///
    /// The sign-in call bypasses the refresh pipeline: a 401 here means bad
    /// credentials, not an expired session.
    pub async fn sign_in<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> RequestResult<Credentials> {
        let request = ApiRequest::post(path).json(body)?;
        let response = self.inner.transport.send(&request, None).await?;

        match response.status() {
            401 => {
                return Err(RequestError::Unauthorized {
                    body: response.text(),
                })
            }
            status if !response.is_success() => {
                return Err(RequestError::http(status, response.text()))
            }
            _ => {}
        }

        let credentials = Credentials::from_sign_in_body(response.body())?;
        self.inner.store.store_credentials(&credentials)?;
        info!(path, "Signed in");
        Ok(credentials)
    }

    /// Persist credentials obtained elsewhere, e.g. from a social login.
    pub fn store_credentials(&self, credentials: &Credentials) -> RequestResult<()> {
        self.inner.store.store_credentials(credentials)?;
        Ok(())
    }

    /// Whether an access token is stored.
    pub fn is_authenticated(&self) -> RequestResult<bool> {
        Ok(self.inner.store.access_token()?.is_some())
    }

    /// Tell the server the session ends, then clear the stored tokens.
    ///
    /// The local session ends even when the server call fails; that failure
    /// is still returned.
    pub async fn sign_out(&self, path: &str) -> RequestResult<()> {
        let result = self.get(path).await;
        if let Err(err) = &result {
            warn!(error = %err, "Sign-out request failed, clearing local session anyway");
        }
        self.inner.store.clear_credentials()?;
        debug!("Cleared stored credentials");
        result.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use crate::{AuthClient, ClientConfig, RequestError};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;
    use storefront_auth::{CredentialStore, Credentials, MemoryStore};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, store: Arc<MemoryStore>) -> AuthClient {
        AuthClient::builder()
            .config(ClientConfig::new().base_url(server.uri()))
            .store(store)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_sign_in_stores_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/user/login"))
            .and(body_json(json!({"email": "a@shop.test", "password": "pw"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": "Login successfully",
                "data": {"accesstoken": "a1", "refreshToken": "r1"}
            })))
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::new());
        let client = client_for(&server, store.clone());

        let creds = client
            .sign_in("/api/user/login", &json!({"email": "a@shop.test", "password": "pw"}))
            .await
            .unwrap();
        assert_eq!(creds, Credentials::new("a1", "r1"));
        assert_eq!(store.refresh_token().unwrap().as_deref(), Some("r1"));
        assert!(client.is_authenticated().unwrap());
    }

    #[tokio::test]
    async fn test_sign_in_bad_password_does_not_log_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/user/login"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"message": "Check your password"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/user/refresh-token"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server, Arc::new(MemoryStore::new()));
        let err = client
            .sign_in("/api/user/login", &json!({"email": "a@shop.test"}))
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::Unauthorized { .. }));
        assert_eq!(err.message(), "Check your password");
    }

    #[tokio::test]
    async fn test_sign_out_clears_even_on_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/user/logout"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::with_credentials(&Credentials::new("a1", "r1")));
        let client = client_for(&server, store.clone());

        let err = client.sign_out("/api/user/logout").await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert!(store.is_empty());
        assert!(!client.is_authenticated().unwrap());
    }

    #[tokio::test]
    async fn test_store_credentials() {
        let server = MockServer::start().await;
        let client = client_for(&server, Arc::new(MemoryStore::new()));
        client
            .store_credentials(&Credentials::new("google-a", "google-r"))
            .unwrap();
        assert_eq!(
            client.store().access_token().unwrap().as_deref(),
            Some("google-a")
        );
    }
}
