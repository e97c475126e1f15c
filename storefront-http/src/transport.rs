//! HTTP transport.

use crate::config::ClientConfig;
use crate::error::{RequestError, RequestResult};
use crate::request::{ApiRequest, ApiResponse, RequestBody};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use tracing::debug;

/// Sends one request and returns whatever the server answered.
///
/// Implementations do not interpret status codes; a 401 or 500 is an
/// `Ok(ApiResponse)`. Errors are reserved for requests that never got a
/// response.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Dispatch `request`, authenticated with `bearer` when given.
    async fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> RequestResult<ApiResponse>;
}

/// Transport backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    config: ClientConfig,
}

impl ReqwestTransport {
    /// Create a transport with a client built from `config`.
    pub fn new(config: ClientConfig) -> RequestResult<Self> {
        let client = build_client(&config)?;
        Ok(Self { client, config })
    }

    /// Create with a custom reqwest client.
    pub fn with_client(client: Client, config: ClientConfig) -> Self {
        Self { client, config }
    }

    /// Get a reference to the underlying client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest, bearer: Option<&str>) -> RequestResult<ApiResponse> {
        let url = self.config.url_for(request.path())?;
        debug!(method = %request.method(), url = %url, authenticated = bearer.is_some(), "Making HTTP request");

        let mut builder = self.client.request(request.method().clone(), url);
        if !request.query_pairs().is_empty() {
            builder = builder.query(request.query_pairs());
        }
        for (name, value) in request.headers() {
            if name.eq_ignore_ascii_case(AUTHORIZATION.as_str()) {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        builder = match request.body() {
            Some(RequestBody::Json(value)) => builder.json(value),
            Some(RequestBody::Bytes { content_type, data }) => builder
                .header(CONTENT_TYPE, content_type.as_str())
                .body(data.clone()),
            None => builder,
        };

        let response = builder.send().await.map_err(RequestError::from)?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(RequestError::from)?;

        Ok(ApiResponse::new(status, headers, body))
    }
}

/// Build the shared reqwest client for a configuration.
pub fn build_client(config: &ClientConfig) -> RequestResult<Client> {
    Client::builder()
        .timeout(config.timeout)
        .cookie_store(config.with_credentials)
        .build()
        .map_err(|e| RequestError::Configuration(format!("cannot build HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_send_attaches_bearer_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/cart/create"))
            .and(query_param("source", "pdp"))
            .and(header("authorization", "Bearer a1"))
            .and(body_json(json!({"productId": "p1"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new(ClientConfig::new().base_url(server.uri())).unwrap();
        let request = ApiRequest::post("/api/cart/create")
            .query("source", "pdp")
            .header("Authorization", "Bearer spoofed")
            .json(&json!({"productId": "p1"}))
            .unwrap();

        let response = transport.send(&request, Some("a1")).await.unwrap();
        assert_eq!(response.status(), 201);
    }

    #[tokio::test]
    async fn test_send_without_token_and_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/order/list"))
            .respond_with(ResponseTemplate::new(401).set_body_string("no token"))
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new(ClientConfig::new().base_url(server.uri())).unwrap();
        let response = transport
            .send(&ApiRequest::get("/api/order/list"), None)
            .await
            .unwrap();

        assert_eq!(response.status(), 401);
        assert_eq!(response.text(), "no token");
        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let transport =
            ReqwestTransport::new(ClientConfig::new().base_url(format!("http://127.0.0.1:{port}")))
                .unwrap();
        let err = transport
            .send(&ApiRequest::get("/"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RequestError::Connection(_)));
    }
}
