//! Request and response model.

use crate::error::{RequestError, RequestResult};
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Body of an outgoing request. Owned, so a request can be replayed.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// JSON document.
    Json(serde_json::Value),
    /// Raw bytes with an explicit content type.
    Bytes {
        /// MIME type sent as `Content-Type`.
        content_type: String,
        /// Payload.
        data: Bytes,
    },
}

/// Description of an API call, relative to the configured base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Option<RequestBody>,
}

impl ApiRequest {
    /// Create a request.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// POST request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// PUT request.
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// PATCH request.
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    /// DELETE request.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Append a header. `Authorization` is always overwritten by the client.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attach a JSON body.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> RequestResult<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| RequestError::Other(anyhow::anyhow!("cannot serialize body: {e}")))?;
        self.body = Some(RequestBody::Json(value));
        Ok(self)
    }

    /// Attach a raw body.
    #[must_use]
    pub fn bytes(mut self, content_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        self.body = Some(RequestBody::Bytes {
            content_type: content_type.into(),
            data: data.into(),
        });
        self
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path as given, possibly with a query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path without query string or fragment, used for route matching.
    pub fn route(&self) -> &str {
        let path = self.path.split(['?', '#']).next().unwrap_or_default();
        let after_scheme = ["https://", "http://"]
            .into_iter()
            .find_map(|scheme| path.strip_prefix(scheme));
        match after_scheme {
            Some(rest) => rest.find('/').map(|i| &rest[i..]).unwrap_or("/"),
            None => path,
        }
    }

    /// Query parameters.
    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    /// Extra headers.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Body, if any.
    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }
}

/// A request together with how many times it has been sent.
///
/// Only the first attempt may trigger a refresh; a second 401 is final.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    request: ApiRequest,
    attempt: u8,
}

impl Attempt {
    /// Wrap a request that has not been sent yet.
    pub fn first(request: ApiRequest) -> Self {
        Self {
            request,
            attempt: 1,
        }
    }

    /// Attempt number, starting at 1.
    pub fn number(&self) -> u8 {
        self.attempt
    }

    /// Whether a 401 on this attempt may still be recovered by a refresh.
    pub fn can_retry_auth(&self) -> bool {
        self.attempt == 1
    }

    /// Mark the request as retried.
    #[must_use]
    pub fn retried(self) -> Self {
        Self {
            request: self.request,
            attempt: self.attempt.saturating_add(1),
        }
    }

    /// The wrapped request.
    pub fn request(&self) -> &ApiRequest {
        &self.request
    }

    /// Unwrap the request.
    pub fn into_request(self) -> ApiRequest {
        self.request
    }
}

/// A response that reached the caller.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: u16,
    headers: HeaderMap,
    body: Bytes,
}

impl ApiResponse {
    /// Create a response.
    pub fn new(status: u16, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// HTTP status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Raw body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body as UTF-8 text, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> RequestResult<T> {
        serde_json::from_slice(&self.body).map_err(|e| RequestError::Decode(e.to_string()))
    }
}
