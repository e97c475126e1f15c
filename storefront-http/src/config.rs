//! Client configuration.

use crate::error::{RequestError, RequestResult};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use storefront_auth::PublicRoutes;
use url::Url;

/// Default API origin when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Default refresh endpoint.
pub const DEFAULT_REFRESH_PATH: &str = "/api/user/refresh-token";

/// Default sign-in page.
pub const DEFAULT_SIGN_IN_PATH: &str = "/login";

/// Configuration for [`AuthClient`](crate::AuthClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Origin (and optional path prefix) every request path is joined onto.
    pub base_url: String,
    /// Per-request timeout, also applied to the refresh exchange.
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    /// Path of the refresh endpoint.
    pub refresh_path: String,
    /// HTTP method of the refresh endpoint.
    pub refresh_method: String,
    /// Page the user is sent to after a forced logout.
    pub sign_in_path: String,
    /// Paths where a 401 does not force a redirect.
    pub public_routes: PublicRoutes,
    /// Where to persist tokens. `None` keeps them in memory.
    pub token_file: Option<PathBuf>,
    /// Keep a cookie store, so cookie-based sessions ride along.
    pub with_credentials: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            refresh_method: "POST".to_string(),
            sign_in_path: DEFAULT_SIGN_IN_PATH.to_string(),
            public_routes: PublicRoutes::new(),
            token_file: None,
            with_credentials: true,
        }
    }
}

impl ClientConfig {
    /// Create a new default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the API base URL.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the refresh endpoint.
    #[must_use]
    pub fn refresh_endpoint(mut self, method: Method, path: impl Into<String>) -> Self {
        self.refresh_method = method.to_string();
        self.refresh_path = path.into();
        self
    }

    /// Set the sign-in page.
    #[must_use]
    pub fn sign_in_path(mut self, path: impl Into<String>) -> Self {
        self.sign_in_path = path.into();
        self
    }

    /// Add a public route prefix.
    #[must_use]
    pub fn public_route(mut self, prefix: impl Into<String>) -> Self {
        self.public_routes.push(prefix);
        self
    }

    /// Replace the public route allow-list.
    #[must_use]
    pub fn public_routes(mut self, routes: PublicRoutes) -> Self {
        self.public_routes = routes;
        self
    }

    /// Persist tokens in a file.
    #[must_use]
    pub fn token_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_file = Some(path.into());
        self
    }

    /// Enable or disable the cookie store.
    #[must_use]
    pub fn with_credentials(mut self, enabled: bool) -> Self {
        self.with_credentials = enabled;
        self
    }

    /// Load from environment variables.
    ///
    /// Looks for:
    /// - `STOREFRONT_API_URL`
    /// - `STOREFRONT_TIMEOUT_SECS`
    /// - `STOREFRONT_REFRESH_PATH`
    /// - `STOREFRONT_SIGN_IN_PATH`
    /// - `STOREFRONT_PUBLIC_ROUTES` (comma separated)
    /// - `STOREFRONT_TOKEN_FILE`
    pub fn from_env() -> RequestResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup, using the same keys as [`Self::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> RequestResult<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = get("STOREFRONT_API_URL") {
            config.base_url = url;
        }
        if let Some(secs) = get("STOREFRONT_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                RequestError::Configuration(format!("STOREFRONT_TIMEOUT_SECS is not a number: {secs}"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(path) = get("STOREFRONT_REFRESH_PATH") {
            config.refresh_path = path;
        }
        if let Some(path) = get("STOREFRONT_SIGN_IN_PATH") {
            config.sign_in_path = path;
        }
        if let Some(list) = get("STOREFRONT_PUBLIC_ROUTES") {
            config.public_routes = PublicRoutes::parse_list(&list);
        }
        if let Some(path) = get("STOREFRONT_TOKEN_FILE") {
            config.token_file = Some(PathBuf::from(path));
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values that can never work.
    pub fn validate(&self) -> RequestResult<()> {
        let base = Url::parse(&self.base_url).map_err(|e| {
            RequestError::Configuration(format!("invalid base URL {:?}: {e}", self.base_url))
        })?;
        if base.cannot_be_a_base() {
            return Err(RequestError::Configuration(format!(
                "base URL {:?} cannot carry paths",
                self.base_url
            )));
        }
        if self.timeout.is_zero() {
            return Err(RequestError::Configuration("timeout must be positive".into()));
        }
        self.refresh_http_method()?;
        Ok(())
    }

    /// Resolve a request path against the base URL.
    ///
    /// Absolute URLs are used unchanged.
    pub fn url_for(&self, path: &str) -> RequestResult<Url> {
        if let Ok(url) = Url::parse(path) {
            return Ok(url);
        }
        let joined = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined)
            .map_err(|e| RequestError::Configuration(format!("invalid request URL {joined:?}: {e}")))
    }

    /// Full URL of the refresh endpoint.
    pub fn refresh_url(&self) -> RequestResult<Url> {
        self.url_for(&self.refresh_path)
    }

    /// Parsed refresh method.
    pub fn refresh_http_method(&self) -> RequestResult<Method> {
        Method::from_bytes(self.refresh_method.to_ascii_uppercase().as_bytes()).map_err(|_| {
            RequestError::Configuration(format!("invalid refresh method {:?}", self.refresh_method))
        })
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}
