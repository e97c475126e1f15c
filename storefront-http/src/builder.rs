//! Builder for [`AuthClient`].

use crate::client::{AuthClient, ClientInner};
use crate::config::ClientConfig;
use crate::error::RequestResult;
use crate::transport::{build_client, ReqwestTransport, Transport};
use std::sync::Arc;
use storefront_auth::{
    AuthSession, CredentialStore, FileStore, HttpRefreshExchange, LogoutHandler, MemoryStore,
    RefreshExchange, TracingLogoutHandler,
};
use tracing::debug;

/// Builder for creating an authenticated client.
///
/// Anything not set explicitly is derived from the [`ClientConfig`]: a
/// `reqwest` transport, an HTTP refresh exchange against
/// `refresh_path`, a [`FileStore`] when `token_file` is set (otherwise a
/// [`MemoryStore`]) and a logging-only logout handler.
#[derive(Default)]
pub struct AuthClientBuilder {
    config: Option<ClientConfig>,
    transport: Option<Arc<dyn Transport>>,
    store: Option<Arc<dyn CredentialStore>>,
    exchange: Option<Arc<dyn RefreshExchange>>,
    logout: Option<Arc<dyn LogoutHandler>>,
}

impl AuthClientBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the transport.
    pub fn transport<T: Transport + 'static>(mut self, transport: Arc<T>) -> Self {
        let transport: Arc<dyn Transport> = transport;
        self.transport = Some(transport);
        self
    }

    /// Set the credential store.
    pub fn store<S: CredentialStore + 'static>(mut self, store: Arc<S>) -> Self {
        let store: Arc<dyn CredentialStore> = store;
        self.store = Some(store);
        self
    }

    /// Set the refresh exchange.
    pub fn exchange<E: RefreshExchange + 'static>(mut self, exchange: Arc<E>) -> Self {
        let exchange: Arc<dyn RefreshExchange> = exchange;
        self.exchange = Some(exchange);
        self
    }

    /// Set the logout handler.
    pub fn logout_handler(mut self, handler: impl LogoutHandler + 'static) -> Self {
        self.logout = Some(Arc::new(handler));
        self
    }

    /// Build the client.
    pub fn build(self) -> RequestResult<AuthClient> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let http = build_client(&config)?;
        let transport: Arc<dyn Transport> = self.transport.unwrap_or_else(|| {
            Arc::new(ReqwestTransport::with_client(http.clone(), config.clone()))
        });
        let exchange: Arc<dyn RefreshExchange> = match self.exchange {
            Some(exchange) => exchange,
            None => Arc::new(
                HttpRefreshExchange::new(http, config.refresh_url()?)
                    .with_method(config.refresh_http_method()?),
            ),
        };

        let store: Arc<dyn CredentialStore> = match (self.store, &config.token_file) {
            (Some(store), _) => store,
            (None, Some(path)) => Arc::new(FileStore::open(path)?),
            (None, None) => Arc::new(MemoryStore::new()),
        };

        let logout: Arc<dyn LogoutHandler> = self
            .logout
            .unwrap_or_else(|| Arc::new(TracingLogoutHandler));

        debug!(base_url = %config.base_url, "Built authenticated client");

        Ok(AuthClient {
            inner: Arc::new(ClientInner {
                config,
                transport,
                store,
                exchange,
                logout,
                session: AuthSession::new(),
            }),
        })
    }
}
