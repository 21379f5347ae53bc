//! Public API client.

use http::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;

use crate::circuit_breaker::CircuitState;
use crate::clock::{Clock, SystemClock};
use crate::credentials::Token;
use crate::endpoints::{EndpointCatalog, Operation};
use crate::executor::Executor;
use crate::models::{LoginRequest, SignupRequest};
use crate::{ApiError, ClientConfig, Result};

/// NS Gifts API client.
///
/// Cheap to clone; clones share the token, the circuit breaker and the HTTP
/// session.
#[derive(Debug, Clone)]
pub struct NsGiftsClient {
    inner: Arc<Executor>,
}

impl NsGiftsClient {
    /// Create a client with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    /// Create a client configured from `NSGIFTS_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Create a client builder.
    pub fn builder() -> NsGiftsClientBuilder {
        NsGiftsClientBuilder::default()
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Open the HTTP session and return a guard that closes it when dropped.
    pub fn open(&self) -> Result<SessionGuard> {
        self.inner.sessions.ensure_session()?;
        Ok(SessionGuard {
            client: self.clone(),
        })
    }

    /// Close the HTTP session. The next request opens a new one.
    pub fn close(&self) {
        self.inner.sessions.close();
    }

    /// Run `f` with an open session, closing it afterwards on every path.
    pub async fn with_session<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(NsGiftsClient) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let guard = self.open()?;
        let result = f(guard.client.clone()).await;
        drop(guard);
        result
    }

    /// Log in and store the credentials for later token refreshes.
    pub async fn login(
        &self,
        identifier: impl Into<String>,
        secret: impl Into<String>,
    ) -> Result<Value> {
        let (identifier, secret) = (identifier.into(), secret.into());
        self.inner.store.set_credentials(&identifier, &secret);

        let body = serde_json::to_value(LoginRequest {
            email: &identifier,
            password: &secret,
        })?;
        self.inner
            .execute(Method::POST, Operation::Login, Some(&body), true)
            .await
    }

    /// Register a new account.
    ///
    /// The returned token is installed, but no password is known afterwards,
    /// so it cannot be refreshed once it expires.
    pub async fn signup(
        &self,
        identifier: impl Into<String>,
        role: impl Into<String>,
        bybit_deposit: impl Into<String>,
    ) -> Result<Value> {
        let (identifier, role, deposit) = (identifier.into(), role.into(), bybit_deposit.into());
        self.inner.store.set_credentials(&identifier, "");

        let body = serde_json::to_value(SignupRequest {
            email: &identifier,
            role: &role,
            bybit_deposit: &deposit,
        })?;
        self.inner
            .execute(Method::POST, Operation::Signup, Some(&body), true)
            .await
    }

    /// Call an authenticated operation that takes no body.
    pub async fn call(&self, operation: Operation) -> Result<Value> {
        self.inner.execute_authenticated(operation, None).await
    }

    /// Call an authenticated operation with a JSON body.
    pub async fn call_with<B: Serialize + ?Sized>(
        &self,
        operation: Operation,
        body: &B,
    ) -> Result<Value> {
        let body = serde_json::to_value(body)?;
        self.inner.execute_authenticated(operation, Some(&body)).await
    }

    /// Call an authenticated operation and decode the response into `T`.
    pub async fn call_as<T, B>(&self, operation: Operation, body: Option<&B>) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let value = match body {
            Some(body) => self.call_with(operation, body).await?,
            None => self.call(operation).await?,
        };
        serde_json::from_value(value).map_err(|e| ApiError::Decode {
            endpoint: self.inner.endpoints.path(operation).to_string(),
            message: e.to_string(),
        })
    }

    /// Snapshot of the current access token.
    pub fn token(&self) -> Option<Token> {
        self.inner.store.token()
    }

    /// Whether both identifier and secret are stored.
    pub fn has_credentials(&self) -> bool {
        self.inner.store.has_credentials()
    }

    /// Whether a server error was seen and its cooldown is still running.
    pub fn is_server_error_detected(&self) -> bool {
        self.inner.breaker.is_open()
    }

    /// Snapshot of the circuit breaker.
    pub fn circuit_state(&self) -> CircuitState {
        self.inner.breaker.state()
    }

    /// Clear the server-error state so requests go out again.
    pub fn reset_server_error_state(&self) {
        self.inner.breaker.reset();
    }

    /// Number of token refreshes performed so far.
    pub fn refresh_count(&self) -> u64 {
        self.inner.tokens.refresh_count()
    }

    /// Whether the HTTP session is currently open.
    pub fn is_session_open(&self) -> bool {
        self.inner.sessions.is_open()
    }

    /// Number of HTTP sessions created so far.
    pub fn session_generation(&self) -> u64 {
        self.inner.sessions.generation()
    }
}

/// Builder for [`NsGiftsClient`].
#[derive(Debug, Default)]
pub struct NsGiftsClientBuilder {
    config: ClientConfig,
    endpoints: EndpointCatalog,
    clock: Option<Arc<dyn Clock>>,
}

impl NsGiftsClientBuilder {
    /// Use this configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Use this endpoint catalog.
    pub fn endpoints(mut self, endpoints: EndpointCatalog) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Read time from `clock` instead of the system clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the client. No connection is made yet.
    pub fn build(self) -> Result<NsGiftsClient> {
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let executor = Executor::new(self.config, self.endpoints, clock)?;
        Ok(NsGiftsClient {
            inner: Arc::new(executor),
        })
    }
}

/// Open session; closes it when dropped.
#[derive(Debug)]
pub struct SessionGuard {
    client: NsGiftsClient,
}

impl Deref for SessionGuard {
    type Target = NsGiftsClient;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.client.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = NsGiftsClient::new(ClientConfig::default()).unwrap();
        assert_eq!(client.config().max_retries(), 3);
        assert!(client.token().is_none());
        assert!(!client.is_session_open());
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let config = ClientConfig::builder().base_url("not a url").build();
        assert!(matches!(
            NsGiftsClient::new(config),
            Err(ApiError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_guard_closes_session() {
        let client = NsGiftsClient::new(ClientConfig::default()).unwrap();
        {
            let guard = client.open().unwrap();
            assert!(guard.is_session_open());
        }
        assert!(!client.is_session_open());
        client.close();
        assert_eq!(client.session_generation(), 1);
    }

    #[tokio::test]
    async fn test_call_without_login_fails_fast() {
        let client = NsGiftsClient::new(ClientConfig::default()).unwrap();
        let err = client.call(Operation::CheckBalance).await.unwrap_err();
        assert!(err.is_authentication());
        assert!(!client.is_session_open());
    }
}
