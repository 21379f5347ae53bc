//! Retrying request executor.
//!
//! One call to [`Executor::execute`] is one logical request. Each network
//! attempt is reduced to an [`Outcome`] and the retry loop decides what to do
//! next from that value alone:
//!
//! | outcome          | action                                              |
//! |------------------|-----------------------------------------------------|
//! | `Success`        | return the body (installing a token for login/signup) |
//! | `BreakerOpen`    | fail with `ServerBusy`, nothing was sent            |
//! | `AuthExpired`    | one forced token refresh, then re-send immediately  |
//! | `ClientFault`    | fail with `Client`                                  |
//! | `ServerFault`    | trip the breaker, fail with `Server`                |
//! | `TransientFault` | back off and retry while attempts remain            |

use async_trait::async_trait;
use http::Method;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::circuit_breaker::CircuitBreaker;
use crate::clock::Clock;
use crate::credentials::{CredentialStore, Credentials, Token};
use crate::endpoints::{EndpointCatalog, Operation};
use crate::models::{LoginRequest, TokenGrant};
use crate::response::Response;
use crate::session::SessionManager;
use crate::token::{TokenManager, TokenRefresher};
use crate::{ApiError, ClientConfig, Result};

/// Transport failure worth retrying.
#[derive(Debug)]
pub(crate) enum TransientFault {
    Connection(reqwest::Error),
    Timeout(reqwest::Error),
}

impl TransientFault {
    fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error)
        } else {
            Self::Connection(error)
        }
    }

    fn into_error(self, attempts: u32, timeout: Duration) -> ApiError {
        match self {
            Self::Connection(source) => ApiError::Connection { attempts, source },
            Self::Timeout(source) => ApiError::Timeout {
                attempts,
                timeout,
                source,
            },
        }
    }
}

/// Result of a single network attempt.
#[derive(Debug)]
pub(crate) enum Outcome {
    Success(Value),
    TransientFault(TransientFault),
    AuthExpired,
    ClientFault { status: u16, message: String },
    ServerFault { status: u16, message: String },
    BreakerOpen { remaining_secs: u64 },
}

/// Map a fully read response to an outcome.
pub(crate) fn classify(
    response: &Response,
    is_auth_request: bool,
    endpoint: &str,
) -> Result<Outcome> {
    let status = response.status();

    if status.is_success() {
        return response
            .json()
            .map(Outcome::Success)
            .map_err(|e| ApiError::Decode {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            });
    }

    if status == http::StatusCode::UNAUTHORIZED && !is_auth_request {
        return Ok(Outcome::AuthExpired);
    }

    if status.is_server_error() {
        return Ok(Outcome::ServerFault {
            status: status.as_u16(),
            message: response.message(),
        });
    }

    // 4xx, plus anything reqwest did not follow or resolve.
    Ok(Outcome::ClientFault {
        status: status.as_u16(),
        message: response.message(),
    })
}

/// Shared request-execution state of a client.
#[derive(Debug)]
pub(crate) struct Executor {
    pub(crate) config: ClientConfig,
    pub(crate) endpoints: EndpointCatalog,
    pub(crate) store: CredentialStore,
    pub(crate) tokens: TokenManager,
    pub(crate) breaker: CircuitBreaker,
    pub(crate) sessions: SessionManager,
    base_url: Url,
    clock: Arc<dyn Clock>,
}

impl Executor {
    pub(crate) fn new(
        config: ClientConfig,
        endpoints: EndpointCatalog,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)?;
        Ok(Self {
            store: CredentialStore::new(),
            tokens: TokenManager::new(config.token_refresh_buffer, clock.clone()),
            breaker: CircuitBreaker::new(config.server_error_cooldown, clock.clone()),
            sessions: SessionManager::new(&config),
            endpoints,
            base_url,
            clock,
            config,
        })
    }

    fn url_for(&self, path: &str) -> Result<Url> {
        // Paths are appended to the base, keeping any prefix the base carries.
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{}/{}", base, path))?)
    }

    /// Run an authenticated request, making sure a usable token exists first.
    pub(crate) async fn execute_authenticated(
        &self,
        operation: Operation,
        body: Option<&Value>,
    ) -> Result<Value> {
        self.tokens.ensure_valid(&self.store, self).await?;
        self.execute(Method::POST, operation, body, false).await
    }

    /// Execute one logical request with retry, refresh and breaker handling.
    pub(crate) async fn execute(
        &self,
        method: Method,
        operation: Operation,
        body: Option<&Value>,
        is_auth_request: bool,
    ) -> Result<Value> {
        let session = self.sessions.ensure_session()?;
        let endpoint = self.endpoints.path(operation);
        let url = self.url_for(endpoint)?;
        let retry = &self.config.retry;

        let mut attempt = 0;
        let mut refreshed = false;
        let mut last_error: Option<ApiError> = None;

        while attempt < retry.max_attempts {
            let bearer = self.store.bearer();
            let outcome = self
                .attempt(
                    &session,
                    &method,
                    &url,
                    body,
                    bearer.as_deref(),
                    is_auth_request,
                    endpoint,
                )
                .await?;

            match outcome {
                Outcome::Success(value) => {
                    if operation.issues_token() {
                        self.install_token(endpoint, &value)?;
                    }
                    return Ok(value);
                }
                Outcome::BreakerOpen { remaining_secs } => {
                    return Err(ApiError::ServerBusy { remaining_secs });
                }
                Outcome::AuthExpired => {
                    if refreshed {
                        return Err(ApiError::authentication(format!(
                            "Authentication failed after token refresh at {}",
                            endpoint
                        )));
                    }
                    warn!(endpoint, "Received 401 Unauthorized. Attempting token refresh");
                    self.tokens
                        .force_refresh(bearer.as_deref(), &self.store, self)
                        .await?;
                    refreshed = true;
                }
                Outcome::ClientFault { status, message } => {
                    return Err(ApiError::Client {
                        endpoint: endpoint.to_string(),
                        status,
                        message,
                    });
                }
                Outcome::ServerFault { status, message } => {
                    self.breaker.record_failure();
                    return Err(ApiError::Server {
                        endpoint: endpoint.to_string(),
                        status,
                        message,
                    });
                }
                Outcome::TransientFault(fault) => {
                    let attempts = attempt + 1;
                    warn!(
                        endpoint,
                        attempt = attempts,
                        max_attempts = retry.max_attempts,
                        error = ?fault,
                        "Transient failure"
                    );
                    let error = fault.into_error(attempts, self.config.request_timeout);
                    if !retry.has_attempts_after(attempt) {
                        return Err(error);
                    }

                    let delay = retry.delay_for_attempt(attempt);
                    debug!(
                        endpoint,
                        delay_ms = delay.as_millis() as u64,
                        "Backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(error);
                    attempt += 1;
                }
            }
        }

        Err(ApiError::RequestFailed {
            attempts: attempt,
            source: last_error.map(Box::new),
        })
    }

    /// Send the request once and classify what came back.
    #[allow(clippy::too_many_arguments)]
    async fn attempt(
        &self,
        session: &reqwest::Client,
        method: &Method,
        url: &Url,
        body: Option<&Value>,
        bearer: Option<&str>,
        is_auth_request: bool,
        endpoint: &str,
    ) -> Result<Outcome> {
        if !is_auth_request && self.breaker.is_open() {
            return Ok(Outcome::BreakerOpen {
                remaining_secs: self.breaker.remaining_cooldown(),
            });
        }

        let mut request = session
            .request(method.clone(), url.clone())
            .header(http::header::CONTENT_TYPE, "application/json")
            .timeout(self.config.request_timeout);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_builder() => return Err(ApiError::RequestBuild(e.to_string())),
            Err(e) => return Ok(Outcome::TransientFault(TransientFault::from_reqwest(e))),
        };

        let status = response.status();
        match Response::from_reqwest(response).await {
            Ok(response) => {
                debug!(endpoint, %status, "Received response");
                classify(&response, is_auth_request, endpoint)
            }
            // The status line already arrived, so only a 2xx is worth re-sending.
            Err(e) if !status.is_success() => {
                warn!(endpoint, %status, error = %e, "Failed to read error response body");
                classify(&Response::new(status, Vec::new()), is_auth_request, endpoint)
            }
            Err(e) => Ok(Outcome::TransientFault(TransientFault::from_reqwest(e))),
        }
    }

    /// Store the token carried by a login or signup response.
    fn install_token(&self, endpoint: &str, body: &Value) -> Result<()> {
        let grant: TokenGrant =
            serde_json::from_value(body.clone()).map_err(|e| ApiError::Decode {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            })?;
        let expires_at = grant.valid_thru.unwrap_or_else(|| {
            let lifetime = i64::try_from(self.config.default_token_lifetime.as_secs())
                .unwrap_or(i64::MAX);
            self.clock.now().saturating_add(lifetime)
        });

        self.store
            .install_token(Token::new(grant.access_token, expires_at));
        debug!(endpoint, expires_at, "Installed access token");
        Ok(())
    }
}

#[async_trait]
impl TokenRefresher for Executor {
    async fn refresh(&self, credentials: &Credentials) -> Result<()> {
        let body = serde_json::to_value(LoginRequest {
            email: &credentials.identifier,
            password: &credentials.secret,
        })?;
        self.execute(Method::POST, Operation::Login, Some(&body), true)
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    fn outcome(status: StatusCode, body: &str, is_auth: bool) -> Result<Outcome> {
        classify(&Response::new(status, body.to_string()), is_auth, "/test")
    }

    #[test]
    fn test_success_parses_body() {
        match outcome(StatusCode::OK, r#"{"balance": 10}"#, false).unwrap() {
            Outcome::Success(value) => assert_eq!(value["balance"], 10),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_success_with_invalid_json_is_decode_error() {
        let err = outcome(StatusCode::OK, "<html>", false).unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }

    #[test]
    fn test_unauthorized_depends_on_auth_flag() {
        assert!(matches!(
            outcome(StatusCode::UNAUTHORIZED, "", false).unwrap(),
            Outcome::AuthExpired
        ));
        assert!(matches!(
            outcome(StatusCode::UNAUTHORIZED, "", true).unwrap(),
            Outcome::ClientFault { status: 401, .. }
        ));
    }

    #[test]
    fn test_other_client_errors() {
        match outcome(StatusCode::UNPROCESSABLE_ENTITY, "bad quantity", false).unwrap() {
            Outcome::ClientFault { status, message } => {
                assert_eq!(status, 422);
                assert_eq!(message, "bad quantity");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_server_errors() {
        assert!(matches!(
            outcome(StatusCode::SERVICE_UNAVAILABLE, "", true).unwrap(),
            Outcome::ServerFault { status: 503, .. }
        ));
    }

    #[test]
    fn test_url_join_keeps_base_prefix() {
        let config = ClientConfig::builder()
            .base_url("https://api.example.com/v1/")
            .build();
        let executor = Executor::new(
            config,
            EndpointCatalog::new(),
            Arc::new(crate::clock::SystemClock),
        )
        .unwrap();

        assert_eq!(
            executor.url_for("/auth/login").unwrap().as_str(),
            "https://api.example.com/v1/auth/login"
        );
    }
}
