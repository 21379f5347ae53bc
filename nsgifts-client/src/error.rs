//! API client error types.

use std::time::Duration;
use thiserror::Error;

/// Result type for API client operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// API client errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server could not be reached after all retries were spent.
    #[error("Connection error after {attempts} attempts: {source}")]
    Connection {
        /// Number of attempts made.
        attempts: u32,
        /// Last transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The request kept timing out after all retries were spent.
    #[error("Request timed out after {attempts} attempts (timeout {timeout:?})")]
    Timeout {
        /// Number of attempts made.
        attempts: u32,
        /// Per-request timeout in effect.
        timeout: Duration,
        /// Last transport error.
        #[source]
        source: reqwest::Error,
    },

    /// Missing credentials, a failed token refresh, or a 401 that survived a refresh.
    #[error("Authentication error: {message}")]
    Authentication {
        /// What went wrong.
        message: String,
        /// Underlying failure, when there was one.
        #[source]
        source: Option<Box<ApiError>>,
    },

    /// 4xx response other than a refreshable 401.
    #[error("Client error at {endpoint}: {status} {message}")]
    Client {
        /// Endpoint path that was called.
        endpoint: String,
        /// HTTP status code.
        status: u16,
        /// Response body or reason phrase.
        message: String,
    },

    /// 5xx response. The circuit breaker has been tripped.
    #[error("Server error at {endpoint}: {status} {message}")]
    Server {
        /// Endpoint path that was called.
        endpoint: String,
        /// HTTP status code.
        status: u16,
        /// Response body or reason phrase.
        message: String,
    },

    /// The circuit breaker is open; no request was sent.
    #[error("API server error detected. Avoiding requests for {remaining_secs} more seconds")]
    ServerBusy {
        /// Seconds until the breaker clears itself.
        remaining_secs: u64,
    },

    /// The retry loop ended without a definitive outcome.
    #[error("Request failed after {attempts} attempts")]
    RequestFailed {
        /// Number of attempts made.
        attempts: u32,
        /// Last error observed, if any.
        #[source]
        source: Option<Box<ApiError>>,
    },

    /// A 2xx response body was not valid JSON, or lacked a required field.
    #[error("Failed to decode response from {endpoint}: {message}")]
    Decode {
        /// Endpoint path that was called.
        endpoint: String,
        /// Decoder message.
        message: String,
    },

    /// Failed to serialize a request body.
    #[error("Failed to serialize request body: {0}")]
    Serialize(#[from] serde_json::Error),

    /// reqwest refused to build the request.
    #[error("Failed to build request: {0}")]
    RequestBuild(String),

    /// The HTTP session could not be created.
    #[error("Failed to create HTTP session: {0}")]
    Session(String),

    /// Base URL or endpoint path did not form a valid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Configuration could not be loaded or failed validation.
    #[error("Configuration error: {0}")]
    Config(#[from] nsgifts_config::ConfigError),
}

impl ApiError {
    pub(crate) fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn authentication_caused_by(message: impl Into<String>, cause: ApiError) -> Self {
        Self::Authentication {
            message: message.into(),
            source: Some(Box::new(cause)),
        }
    }

    /// Check if this error came from a transient transport fault.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout { .. })
    }

    /// Check if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Check if this is an authentication error.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Check if the circuit breaker rejected the call without sending it.
    pub fn is_server_busy(&self) -> bool {
        matches!(self, Self::ServerBusy { .. })
    }

    /// Get the HTTP status code if the server answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Client { status, .. } | Self::Server { status, .. } => Some(*status),
            Self::Authentication {
                source: Some(inner),
                ..
            } => inner.status_code(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_reaches_through_authentication() {
        let inner = ApiError::Client {
            endpoint: "/auth/login".to_string(),
            status: 403,
            message: "forbidden".to_string(),
        };
        let err = ApiError::authentication_caused_by("refresh failed", inner);

        assert!(err.is_authentication());
        assert_eq!(err.status_code(), Some(403));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_server_busy_message_carries_cooldown() {
        let err = ApiError::ServerBusy { remaining_secs: 299 };
        assert!(err.is_server_busy());
        assert!(err.to_string().contains("299 more seconds"));
    }
}
