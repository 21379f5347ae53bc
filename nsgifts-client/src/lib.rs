//! # NS Gifts API Client
//!
//! An async client for the NS Gifts API that manages the whole credential
//! lifecycle for you.
//!
//! ## Features
//!
//! - **Token refresh**: tokens close to expiry are refreshed before use, and a
//!   `401` triggers one forced refresh and a single re-send
//! - **Retry with backoff**: connection failures and timeouts are retried with
//!   exponential backoff (1s, 2s, 4s, ...)
//! - **Circuit breaker**: any `5xx` pauses non-auth requests for a cooldown,
//!   failing fast with [`ApiError::ServerBusy`] instead of hitting the server
//! - **Shared session**: one lazily created connection pool, reopened on demand
//!   after [`NsGiftsClient::close`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nsgifts_client::{ClientConfig, NsGiftsClient, Operation};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = NsGiftsClient::new(ClientConfig::default())?;
//!     let session = client.open()?;
//!
//!     session.login("user@example.com", "password").await?;
//!     let balance = session.call(Operation::CheckBalance).await?;
//!     println!("Balance: {}", balance);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Handling a busy server
//!
//! ```rust,no_run
//! use nsgifts_client::{ApiError, NsGiftsClient, Operation};
//!
//! # async fn run(client: NsGiftsClient) -> Result<(), ApiError> {
//! match client.call(Operation::GetCategories).await {
//!     Err(ApiError::ServerBusy { remaining_secs }) => {
//!         println!("Server unhealthy, retry in {}s", remaining_secs);
//!     }
//!     other => println!("{:?}", other?),
//! }
//! # Ok(())
//! # }
//! ```

mod circuit_breaker;
mod client;
mod clock;
mod config;
mod credentials;
mod endpoints;
mod error;
mod executor;
mod models;
mod response;
mod retry;
mod session;
mod token;

pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use client::{NsGiftsClient, NsGiftsClientBuilder, SessionGuard};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_BASE_URL, DEFAULT_TOKEN_LIFETIME};
pub use credentials::{CredentialStore, Credentials, Token};
pub use endpoints::{EndpointCatalog, Operation};
pub use error::{ApiError, Result};
pub use models::{LoginRequest, SignupRequest, TokenGrant};
pub use response::Response;
pub use retry::{BackoffStrategy, RetryConfig};
pub use session::SessionManager;
pub use token::{TokenManager, TokenRefresher};

// Re-export common types
pub use http::{Method, StatusCode};
pub use serde_json::Value;

/// Prelude for common imports.
///
/// ```
/// use nsgifts_client::prelude::*;
/// ```
pub mod prelude {
    pub use crate::client::{NsGiftsClient, NsGiftsClientBuilder, SessionGuard};
    pub use crate::config::{ClientConfig, ClientConfigBuilder};
    pub use crate::endpoints::{EndpointCatalog, Operation};
    pub use crate::error::{ApiError, Result};
    pub use crate::retry::{BackoffStrategy, RetryConfig};
}
