// NS Gifts - Async client for the NS Gifts API
//
// This library wraps the API with automatic token refresh, retry with
// exponential backoff, and a circuit breaker that backs off after server errors.

// Re-export core functionality
pub use nsgifts_client::*;

// Re-export optional crates
#[cfg(feature = "config")]
pub use nsgifts_config;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        ApiError, BackoffStrategy, ClientConfig, ClientConfigBuilder, EndpointCatalog,
        NsGiftsClient, NsGiftsClientBuilder, Operation, Result, RetryConfig, SessionGuard, Value,
    };
}
