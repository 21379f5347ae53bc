//! Client configuration.

use nsgifts_config::{ConfigValidator, Settings, Validate};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

use crate::retry::RetryConfig;
use crate::Result;

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.ns.gifts";

/// Token lifetime assumed when a login response omits `valid_thru`.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(5400);

/// API client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every endpoint path is appended to.
    pub base_url: String,
    /// Retry policy for connection failures and timeouts.
    pub retry: RetryConfig,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// How long the circuit breaker stays open after a 5xx.
    pub server_error_cooldown: Duration,
    /// Refresh the token when it expires within this window.
    pub token_refresh_buffer: Duration,
    /// Lifetime given to tokens whose login response has no `valid_thru`.
    pub default_token_lifetime: Duration,
    /// User agent string.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            retry: RetryConfig::default(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            server_error_cooldown: Duration::from_secs(300),
            token_refresh_buffer: Duration::from_secs(300),
            default_token_lifetime: DEFAULT_TOKEN_LIFETIME,
            user_agent: format!("nsgifts-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Maximum attempts per request.
    pub fn max_retries(&self) -> u32 {
        self.retry.max_attempts
    }

    /// Build a configuration from already loaded settings.
    ///
    /// Missing keys keep their defaults.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let overrides: ConfigOverrides = settings.load_validated()?;
        Ok(overrides.apply(Self::default()))
    }

    /// Build a configuration from `NSGIFTS_*` environment variables,
    /// reading a `.env` file first when one exists.
    pub fn from_env() -> Result<Self> {
        let mut settings = Settings::new();
        settings.load_dotenv(None)?;
        Self::from_settings(&settings)
    }

    /// Build a configuration from a JSON, TOML or `.env` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut settings = Settings::new();
        settings.load_file(path)?;
        Self::from_settings(&settings)
    }
}

/// Upper bound for cooldown, refresh buffer and token lifetime settings (one week).
const MAX_WINDOW_SECS: u64 = 7 * 24 * 60 * 60;

/// Optional overrides as they appear in files and the environment.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigOverrides {
    #[serde(deserialize_with = "lenient_string")]
    base_url: Option<String>,
    max_retries: Option<u32>,
    backoff_base_ms: Option<u64>,
    request_timeout_secs: Option<u64>,
    connect_timeout_secs: Option<u64>,
    server_error_cooldown_secs: Option<u64>,
    token_refresh_buffer_secs: Option<u64>,
    default_token_lifetime_secs: Option<u64>,
    #[serde(deserialize_with = "lenient_string")]
    user_agent: Option<String>,
}

// Environment values are coerced to numbers and booleans on load, so a
// string setting such as `NSGIFTS_USER_AGENT=1.0` may arrive as a scalar.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

impl Validate for ConfigOverrides {
    fn validate(&self) -> nsgifts_config::Result<()> {
        if let Some(url) = &self.base_url {
            ConfigValidator::is_url(url, "base_url")?;
        }
        if let Some(retries) = self.max_retries {
            ConfigValidator::in_range(retries, 1, 20, "max_retries")?;
        }
        if let Some(timeout) = self.request_timeout_secs {
            ConfigValidator::in_range(timeout, 1, 3600, "request_timeout_secs")?;
        }
        if let Some(cooldown) = self.server_error_cooldown_secs {
            ConfigValidator::in_range(cooldown, 0, MAX_WINDOW_SECS, "server_error_cooldown_secs")?;
        }
        if let Some(buffer) = self.token_refresh_buffer_secs {
            ConfigValidator::in_range(buffer, 0, MAX_WINDOW_SECS, "token_refresh_buffer_secs")?;
        }
        if let Some(lifetime) = self.default_token_lifetime_secs {
            ConfigValidator::in_range(lifetime, 1, MAX_WINDOW_SECS, "default_token_lifetime_secs")?;
        }
        if let Some(agent) = &self.user_agent {
            ConfigValidator::not_empty(agent, "user_agent")?;
        }
        Ok(())
    }
}

impl ConfigOverrides {
    fn apply(self, mut config: ClientConfig) -> ClientConfig {
        if let Some(url) = self.base_url {
            config.base_url = url;
        }
        let base = self
            .backoff_base_ms
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_secs(1));
        config.retry = RetryConfig::exponential(
            self.max_retries.unwrap_or(config.retry.max_attempts),
            base,
        );
        if let Some(secs) = self.request_timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.connect_timeout_secs {
            config.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.server_error_cooldown_secs {
            config.server_error_cooldown = Duration::from_secs(secs);
        }
        if let Some(secs) = self.token_refresh_buffer_secs {
            config.token_refresh_buffer = Duration::from_secs(secs);
        }
        if let Some(secs) = self.default_token_lifetime_secs {
            config.default_token_lifetime = Duration::from_secs(secs);
        }
        if let Some(agent) = self.user_agent {
            config.user_agent = agent;
        }
        config
    }
}

/// Builder for client configuration.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the base URL for all requests.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Set the maximum number of attempts per request.
    pub fn max_retries(mut self, attempts: u32) -> Self {
        self.config.retry.max_attempts = attempts.max(1);
        self
    }

    /// Set the full retry configuration.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    /// Set the per-request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set how long the circuit breaker stays open after a server error.
    pub fn server_error_cooldown(mut self, cooldown: Duration) -> Self {
        self.config.server_error_cooldown = cooldown;
        self
    }

    /// Set the window before expiry in which the token is refreshed.
    pub fn token_refresh_buffer(mut self, buffer: Duration) -> Self {
        self.config.token_refresh_buffer = buffer;
        self
    }

    /// Set the lifetime assumed for tokens without `valid_thru`.
    pub fn default_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.config.default_token_lifetime = lifetime;
        self
    }

    /// Set the user agent string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ClientConfig {
        self.config
    }
}
