//! Token manager: keeps a valid access token available.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::credentials::{CredentialStore, Credentials, Token};
use crate::{ApiError, Result};

/// Something that can obtain a fresh token for a set of credentials.
///
/// Implementations are expected to install the token into the
/// [`CredentialStore`] themselves; the manager only coordinates when a refresh
/// happens and who performs it.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Log in again with `credentials`.
    async fn refresh(&self, credentials: &Credentials) -> Result<()>;
}

/// Coordinates token refreshes between concurrent callers.
///
/// At most one refresh is in flight at a time. Callers that were waiting on
/// the lock re-check the token after acquiring it and skip the refresh when
/// another caller already did the work.
#[derive(Debug)]
pub struct TokenManager {
    refresh_lock: Mutex<()>,
    refresh_buffer: i64,
    clock: Arc<dyn Clock>,
    refreshes: AtomicU64,
}

impl TokenManager {
    /// Create a manager that refreshes tokens expiring within `refresh_buffer`.
    pub fn new(refresh_buffer: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            refresh_lock: Mutex::new(()),
            refresh_buffer: i64::try_from(refresh_buffer.as_secs()).unwrap_or(i64::MAX),
            clock,
            refreshes: AtomicU64::new(0),
        }
    }

    /// Whether `token` is missing or too close to expiry to be used.
    pub fn needs_refresh(&self, token: Option<&Token>) -> bool {
        match token {
            None => true,
            Some(token) => token.seconds_left(self.clock.now()) < self.refresh_buffer,
        }
    }

    /// Number of refreshes performed by this manager.
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::SeqCst)
    }

    /// Make sure a usable token is installed, refreshing it if needed.
    pub async fn ensure_valid(
        &self,
        store: &CredentialStore,
        refresher: &dyn TokenRefresher,
    ) -> Result<()> {
        let current = store.token();
        if current.is_none() && !store.has_credentials() {
            return Err(ApiError::authentication(
                "Authentication required. Call login() or signup() first",
            ));
        }
        if !self.needs_refresh(current.as_ref()) {
            return Ok(());
        }

        let _guard = self.refresh_lock.lock().await;
        if !self.needs_refresh(store.token().as_ref()) {
            debug!("Token refreshed by a concurrent request");
            return Ok(());
        }

        self.refresh_locked(store, refresher).await
    }

    /// Refresh after the server rejected `stale`.
    ///
    /// Skips the refresh when the installed token no longer matches `stale`,
    /// meaning someone else replaced it while this request was in flight.
    pub async fn force_refresh(
        &self,
        stale: Option<&str>,
        store: &CredentialStore,
        refresher: &dyn TokenRefresher,
    ) -> Result<()> {
        let _guard = self.refresh_lock.lock().await;
        if let Some(current) = store.bearer()
            && Some(current.as_str()) != stale
        {
            debug!("Rejected token already replaced by a concurrent request");
            return Ok(());
        }

        self.refresh_locked(store, refresher).await
    }

    async fn refresh_locked(
        &self,
        store: &CredentialStore,
        refresher: &dyn TokenRefresher,
    ) -> Result<()> {
        if !store.has_credentials() {
            return Err(ApiError::authentication(
                "Token expired, but credentials are not set for refresh. Call login() first",
            ));
        }

        let credentials = store.credentials();
        refresher
            .refresh(&credentials)
            .await
            .map_err(|e| ApiError::authentication_caused_by("Token refresh failed", e))?;

        self.refreshes.fetch_add(1, Ordering::SeqCst);
        info!("Token refreshed successfully");
        Ok(())
    }
}
