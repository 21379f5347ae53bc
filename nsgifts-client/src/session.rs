//! Lazily created, shared HTTP session.

use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

use crate::{ApiError, ClientConfig, Result};

/// Owns the connection pool shared by every request of a client.
///
/// The pool is built on first use and can be closed and rebuilt any number
/// of times.
#[derive(Debug)]
pub struct SessionManager {
    handle: RwLock<Option<reqwest::Client>>,
    create_lock: Mutex<()>,
    generation: AtomicU64,
    connect_timeout: Duration,
    user_agent: String,
}

impl SessionManager {
    /// Create a manager; no pool is built yet.
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            handle: RwLock::new(None),
            create_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
            connect_timeout: config.connect_timeout,
            user_agent: config.user_agent.clone(),
        }
    }

    /// Return the live pool, building it if needed.
    pub fn ensure_session(&self) -> Result<reqwest::Client> {
        if let Some(client) = self.handle.read().as_ref() {
            return Ok(client.clone());
        }

        let _guard = self.create_lock.lock();
        if let Some(client) = self.handle.read().as_ref() {
            return Ok(client.clone());
        }

        let client = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .user_agent(&self.user_agent)
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| ApiError::Session(e.to_string()))?;

        *self.handle.write() = Some(client.clone());
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(generation, "Created new HTTP session");

        Ok(client)
    }

    /// Release the pool. Safe to call when nothing is open.
    pub fn close(&self) {
        let _guard = self.create_lock.lock();
        if self.handle.write().take().is_some() {
            debug!("Closed HTTP session");
        }
    }

    /// Whether a pool is currently open.
    pub fn is_open(&self) -> bool {
        self.handle.read().is_some()
    }

    /// Number of pools built so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}
