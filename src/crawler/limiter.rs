//! Rate limiter for fetches
//!
//! This module handles:
//! - Global concurrency limiting via a semaphore
//! - Per-domain in-flight limits
//! - A minimum delay between grants for the same domain

use crate::config::CrawlerConfig;
use crate::state::DomainState;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tracing::debug;

/// Permission to issue one fetch
///
/// Holds a global slot and a domain slot; both are returned on drop.
#[derive(Debug)]
pub struct Permit {
    domain: String,
    granted_at: Instant,
    _slot: OwnedSemaphorePermit,
    _global: OwnedSemaphorePermit,
}

impl Permit {
    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn granted_at(&self) -> Instant {
        self.granted_at
    }

    /// Returns the slots early; equivalent to dropping the permit
    pub fn release(self) {}
}

/// Bounds concurrent fetches globally and per domain, and spaces out
/// grants for the same domain
///
/// Waiters are served first come, first served within each stage.
#[derive(Debug)]
pub struct RateLimiter {
    global: Arc<Semaphore>,
    max_parallelism: usize,
    min_delay: Duration,
    domains: Mutex<HashMap<String, Arc<DomainState>>>,
}

impl RateLimiter {
    /// Creates a new rate limiter
    ///
    /// # Arguments
    ///
    /// * `max_concurrent` - Global cap on permits held at once
    /// * `max_parallelism` - Per-domain cap on permits held at once
    /// * `min_delay` - Minimum time between two grants for the same domain
    pub fn new(max_concurrent: usize, max_parallelism: usize, min_delay: Duration) -> Self {
        Self {
            global: Arc::new(Semaphore::new(max_concurrent.max(1))),
            max_parallelism: max_parallelism.max(1),
            min_delay,
            domains: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(
            config.max_concurrent_fetches as usize,
            config.max_parallelism as usize,
            config.min_delay(),
        )
    }

    /// Waits for permission to fetch from `domain`
    ///
    /// Acquisition order: global slot, domain slot, then the domain's delay
    /// gate. The grant time is recorded while the gate is held.
    pub async fn acquire(&self, domain: &str) -> Permit {
        let state = self.domain_state(domain);

        let global = Arc::clone(&self.global)
            .acquire_owned()
            .await
            .expect("global fetch semaphore is never closed");
        let slot = state.acquire_slot().await;
        let granted_at = state.wait_turn(self.min_delay).await;

        debug!(
            "Granted fetch permit for {} ({} in flight, {} total)",
            domain,
            state.in_flight(),
            state.grants()
        );

        Permit {
            domain: domain.to_string(),
            granted_at,
            _slot: slot,
            _global: global,
        }
    }

    /// Number of permits currently held for `domain`
    pub fn in_flight(&self, domain: &str) -> usize {
        self.lookup(domain).map_or(0, |state| state.in_flight())
    }

    /// Number of permits granted so far for `domain`
    pub fn grants(&self, domain: &str) -> u64 {
        self.lookup(domain).map_or(0, |state| state.grants())
    }

    /// Number of global slots currently free
    pub fn available(&self) -> usize {
        self.global.available_permits()
    }

    fn lookup(&self, domain: &str) -> Option<Arc<DomainState>> {
        self.domains
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(domain)
            .cloned()
    }

    fn domain_state(&self, domain: &str) -> Arc<DomainState> {
        let mut domains = self.domains.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            domains
                .entry(domain.to_string())
                .or_insert_with(|| Arc::new(DomainState::new(self.max_parallelism))),
        )
    }
}
