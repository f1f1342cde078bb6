use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

/// Per-domain admission state used by the rate limiter
///
/// Two things are tracked for a domain: how many fetches are in flight
/// (a semaphore with `max_parallelism` slots) and when the last request was
/// granted (behind an async mutex that doubles as the FIFO queue for the
/// inter-request delay). Both tokio primitives hand out in request order,
/// so waiters are served first come, first served.
#[derive(Debug)]
pub struct DomainState {
    slots: Arc<Semaphore>,
    capacity: usize,
    last_grant: Mutex<Option<Instant>>,
    grants: AtomicU64,
}

impl DomainState {
    /// Creates state for a domain allowing `max_parallelism` concurrent fetches
    pub fn new(max_parallelism: usize) -> Self {
        let capacity = max_parallelism.max(1);
        Self {
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
            last_grant: Mutex::new(None),
            grants: AtomicU64::new(0),
        }
    }

    /// Waits for a free parallelism slot
    pub async fn acquire_slot(&self) -> OwnedSemaphorePermit {
        Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .expect("domain slot semaphore is never closed")
    }

    /// Waits until `min_delay` has passed since the previous grant, then
    /// records a new grant and returns its time
    ///
    /// Callers queue on the gate mutex, so concurrent waiters are released
    /// one at a time, each at least `min_delay` after the one before.
    pub async fn wait_turn(&self, min_delay: Duration) -> Instant {
        let mut last_grant = self.last_grant.lock().await;

        if let Some(last) = *last_grant {
            tokio::time::sleep_until(last + min_delay).await;
        }

        let now = Instant::now();
        *last_grant = Some(now);
        self.grants.fetch_add(1, Ordering::Relaxed);
        now
    }

    /// Number of slots currently held
    pub fn in_flight(&self) -> usize {
        self.capacity - self.slots.available_permits()
    }

    /// Total grants handed out for this domain
    pub fn grants(&self) -> u64 {
        self.grants.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
