//! Rate limiting
//!
//! Login attempts are limited per normalized email address so that password
//! guessing against one account is throttled without affecting others.

use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use tracing::{debug, warn};
use crate::utils::errors::{EventHubError, Result};

type KeyedLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Stale keys are dropped once every this many checks
const PRUNE_EVERY: u64 = 256;

/// Keyed limiter for login attempts
#[derive(Clone)]
pub struct LoginRateLimiter {
    limiter: Arc<KeyedLimiter>,
    checks: Arc<AtomicU64>,
}

impl LoginRateLimiter {
    /// Allow `attempts_per_minute` attempts per key, with the same burst
    pub fn new(attempts_per_minute: u32) -> Self {
        let per_minute = NonZeroU32::new(attempts_per_minute).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: Arc::new(RateLimiter::keyed(Quota::per_minute(per_minute))),
            checks: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Consume one attempt for `key`
    pub fn check(&self, key: &str) -> Result<()> {
        if (self.checks.fetch_add(1, Ordering::Relaxed) + 1) % PRUNE_EVERY == 0 {
            self.prune();
        }

        match self.limiter.check_key(&key.to_string()) {
            Ok(()) => Ok(()),
            Err(_) => {
                warn!(key = %key, "Login rate limit exceeded");
                Err(EventHubError::RateLimitExceeded)
            }
        }
    }

    /// Forget keys whose quota has fully replenished
    pub fn prune(&self) {
        let before = self.limiter.len();
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        debug!(before, after = self.limiter.len(), "Pruned login rate limiter");
    }

    /// Number of keys currently holding limiter state
    pub fn tracked_keys(&self) -> usize {
        self.limiter.len()
    }
}
