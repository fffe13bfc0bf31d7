// src/github/rate_limit.rs
// Token-bucket limiting for GitHub API calls

use std::num::NonZeroU32;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Jitter, Quota, RateLimiter as GovRateLimiter};
use tokio_util::sync::CancellationToken;

use crate::error::{DevToolsError, Result};

/// Requests-per-minute token bucket. Instantiated per client and per
/// endpoint class (core vs. search); clients do not coordinate.
pub struct RateLimiter {
    limiter: GovRateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    jitter: Jitter,
}

impl RateLimiter {
    pub fn per_minute(requests_per_minute: u32) -> Result<Self> {
        let quota = Quota::per_minute(NonZeroU32::new(requests_per_minute).ok_or_else(|| {
            DevToolsError::Config("rate limit must be at least 1 request/minute".to_string())
        })?);
        Ok(Self {
            limiter: GovRateLimiter::direct(quota),
            jitter: Jitter::new(Duration::from_millis(10), Duration::from_millis(100)),
        })
    }

    /// Wait for a token. Cancellation aborts the wait with the cancellation
    /// error, not a resource-gate error.
    pub async fn acquire(&self, ct: &CancellationToken) -> Result<()> {
        tokio::select! {
            _ = self.limiter.until_ready_with_jitter(self.jitter) => Ok(()),
            _ = ct.cancelled() => Err(DevToolsError::Cancelled),
        }
    }

    /// Non-blocking probe, used by tests.
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}
