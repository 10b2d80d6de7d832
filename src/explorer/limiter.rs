use std::time::Duration;
use tokio::sync::{AcquireError, Mutex, Semaphore, SemaphorePermit};
use tokio::time::Instant;

/// Process-wide limiter for explorer requests: bounded concurrency plus a
/// minimum spacing between request starts.
pub struct RateLimiter {
    permits: Semaphore,
    min_spacing: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(max_concurrent: usize, min_spacing: Duration) -> Self {
        Self {
            permits: Semaphore::new(max_concurrent),
            min_spacing,
            next_slot: Mutex::new(None),
        }
    }

    /// Wait for a free slot. The returned permit must be held for the duration
    /// of the request.
    pub async fn acquire(&self) -> Result<SemaphorePermit<'_>, AcquireError> {
        let permit = self.permits.acquire().await?;

        let wait = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let start = next_slot.map_or(now, |slot| slot.max(now));
            *next_slot = Some(start + self.min_spacing);
            start - now
        };

        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }

        Ok(permit)
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}
