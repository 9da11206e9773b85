use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore, SemaphorePermit};

#[derive(Clone, Debug, Default)]
pub struct Limits {
    pub requests_per_min: Option<u64>,
    pub concurrency: Option<u32>,
}

/// Token bucket plus concurrency cap, shared by every caller of one external service
#[derive(Debug, Clone)]
pub struct RateLimiter {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    limits: Limits,
    // tokens available and the instant of the last refill
    rpm_tokens: Mutex<(f64, Instant)>,
    sem: Option<Semaphore>,
}

/// Held for the duration of one call; dropping it frees the concurrency slot
pub struct Permit<'a> {
    _permit: Option<SemaphorePermit<'a>>,
}

impl RateLimiter {
    pub fn new(limits: Limits) -> Self {
        let capacity = limits.requests_per_min.unwrap_or(0) as f64;
        let sem = limits
            .concurrency
            .filter(|c| *c > 0)
            .map(|c| Semaphore::new(c as usize));
        Self {
            inner: Arc::new(Inner {
                limits,
                rpm_tokens: Mutex::new((capacity, Instant::now())),
                sem,
            }),
        }
    }

    pub fn unlimited() -> Self {
        Self::new(Limits::default())
    }

    /// Wait for a concurrency slot and a request token.
    pub async fn acquire(&self) -> Permit<'_> {
        // Concurrency first so queued callers don't drain the bucket
        let permit = match &self.inner.sem {
            // The semaphore is never closed, so an error only means "no limit"
            Some(sem) => sem.acquire().await.ok(),
            None => None,
        };

        if let Some(rpm) = self.inner.limits.requests_per_min {
            if rpm > 0 {
                self.consume_token(rpm as f64, 60.0).await;
            }
        }

        Permit { _permit: permit }
    }

    async fn consume_token(&self, capacity: f64, period_secs: f64) {
        let refill_rate = capacity / period_secs; // tokens per second
        loop {
            let mut guard = self.inner.rpm_tokens.lock().await;
            let (ref mut tokens, ref mut last) = *guard;
            let now = Instant::now();
            let elapsed = now.duration_since(*last).as_secs_f64();
            *tokens = (*tokens + elapsed * refill_rate).min(capacity);
            *last = now;
            if *tokens >= 1.0 {
                *tokens -= 1.0;
                break;
            }
            let secs = (1.0 - *tokens) / refill_rate;
            drop(guard);
            tokio::time::sleep(Duration::from_secs_f64(secs.max(0.001))).await;
        }
    }
}
