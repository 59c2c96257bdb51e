//! The Rate Limiter: a token bucket gating resolver workers.
//! Built on a [`tokio::sync::Semaphore`] seeded with the burst capacity and
//! smoothly replenished by a background task, rather than refilling the
//! whole bucket once per interval — this keeps query dispatch evenly
//! spaced instead of bursty at interval boundaries.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

enum Inner {
    Unlimited,
    Limited(LimitedState),
}

struct LimitedState {
    semaphore: Arc<Semaphore>,
    replenisher: JoinHandle<()>,
}

impl Drop for LimitedState {
    fn drop(&mut self) {
        self.replenisher.abort();
    }
}

pub struct RateLimiter {
    inner: Inner,
}

impl RateLimiter {
    pub fn unlimited() -> Self {
        Self { inner: Inner::Unlimited }
    }

    /// A limiter allowing `rate_per_second` tokens per second, with bursts
    /// up to `rate_per_second`.
    pub fn new(rate_per_second: u32) -> Self {
        if rate_per_second == 0 {
            return Self::unlimited();
        }

        let burst = rate_per_second as usize;
        let semaphore = Arc::new(Semaphore::new(burst));
        let tick = Duration::from_secs_f64(1.0 / rate_per_second as f64);

        let replenish_target = semaphore.clone();
        let replenisher = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tick);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if replenish_target.available_permits() < burst {
                    replenish_target.add_permits(1);
                }
            }
        });

        Self {
            inner: Inner::Limited(LimitedState { semaphore, replenisher }),
        }
    }

    pub fn from_config(rate_per_second: Option<u32>) -> Self {
        match rate_per_second {
            Some(rate) if rate > 0 => Self::new(rate),
            _ => Self::unlimited(),
        }
    }

    /// Blocks until a token is available.
    pub async fn take(&self) {
        match &self.inner {
            Inner::Unlimited => {}
            Inner::Limited(state) => {
                let permit = state
                    .semaphore
                    .acquire()
                    .await
                    .expect("rate limiter semaphore is never closed");
                permit.forget();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn unlimited_never_blocks() {
        let limiter = RateLimiter::unlimited();
        for _ in 0..1000 {
            limiter.take().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn limited_allows_burst_then_throttles() {
        let limiter = RateLimiter::new(5);
        // Burst capacity of 5 should be immediately available.
        for _ in 0..5 {
            limiter.take().await;
        }

        let taken = Arc::new(AtomicUsize::new(0));
        let taken_clone = taken.clone();
        let limiter = Arc::new(limiter);
        let limiter_clone = limiter.clone();
        let task = tokio::spawn(async move {
            limiter_clone.take().await;
            taken_clone.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::advance(Duration::from_millis(50)).await;
        tokio::task::yield_now().await;
        assert_eq!(taken.load(Ordering::SeqCst), 0, "no token replenished yet");

        tokio::time::advance(Duration::from_millis(200)).await;
        task.await.unwrap();
        assert_eq!(taken.load(Ordering::SeqCst), 1);
    }
}
