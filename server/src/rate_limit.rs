//! Fixed-window inbound rate limiting.
//!
//! Each connection keeps its own [`Budget`]. A single background task bumps a
//! shared window counter on every tick, and a budget that notices the counter
//! moved starts over. Resetting therefore never touches any connection or
//! session directly.

use log::debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// Over budget; `notify` is true for the first rejection in a window
    Reject { notify: bool },
}

#[derive(Debug, Default)]
pub struct Budget {
    window: u64,
    used: u32,
    notified: bool,
}

#[derive(Debug)]
pub struct RateLimiter {
    limit: u32,
    window: AtomicU64,
}

impl RateLimiter {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            window: AtomicU64::new(0),
        }
    }

    /// Starts a new window for every connection.
    pub fn tick(&self) {
        self.window.fetch_add(1, Ordering::Relaxed);
    }

    pub fn check(&self, budget: &mut Budget) -> Decision {
        let window = self.window.load(Ordering::Relaxed);
        if budget.window != window {
            *budget = Budget {
                window,
                ..Budget::default()
            };
        }

        if budget.used < self.limit {
            budget.used += 1;
            return Decision::Allow;
        }

        let notify = !budget.notified;
        budget.notified = true;
        Decision::Reject { notify }
    }

    pub fn spawn_reset_task(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                limiter.tick();
                debug!("Rate limit window reset");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_exhausts_within_window() {
        let limiter = RateLimiter::new(3);
        let mut budget = Budget::default();

        for _ in 0..3 {
            assert_eq!(limiter.check(&mut budget), Decision::Allow);
        }
        assert_eq!(limiter.check(&mut budget), Decision::Reject { notify: true });
        assert_eq!(limiter.check(&mut budget), Decision::Reject { notify: false });
    }

    #[test]
    fn test_tick_resets_every_budget() {
        let limiter = RateLimiter::new(1);
        let mut a = Budget::default();
        let mut b = Budget::default();

        assert_eq!(limiter.check(&mut a), Decision::Allow);
        assert_eq!(limiter.check(&mut b), Decision::Allow);
        assert!(matches!(limiter.check(&mut a), Decision::Reject { .. }));

        limiter.tick();
        assert_eq!(limiter.check(&mut a), Decision::Allow);
        assert_eq!(limiter.check(&mut b), Decision::Allow);
        assert_eq!(limiter.check(&mut b), Decision::Reject { notify: true });
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_task_ticks_periodically() {
        let limiter = Arc::new(RateLimiter::new(1));
        let task = limiter.spawn_reset_task(Duration::from_secs(1));
        let mut budget = Budget::default();

        assert_eq!(limiter.check(&mut budget), Decision::Allow);
        assert!(matches!(limiter.check(&mut budget), Decision::Reject { .. }));

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert_eq!(limiter.check(&mut budget), Decision::Allow);

        task.abort();
    }
}
