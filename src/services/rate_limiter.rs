//! Minimum-interval pacing for catalog calls, with adaptive backoff.

use std::time::Duration;

use tokio::time::Instant;

/// Enforces a minimum interval between requests. The interval doubles after
/// a failed request (up to a ceiling) and halves back toward the base after
/// a run of successes.
#[derive(Debug)]
pub struct RateLimiter {
    name: &'static str,
    last_request: Option<Instant>,
    current_interval: Duration,
    base_interval: Duration,
    max_interval: Duration,
    success_count: u32,
    successes_to_reduce: u32,
}

impl RateLimiter {
    /// * `base_interval`: minimum time between requests; zero disables waiting
    /// * `max_interval`: upper bound after repeated failures
    /// * `successes_to_reduce`: consecutive successes before halving the
    ///   interval (0 disables reduction)
    pub fn new(name: &'static str, base_interval: Duration, max_interval: Duration, successes_to_reduce: u32) -> Self {
        Self {
            name,
            last_request: None,
            current_interval: base_interval,
            base_interval,
            max_interval,
            success_count: 0,
            successes_to_reduce,
        }
    }

    /// Max interval = 16× base, reduce after 10 successes.
    pub fn with_interval(name: &'static str, base: Duration) -> Self {
        Self::new(name, base, base * 16, 10)
    }

    pub fn current_interval(&self) -> Duration {
        self.current_interval
    }

    /// Sleep if not enough time has elapsed since the last request.
    /// Must be called *before* making a request.
    pub async fn wait_if_needed(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.current_interval {
                let wait_time = self.current_interval - elapsed;
                tracing::trace!(limiter = self.name, wait_ms = wait_time.as_millis() as u64, "Rate limiting");
                tokio::time::sleep(wait_time).await;
            }
        }
        self.last_request = Some(Instant::now());
    }

    pub fn report_success(&mut self) {
        if self.successes_to_reduce == 0 {
            return;
        }

        self.success_count += 1;

        if self.success_count >= self.successes_to_reduce && self.current_interval > self.base_interval {
            self.current_interval = (self.current_interval / 2).max(self.base_interval);
            tracing::debug!(
                limiter = self.name,
                interval_ms = self.current_interval.as_millis() as u64,
                "Rate limit interval reduced"
            );
            self.success_count = 0;
        }
    }

    pub fn report_failure(&mut self) {
        self.current_interval = (self.current_interval * 2).min(self.max_interval);
        tracing::debug!(
            limiter = self.name,
            interval_ms = self.current_interval.as_millis() as u64,
            "Rate limit interval increased after error"
        );
        self.success_count = 0;
    }
}
