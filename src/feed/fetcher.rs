use std::time::Duration;

use async_trait::async_trait;

use crate::feed::client::FeedClient;
use crate::feed::error::FetchFailure;
use crate::feed::traits::EventSource;
use crate::feed::types::{FeedWindow, QuakeEvent};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_secs(2);

/// Linear backoff: the pause after failed attempt `n` is `n * base_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_RETRY_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

/// Retrying event source over a [`FeedClient`].
pub struct Fetcher {
    client: FeedClient,
    policy: RetryPolicy,
}

impl Fetcher {
    pub fn new(client: FeedClient, policy: RetryPolicy) -> Self {
        Self {
            client,
            policy: RetryPolicy {
                max_attempts: policy.max_attempts.max(1),
                base_delay: policy.base_delay,
            },
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }
}

#[async_trait]
impl EventSource for Fetcher {
    async fn fetch(&self, window: FeedWindow) -> Result<Vec<QuakeEvent>, FetchFailure> {
        let mut attempt = 1;
        loop {
            match self.client.fetch_once(window).await {
                Ok(events) => {
                    if attempt > 1 {
                        tracing::info!(
                            "feed fetch for window={} succeeded on attempt {}",
                            window,
                            attempt
                        );
                    }
                    return Ok(events);
                }
                Err(error) if attempt < self.policy.max_attempts => {
                    let delay = self.policy.delay_after(attempt);
                    tracing::warn!(
                        "feed fetch attempt {}/{} failed ({}), retrying in {}ms",
                        attempt,
                        self.policy.max_attempts,
                        error,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(last) => {
                    return Err(FetchFailure {
                        attempts: attempt,
                        last,
                    })
                }
            }
        }
    }
}
