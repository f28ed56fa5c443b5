use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::StaleguardError;

/// Bounded exponential backoff: `tries` attempts in total, the delay grows by `backoff` each time.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub tries: u32,
    pub delay: Duration,
    pub backoff: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            tries: 4,
            delay: Duration::from_secs(1),
            backoff: 2,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn none() -> Self {
        Self {
            tries: 1,
            delay: Duration::ZERO,
            backoff: 1,
        }
    }

    /// Run `op`, retrying only transient errors. The last error is returned once attempts run out.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, StaleguardError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StaleguardError>>,
    {
        let tries = self.tries.max(1);
        let mut delay = self.delay;
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < tries => {
                    warn!(
                        attempt,
                        tries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying {what}"
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(self.backoff);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
