use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Exponential backoff, the delay doubles after every failed attempt.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub attempts: u32,
    pub base: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            attempts: 3,
            base: Duration::from_millis(200),
        }
    }
}

/// Runs `op` until it succeeds or the attempts are used up, returning the last error.
pub async fn with_backoff<F, Fut, T, E>(policy: Backoff, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 1;
    let mut delay = policy.base;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= policy.attempts => return Err(err),
            Err(err) => {
                warn!("attempt {attempt}/{} failed: {err}, retrying in {delay:?}", policy.attempts);
                tokio::time::sleep(delay).await;
                attempt += 1;
                delay *= 2;
            }
        }
    }
}
