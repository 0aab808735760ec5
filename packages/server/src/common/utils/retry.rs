//! Bounded, fixed-delay retry for startup connections.
//!
//! Dependencies (Postgres, NATS, ClickHouse) may come up after the service in
//! container deployments. Each connect is attempted a fixed number of times;
//! running out of attempts is a fatal startup error. This is never used on
//! request paths.

use std::future::Future;
use std::time::Duration;

use anyhow::{anyhow, Result};
use tracing::{info, warn};

use crate::config::{CONNECT_ATTEMPTS, CONNECT_DELAY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    /// 10 attempts, 2 seconds apart.
    pub fn startup() -> Self {
        Self::new(CONNECT_ATTEMPTS, CONNECT_DELAY)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::startup()
    }
}

/// Run `connect` until it succeeds or the policy's attempts are exhausted.
///
/// The last error is returned with the dependency name attached.
pub async fn retry_connect<T, F, Fut>(name: &str, policy: RetryPolicy, mut connect: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
        match connect().await {
            Ok(value) => {
                info!(dependency = name, attempt, "connected");
                return Ok(value);
            }
            Err(e) => {
                warn!(
                    dependency = name,
                    attempt,
                    attempts,
                    error = %e,
                    "waiting for {}",
                    name
                );
                last_error = Some(e);
            }
        }

        if attempt < attempts {
            tokio::time::sleep(policy.delay).await;
        }
    }

    let error = last_error.unwrap_or_else(|| anyhow!("no connection attempt was made"));
    Err(error.context(format!(
        "could not connect to {} after {} attempts",
        name, attempts
    )))
}
