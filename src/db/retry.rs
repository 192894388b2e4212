//! Connection acquisition with optional self-healing.
//!
//! When self-healing is enabled, a failed connection attempt is retried after
//! a fixed delay until the attempt limit is used up. When it is disabled, the
//! first failure is returned as-is.

use crate::db::connection::{ConnectionSettings, DbConnection};
use crate::error::{DbError, DbResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

/// How connection failures are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retry failed connection attempts
    pub self_healing: bool,
    /// Total attempts when self-healing, including the first
    pub max_attempts: u32,
    /// Fixed pause between attempts
    pub delay: Duration,
}

impl RetryPolicy {
    /// Fail on the first connection error.
    pub fn disabled() -> Self {
        Self {
            self_healing: false,
            max_attempts: 1,
            delay: Duration::ZERO,
        }
    }

    pub fn self_healing(max_attempts: u32, delay: Duration) -> Self {
        Self {
            self_healing: true,
            max_attempts,
            delay,
        }
    }

    /// Number of attempts this policy allows. Always at least one.
    pub fn attempts(&self) -> u32 {
        if self.self_healing {
            self.max_attempts.max(1)
        } else {
            1
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Run `attempt` until it succeeds or the policy gives up.
///
/// `attempt` receives the 1-based attempt number. Without self-healing the
/// error of the single attempt is returned unchanged; with self-healing the
/// last error is wrapped in [`DbError::RetriesExhausted`].
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut attempt: F) -> DbResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = DbResult<T>>,
{
    if !policy.self_healing {
        return attempt(1).await;
    }

    let max_attempts = policy.attempts();
    let mut current = 1;
    loop {
        match attempt(current).await {
            Ok(value) => {
                if current > 1 {
                    info!(attempt = current, "Connection recovered after retry");
                }
                return Ok(value);
            }
            Err(e) => {
                warn!(
                    attempt = current,
                    max_attempts = max_attempts,
                    error = %e,
                    "Connection attempt failed"
                );
                if current >= max_attempts {
                    return Err(DbError::retries_exhausted(current, e));
                }
                sleep(policy.delay).await;
                current += 1;
            }
        }
    }
}

/// Opens connections according to the configured retry policy.
#[derive(Debug, Clone)]
pub struct Connector {
    settings: ConnectionSettings,
    policy: RetryPolicy,
}

impl Connector {
    pub fn new(settings: ConnectionSettings, policy: RetryPolicy) -> Self {
        Self { settings, policy }
    }

    /// Acquire a fresh connection. The caller must release it.
    pub async fn acquire(&self) -> DbResult<DbConnection> {
        with_retry(&self.policy, |attempt| {
            debug!(
                attempt = attempt,
                db_type = %self.settings.db_type(),
                "Opening database connection"
            );
            DbConnection::open(&self.settings)
        })
        .await
    }
}
