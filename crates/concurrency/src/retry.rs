//! Conflict retry combinator
//!
//! Optimistic-concurrency conflicts surface as the transient
//! `Error::WriteConflict`. Engines wrap each transactional closure in
//! `write_conflict_retry`, which re-runs it with exponential backoff until
//! it succeeds, fails terminally, or the attempt budget is spent. Conflicts
//! are never surfaced to callers.

use crate::context::OperationContext;
use coral_core::error::Result;
use coral_core::types::Namespace;
use std::time::Duration;
use tracing::debug;

/// Configuration for conflict retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first)
    pub max_attempts: usize,
    /// Base delay between retries in milliseconds (exponential backoff)
    pub base_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 16,
            base_delay_ms: 1,
            max_delay_ms: 50,
        }
    }
}

impl RetryConfig {
    /// Create a RetryConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of attempts
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set base delay for exponential backoff
    pub fn with_base_delay_ms(mut self, base_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self
    }

    /// Set maximum delay between retries
    pub fn with_max_delay_ms(mut self, max_delay_ms: u64) -> Self {
        self.max_delay_ms = max_delay_ms;
        self
    }

    /// Delay before the given retry (exponential backoff, capped)
    pub(crate) fn calculate_delay(&self, attempt: usize) -> Duration {
        let shift = attempt.min(16) as u32;
        let delay = self
            .base_delay_ms
            .saturating_mul(1u64 << shift)
            .min(self.max_delay_ms);
        Duration::from_millis(delay)
    }
}

/// Run `f`, retrying transient conflicts with backoff.
///
/// The closure is re-entered from the top on every attempt, so it must
/// re-read any state it based decisions on. Interruption is checked before
/// each attempt.
///
/// # Errors
/// Whatever terminal error the closure returns; `WriteConflict` itself once
/// the attempt budget is exhausted; `Interrupted` on cancellation.
pub fn write_conflict_retry<T, F>(
    ctx: &OperationContext,
    op_name: &str,
    ns: &Namespace,
    mut f: F,
) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let config = ctx.retry_config().clone();
    let mut attempt = 0usize;
    loop {
        ctx.check_for_interrupt()?;
        match f() {
            Err(err) if err.is_transient() => {
                attempt += 1;
                if attempt >= config.max_attempts {
                    return Err(err);
                }
                debug!(
                    target: "coral::txn",
                    op = op_name,
                    ns = %ns,
                    attempt,
                    "Write conflict, retrying"
                );
                std::thread::sleep(config.calculate_delay(attempt));
            }
            other => return other,
        }
    }
}
