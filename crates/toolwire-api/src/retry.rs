//! When to resubmit a completion that failed for a transient reason.

use rand::Rng;
use std::time::Duration;
use toolwire_types::BackendError;

/// Resubmission budget and backoff window for one completion request.
///
/// Waits double from `base_delay` per attempt and never exceed `max_delay`.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Resubmissions after the first attempt (0 = never resubmit).
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    /// How long to wait before resubmitting after `err` on `attempt`
    /// (0-based), or `None` if the request should fail now.
    ///
    /// A rate limit that names its own wait is honoured up to `max_delay`.
    /// Other waits are spread by a random factor so parallel clients do not
    /// resubmit in lockstep.
    pub fn next_delay(&self, attempt: u32, err: &BackendError) -> Option<Duration> {
        if attempt >= self.max_retries {
            return None;
        }
        match err {
            BackendError::RateLimited {
                retry_after_ms: Some(ms),
            } => Some(Duration::from_millis(*ms).min(self.max_delay)),
            BackendError::RateLimited { .. }
            | BackendError::Server { .. }
            | BackendError::Network(_)
            | BackendError::Timeout => Some(self.backoff(attempt)),
            BackendError::Auth { .. } | BackendError::BadRequest { .. } | BackendError::Decode(_) => {
                None
            }
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        let window = self.base_delay.saturating_mul(factor).min(self.max_delay);
        window
            .mul_f64(rand::rng().random_range(0.75..=1.25))
            .min(self.max_delay)
    }
}
