use std::time::Duration;

use rand::Rng;

/// Total attempts per send, the first one included.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Base delay before the first retry.
pub const BASE_DELAY_MS: u64 = 500;
/// Upper bound (exclusive) of the random jitter added to computed delays.
pub const JITTER_CEILING_MS: u64 = 250;
/// Cap applied to computed delays. Server hints are not capped.
pub const MAX_DELAY_MS: u64 = 5000;

/// Exponential backoff with random jitter and a server-hint override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub jitter_ceiling: Duration,
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(BASE_DELAY_MS),
            jitter_ceiling: Duration::from_millis(JITTER_CEILING_MS),
            max_delay: Duration::from_millis(MAX_DELAY_MS),
        }
    }
}

impl BackoffPolicy {
    pub fn new(base: Duration, jitter_ceiling: Duration, max_delay: Duration) -> Self {
        Self {
            base,
            jitter_ceiling,
            max_delay,
        }
    }

    /// Wait before the attempt following `attempt` (zero-based).
    ///
    /// A `Retry-After` hint that parses as whole seconds wins outright. A hint
    /// that does not parse yields the base delay, not the exponential one.
    pub fn delay(&self, attempt: u32, server_hint: Option<&str>) -> Duration {
        if let Some(hint) = server_hint {
            return match parse_retry_after(hint) {
                Some(seconds) => Duration::from_secs(seconds),
                None => self.base,
            };
        }

        self.delay_with_jitter(attempt, self.sample_jitter())
    }

    /// `min(base * 2^attempt + jitter, max_delay)` for a caller-chosen jitter.
    pub fn delay_with_jitter(&self, attempt: u32, jitter: Duration) -> Duration {
        let exponent = attempt.min(30);
        self.base
            .saturating_mul(2u32.saturating_pow(exponent))
            .saturating_add(jitter)
            .min(self.max_delay)
    }

    fn sample_jitter(&self) -> Duration {
        let ceiling = u64::try_from(self.jitter_ceiling.as_micros()).unwrap_or(u64::MAX);
        if ceiling == 0 {
            return Duration::ZERO;
        }
        Duration::from_micros(rand::thread_rng().gen_range(0..ceiling))
    }
}

/// Parse a `Retry-After` value given in whole seconds.
///
/// Negative values clamp to zero, meaning retry immediately. HTTP-date forms
/// are not recognized.
pub fn parse_retry_after(value: &str) -> Option<u64> {
    let seconds = value.trim().parse::<i64>().ok()?;
    Some(u64::try_from(seconds).unwrap_or(0))
}
