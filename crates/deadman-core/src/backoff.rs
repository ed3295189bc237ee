use chrono::{DateTime, Utc};

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_MAX_RATE_LIMIT_WAIT_SECS: u64 = 600;

/// Rate-limit retry budget for a single fetch.
///
/// v0 defaults:
/// Retries: 3 (the 4th rate-limited response is fatal)
/// Max wait: 600s (a longer reset fails fast instead of blocking the job)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub max_wait_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            max_wait_secs: DEFAULT_MAX_RATE_LIMIT_WAIT_SECS,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitWait {
    /// Reset already passed.
    RetryNow,
    SleepSecs(u64),
    /// Reset is further out than the ceiling allows.
    TooLong(u64),
}

/// Pure wait computation: one second past the reset instant, truncated.
pub fn rate_limit_wait(reset_epoch_secs: i64, now: DateTime<Utc>, max_wait_secs: u64) -> RateLimitWait {
    let remaining_ms = reset_epoch_secs.saturating_mul(1000).saturating_sub(now.timestamp_millis());
    let wait = remaining_ms / 1000 + 1;
    if wait <= 0 {
        return RateLimitWait::RetryNow;
    }
    let wait = wait as u64;
    if wait > max_wait_secs {
        RateLimitWait::TooLong(wait)
    } else {
        RateLimitWait::SleepSecs(wait)
    }
}
