//! Fixed-delay retry for filesystem access on flaky storage
//!
//! Archive inputs usually live on a network mount that drops out for
//! minutes at a time. The default policy therefore retries forever with a
//! fixed delay; tests and impatient operators can bound it.

use std::fmt::Display;
use std::time::Duration;

/// Delay between attempts when nothing else is configured.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Classification of an error as worth retrying or not.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// How often and how patiently to retry a transient failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Sleep between two attempts
    pub delay: Duration,
    /// Total attempts including the first one; `None` retries forever
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    /// Retry forever, sleeping `delay` between attempts.
    pub const fn unbounded(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
        }
    }

    /// Give up after `max_attempts` attempts.
    pub const fn bounded(max_attempts: u32, delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: Some(max_attempts),
        }
    }

    fn may_retry_after(&self, attempt: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempt < max)
    }

    /// Run `op` until it succeeds, fails permanently, or the policy is exhausted.
    ///
    /// Only errors whose [`Transient::is_transient`] is true are retried; any
    /// other error is returned immediately. The sleep blocks the calling thread.
    pub fn run<T, E>(&self, label: &str, mut op: impl FnMut() -> Result<T, E>) -> Result<T, E>
    where
        E: Transient + Display,
    {
        let mut attempt = 1u32;
        loop {
            match op() {
                Ok(v) => return Ok(v),
                Err(e) if e.is_transient() && self.may_retry_after(attempt) => {
                    log::warn!(
                        "[{attempt}] {label}: IO error: {e}, retrying in {}s",
                        self.delay.as_secs()
                    );
                    attempt += 1;
                    std::thread::sleep(self.delay);
                }
                Err(e) => {
                    if e.is_transient() {
                        log::error!("{label}: giving up after {attempt} attempts: {e}");
                    }
                    return Err(e);
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::unbounded(DEFAULT_RETRY_DELAY)
    }
}
