//! Retry with exponential backoff for outbound weather fetches.
//!
//! Forecast and observation requests cross the public internet and fail
//! transiently now and then. Only errors for which
//! [`Error::is_transient`] holds are repeated; a missing file or a
//! malformed payload will not fix itself.
//!
//! # Example
//!
//! ```
//! use fueltrack_core::{Error, RetryConfig, with_retry};
//!
//! # async fn example() -> Result<(), Error> {
//! let value = with_retry(&RetryConfig::for_fetch(), "fetch_forecast", || async {
//!     Ok::<_, Error>(42)
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::error::Result;

/// Retry budget and backoff schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Repeats after the first attempt. Zero disables retrying.
    pub max_retries: u32,
    pub initial_delay: Duration,
    /// Ceiling applied before jitter.
    pub max_delay: Duration,
    /// Growth factor between consecutive delays.
    pub multiplier: f64,
    /// Stretch each delay by a random 0-25%.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Budget for a single weather request.
    ///
    /// The observation importer issues one request per day and strategy,
    /// so this stays small.
    pub fn for_fetch() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(4),
            ..Self::default()
        }
    }

    /// Never retry.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delays to wait before each retry, in order.
    pub fn backoff(&self) -> Backoff<'_> {
        Backoff {
            config: self,
            retry: 0,
        }
    }

    fn base_delay(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()))
    }
}

/// Iterator over the backoff delays of a [`RetryConfig`].
///
/// Yields exactly `max_retries` items.
#[derive(Debug)]
pub struct Backoff<'a> {
    config: &'a RetryConfig,
    retry: u32,
}

impl Iterator for Backoff<'_> {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.retry >= self.config.max_retries {
            return None;
        }
        let delay = self.config.base_delay(self.retry);
        self.retry += 1;
        if self.config.jitter {
            Some(delay.mul_f64(1.0 + rand::rng().random_range(0.0..0.25)))
        } else {
            Some(delay)
        }
    }
}

/// Run `operation` until it succeeds, fails permanently, or the backoff
/// schedule runs out. The last error is returned in the latter case.
pub async fn with_retry<F, Fut, T>(config: &RetryConfig, label: &str, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut schedule = config.backoff();
    let mut retries = 0u32;
    loop {
        let error = match operation().await {
            Ok(value) => {
                if retries > 0 {
                    debug!("{} recovered after {} retries", label, retries);
                }
                return Ok(value);
            }
            Err(e) if !e.is_transient() => return Err(e),
            Err(e) => e,
        };

        let Some(delay) = schedule.next() else {
            return Err(error);
        };
        retries += 1;
        warn!(
            "{} failed ({}), retry {}/{} in {:?}",
            label, error, retries, config.max_retries, delay
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn instant(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_delay: Duration::from_millis(1),
            jitter: false,
            ..RetryConfig::default()
        }
    }

    #[test]
    fn test_backoff_doubles_until_ceiling() {
        let config = RetryConfig {
            max_retries: 4,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(300),
            multiplier: 2.0,
            jitter: false,
        };
        let delays: Vec<_> = config.backoff().collect();
        assert_eq!(
            delays,
            [100, 200, 300, 300].map(Duration::from_millis).to_vec()
        );
    }

    #[test]
    fn test_jitter_stays_within_quarter() {
        let config = RetryConfig {
            max_retries: 20,
            initial_delay: Duration::from_millis(400),
            max_delay: Duration::from_millis(400),
            ..RetryConfig::default()
        };
        for delay in config.backoff() {
            assert!(delay >= Duration::from_millis(400));
            assert!(delay <= Duration::from_millis(500));
        }
    }

    #[test]
    fn test_disabled_has_no_delays() {
        assert_eq!(RetryConfig::disabled().backoff().count(), 0);
        assert_eq!(RetryConfig::for_fetch().backoff().count(), 2);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let calls = &AtomicU32::new(0);
        let result: Result<&str> = with_retry(&instant(3), "flaky", || async move {
            match calls.fetch_add(1, Ordering::SeqCst) {
                0 | 1 => Err(Error::status(502, "u")),
                _ => Ok("ok"),
            }
        })
        .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_budget_exhausted_returns_last_error() {
        let calls = &AtomicU32::new(0);
        let result: Result<()> = with_retry(&instant(2), "down", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::status(503, "u"))
        })
        .await;

        assert!(matches!(result, Err(Error::Status { status: 503, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let calls = &AtomicU32::new(0);
        let result: Result<()> = with_retry(&instant(3), "missing", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::status(404, "u"))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
