//! Bounded retries with a fixed delay.

use super::SourceError;
use std::thread;
use std::time::Duration;
use tracing::warn;

/// How many times to try an upstream call and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// `attempts` is clamped to at least one.
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }

    /// A single attempt, no waiting.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `op` until it succeeds or the attempts run out.
    ///
    /// With a single attempt the original error is returned as is.
    pub fn run<T, F>(&self, what: &str, mut op: F) -> Result<T, SourceError>
    where
        F: FnMut() -> Result<T, SourceError>,
    {
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.attempts => {
                    warn!(
                        what,
                        attempt,
                        max_attempts = self.attempts,
                        error = %err,
                        "attempt failed, retrying in {:?}",
                        self.delay
                    );
                    if !self.delay.is_zero() {
                        thread::sleep(self.delay);
                    }
                    attempt += 1;
                }
                Err(err) if self.attempts > 1 => {
                    return Err(SourceError::RetriesExhausted {
                        attempts: self.attempts,
                        last: Box::new(err),
                    })
                }
                Err(err) => return Err(err),
            }
        }
    }
}
