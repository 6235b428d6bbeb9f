//! Bounded exponential backoff for waiting on attestation results.

use std::time::Duration;

use anyhow::Result;
use rand::Rng;

/// Shortest pause between two fetches, whatever the policy or jitter says.
pub const MIN_DELAY: Duration = Duration::from_secs(1);

/// How long and how often to ask the DA layer for a proof.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Fraction of each delay that may be added or removed at random.
    pub jitter: f64,
    /// Total time spent sleeping before giving up.
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            jitter: 0.2,
            timeout: Duration::from_secs(300),
        }
    }
}

/// Result of a poll loop that did not fail.
#[derive(Debug, PartialEq)]
pub enum PollOutcome<T> {
    Ready { value: T, attempts: u32 },
    TimedOut { attempts: u32, waited: Duration },
}

impl PollPolicy {
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = if jitter.is_nan() { 0.0 } else { jitter.clamp(0.0, 1.0) };
        self
    }

    /// Delay before retry number `attempt` (0-indexed). Never shorter
    /// than [`MIN_DELAY`].
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_secs_f64());
        let secs = if self.jitter <= 0.0 {
            capped
        } else {
            let range = capped * self.jitter;
            capped + rand::thread_rng().gen_range(-range..=range)
        };
        Duration::try_from_secs_f64(secs.max(0.0))
            .unwrap_or(self.max_delay)
            .max(MIN_DELAY)
    }

    /// Calls `fetch` until it yields a value, it fails, or the sleep
    /// budget is spent. `fetch` receives the 1-based attempt number.
    pub fn run<T, F, S>(&self, mut fetch: F, mut sleep: S) -> Result<PollOutcome<T>>
    where
        F: FnMut(u32) -> Result<Option<T>>,
        S: FnMut(Duration),
    {
        let mut waited = Duration::ZERO;
        let mut attempts = 0;
        loop {
            attempts += 1;
            if let Some(value) = fetch(attempts)? {
                return Ok(PollOutcome::Ready { value, attempts });
            }

            let remaining = self.timeout.saturating_sub(waited);
            if remaining.is_zero() {
                return Ok(PollOutcome::TimedOut { attempts, waited });
            }
            let delay = self.delay_for_attempt(attempts - 1).min(remaining);
            sleep(delay);
            waited += delay;
        }
    }
}
