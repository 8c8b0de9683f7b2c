use std::time::Duration;

use rand::Rng;

use crate::config::settings::RetryConfig;
use crate::error::Error;

/// Bounded exponential backoff with jitter.
#[derive(Debug, Clone)]
pub struct RetrySettings {
    /// total attempts, first one included
    pub attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetrySettings {
    fn from(config: &RetryConfig) -> Self {
        Self {
            attempts: config.attempts().max(1),
            base_delay_ms: config.base_delay_ms(),
            max_delay_ms: config.max_delay_ms().max(config.base_delay_ms()),
        }
    }
}

impl RetrySettings {
    /// Delay before the retry that follows failed attempt `attempt` (0-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_with_jitter(attempt, &mut rand::rng())
    }

    /// `base * 2^attempt` plus up to half of that again, capped at `max_delay_ms`.
    ///
    /// The jitter never reaches the next step, so uncapped delays strictly increase.
    pub fn backoff_with_jitter(&self, attempt: u32, rng: &mut impl Rng) -> Duration {
        let exp = self
            .base_delay_ms
            .saturating_mul(1u64.checked_shl(attempt).unwrap_or(u64::MAX));
        let jitter = match exp / 2 {
            0 => 0,
            half => rng.random_range(0..half),
        };
        Duration::from_millis(exp.saturating_add(jitter).min(self.max_delay_ms))
    }
}

/// Book-keeping for one dispatch; dropped once it succeeds or gives up.
#[derive(Debug, Default)]
pub struct RetryState {
    pub attempt: u32,
    pub last_error: Option<Error>,
    /// the one forced token refresh after 401/403 has been spent
    pub auth_refreshed: bool,
}

impl RetryState {
    /// Record a retryable failure. Returns the failure back when the budget is spent.
    pub fn record(&mut self, error: Error, settings: &RetrySettings) -> Option<Duration> {
        let delay = settings.backoff(self.attempt);
        self.attempt += 1;
        self.last_error = Some(error);
        (self.attempt < settings.attempts).then_some(delay)
    }

    pub fn exhausted(self) -> Error {
        let last = self.last_error.unwrap_or_else(|| Error::TransientTransport {
            status: None,
            message: "no attempt was made".into(),
        });
        Error::RetryExhausted { attempts: self.attempt, last: Box::new(last) }
    }
}
