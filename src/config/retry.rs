use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::utils::time::backoff_delay;
use crate::Error;
use crate::Result;

/// Bounds for [`Session::retry_change`](crate::Session::retry_change)
///
/// The default is unbounded with no delay between restarts.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryChangePolicy {
    /// Maximum number of restarts (0 means unlimited retries)
    #[serde(default)]
    pub max_retries: usize,

    /// Backoff base (unit: milliseconds)
    #[serde(default)]
    pub base_delay_ms: u64,

    /// Maximum backoff time (unit: milliseconds)
    #[serde(default)]
    pub max_delay_ms: u64,
}

impl RetryChangePolicy {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn bounded(max_retries: usize) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    pub fn with_backoff(
        mut self,
        base_delay_ms: u64,
        max_delay_ms: u64,
    ) -> Self {
        self.base_delay_ms = base_delay_ms;
        self.max_delay_ms = max_delay_ms;
        self
    }

    pub fn is_bounded(&self) -> bool {
        self.max_retries > 0
    }

    /// Delay before the `restart`-th restart (starting at 0)
    pub fn delay(
        &self,
        restart: usize,
    ) -> Duration {
        backoff_delay(
            restart.min(u32::MAX as usize) as u32,
            self.base_delay_ms,
            self.max_delay_ms,
        )
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_delay_ms < self.base_delay_ms {
            return Err(Error::Config(ConfigError::Message(format!(
                "retry_change.max_delay_ms ({}) must be >= base_delay_ms ({})",
                self.max_delay_ms, self.base_delay_ms
            ))));
        }
        Ok(())
    }
}
