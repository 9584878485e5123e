//! Politeness delays between requests.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::duration_ms;
use crate::error::{Error, Result};

/// Pause inserted between consecutive requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Pacing {
    /// No pause.
    #[default]
    None,
    /// Always the same pause.
    Fixed {
        #[serde(with = "duration_ms")]
        delay: Duration,
    },
    /// A uniformly random pause in `[min, max]`.
    Random {
        #[serde(with = "duration_ms")]
        min: Duration,
        #[serde(with = "duration_ms")]
        max: Duration,
    },
}

impl Pacing {
    /// Pick the next pause.
    #[must_use]
    pub fn next_delay(&self) -> Duration {
        match *self {
            Self::None => Duration::ZERO,
            Self::Fixed { delay } => delay,
            Self::Random { min, max } if min >= max => min,
            Self::Random { min, max } => {
                let lo = u64::try_from(min.as_millis()).unwrap_or(u64::MAX);
                let hi = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
                Duration::from_millis(rand::thread_rng().gen_range(lo..=hi))
            }
        }
    }

    /// Sleep for the next pause, if any.
    pub async fn wait(&self) {
        let delay = self.next_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] for a random range whose bounds are inverted.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Random { min, max } if min > max => Err(Error::config_error(format!(
                "random pacing min ({}ms) exceeds max ({}ms)",
                min.as_millis(),
                max.as_millis()
            ))),
            _ => Ok(()),
        }
    }
}
