//! Delay between paginated requests

use crate::config::CrawlerConfig;
use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;

/// Pause inserted between consecutive page requests of a walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Throttle {
    /// No delay
    Off,
    /// Always the same delay
    Fixed(Duration),
    /// Uniformly random delay in `[0, max)`
    Random { max: Duration },
}

impl Throttle {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        match config.crawl_interval_ms {
            Some(0) => Self::Off,
            Some(ms) => Self::Fixed(Duration::from_millis(ms)),
            None if config.max_random_interval_ms == 0 => Self::Off,
            None => Self::Random {
                max: Duration::from_millis(config.max_random_interval_ms),
            },
        }
    }

    /// The delay to apply before the next request
    pub fn next_delay(&self) -> Duration {
        match self {
            Self::Off => Duration::ZERO,
            Self::Fixed(delay) => *delay,
            Self::Random { max } => {
                let max_micros = max.as_micros().min(u128::from(u64::MAX)) as u64;
                if max_micros == 0 {
                    return Duration::ZERO;
                }
                Duration::from_micros(rand::thread_rng().gen_range(0..max_micros))
            }
        }
    }

    pub async fn wait(&self) {
        let delay = self.next_delay();
        if !delay.is_zero() {
            sleep(delay).await;
        }
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::Random {
            max: Duration::from_secs(1),
        }
    }
}
