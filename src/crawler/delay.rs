//! Randomized inter-page delay
//!
//! Consecutive pages of one source are spaced by a random pause inside a
//! configured window to keep the load on the list host low.

use crate::config::DelayConfig;
use rand::Rng;
use std::time::Duration;

/// Inclusive window the pause between two page fetches is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    min: Duration,
    max: Duration,
}

impl DelayRange {
    /// Creates a range; reversed bounds are swapped
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn from_secs(min: u64, max: u64) -> Self {
        Self::new(Duration::from_secs(min), Duration::from_secs(max))
    }

    /// No pause at all
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    /// Draws a pause uniformly from the window, at millisecond resolution
    pub fn sample(&self) -> Duration {
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        if min == max {
            return self.min;
        }
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

impl From<&DelayConfig> for DelayRange {
    fn from(config: &DelayConfig) -> Self {
        Self::from_secs(config.min_secs, config.max_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_within_bounds() {
        let range = DelayRange::new(Duration::from_millis(10), Duration::from_millis(20));
        for _ in 0..200 {
            let pause = range.sample();
            assert!(pause >= range.min() && pause <= range.max());
        }
    }

    #[test]
    fn test_reversed_bounds_swapped() {
        let range = DelayRange::from_secs(10, 5);
        assert_eq!(range.min(), Duration::from_secs(5));
        assert_eq!(range.max(), Duration::from_secs(10));
    }

    #[test]
    fn test_none_is_zero() {
        assert_eq!(DelayRange::none().sample(), Duration::ZERO);
    }

    #[test]
    fn test_from_config_defaults() {
        let range = DelayRange::from(&DelayConfig::default());
        assert_eq!(range.min(), Duration::from_secs(5));
        assert_eq!(range.max(), Duration::from_secs(10));
    }
}
