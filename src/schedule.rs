//! Randomized delays between cycles and between claims.

use std::time::Duration;

use rand::Rng;

use crate::error::{PinpollError, Result};

pub const DEFAULT_MIN_DELAY_SECS: u64 = 10;
pub const DEFAULT_MAX_DELAY_SECS: u64 = 30;

/// Uniform whole-second delay drawn from a closed interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jitter {
    min_secs: u64,
    max_secs: u64,
}

impl Jitter {
    pub fn new(min_secs: u64, max_secs: u64) -> Result<Self> {
        if min_secs > max_secs {
            return Err(PinpollError::Configuration(format!(
                "delay range is empty: min {}s > max {}s",
                min_secs, max_secs
            )));
        }
        Ok(Self { min_secs, max_secs })
    }

    /// No delay at all; used by tests and one-shot runs
    pub fn none() -> Self {
        Self { min_secs: 0, max_secs: 0 }
    }

    pub fn min_secs(&self) -> u64 {
        self.min_secs
    }

    pub fn max_secs(&self) -> u64 {
        self.max_secs
    }

    /// Draw a fresh delay; every call is independent
    pub fn sample(&self) -> Duration {
        let secs = rand::rng().random_range(self.min_secs..=self.max_secs);
        Duration::from_secs(secs)
    }
}

impl Default for Jitter {
    fn default() -> Self {
        Self {
            min_secs: DEFAULT_MIN_DELAY_SECS,
            max_secs: DEFAULT_MAX_DELAY_SECS,
        }
    }
}
