//! Scan timing and retry configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timings and bounds for one scan run. Durations are in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Per-navigation load timeout.
    pub navigation_timeout_ms: u64,
    /// Total attempts per date, including the first.
    pub max_attempts: u32,
    /// Pause before retrying a failed attempt.
    pub retry_delay_ms: u64,
    /// Pause after a page loads, before popups and extraction.
    pub settle_delay_ms: u64,
    /// Pause after each date, whatever its outcome.
    pub date_delay_ms: u64,
    /// How long a consent button may take to become visible.
    pub popup_timeout_ms: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            navigation_timeout_ms: 30_000,
            max_attempts: 3,
            retry_delay_ms: 3_000,
            settle_delay_ms: 2_000,
            date_delay_ms: 1_000,
            popup_timeout_ms: crate::popup::DEFAULT_VISIBILITY_TIMEOUT_MS,
        }
    }
}

impl ScanConfig {
    /// All delays zeroed; for replaying snapshots.
    pub fn without_delays(self) -> Self {
        Self {
            retry_delay_ms: 0,
            settle_delay_ms: 0,
            date_delay_ms: 0,
            ..self
        }
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn date_delay(&self) -> Duration {
        Duration::from_millis(self.date_delay_ms)
    }
}
