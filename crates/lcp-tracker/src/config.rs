//! Configuration for LCP tracking.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LcpConfig {
    /// Delay after activation before the measurement is treated as settled.
    pub finalize_delay_ms: u64,
    /// Wait before the first heuristic fallback attempt.
    pub fallback_settle_ms: u64,
    pub poll_interval_ms: u64,
    /// Polling stops this long after activation whatever the outcome.
    pub poll_ceiling_ms: u64,
    pub min_width: f64,
    pub min_height: f64,
    pub min_area: f64,
}

impl Default for LcpConfig {
    fn default() -> Self {
        Self {
            finalize_delay_ms: 5_000,
            fallback_settle_ms: 1_500,
            poll_interval_ms: 500,
            poll_ceiling_ms: 15_000,
            min_width: 300.0,
            min_height: 200.0,
            min_area: 60_000.0,
        }
    }
}
