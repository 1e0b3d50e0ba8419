use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::JobId;

/// Sentinel for "time remaining unknown".
pub const UNKNOWN_ETA: i64 = -1;

/// One progress observation of a job, published once per sampler tick.
///
/// `bytes_remaining` is `bytes_total - bytes_transferred` and is not
/// clamped: some services briefly report more transferred than total
/// bytes right after a resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub job_id: JobId,
    pub bytes_total: i64,
    pub bytes_transferred: i64,
    pub bytes_remaining: i64,
    /// Smoothed transfer rate in bytes per second.
    pub estimated_bytes_per_second: i64,
    /// Whole seconds until completion, or [`UNKNOWN_ETA`].
    pub estimated_seconds_remaining: i64,
    /// Fraction in `[0.0, 1.0]` (see `bytes_remaining` for the
    /// overshoot caveat).
    pub completion_fraction: f64,
}

impl ProgressSnapshot {
    /// Returns the estimated time remaining, if known.
    pub fn eta(&self) -> Option<Duration> {
        u64::try_from(self.estimated_seconds_remaining)
            .ok()
            .map(Duration::from_secs)
    }

    /// Returns the completion as a percentage (0-100).
    pub fn percentage(&self) -> f64 {
        self.completion_fraction * 100.0
    }
}
