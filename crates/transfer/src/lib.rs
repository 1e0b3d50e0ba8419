//! Control and progress monitoring for background transfer jobs.
//!
//! Jobs are owned by the OS transfer service (see [`service`]); this crate
//! forwards control requests to it and samples each job's raw byte counters
//! on a fixed period to derive a smoothed rate, an ETA and a completion
//! fraction, published to subscribers as [`ProgressSnapshot`]s.

mod config;
mod error;
mod file;
mod folder;
mod job;
mod manager;
mod progress;
mod rate;
mod registry;
pub mod service;
mod subscribers;

#[cfg(test)]
mod testing;

use std::time::Duration;

pub use bgxfer_protocol::ProgressSnapshot;
pub use config::{ConfigError, SamplerConfig};
pub use error::{Result, TransferError};
pub use file::{FileIter, TransferFile};
pub use job::TransferJobHandle;
pub use manager::ServiceManager;
pub use progress::ProgressSampler;
pub use rate::RateEstimator;
pub use registry::{JobIter, JobRegistry};
pub use service::{ServiceFault, TransferService};
pub use subscribers::{ProgressCallback, SubscriptionId};

/// Default sampler tick period.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// Default number of per-tick deltas averaged into the rate estimate.
pub const DEFAULT_RATE_WINDOW: usize = 6;
