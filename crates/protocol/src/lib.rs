//! Data model shared by the background transfer client.
//!
//! Everything here is a plain value: job identifiers, lifecycle states,
//! progress counters as reported by the transfer service, error payloads,
//! and the [`ProgressSnapshot`] published by the progress sampler.

pub mod snapshot;
pub mod types;

pub use snapshot::{ProgressSnapshot, UNKNOWN_ETA};
pub use types::{
    ErrorContext, FileProgress, JobError, JobId, JobOwner, JobPriority, JobProgress, JobState,
    JobTimes,
};
