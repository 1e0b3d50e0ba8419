//! Job handle: control operations, property access and progress sampling.

use std::sync::Arc;
use std::time::Duration;

use bgxfer_protocol::{JobId, JobPriority, JobProgress, JobState, JobTimes, ProgressSnapshot};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::SamplerConfig;
use crate::error::{Result, TransferError, translate};
use crate::file::FileIter;
use crate::progress::ProgressSampler;
use crate::service::{ServiceJob, ServiceResult};
use crate::subscribers::SubscriptionId;

/// Handle to one job of the transfer service.
///
/// The service owns the job; dropping the handle stops local progress
/// sampling but leaves the job itself untouched.
///
/// Control operations on one handle must not be issued concurrently.
pub struct TransferJobHandle {
    id: JobId,
    job: Arc<dyn ServiceJob>,
    sampler: ProgressSampler,
}

impl TransferJobHandle {
    /// Wraps a service job, reading its id once.
    pub fn new(job: Arc<dyn ServiceJob>, config: &SamplerConfig) -> Result<Self> {
        let id = job.id().map_err(|fault| translate(job.as_ref(), fault))?;
        Ok(Self::with_id(id, job, config))
    }

    pub(crate) fn with_id(id: JobId, job: Arc<dyn ServiceJob>, config: &SamplerConfig) -> Self {
        let sampler = ProgressSampler::new(Arc::clone(&job), id, config);
        Self { id, job, sampler }
    }

    /// Runs one service call, translating failures.
    fn call<T>(&self, op: impl FnOnce(&dyn ServiceJob) -> ServiceResult<T>) -> Result<T> {
        op(self.job.as_ref()).map_err(|fault| translate(self.job.as_ref(), fault))
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn display_name(&self) -> Result<String> {
        self.call(|job| job.display_name())
    }

    pub fn set_display_name(&self, name: &str) -> Result<()> {
        self.call(|job| job.set_display_name(name))
    }

    pub fn description(&self) -> Result<String> {
        self.call(|job| job.description())
    }

    pub fn set_description(&self, description: &str) -> Result<()> {
        self.call(|job| job.set_description(description))
    }

    pub fn priority(&self) -> Result<JobPriority> {
        self.call(|job| job.priority())
    }

    pub fn set_priority(&self, priority: JobPriority) -> Result<()> {
        self.call(|job| job.set_priority(priority))
    }

    /// Minimum delay the service waits before retrying after a transient
    /// error.
    pub fn minimum_retry_delay(&self) -> Result<Duration> {
        self.call(|job| job.minimum_retry_delay())
            .map(|secs| Duration::from_secs(u64::from(secs)))
    }

    /// Sets the retry delay, truncated to whole seconds.
    pub fn set_minimum_retry_delay(&self, delay: Duration) -> Result<()> {
        let secs = u32::try_from(delay.as_secs()).unwrap_or(u32::MAX);
        self.call(|job| job.set_minimum_retry_delay(secs))
    }

    pub fn owner(&self) -> Result<String> {
        self.call(|job| job.owner())
    }

    pub fn state(&self) -> Result<JobState> {
        self.call(|job| job.state())
    }

    /// True once every file has been transferred.
    pub fn is_transferred(&self) -> Result<bool> {
        Ok(self.state()? == JobState::Transferred)
    }

    pub fn progress(&self) -> Result<JobProgress> {
        self.call(|job| job.progress())
    }

    pub fn bytes_total(&self) -> Result<u64> {
        Ok(self.progress()?.bytes_total)
    }

    pub fn bytes_transferred(&self) -> Result<u64> {
        Ok(self.progress()?.bytes_transferred)
    }

    pub fn files_total(&self) -> Result<u32> {
        Ok(self.progress()?.files_total)
    }

    pub fn files_transferred(&self) -> Result<u32> {
        Ok(self.progress()?.files_transferred)
    }

    pub fn times(&self) -> Result<JobTimes> {
        self.call(|job| job.times())
    }

    pub fn creation_time(&self) -> Result<DateTime<Utc>> {
        Ok(self.times()?.creation)
    }

    pub fn modification_time(&self) -> Result<DateTime<Utc>> {
        Ok(self.times()?.modification)
    }

    pub fn transfer_completion_time(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.times()?.transfer_completion)
    }

    /// Suspends the job. Sampling stops even if the request fails.
    pub fn suspend(&self) -> Result<()> {
        debug!(job = %self.id, "suspending job");
        let result = self.call(|job| job.suspend());
        self.sampler.stop();
        result
    }

    /// Resumes the job and restarts sampling with an empty rate window.
    pub fn resume(&self) -> Result<()> {
        debug!(job = %self.id, "resuming job");
        self.call(|job| job.resume())?;
        self.sampler.start()
    }

    /// Cancels the job. Sampling stops even if the request fails.
    pub fn cancel(&self) -> Result<()> {
        debug!(job = %self.id, "cancelling job");
        let result = self.call(|job| job.cancel());
        self.sampler.stop();
        result
    }

    /// Acknowledges a transferred job, making its files available.
    ///
    /// Sampling stops before the request is sent.
    pub fn complete(&self) -> Result<()> {
        debug!(job = %self.id, "completing job");
        self.sampler.stop();
        self.call(|job| job.complete())
    }

    /// Queues one file. `remote` is a URL or UNC path, `local` a path on
    /// this machine.
    pub fn add_file(&self, remote: &str, local: &str) -> Result<()> {
        if remote.is_empty() {
            return Err(TransferError::InvalidArgument("remote file name is empty".into()));
        }
        if local.is_empty() {
            return Err(TransferError::InvalidArgument("local file name is empty".into()));
        }
        self.call(|job| job.add_file(remote, local))
    }

    /// Lists the job's files lazily.
    pub fn files(&self) -> Result<FileIter> {
        let cursor = self.call(|job| job.enum_files())?;
        Ok(FileIter::new(Arc::clone(&self.job), cursor))
    }

    /// Registers a callback invoked with every progress snapshot.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ProgressSnapshot) + Send + Sync + 'static,
    {
        self.sampler.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.sampler.unsubscribe(id)
    }

    /// Samples and publishes progress immediately, outside the periodic
    /// schedule.
    ///
    /// Calling it from one of this handle's own progress callbacks fails
    /// with [`TransferError::ReentrantRefresh`].
    pub fn refresh_progress(&self) -> Result<ProgressSnapshot> {
        self.sampler.sample_now()
    }

    pub fn is_sampling(&self) -> bool {
        self.sampler.is_running()
    }

    /// Current smoothed rate in bytes per second.
    pub fn current_rate(&self) -> i64 {
        self.sampler.current_rate()
    }

    pub fn sampler(&self) -> &ProgressSampler {
        &self.sampler
    }
}

impl std::fmt::Debug for TransferJobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferJobHandle")
            .field("id", &self.id)
            .field("sampling", &self.sampler.is_running())
            .finish()
    }
}
