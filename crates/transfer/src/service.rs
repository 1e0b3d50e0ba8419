//! Capability set consumed from the OS transfer service.
//!
//! The service owns every job and file; these traits are the only way the
//! rest of the crate talks to it. All calls are synchronous round-trips.

use std::sync::Arc;

use bgxfer_protocol::{
    FileProgress, JobError, JobId, JobOwner, JobPriority, JobProgress, JobState, JobTimes,
};

/// Native failure returned by the transfer service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("transfer service call failed ({code:#010x}): {message}")]
pub struct ServiceFault {
    /// Service status code (HRESULT-style).
    pub code: i32,
    pub message: String,
}

impl ServiceFault {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceFault>;

/// Entry point of the transfer service.
pub trait TransferService: Send + Sync {
    /// Creates a new download job with the given display name.
    fn create_job(&self, name: &str) -> ServiceResult<(JobId, Arc<dyn ServiceJob>)>;

    /// Enumerates the jobs visible in `owner` scope.
    fn enum_jobs(&self, owner: JobOwner) -> ServiceResult<Box<dyn JobEnumerator>>;

    /// Looks up a job by id across all users.
    fn get_job(&self, id: JobId) -> ServiceResult<Option<Arc<dyn ServiceJob>>> {
        let mut jobs = self.enum_jobs(JobOwner::AllUsers)?;
        while let Some(job) = jobs.next()? {
            if job.id()? == id {
                return Ok(Some(job));
            }
        }
        Ok(None)
    }

    /// Cheap liveness probe used to decide whether a cached handle can
    /// still be used.
    fn is_alive(&self) -> bool {
        true
    }
}

/// One job owned by the transfer service.
pub trait ServiceJob: Send + Sync {
    fn id(&self) -> ServiceResult<JobId>;

    fn display_name(&self) -> ServiceResult<String>;
    fn set_display_name(&self, name: &str) -> ServiceResult<()>;

    fn description(&self) -> ServiceResult<String>;
    fn set_description(&self, description: &str) -> ServiceResult<()>;

    fn priority(&self) -> ServiceResult<JobPriority>;
    fn set_priority(&self, priority: JobPriority) -> ServiceResult<()>;

    /// Minimum retry delay in seconds.
    fn minimum_retry_delay(&self) -> ServiceResult<u32>;
    fn set_minimum_retry_delay(&self, seconds: u32) -> ServiceResult<()>;

    fn owner(&self) -> ServiceResult<String>;

    fn state(&self) -> ServiceResult<JobState>;
    fn progress(&self) -> ServiceResult<JobProgress>;
    fn times(&self) -> ServiceResult<JobTimes>;

    /// Current error payload. `None` when the service has no error object
    /// for the job.
    fn error(&self) -> ServiceResult<Option<JobError>>;

    fn suspend(&self) -> ServiceResult<()>;
    fn resume(&self) -> ServiceResult<()>;
    fn cancel(&self) -> ServiceResult<()>;
    fn complete(&self) -> ServiceResult<()>;

    fn add_file(&self, remote: &str, local: &str) -> ServiceResult<()>;
    fn enum_files(&self) -> ServiceResult<Box<dyn FileEnumerator>>;
}

/// One file of a job.
pub trait ServiceFile: Send + Sync {
    fn remote_name(&self) -> ServiceResult<String>;
    fn local_name(&self) -> ServiceResult<String>;
    fn progress(&self) -> ServiceResult<FileProgress>;
}

/// Service-side job cursor. Advances one job per call; `Ok(None)` once
/// exhausted.
pub trait JobEnumerator: Send {
    fn count(&self) -> ServiceResult<u32>;
    fn next(&mut self) -> ServiceResult<Option<Arc<dyn ServiceJob>>>;
}

/// Service-side file cursor. Advances one file per call; `Ok(None)` once
/// exhausted.
pub trait FileEnumerator: Send {
    fn count(&self) -> ServiceResult<u32>;
    fn next(&mut self) -> ServiceResult<Option<Arc<dyn ServiceFile>>>;
}
