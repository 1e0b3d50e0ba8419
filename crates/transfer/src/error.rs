//! Transfer error types and service-failure translation.

use bgxfer_protocol::JobError;
use tracing::warn;

use crate::service::{ServiceFault, ServiceJob};

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// A call into the transfer service failed. `job_error` carries the
    /// job's error payload when the job was in an error state, and is
    /// empty otherwise.
    #[error("{fault} [{job_error}]")]
    ServiceCall {
        #[source]
        fault: ServiceFault,
        job_error: JobError,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("progress sampler has been disposed")]
    SamplerDisposed,

    #[error("progress refresh requested from one of the job's own progress callbacks")]
    ReentrantRefresh,

    #[error("no Tokio runtime available to run the progress sampler")]
    NoRuntime,

    #[error("no transfer service connector installed")]
    NoService,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransferError {
    /// Wraps a failure that happened outside any job context.
    pub fn service(fault: ServiceFault) -> Self {
        Self::ServiceCall {
            fault,
            job_error: JobError::default(),
        }
    }

    /// Returns the job error payload for service-call failures.
    pub fn job_error(&self) -> Option<&JobError> {
        match self {
            Self::ServiceCall { job_error, .. } => Some(job_error),
            _ => None,
        }
    }
}

pub type Result<T, E = TransferError> = std::result::Result<T, E>;

/// Converts a failed call on `job` into a [`TransferError`], enriched with
/// the job's current error payload.
pub(crate) fn translate(job: &dyn ServiceJob, fault: ServiceFault) -> TransferError {
    TransferError::ServiceCall {
        job_error: read_job_error(job),
        fault,
    }
}

/// Reads the job's error payload if the job is in an error state.
///
/// Failures here are diagnostic only: they are logged and yield an empty
/// payload.
fn read_job_error(job: &dyn ServiceJob) -> JobError {
    let state = match job.state() {
        Ok(state) => state,
        Err(e) => {
            warn!(error = %e, "failed to read job state for error diagnostics");
            return JobError::default();
        }
    };
    if !state.is_error() {
        return JobError::default();
    }

    match job.error() {
        Ok(Some(err)) => err,
        Ok(None) => JobError::default(),
        Err(e) => {
            warn!(error = %e, %state, "failed to read job error payload");
            JobError::default()
        }
    }
}
