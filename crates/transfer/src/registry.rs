//! Job creation, lookup and enumeration.

use std::sync::Arc;

use bgxfer_protocol::{JobId, JobOwner};
use tracing::debug;

use crate::config::SamplerConfig;
use crate::error::{Result, TransferError};
use crate::job::TransferJobHandle;
use crate::manager::ServiceManager;
use crate::service::JobEnumerator;

/// Resolves jobs through the transfer service. Every handle it returns
/// shares the registry's sampler configuration.
pub struct JobRegistry {
    manager: Arc<ServiceManager>,
    config: SamplerConfig,
}

impl JobRegistry {
    pub fn new(manager: Arc<ServiceManager>, config: SamplerConfig) -> Self {
        Self { manager, config }
    }

    /// Uses the process-wide [`ServiceManager`].
    pub fn global(config: SamplerConfig) -> Result<Self> {
        Ok(Self::new(ServiceManager::global()?, config))
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Creates a new job with the given display name.
    pub fn create_job(&self, name: &str) -> Result<TransferJobHandle> {
        if name.is_empty() {
            return Err(TransferError::InvalidArgument("job name is empty".into()));
        }
        let service = self.manager.service()?;
        let (id, job) = service.create_job(name).map_err(TransferError::service)?;
        debug!(job = %id, name, "job created");
        Ok(TransferJobHandle::with_id(id, job, &self.config))
    }

    /// Lists the jobs visible in `owner` scope, lazily.
    pub fn jobs(&self, owner: JobOwner) -> Result<JobIter> {
        let service = self.manager.service()?;
        let cursor = service.enum_jobs(owner).map_err(TransferError::service)?;
        Ok(JobIter {
            cursor,
            config: self.config.clone(),
            done: false,
        })
    }

    pub fn find_by_id(&self, id: JobId) -> Result<Option<TransferJobHandle>> {
        let service = self.manager.service()?;
        let job = service.get_job(id).map_err(TransferError::service)?;
        Ok(job.map(|job| TransferJobHandle::with_id(id, job, &self.config)))
    }

    /// Returns the first job, across all users, whose display name is
    /// `name`.
    pub fn find_by_name(&self, name: &str) -> Result<Option<TransferJobHandle>> {
        for handle in self.jobs(JobOwner::AllUsers)? {
            let handle = handle?;
            if handle.display_name()? == name {
                return Ok(Some(handle));
            }
        }
        Ok(None)
    }
}

/// Lazy iterator over enumerated jobs; finite and not restartable.
pub struct JobIter {
    cursor: Box<dyn JobEnumerator>,
    config: SamplerConfig,
    done: bool,
}

impl Iterator for JobIter {
    type Item = Result<TransferJobHandle>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.cursor.next() {
            Ok(Some(job)) => Some(TransferJobHandle::new(job, &self.config)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(fault) => {
                self.done = true;
                Some(Err(TransferError::service(fault)))
            }
        }
    }
}

impl std::iter::FusedIterator for JobIter {}
