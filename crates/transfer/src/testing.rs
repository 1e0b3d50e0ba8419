//! In-memory transfer service used by the unit tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bgxfer_protocol::{
    FileProgress, JobError, JobId, JobOwner, JobPriority, JobProgress, JobState, JobTimes,
};
use chrono::Utc;
use uuid::Uuid;

use crate::service::{
    FileEnumerator, JobEnumerator, ServiceFault, ServiceFile, ServiceJob, ServiceResult,
    TransferService,
};

/// Generic failure status used by the fakes.
pub(crate) const E_FAIL: i32 = 0x8000_4005_u32 as i32;

pub(crate) const CURRENT_USER: &str = "HOST\\tester";

pub(crate) fn fault(message: &str) -> ServiceFault {
    ServiceFault::new(E_FAIL, message)
}

type Hook = Box<dyn Fn(&'static str) + Send + Sync>;

pub(crate) struct FakeJob {
    id: JobId,
    inner: Mutex<JobData>,
    failing: Mutex<HashSet<&'static str>>,
    calls: Mutex<Vec<&'static str>>,
    hook: Mutex<Option<Hook>>,
}

struct JobData {
    name: String,
    description: String,
    priority: JobPriority,
    retry_delay: u32,
    owner: String,
    state: JobState,
    progress: JobProgress,
    times: JobTimes,
    error: Option<JobError>,
    files: Vec<Arc<FakeFile>>,
}

impl FakeJob {
    pub(crate) fn new(name: &str) -> Arc<Self> {
        Self::owned_by(name, CURRENT_USER)
    }

    pub(crate) fn owned_by(name: &str, owner: &str) -> Arc<Self> {
        let now = Utc::now();
        Arc::new(Self {
            id: JobId::from_uuid(Uuid::new_v4()),
            inner: Mutex::new(JobData {
                name: name.into(),
                description: String::new(),
                priority: JobPriority::Normal,
                retry_delay: 600,
                owner: owner.into(),
                state: JobState::Suspended,
                progress: JobProgress::default(),
                times: JobTimes {
                    creation: now,
                    modification: now,
                    transfer_completion: None,
                },
                error: None,
                files: Vec::new(),
            }),
            failing: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            hook: Mutex::new(None),
        })
    }

    pub(crate) fn job_id(&self) -> JobId {
        self.id
    }

    pub(crate) fn set_state(&self, state: JobState) {
        self.inner.lock().unwrap().state = state;
    }

    pub(crate) fn current_state(&self) -> JobState {
        self.inner.lock().unwrap().state
    }

    pub(crate) fn set_bytes(&self, total: u64, transferred: u64) {
        let mut d = self.inner.lock().unwrap();
        d.progress.bytes_total = total;
        d.progress.bytes_transferred = transferred;
    }

    pub(crate) fn set_error(&self, error: JobError) {
        self.inner.lock().unwrap().error = Some(error);
    }

    pub(crate) fn fail_on(&self, op: &'static str) {
        self.failing.lock().unwrap().insert(op);
    }

    pub(crate) fn clear_failures(&self) {
        self.failing.lock().unwrap().clear();
    }

    /// Control calls (suspend, resume, cancel, complete, add_file) in the
    /// order they were received.
    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    /// Installs a hook run at the start of every call, before any
    /// configured failure.
    pub(crate) fn set_hook<F>(&self, hook: F)
    where
        F: Fn(&'static str) + Send + Sync + 'static,
    {
        *self.hook.lock().unwrap() = Some(Box::new(hook));
    }

    pub(crate) fn file_names(&self) -> Vec<(String, String)> {
        self.inner
            .lock()
            .unwrap()
            .files
            .iter()
            .map(|f| (f.remote.clone(), f.local.clone()))
            .collect()
    }

    fn enter(&self, op: &'static str) -> ServiceResult<()> {
        if let Some(hook) = self.hook.lock().unwrap().as_ref() {
            hook(op);
        }
        if matches!(op, "suspend" | "resume" | "cancel" | "complete" | "add_file") {
            self.calls.lock().unwrap().push(op);
        }
        if self.failing.lock().unwrap().contains(op) {
            return Err(fault(&format!("{op} failed")));
        }
        Ok(())
    }

    fn transition(&self, op: &'static str, to: JobState) -> ServiceResult<()> {
        self.enter(op)?;
        let mut d = self.inner.lock().unwrap();
        if d.state.is_final() {
            return Err(fault("job is already final"));
        }
        d.state = to;
        d.times.modification = Utc::now();
        Ok(())
    }
}

impl ServiceJob for FakeJob {
    fn id(&self) -> ServiceResult<JobId> {
        self.enter("id")?;
        Ok(self.id)
    }

    fn display_name(&self) -> ServiceResult<String> {
        self.enter("display_name")?;
        Ok(self.inner.lock().unwrap().name.clone())
    }

    fn set_display_name(&self, name: &str) -> ServiceResult<()> {
        self.enter("set_display_name")?;
        self.inner.lock().unwrap().name = name.into();
        Ok(())
    }

    fn description(&self) -> ServiceResult<String> {
        self.enter("description")?;
        Ok(self.inner.lock().unwrap().description.clone())
    }

    fn set_description(&self, description: &str) -> ServiceResult<()> {
        self.enter("set_description")?;
        self.inner.lock().unwrap().description = description.into();
        Ok(())
    }

    fn priority(&self) -> ServiceResult<JobPriority> {
        self.enter("priority")?;
        Ok(self.inner.lock().unwrap().priority)
    }

    fn set_priority(&self, priority: JobPriority) -> ServiceResult<()> {
        self.enter("set_priority")?;
        self.inner.lock().unwrap().priority = priority;
        Ok(())
    }

    fn minimum_retry_delay(&self) -> ServiceResult<u32> {
        self.enter("minimum_retry_delay")?;
        Ok(self.inner.lock().unwrap().retry_delay)
    }

    fn set_minimum_retry_delay(&self, seconds: u32) -> ServiceResult<()> {
        self.enter("set_minimum_retry_delay")?;
        self.inner.lock().unwrap().retry_delay = seconds;
        Ok(())
    }

    fn owner(&self) -> ServiceResult<String> {
        self.enter("owner")?;
        Ok(self.inner.lock().unwrap().owner.clone())
    }

    fn state(&self) -> ServiceResult<JobState> {
        self.enter("state")?;
        Ok(self.inner.lock().unwrap().state)
    }

    fn progress(&self) -> ServiceResult<JobProgress> {
        self.enter("progress")?;
        Ok(self.inner.lock().unwrap().progress)
    }

    fn times(&self) -> ServiceResult<JobTimes> {
        self.enter("times")?;
        Ok(self.inner.lock().unwrap().times)
    }

    fn error(&self) -> ServiceResult<Option<JobError>> {
        self.enter("error")?;
        Ok(self.inner.lock().unwrap().error.clone())
    }

    fn suspend(&self) -> ServiceResult<()> {
        self.transition("suspend", JobState::Suspended)
    }

    fn resume(&self) -> ServiceResult<()> {
        self.transition("resume", JobState::Transferring)
    }

    fn cancel(&self) -> ServiceResult<()> {
        self.transition("cancel", JobState::Cancelled)
    }

    fn complete(&self) -> ServiceResult<()> {
        self.transition("complete", JobState::Acknowledged)
    }

    fn add_file(&self, remote: &str, local: &str) -> ServiceResult<()> {
        self.enter("add_file")?;
        let mut d = self.inner.lock().unwrap();
        d.files.push(Arc::new(FakeFile::new(remote, local)));
        d.progress.files_total += 1;
        Ok(())
    }

    fn enum_files(&self) -> ServiceResult<Box<dyn FileEnumerator>> {
        self.enter("enum_files")?;
        let files = self.inner.lock().unwrap().files.clone();
        Ok(Box::new(FakeCursor {
            items: files.into_iter().map(|f| f as Arc<dyn ServiceFile>).collect(),
            pos: 0,
            fail_at: None,
        }))
    }
}

pub(crate) struct FakeFile {
    remote: String,
    local: String,
    progress: Mutex<FileProgress>,
}

impl FakeFile {
    pub(crate) fn new(remote: &str, local: &str) -> Self {
        Self {
            remote: remote.into(),
            local: local.into(),
            progress: Mutex::new(FileProgress::default()),
        }
    }

    pub(crate) fn set_progress(&self, progress: FileProgress) {
        *self.progress.lock().unwrap() = progress;
    }
}

impl ServiceFile for FakeFile {
    fn remote_name(&self) -> ServiceResult<String> {
        Ok(self.remote.clone())
    }

    fn local_name(&self) -> ServiceResult<String> {
        Ok(self.local.clone())
    }

    fn progress(&self) -> ServiceResult<FileProgress> {
        Ok(*self.progress.lock().unwrap())
    }
}

/// Cursor over a fixed list, optionally failing at a given position.
pub(crate) struct FakeCursor<T: ?Sized> {
    pub(crate) items: Vec<Arc<T>>,
    pub(crate) pos: usize,
    pub(crate) fail_at: Option<usize>,
}

impl<T: ?Sized> FakeCursor<T> {
    fn advance(&mut self) -> ServiceResult<Option<Arc<T>>> {
        if self.fail_at == Some(self.pos) {
            self.pos += 1;
            return Err(fault("enumeration failed"));
        }
        let item = self.items.get(self.pos).cloned();
        if item.is_some() {
            self.pos += 1;
        }
        Ok(item)
    }
}

impl FileEnumerator for FakeCursor<dyn ServiceFile> {
    fn count(&self) -> ServiceResult<u32> {
        Ok(self.items.len() as u32)
    }

    fn next(&mut self) -> ServiceResult<Option<Arc<dyn ServiceFile>>> {
        self.advance()
    }
}

impl JobEnumerator for FakeCursor<dyn ServiceJob> {
    fn count(&self) -> ServiceResult<u32> {
        Ok(self.items.len() as u32)
    }

    fn next(&mut self) -> ServiceResult<Option<Arc<dyn ServiceJob>>> {
        self.advance()
    }
}

#[derive(Default)]
pub(crate) struct FakeService {
    jobs: Mutex<Vec<Arc<FakeJob>>>,
    dead: AtomicBool,
    fail_create: AtomicBool,
    fail_enum_at: Mutex<Option<usize>>,
}

impl FakeService {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn insert(&self, job: Arc<FakeJob>) {
        self.jobs.lock().unwrap().push(job);
    }

    pub(crate) fn job(&self, index: usize) -> Arc<FakeJob> {
        Arc::clone(&self.jobs.lock().unwrap()[index])
    }

    pub(crate) fn kill(&self) {
        self.dead.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_create(&self) {
        self.fail_create.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_enum_at(&self, pos: usize) {
        *self.fail_enum_at.lock().unwrap() = Some(pos);
    }
}

impl TransferService for FakeService {
    fn create_job(&self, name: &str) -> ServiceResult<(JobId, Arc<dyn ServiceJob>)> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(fault("create failed"));
        }
        let job = FakeJob::new(name);
        self.insert(Arc::clone(&job));
        Ok((job.job_id(), job))
    }

    fn enum_jobs(&self, owner: JobOwner) -> ServiceResult<Box<dyn JobEnumerator>> {
        let items: Vec<Arc<dyn ServiceJob>> = self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .filter(|job| {
                owner == JobOwner::AllUsers || job.inner.lock().unwrap().owner == CURRENT_USER
            })
            .map(|job| Arc::clone(job) as Arc<dyn ServiceJob>)
            .collect();
        Ok(Box::new(FakeCursor {
            items,
            pos: 0,
            fail_at: *self.fail_enum_at.lock().unwrap(),
        }))
    }

    fn is_alive(&self) -> bool {
        !self.dead.load(Ordering::SeqCst)
    }
}
