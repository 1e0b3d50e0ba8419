use std::sync::Arc;

use bgxfer_protocol::FileProgress;

use crate::error::{Result, translate};
use crate::service::{FileEnumerator, ServiceFile, ServiceJob};

/// Read-only view of one file in a job.
///
/// Failures are translated against the owning job, so they carry the
/// job's error payload.
pub struct TransferFile {
    job: Arc<dyn ServiceJob>,
    file: Arc<dyn ServiceFile>,
}

impl TransferFile {
    pub(crate) fn new(job: Arc<dyn ServiceJob>, file: Arc<dyn ServiceFile>) -> Self {
        Self { job, file }
    }

    /// Remote source URL or UNC path.
    pub fn remote_name(&self) -> Result<String> {
        self.file
            .remote_name()
            .map_err(|fault| translate(self.job.as_ref(), fault))
    }

    /// Local destination path.
    pub fn local_name(&self) -> Result<String> {
        self.file
            .local_name()
            .map_err(|fault| translate(self.job.as_ref(), fault))
    }

    pub fn progress(&self) -> Result<FileProgress> {
        self.file
            .progress()
            .map_err(|fault| translate(self.job.as_ref(), fault))
    }

    pub fn bytes_total(&self) -> Result<u64> {
        Ok(self.progress()?.bytes_total)
    }

    pub fn bytes_transferred(&self) -> Result<u64> {
        Ok(self.progress()?.bytes_transferred)
    }

    pub fn completed(&self) -> Result<bool> {
        Ok(self.progress()?.completed)
    }
}

/// Lazy iterator over a job's files.
///
/// Advances the service cursor one file per `next`. It is finite and not
/// restartable: listing again needs a fresh `files()` call. After an
/// enumeration error the error is yielded once and iteration ends.
pub struct FileIter {
    job: Arc<dyn ServiceJob>,
    cursor: Box<dyn FileEnumerator>,
    done: bool,
}

impl FileIter {
    pub(crate) fn new(job: Arc<dyn ServiceJob>, cursor: Box<dyn FileEnumerator>) -> Self {
        Self {
            job,
            cursor,
            done: false,
        }
    }
}

impl Iterator for FileIter {
    type Item = Result<TransferFile>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.cursor.next() {
            Ok(Some(file)) => Some(Ok(TransferFile::new(Arc::clone(&self.job), file))),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(fault) => {
                self.done = true;
                Some(Err(translate(self.job.as_ref(), fault)))
            }
        }
    }
}

impl std::iter::FusedIterator for FileIter {}
