use std::cell::RefCell;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bgxfer_protocol::{JobId, JobState, ProgressSnapshot, UNKNOWN_ETA};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::config::SamplerConfig;
use crate::error::{Result, TransferError, translate};
use crate::rate::RateEstimator;
use crate::service::{ServiceJob, ServiceResult};
use crate::subscribers::{Subscribers, SubscriptionId};

/// Periodically polls a job's counters and publishes progress snapshots.
///
/// Ticks run on Tokio's blocking pool, scheduled by a background task, so
/// service round-trips and subscriber callbacks never occupy a runtime
/// worker. At most one tick is in flight at any time, including across
/// `stop`/`start` cycles.
pub struct ProgressSampler {
    shared: Arc<Shared>,
    task: Mutex<TaskSlot>,
}

#[derive(Default)]
struct TaskSlot {
    cancel: Option<CancellationToken>,
    disposed: bool,
}

struct Shared {
    job: Arc<dyn ServiceJob>,
    job_id: JobId,
    interval: Duration,
    estimator: RateEstimator,
    last_transferred: AtomicI64,
    subscribers: Subscribers,
    tick_lock: Mutex<()>,
}

impl ProgressSampler {
    pub fn new(job: Arc<dyn ServiceJob>, job_id: JobId, config: &SamplerConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                job,
                job_id,
                interval: config.interval(),
                estimator: RateEstimator::new(config.capacity()),
                last_transferred: AtomicI64::new(0),
                subscribers: Subscribers::default(),
                tick_lock: Mutex::new(()),
            }),
            task: Mutex::new(TaskSlot::default()),
        }
    }

    /// Registers a progress callback.
    ///
    /// Callbacks run synchronously on the sampler task; a slow callback
    /// delays the next tick.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ProgressSnapshot) + Send + Sync + 'static,
    {
        self.shared.subscribers.subscribe(Arc::new(callback))
    }

    /// Removes a callback. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.subscribers.unsubscribe(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers.len()
    }

    /// Clears the rate history and starts ticking, first tick immediately.
    ///
    /// Restarts an already running sampler. Must be called from within a
    /// Tokio runtime.
    pub fn start(&self) -> Result<()> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| TransferError::NoRuntime)?;

        let mut slot = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.disposed {
            return Err(TransferError::SamplerDisposed);
        }
        if let Some(previous) = slot.cancel.take() {
            previous.cancel();
        }

        self.shared.estimator.clear();
        self.shared.last_transferred.store(0, Ordering::Release);

        let cancel = CancellationToken::new();
        slot.cancel = Some(cancel.clone());
        runtime.spawn(sample_loop(Arc::clone(&self.shared), cancel));

        debug!(
            job = %self.shared.job_id,
            interval = ?self.shared.interval,
            "progress sampler started"
        );
        Ok(())
    }

    /// Stops scheduling ticks. A tick already running completes normally.
    pub fn stop(&self) {
        let mut slot = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cancel) = slot.cancel.take() {
            cancel.cancel();
            debug!(job = %self.shared.job_id, "progress sampler stopped");
        }
    }

    /// Stops the sampler for good; later calls to `start` fail.
    pub fn dispose(&self) {
        let mut slot = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cancel) = slot.cancel.take() {
            cancel.cancel();
        }
        slot.disposed = true;
    }

    pub fn is_running(&self) -> bool {
        let slot = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        slot.cancel.as_ref().is_some_and(|c| !c.is_cancelled())
    }

    pub fn is_disposed(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .disposed
    }

    /// Current smoothed rate in bytes per second.
    pub fn current_rate(&self) -> i64 {
        self.shared.estimator.average_rate()
    }

    /// Runs one tick on the caller's thread and publishes the snapshot.
    ///
    /// Fails with [`TransferError::ReentrantRefresh`] when called from one
    /// of this sampler's own callbacks.
    pub fn sample_now(&self) -> Result<ProgressSnapshot> {
        let Some(_publishing) = PublishGuard::enter(&self.shared) else {
            return Err(TransferError::ReentrantRefresh);
        };
        let _tick = self
            .shared
            .tick_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let snapshot = self
            .shared
            .observe()
            .map_err(|fault| translate(self.shared.job.as_ref(), fault))?;
        self.shared.subscribers.publish(&snapshot);
        Ok(snapshot)
    }
}

impl Drop for ProgressSampler {
    fn drop(&mut self) {
        self.dispose();
    }
}

async fn sample_loop(shared: Arc<Shared>, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(shared.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let (worker, token) = (Arc::clone(&shared), cancel.clone());
                let tick = tokio::task::spawn_blocking(move || worker.tick(&token));
                if let Err(e) = tick.await {
                    warn!(job = %shared.job_id, error = %e, "progress tick panicked");
                }
            }
        }
    }
    trace!(job = %shared.job_id, "progress sampler task exited");
}

impl Shared {
    fn tick(&self, cancel: &CancellationToken) {
        let _publishing = PublishGuard::enter(self);
        let _tick = self.tick_lock.lock().unwrap_or_else(PoisonError::into_inner);
        // A stop/start may have raced with this tick's wakeup.
        if cancel.is_cancelled() {
            return;
        }
        match self.observe() {
            Ok(snapshot) => {
                trace!(
                    job = %self.job_id,
                    transferred = snapshot.bytes_transferred,
                    rate = snapshot.estimated_bytes_per_second,
                    "progress tick"
                );
                self.subscribers.publish(&snapshot);
            }
            Err(e) => warn!(job = %self.job_id, error = %e, "progress tick skipped"),
        }
    }

    /// Reads state and counters and derives one snapshot.
    fn observe(&self) -> ServiceResult<ProgressSnapshot> {
        let state = self.job.state()?;
        if state != JobState::Transferring && state != JobState::Transferred {
            self.estimator.clear();
        }

        let progress = self.job.progress()?;
        let total = clamp_i64(progress.bytes_total);
        let transferred = clamp_i64(progress.bytes_transferred);
        let remaining = total - transferred;

        if state == JobState::Transferred {
            return Ok(ProgressSnapshot {
                job_id: self.job_id,
                bytes_total: total,
                bytes_transferred: transferred,
                bytes_remaining: remaining,
                estimated_bytes_per_second: 0,
                estimated_seconds_remaining: UNKNOWN_ETA,
                completion_fraction: 1.0,
            });
        }

        let last = self.last_transferred.swap(transferred, Ordering::AcqRel);
        self.estimator.record_delta(transferred - last);

        let rate = self.estimator.average_rate();
        let eta = if remaining <= 0 || rate == 0 {
            UNKNOWN_ETA
        } else {
            remaining / rate
        };
        let fraction = if total > 0 {
            (transferred as f64 / total as f64).min(1.0)
        } else {
            0.0
        };

        Ok(ProgressSnapshot {
            job_id: self.job_id,
            bytes_total: total,
            bytes_transferred: transferred,
            bytes_remaining: remaining,
            estimated_bytes_per_second: rate,
            estimated_seconds_remaining: eta,
            completion_fraction: fraction,
        })
    }
}

thread_local! {
    /// Samplers currently publishing on this thread.
    static PUBLISHING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Marks a sampler as publishing on the current thread so a callback that
/// asks the same sampler for a refresh is refused instead of re-locking
/// `tick_lock`.
struct PublishGuard(usize);

impl PublishGuard {
    fn enter(shared: &Shared) -> Option<Self> {
        let key = shared as *const Shared as usize;
        PUBLISHING.with_borrow_mut(|active| {
            if active.contains(&key) {
                None
            } else {
                active.push(key);
                Some(Self(key))
            }
        })
    }
}

impl Drop for PublishGuard {
    fn drop(&mut self) {
        PUBLISHING.with_borrow_mut(|active| active.retain(|key| *key != self.0));
    }
}

fn clamp_i64(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}
