use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// Smooths per-tick byte deltas into a transfer rate using a bounded
/// FIFO window of recent samples.
pub struct RateEstimator {
    inner: Mutex<RateWindow>,
}

struct RateWindow {
    deltas: VecDeque<i64>,
    capacity: usize,
}

impl RateEstimator {
    /// Creates an estimator keeping at most `capacity` deltas (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(RateWindow {
                deltas: VecDeque::with_capacity(capacity + 1),
                capacity,
            }),
        }
    }

    /// Records the bytes transferred since the previous tick.
    ///
    /// Zero and negative deltas (counter resets) are ignored.
    pub fn record_delta(&self, bytes: i64) {
        if bytes <= 0 {
            return;
        }
        let mut w = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        w.deltas.push_back(bytes);
        while w.deltas.len() > w.capacity {
            w.deltas.pop_front();
        }
    }

    /// Returns the truncated mean of the window in bytes per tick, or 0
    /// when the window is empty.
    pub fn average_rate(&self) -> i64 {
        let w = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if w.deltas.is_empty() {
            return 0;
        }
        let sum: i128 = w.deltas.iter().map(|&d| i128::from(d)).sum();
        (sum / w.deltas.len() as i128) as i64
    }

    /// Drops all recorded deltas.
    pub fn clear(&self) {
        let mut w = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        w.deltas.clear();
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .deltas
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .capacity
    }
}
