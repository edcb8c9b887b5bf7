use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use thiserror::Error;

/// Why a dequeue attempt returned no unit. Emptiness is an expected terminal
/// condition during graceful drain, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DequeueError {
    /// Nothing arrived within the timeout; the queue may still be filling.
    #[error("queue empty")]
    Empty,
    /// The filler is done and all buffered units have been taken.
    #[error("queue closed and drained")]
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EnqueueError {
    #[error("queue closed")]
    Closed,
    #[error("enqueue interrupted")]
    Interrupted,
}

#[derive(Debug, Default)]
struct QueueProgress {
    enqueued: u64,
    acknowledged: u64,
}

/// Bounded, join-able FIFO distributing replay paths to workers exactly once
/// each.
///
/// The channel provides the bound and the backpressure; outstanding-unit
/// tracking is queue-internal state, never synchronized separately by
/// callers. The expected total is fixed at construction (discovery knows the
/// full sorted list up front), which keeps `join_all` from racing a slow
/// filler: it completes only once every expected unit has been acknowledged.
pub struct ReplayQueue {
    tx: Mutex<Option<Sender<PathBuf>>>,
    rx: Receiver<PathBuf>,
    expected: u64,
    progress: Mutex<QueueProgress>,
    drained: Condvar,
}

/// Poll interval for the interrupt-aware blocking operations.
const WAIT_SLICE: Duration = Duration::from_millis(100);

impl ReplayQueue {
    #[must_use]
    pub fn new(capacity: usize, expected: u64) -> Self {
        let (tx, rx) = bounded(capacity.max(1));
        Self {
            tx: Mutex::new(Some(tx)),
            rx,
            expected,
            progress: Mutex::new(QueueProgress::default()),
            drained: Condvar::new(),
        }
    }

    /// Enqueue one unit, blocking while the queue is full. The block is
    /// re-checked against the interrupt flag on a fixed interval so a filler
    /// stuck behind dead workers can still shut down.
    pub fn enqueue(&self, path: PathBuf, interrupt: &AtomicBool) -> Result<(), EnqueueError> {
        let tx = {
            let guard = self.tx.lock().expect("queue sender lock");
            guard.as_ref().ok_or(EnqueueError::Closed)?.clone()
        };

        let mut pending = path;
        loop {
            if interrupt.load(Ordering::Relaxed) {
                return Err(EnqueueError::Interrupted);
            }
            match tx.send_timeout(pending, WAIT_SLICE) {
                Ok(()) => break,
                Err(crossbeam_channel::SendTimeoutError::Timeout(p)) => pending = p,
                Err(crossbeam_channel::SendTimeoutError::Disconnected(_)) => {
                    return Err(EnqueueError::Closed)
                }
            }
        }

        let mut progress = self.progress.lock().expect("queue progress lock");
        progress.enqueued += 1;
        Ok(())
    }

    /// Close the producer side. Workers observing an empty, closed queue
    /// conclude it is permanently empty.
    pub fn close(&self) {
        let mut guard = self.tx.lock().expect("queue sender lock");
        guard.take();
    }

    /// Take one unit, waiting up to `timeout`.
    pub fn dequeue(&self, timeout: Duration) -> Result<PathBuf, DequeueError> {
        match self.rx.recv_timeout(timeout) {
            Ok(path) => Ok(path),
            Err(RecvTimeoutError::Timeout) => Err(DequeueError::Empty),
            Err(RecvTimeoutError::Disconnected) => Err(DequeueError::Closed),
        }
    }

    /// Mark one previously dequeued unit complete.
    pub fn acknowledge(&self) {
        let mut progress = self.progress.lock().expect("queue progress lock");
        progress.acknowledged += 1;
        if progress.acknowledged >= self.expected {
            self.drained.notify_all();
        }
    }

    /// Block until every expected unit has been acknowledged. Returns `false`
    /// without waiting further when the interrupt flag is raised; the caller
    /// still owes the aggregator its sentinel-and-join shutdown.
    pub fn join_all(&self, interrupt: &AtomicBool) -> bool {
        let mut progress = self.progress.lock().expect("queue progress lock");
        loop {
            if progress.acknowledged >= self.expected {
                return true;
            }
            if interrupt.load(Ordering::Relaxed) {
                return false;
            }
            let (guard, _timeout) = self
                .drained
                .wait_timeout(progress, WAIT_SLICE)
                .expect("queue progress lock");
            progress = guard;
        }
    }

    /// Units enqueued but not yet acknowledged.
    #[must_use]
    pub fn outstanding(&self) -> u64 {
        let progress = self.progress.lock().expect("queue progress lock");
        progress.enqueued.saturating_sub(progress.acknowledged)
    }

    #[must_use]
    pub fn expected(&self) -> u64 {
        self.expected
    }
}
