//! Background reconciliation of reclaimed payloads.
//!
//! When a pooled payload is reclaimed under memory pressure, its entry
//! stays in the owning pool's free list until the reaper removes it. The
//! pool posts a notice on the reaper's channel; the reaper thread takes
//! the pool's lock and excises the entry.
//!
//! ```text
//! Pool (any thread)                      Reaper thread
//!     |                                        |
//!     | reclaim payload (pool lock held)       |
//!     |--Notice::Reclaimed(entry)------------->| rx.recv()
//!     |   [unbounded crossbeam channel]        | lock entry's pool
//!     |                                        | excise, then try_recv()
//!     |                                        |   while same pool
//!     |                                        | unlock
//! ```
//!
//! Consecutive notices for the same pool are handled under a single
//! acquisition of that pool's lock. A notice for a different pool ends
//! the batch and starts the next one.
//!
//! One reaper serves the whole process ([`Reaper::global`]); tests can
//! spawn private ones and shut them down deterministically.

use std::any::Any;
use std::error::Error;
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use pane_core::PoolId;

use crate::lock::recover;

/// Name of the reaper thread.
pub const REAPER_THREAD_NAME: &str = "pane-pool-reaper";

/// An entry whose payload has been reclaimed.
pub(crate) trait Reclaimed: Send + Sync {
    /// Id of the pool that owns the entry.
    fn pool_id(&self) -> PoolId;

    /// The owning pool, if it is still alive.
    fn pool(&self) -> Option<Arc<dyn Reap>>;

    /// Type-erased self, for the owning pool to downcast.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// A pool the reaper can reconcile.
pub(crate) trait Reap: Send + Sync {
    /// Excise `first` and every following same-pool notice under one lock.
    ///
    /// `next` polls the channel without blocking. Returns the first notice
    /// that does not belong to this pool, if any, so the reaper handles
    /// it next.
    fn reap_batch(
        &self,
        first: Arc<dyn Reclaimed>,
        next: &mut dyn FnMut() -> Option<Notice>,
        report: &mut ReaperReport,
    ) -> Option<Notice>;
}

/// A message on the reaper channel.
pub(crate) enum Notice {
    /// An entry's payload was reclaimed.
    Reclaimed(Arc<dyn Reclaimed>),
    /// Acknowledge once everything queued before this has been handled.
    Barrier(Sender<()>),
    /// Finish everything queued before this, then exit.
    Stop,
}

/// Errors from reaper lifecycle operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReaperError {
    /// The reaper thread could not be started.
    Spawn(String),
    /// The reaper has been shut down.
    Stopped,
    /// The reaper thread panicked.
    Panicked,
}

impl fmt::Display for ReaperError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn(reason) => write!(f, "failed to start reaper thread: {reason}"),
            Self::Stopped => write!(f, "reaper has been shut down"),
            Self::Panicked => write!(f, "reaper thread panicked"),
        }
    }
}

impl Error for ReaperError {}

/// Work done by a reaper over its lifetime.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReaperReport {
    /// Reclamation notices received.
    pub notices: u64,
    /// Entries removed from a free list.
    pub excised: u64,
    /// Pool-lock acquisitions (one per same-pool run of notices).
    pub batches: u64,
}

/// Sending side of a reaper; what pools hold.
///
/// Sends happen under the read side of `stopped`; the reaper flips it and
/// queues its stop marker under the write side. A notice that was
/// accepted is therefore always queued ahead of the stop marker.
#[derive(Clone, Debug)]
pub struct ReaperHandle {
    tx: Sender<Notice>,
    stopped: Arc<RwLock<bool>>,
}

impl ReaperHandle {
    /// A handle whose reaper is already gone. Every post fails with
    /// [`ReaperError::Stopped`]; stale entries are then only cleaned up
    /// when `acquire` runs into them.
    fn disconnected() -> Self {
        let (tx, _) = crossbeam_channel::unbounded();
        Self {
            tx,
            stopped: Arc::new(RwLock::new(true)),
        }
    }

    /// A live handle with nobody draining it; notices pile up in the
    /// returned receiver.
    #[cfg(test)]
    pub(crate) fn unattended() -> (Self, Receiver<Notice>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let handle = Self {
            tx,
            stopped: Arc::new(RwLock::new(false)),
        };
        (handle, rx)
    }

    pub(crate) fn post(&self, entry: Arc<dyn Reclaimed>) -> Result<(), ReaperError> {
        self.send(Notice::Reclaimed(entry))
    }

    /// Block until every notice posted before this call has been handled.
    pub fn sync(&self) -> Result<(), ReaperError> {
        let (ack_tx, ack_rx) = crossbeam_channel::bounded(1);
        self.send(Notice::Barrier(ack_tx))?;
        ack_rx.recv().map_err(|_| ReaperError::Stopped)
    }

    /// Whether the reaper behind this handle has been shut down.
    pub fn is_stopped(&self) -> bool {
        *recover(self.stopped.read(), "reaper state")
    }

    fn send(&self, notice: Notice) -> Result<(), ReaperError> {
        let stopped = recover(self.stopped.read(), "reaper state");
        if *stopped {
            return Err(ReaperError::Stopped);
        }
        self.tx.send(notice).map_err(|_| ReaperError::Stopped)
    }
}

/// The reaper thread and its handle.
pub struct Reaper {
    handle: ReaperHandle,
    thread: Option<JoinHandle<ReaperReport>>,
}

impl Reaper {
    /// Start a private reaper on a new thread.
    pub fn spawn() -> Result<Self, ReaperError> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let thread = thread::Builder::new()
            .name(REAPER_THREAD_NAME.to_string())
            .spawn(move || run(rx))
            .map_err(|e| ReaperError::Spawn(e.to_string()))?;
        log::debug!("buffer pool reaper started");
        Ok(Self {
            handle: ReaperHandle {
                tx,
                stopped: Arc::new(RwLock::new(false)),
            },
            thread: Some(thread),
        })
    }

    /// Handle to the process-wide reaper, starting it on first use.
    ///
    /// The global reaper runs until the process exits. If its thread
    /// cannot be started, the error is logged and a disconnected handle
    /// is returned instead.
    pub fn global() -> ReaperHandle {
        static GLOBAL: OnceLock<ReaperHandle> = OnceLock::new();
        GLOBAL
            .get_or_init(|| match Reaper::spawn() {
                Ok(reaper) => reaper.detach(),
                Err(err) => {
                    log::error!("{err}; reclaimed entries will be dropped lazily");
                    ReaperHandle::disconnected()
                }
            })
            .clone()
    }

    /// A new handle to this reaper.
    pub fn handle(&self) -> ReaperHandle {
        self.handle.clone()
    }

    /// Handle everything queued so far, stop the thread, and join it.
    pub fn shutdown(mut self) -> Result<ReaperReport, ReaperError> {
        self.stop()
    }

    /// Let the thread run for the rest of the process.
    fn detach(mut self) -> ReaperHandle {
        self.thread = None;
        self.handle.clone()
    }

    fn stop(&mut self) -> Result<ReaperReport, ReaperError> {
        let thread = self.thread.take().ok_or(ReaperError::Stopped)?;
        {
            let mut stopped = recover(self.handle.stopped.write(), "reaper state");
            *stopped = true;
            // The receiver outlives this send: it is only dropped when `run` returns.
            let _ = self.handle.tx.send(Notice::Stop);
        }
        let report = thread.join().map_err(|_| ReaperError::Panicked)?;
        log::debug!(
            "buffer pool reaper stopped: {} notices, {} excised, {} batches",
            report.notices,
            report.excised,
            report.batches
        );
        Ok(report)
    }
}

impl Drop for Reaper {
    fn drop(&mut self) {
        if self.thread.is_some() {
            let _ = self.stop();
        }
    }
}

impl fmt::Debug for Reaper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reaper")
            .field("running", &self.thread.is_some())
            .finish()
    }
}

/// Reaper thread body. Returns when a stop marker arrives or every
/// sender is gone.
fn run(rx: Receiver<Notice>) -> ReaperReport {
    let mut report = ReaperReport::default();
    let mut pending: Option<Notice> = None;

    loop {
        let notice = match pending.take() {
            Some(notice) => notice,
            None => match rx.recv() {
                Ok(notice) => notice,
                Err(_) => break,
            },
        };

        match notice {
            Notice::Stop => break,
            Notice::Barrier(ack) => {
                // Best-effort: the waiter may have given up.
                let _ = ack.send(());
            }
            Notice::Reclaimed(entry) => {
                report.notices += 1;
                // A dropped pool has no free list left to reconcile.
                let Some(pool) = entry.pool() else {
                    continue;
                };
                report.batches += 1;
                let before = report.excised;
                pending = pool.reap_batch(entry, &mut || rx.try_recv().ok(), &mut report);
                log::trace!(
                    "reaper batch excised {} entries",
                    report.excised - before
                );
            }
        }
    }

    report
}
