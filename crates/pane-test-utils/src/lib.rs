//! Test doubles for Pane development.
//!
//! Provides a call-counting pool [`Factory`], an in-memory host
//! clipboard, a recording [`Broadcaster`], and pool consistency checks.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::convert::Infallible;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use pane_core::{ClientId, Message, ServerEvent};
use pane_pool::{Factory, Pool};
use pane_proto::{Broadcaster, ClipboardContents, ClipboardInterface};

/// Factory for `Vec<u8>` buffers that counts its calls.
///
/// Every buffer is `order` bytes long. Clones share the counter, so a
/// test can keep one clone and hand the other to the pool.
#[derive(Clone, Debug, Default)]
pub struct CountingFactory {
    calls: Arc<AtomicU64>,
}

impl CountingFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of buffers built so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Factory<Vec<u8>> for CountingFactory {
    type Error = Infallible;

    fn make(&self, order: usize) -> Result<Vec<u8>, Infallible> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![0; order])
    }
}

/// Panic with the pool's own diagnosis if its free list is inconsistent.
pub fn assert_pool_consistent<T: Send + Sync + 'static, F>(pool: &Pool<T, F>) {
    if let Err(reason) = pool.check_invariants() {
        panic!("pool '{}' is inconsistent: {reason}", pool.name());
    }
}

/// In-memory host clipboard.
///
/// Clones share state, so a test can keep one clone after moving the
/// other into a [`Clipboard`](pane_proto::Clipboard).
#[derive(Clone, Debug, Default)]
pub struct MemoryClipboard {
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    current: ClipboardContents,
    sets: usize,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current contents.
    pub fn contents(&self) -> ClipboardContents {
        self.lock().current.clone()
    }

    /// Number of times the contents were replaced.
    pub fn set_count(&self) -> usize {
        self.lock().sets
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl ClipboardInterface for MemoryClipboard {
    fn set(&mut self, contents: &ClipboardContents) {
        let mut state = self.lock();
        state.current = contents.clone();
        state.sets += 1;
    }

    fn get(&self) -> ClipboardContents {
        self.contents()
    }
}

/// [`Broadcaster`] that records every broadcast.
#[derive(Debug, Default)]
pub struct RecordingBroadcaster {
    sent: Mutex<Vec<(ClientId, Message<ServerEvent>)>>,
}

impl RecordingBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `(excluded client, message)` pair broadcast so far.
    pub fn sent(&self) -> Vec<(ClientId, Message<ServerEvent>)> {
        self.sent.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl Broadcaster for RecordingBroadcaster {
    fn send_to_all_except(&self, except: ClientId, message: Message<ServerEvent>) {
        self.sent
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push((except, message));
    }
}
