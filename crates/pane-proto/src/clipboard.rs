//! Clipboard contents, the host clipboard seam, and change monitoring.
//!
//! A clipboard update carries one or more `(flavor, data)` pairs, e.g.
//! `("text/plain", b"hello")`. On the wire they arrive as a flat,
//! even-length argument list: `[flavor0, data0, flavor1, data1, ...]`.
//!
//! The host clipboard sits behind [`ClipboardInterface`]. [`Clipboard`]
//! wraps it with a FIFO lock and a [`ClipboardMonitor`]. The monitor
//! reports local changes to peers, and is suspended while a remote
//! update is being applied so that update is not echoed back.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use pane_core::{Arg, HandleError};
use pane_pool::{FairGuard, FairLock};
use smallvec::SmallVec;

/// One clipboard representation: a flavor (MIME-like type) and its bytes.
pub type ClipboardItem = (String, Vec<u8>);

/// The representations of one clipboard value. Usually one or two.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClipboardContents {
    items: SmallVec<[ClipboardItem; 2]>,
}

impl ClipboardContents {
    /// Empty contents.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a representation.
    pub fn push(&mut self, flavor: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.items.push((flavor.into(), data.into()));
    }

    /// Builder-style [`push`](Self::push).
    pub fn with(mut self, flavor: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.push(flavor, data);
        self
    }

    /// Decode the flat `[flavor, data, ...]` argument list of `event`.
    ///
    /// The list must be non-empty and of even length, with text flavors
    /// at even positions and byte payloads at odd positions.
    pub fn from_args(event: &'static str, args: &[Arg]) -> Result<Self, HandleError> {
        if args.is_empty() {
            return Err(HandleError::bad_args(event, "no clipboard data"));
        }
        if args.len() % 2 != 0 {
            return Err(HandleError::bad_args(
                event,
                format!("odd argument count {}", args.len()),
            ));
        }
        let mut contents = Self::new();
        for (pair, chunk) in args.chunks_exact(2).enumerate() {
            match chunk {
                [Arg::Text(flavor), Arg::Bytes(data)] => contents.push(flavor.clone(), data.clone()),
                _ => {
                    return Err(HandleError::bad_args(
                        event,
                        format!("pair {pair} is not (text flavor, bytes)"),
                    ))
                }
            }
        }
        Ok(contents)
    }

    /// Encode as the flat argument list [`from_args`](Self::from_args) reads.
    pub fn to_args(&self) -> Vec<Arg> {
        self.items
            .iter()
            .flat_map(|(flavor, data)| [Arg::Text(flavor.clone()), Arg::Bytes(data.clone())])
            .collect()
    }

    /// Data for `flavor`, if present.
    pub fn get(&self, flavor: &str) -> Option<&[u8]> {
        self.items
            .iter()
            .find(|(f, _)| f == flavor)
            .map(|(_, d)| d.as_slice())
    }

    /// All representations, in arrival order.
    pub fn items(&self) -> &[ClipboardItem] {
        &self.items
    }

    /// Number of representations.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there are no representations.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// The host clipboard.
pub trait ClipboardInterface: Send {
    /// Replace the clipboard contents.
    fn set(&mut self, contents: &ClipboardContents);

    /// Current clipboard contents.
    fn get(&self) -> ClipboardContents;
}

/// Whether local clipboard changes are reported to peers.
#[derive(Debug)]
pub struct ClipboardMonitor {
    enabled: AtomicBool,
}

impl ClipboardMonitor {
    /// A monitor in the enabled state.
    pub fn new() -> Self {
        Self {
            enabled: AtomicBool::new(true),
        }
    }

    /// Whether changes are currently being reported.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Turn reporting on or off.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    /// Disable reporting until the returned guard is dropped.
    ///
    /// Reporting is re-enabled on drop even if it was disabled before.
    pub fn suspend(&self) -> MonitorSuspended<'_> {
        self.set_enabled(false);
        MonitorSuspended { monitor: self }
    }
}

impl Default for ClipboardMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Re-enables a [`ClipboardMonitor`] when dropped.
#[must_use = "the monitor is re-enabled as soon as the guard is dropped"]
pub struct MonitorSuspended<'a> {
    monitor: &'a ClipboardMonitor,
}

impl Drop for MonitorSuspended<'_> {
    fn drop(&mut self) {
        self.monitor.set_enabled(true);
    }
}

/// The host clipboard behind a FIFO lock, with its change monitor.
pub struct Clipboard {
    host: FairLock<Box<dyn ClipboardInterface>>,
    monitor: Arc<ClipboardMonitor>,
}

impl Clipboard {
    /// Wrap a host clipboard with a fresh monitor.
    pub fn new(host: impl ClipboardInterface + 'static) -> Self {
        Self::with_monitor(host, Arc::new(ClipboardMonitor::new()))
    }

    /// Wrap a host clipboard, sharing an existing monitor.
    pub fn with_monitor(
        host: impl ClipboardInterface + 'static,
        monitor: Arc<ClipboardMonitor>,
    ) -> Self {
        Self {
            host: FairLock::new(Box::new(host)),
            monitor,
        }
    }

    /// Exclusive access to the host clipboard until the guard is dropped.
    pub fn lock(&self) -> FairGuard<'_, Box<dyn ClipboardInterface>> {
        self.host.lock()
    }

    /// The change monitor.
    pub fn monitor(&self) -> &ClipboardMonitor {
        &self.monitor
    }

    /// Apply contents received from a peer without reporting them back.
    pub fn apply_remote(&self, contents: &ClipboardContents) {
        let mut host = self.lock();
        let _quiet = self.monitor.suspend();
        host.set(contents);
    }
}

impl fmt::Debug for Clipboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clipboard")
            .field("monitor", &self.monitor)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Host clipboard that records the monitor state on every set.
    struct Probe {
        value: ClipboardContents,
        monitor: Arc<ClipboardMonitor>,
        seen_enabled: Arc<Mutex<Vec<bool>>>,
    }

    impl ClipboardInterface for Probe {
        fn set(&mut self, contents: &ClipboardContents) {
            self.seen_enabled
                .lock()
                .unwrap()
                .push(self.monitor.is_enabled());
            self.value = contents.clone();
        }

        fn get(&self) -> ClipboardContents {
            self.value.clone()
        }
    }

    #[test]
    fn decodes_flavor_data_pairs() {
        let args = vec![
            Arg::Text("text/plain".into()),
            Arg::Bytes(b"hi".to_vec()),
            Arg::Text("text/html".into()),
            Arg::Bytes(b"<b>hi</b>".to_vec()),
        ];
        let contents = ClipboardContents::from_args("SET_CLIPBOARD", &args).unwrap();
        assert_eq!(contents.len(), 2);
        assert_eq!(contents.get("text/plain"), Some(&b"hi"[..]));
        assert_eq!(contents.to_args(), args);
    }

    #[test]
    fn rejects_empty_odd_and_mistyped() {
        assert!(ClipboardContents::from_args("SET_CLIPBOARD", &[]).is_err());
        let odd = [Arg::Text("text/plain".into())];
        assert_eq!(
            ClipboardContents::from_args("SET_CLIPBOARD", &odd).unwrap_err(),
            HandleError::bad_args("SET_CLIPBOARD", "odd argument count 1")
        );
        let swapped = [Arg::Bytes(vec![1]), Arg::Text("text/plain".into())];
        assert!(ClipboardContents::from_args("SET_CLIPBOARD", &swapped).is_err());
    }

    #[test]
    fn suspend_reenables_on_drop() {
        let monitor = ClipboardMonitor::new();
        {
            let _quiet = monitor.suspend();
            assert!(!monitor.is_enabled());
        }
        assert!(monitor.is_enabled());

        monitor.set_enabled(false);
        drop(monitor.suspend());
        assert!(monitor.is_enabled());
    }

    #[test]
    fn remote_update_is_applied_with_monitor_quiet() {
        let monitor = Arc::new(ClipboardMonitor::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let clipboard = Clipboard::with_monitor(
            Probe {
                value: ClipboardContents::new(),
                monitor: Arc::clone(&monitor),
                seen_enabled: Arc::clone(&seen),
            },
            Arc::clone(&monitor),
        );

        clipboard.apply_remote(&ClipboardContents::new().with("text/plain", "y"));
        assert_eq!(*seen.lock().unwrap(), vec![false]);
        assert!(monitor.is_enabled());
        assert_eq!(clipboard.lock().get().get("text/plain"), Some(&b"y"[..]));
    }
}
