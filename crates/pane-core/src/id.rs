//! Strongly-typed identifiers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for unique [`PoolId`] allocation.
static POOL_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique per-instance identifier for a buffer pool.
///
/// Allocated from a monotonic atomic counter via [`PoolId::next`]. The
/// reaper compares ids to batch consecutive notices for the same pool
/// without holding a strong reference to it. Ids are never reused within
/// a process, so a dropped pool can't be confused with a new one
/// allocated at the same address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolId(u64);

impl PoolId {
    /// Allocate a fresh, unique pool id. Thread-safe.
    pub fn next() -> Self {
        Self(POOL_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw counter value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies one client connection on the server.
///
/// Used to address broadcasts ("everyone except the sender").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// Identifies one segment of the shared screen.
///
/// Segments are numbered row-major from 0. The value `-1`
/// ([`SegmentId::WHOLE_SCREEN`]) addresses the entire screen at once.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentId(pub i32);

impl SegmentId {
    /// Sentinel addressing the whole screen rather than one segment.
    pub const WHOLE_SCREEN: SegmentId = SegmentId(-1);

    /// Whether this id is the whole-screen sentinel.
    pub fn is_whole_screen(self) -> bool {
        self == Self::WHOLE_SCREEN
    }

    /// The segment index, or `None` for the whole-screen sentinel and
    /// any other negative value.
    pub fn index(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for SegmentId {
    fn from(v: i32) -> Self {
        Self(v)
    }
}
