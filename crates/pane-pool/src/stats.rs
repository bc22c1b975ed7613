//! Pool activity counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time view of a pool's activity.
///
/// The counters are cumulative since the pool was created. `pooled` is
/// the free-list size at the moment of the snapshot, including entries
/// whose payload was reclaimed but which the reaper has not excised yet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Entries currently in the free list.
    pub pooled: usize,
    /// Factory calls (pool misses).
    pub created: u64,
    /// Free-list hits handed out as leases.
    pub reused: u64,
    /// Free-list hits discarded because their payload was already reclaimed.
    pub stale_skipped: u64,
    /// Payloads dropped under memory pressure.
    pub reclaimed: u64,
    /// Reclaimed entries excised from the free list, by the reaper or
    /// inline when no reaper is running. Once the reaper has caught up,
    /// `reaped + stale_skipped == reclaimed`.
    pub reaped: u64,
}

/// Live counters behind [`PoolStats`]. Relaxed ordering throughout:
/// the values are diagnostics, never used for synchronisation.
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    created: AtomicU64,
    reused: AtomicU64,
    stale_skipped: AtomicU64,
    reclaimed: AtomicU64,
    reaped: AtomicU64,
}

impl PoolCounters {
    /// Count a factory call; returns the serial number of the new entry.
    pub fn record_created(&self) -> u64 {
        self.created.fetch_add(1, Ordering::Relaxed)
    }

    pub fn record_reused(&self) {
        self.reused.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale(&self) {
        self.stale_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reclaimed(&self, n: u64) {
        self.reclaimed.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_reaped(&self) {
        self.reaped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, pooled: usize) -> PoolStats {
        PoolStats {
            pooled,
            created: self.created.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            stale_skipped: self.stale_skipped.load(Ordering::Relaxed),
            reclaimed: self.reclaimed.load(Ordering::Relaxed),
            reaped: self.reaped.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stats_are_zero() {
        let counters = PoolCounters::default();
        assert_eq!(counters.snapshot(0), PoolStats::default());
    }

    #[test]
    fn created_returns_sequential_serials() {
        let counters = PoolCounters::default();
        assert_eq!(counters.record_created(), 0);
        assert_eq!(counters.record_created(), 1);
        counters.record_reused();
        counters.record_reclaimed(3);
        let stats = counters.snapshot(7);
        assert_eq!(stats.pooled, 7);
        assert_eq!(stats.created, 2);
        assert_eq!(stats.reused, 1);
        assert_eq!(stats.reclaimed, 3);
    }
}
