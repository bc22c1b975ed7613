//! Pool entries: one payload, its lease count, and its free-list slot.
//!
//! A [`PoolEntry`] is in exactly one of two states:
//!
//! - **leased**: `ref_count > 0`, not in the free list. The leases hold
//!   the only references to the payload, so a sole lease can mutate it.
//! - **pooled**: `ref_count == 0`, in the free list at `slot`. The entry
//!   holds the only strong reference, which the pool may drop under
//!   memory pressure (the payload is then *reclaimed*).
//!
//! Transitions between the two happen only under the owning pool's lock.
//! The lease count has its own lock, which is always released before the
//! pool lock is taken.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};

use pane_core::PoolId;

use crate::check::invariant;
use crate::heap::{HeapSlot, SLOT_NONE};
use crate::lock::{recover, FairLock};
use crate::pool::PoolShared;

/// Where the payload currently lives.
pub(crate) enum Payload<T> {
    /// In the free list; this is the only strong reference.
    Pooled(Arc<T>),
    /// Handed out; the leases own it.
    Leased,
    /// Dropped under memory pressure. Terminal.
    Reclaimed,
}

/// A leasable, reclaimable wrapper around one pooled value.
pub struct PoolEntry<T> {
    order: usize,
    serial: u64,
    pool_id: PoolId,
    slot: AtomicUsize,
    ref_count: FairLock<u32>,
    payload: Mutex<Payload<T>>,
    /// Back-reference for the reaper only; never keeps the pool alive.
    owner: Mutex<Option<Weak<PoolShared<T>>>>,
}

impl<T> PoolEntry<T> {
    /// A fresh entry, leased once. The caller's lease owns the value.
    pub(crate) fn new_leased(
        order: usize,
        serial: u64,
        owner: &Arc<PoolShared<T>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            order,
            serial,
            pool_id: owner.id(),
            slot: AtomicUsize::new(SLOT_NONE),
            ref_count: FairLock::new(1),
            payload: Mutex::new(Payload::Leased),
            owner: Mutex::new(Some(Arc::downgrade(owner))),
        })
    }

    /// The order this entry was built for.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Creation sequence number within the owning pool, starting at 0.
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Id of the owning pool.
    pub fn pool_id(&self) -> PoolId {
        self.pool_id
    }

    /// Current free-list slot, or [`SLOT_NONE`] while leased.
    pub fn slot(&self) -> usize {
        self.slot.load(Ordering::Acquire)
    }

    /// Number of active leases.
    pub fn ref_count(&self) -> u32 {
        *self.ref_count.lock()
    }

    /// Whether the payload has been dropped under memory pressure.
    pub fn is_reclaimed(&self) -> bool {
        matches!(*self.payload(), Payload::Reclaimed)
    }

    pub(crate) fn is_leased(&self) -> bool {
        matches!(*self.payload(), Payload::Leased)
    }

    fn payload(&self) -> std::sync::MutexGuard<'_, Payload<T>> {
        recover(self.payload.lock(), "pool entry payload")
    }

    // ── Transitions (pool lock held) ────────────────────────────

    /// Take a strong reference to the payload for a new lease.
    ///
    /// Returns `None` if the payload was reclaimed; the caller discards
    /// the entry and keeps searching.
    pub(crate) fn stage(&self) -> Option<Arc<T>> {
        let mut payload = self.payload();
        match std::mem::replace(&mut *payload, Payload::Reclaimed) {
            Payload::Pooled(value) => {
                *payload = Payload::Leased;
                Some(value)
            }
            Payload::Reclaimed => None,
            Payload::Leased => {
                *payload = Payload::Leased;
                invariant(false, "staged an entry that is already leased");
                None
            }
        }
    }

    /// Take back the last lease's strong reference on return to the pool.
    pub(crate) fn restore(&self, value: Arc<T>) {
        *self.payload() = Payload::Pooled(value);
    }

    /// Drop a pooled payload. Returns `false` if there was nothing to drop.
    pub(crate) fn reclaim(&self) -> bool {
        let dropped = {
            let mut payload = self.payload();
            match &*payload {
                Payload::Pooled(_) => std::mem::replace(&mut *payload, Payload::Reclaimed),
                _ => return false,
            }
        };
        drop(dropped);
        true
    }

    /// Restart the lease count for an entry taken from the free list.
    pub(crate) fn reset_lease(&self) {
        let mut count = self.ref_count.lock();
        invariant(*count == 0, "pooled entry had live leases");
        *count = 1;
    }

    /// The owning pool, if it is still alive and not yet detached.
    pub(crate) fn owner(&self) -> Option<Arc<PoolShared<T>>> {
        recover(self.owner.lock(), "pool entry owner")
            .as_ref()
            .and_then(Weak::upgrade)
    }

    /// Clear the back-reference once the reaper has dealt with this entry.
    pub(crate) fn detach(&self) {
        *recover(self.owner.lock(), "pool entry owner") = None;
    }

    // ── Leasing (entry lock only) ───────────────────────────────

    /// Add a lease. The entry must already be leased.
    pub(crate) fn add_lease(&self) {
        let mut count = self.ref_count.lock();
        invariant(*count > 0, "re-leased an entry that was fully released");
        *count += 1;
    }

    /// Drop one lease and its strong reference to the payload.
    ///
    /// A non-final lease's reference is dropped while the entry lock is
    /// still held, so the final lease is guaranteed to own the last one.
    /// Returns that last reference when the count reaches zero; the caller
    /// must hand it to the pool after this returns, with no entry lock held.
    pub(crate) fn drop_lease(&self, staged: Arc<T>) -> Option<Arc<T>> {
        let mut count = self.ref_count.lock();
        if !invariant(*count > 0, "released an entry with no leases") {
            return None;
        }
        *count -= 1;
        if *count > 0 {
            drop(staged);
            return None;
        }
        Some(staged)
    }
}

impl<T> HeapSlot for PoolEntry<T> {
    fn order(&self) -> usize {
        self.order
    }

    fn slot(&self) -> usize {
        self.slot.load(Ordering::Acquire)
    }

    fn set_slot(&self, slot: usize) {
        self.slot.store(slot, Ordering::Release);
    }
}

impl<T> fmt::Debug for PoolEntry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.slot();
        f.debug_struct("PoolEntry")
            .field("pool", &self.pool_id)
            .field("serial", &self.serial)
            .field("order", &self.order)
            .field("slot", &(slot != SLOT_NONE).then_some(slot))
            .finish()
    }
}
