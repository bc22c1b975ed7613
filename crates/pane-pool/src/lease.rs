//! Leases: owned, reference-counted borrows of a pooled value.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use pane_core::PoolId;

use crate::entry::PoolEntry;
use crate::pool::PoolShared;

/// A borrowed pool value.
///
/// Each `Lease` is one unit of the entry's lease count. Dropping it (or
/// calling [`release`](Self::release)) gives that unit back; when the last
/// lease goes, the value returns to its pool's free list instead of being
/// freed. [`acquire_extra`](Self::acquire_extra) hands out another lease
/// on the same value for a second, independent owner.
pub struct Lease<T: Send + Sync + 'static> {
    entry: Arc<PoolEntry<T>>,
    /// `None` only during drop.
    value: Option<Arc<T>>,
    pool: Arc<PoolShared<T>>,
}

// Compile-time assertion: leases can move across threads.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<Lease<Vec<u8>>>();
};

impl<T: Send + Sync + 'static> Lease<T> {
    pub(crate) fn new(entry: Arc<PoolEntry<T>>, value: Arc<T>, pool: Arc<PoolShared<T>>) -> Self {
        Self {
            entry,
            value: Some(value),
            pool,
        }
    }

    /// The leased value.
    pub fn get(&self) -> &T {
        self.value
            .as_deref()
            .expect("lease payload is present until drop")
    }

    /// Mutable access, if this is the only lease on the value.
    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.value.as_mut().and_then(Arc::get_mut)
    }

    /// Another lease on the same value.
    ///
    /// The value goes back to the pool only after both leases are gone.
    pub fn acquire_extra(&self) -> Self {
        self.entry.add_lease();
        Self {
            entry: Arc::clone(&self.entry),
            value: self.value.clone(),
            pool: Arc::clone(&self.pool),
        }
    }

    /// Give this lease back. Same as dropping it.
    pub fn release(self) {
        drop(self);
    }

    /// The order the value was built for.
    pub fn order(&self) -> usize {
        self.entry.order()
    }

    /// Creation sequence number of the underlying entry.
    ///
    /// Two leases with the same pool id and serial share one value.
    pub fn serial(&self) -> u64 {
        self.entry.serial()
    }

    /// Id of the pool the value belongs to.
    pub fn pool_id(&self) -> PoolId {
        self.entry.pool_id()
    }

    /// Number of live leases on the value, this one included.
    pub fn ref_count(&self) -> u32 {
        self.entry.ref_count()
    }

    /// The underlying entry. While any lease is live it is out of the
    /// free list: its slot is [`SLOT_NONE`](crate::SLOT_NONE).
    pub fn entry(&self) -> &PoolEntry<T> {
        &self.entry
    }
}

impl<T: Send + Sync + 'static> Deref for Lease<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.get()
    }
}

impl<T: Send + Sync + 'static> Clone for Lease<T> {
    fn clone(&self) -> Self {
        self.acquire_extra()
    }
}

impl<T: Send + Sync + 'static> Drop for Lease<T> {
    fn drop(&mut self) {
        let Some(value) = self.value.take() else {
            return;
        };
        // The entry lock is released inside drop_lease, before the pool lock.
        if let Some(last) = self.entry.drop_lease(value) {
            self.pool.release(&self.entry, last);
        }
    }
}

impl<T: Send + Sync + fmt::Debug + 'static> fmt::Debug for Lease<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease")
            .field("entry", &self.entry)
            .field("value", &self.value)
            .finish()
    }
}
