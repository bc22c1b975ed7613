//! The pool: a free list of idle entries plus a value factory.

use std::any::Any;
use std::convert::Infallible;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pane_core::PoolId;

use crate::check::invariant;
use crate::config::{PoolConfig, PoolConfigError};
use crate::entry::PoolEntry;
use crate::heap::{OrderedFreeHeap, SLOT_NONE};
use crate::lease::Lease;
use crate::lock::FairLock;
use crate::reaper::{Notice, Reap, Reaper, ReaperHandle, ReaperReport, Reclaimed};
use crate::stats::{PoolCounters, PoolStats};

// ── Factory ─────────────────────────────────────────────────────

/// Builds a new value for an order the free list could not supply.
///
/// Implemented for every `Fn(usize) -> T` closure (which cannot fail).
/// Wrap a `Fn(usize) -> Result<T, E>` in [`TryFactory`] to let failures
/// propagate out of [`Pool::try_acquire`].
pub trait Factory<T>: Send + Sync {
    /// Error returned when a value cannot be built.
    type Error;

    /// Build a value for `order`.
    fn make(&self, order: usize) -> Result<T, Self::Error>;
}

impl<T, F> Factory<T> for F
where
    F: Fn(usize) -> T + Send + Sync,
{
    type Error = Infallible;

    fn make(&self, order: usize) -> Result<T, Infallible> {
        Ok(self(order))
    }
}

/// Adapter for fallible factory closures.
#[derive(Clone, Copy, Debug)]
pub struct TryFactory<F>(pub F);

impl<T, E, F> Factory<T> for TryFactory<F>
where
    F: Fn(usize) -> Result<T, E> + Send + Sync,
{
    type Error = E;

    fn make(&self, order: usize) -> Result<T, E> {
        (self.0)(order)
    }
}

// ── Shared state ────────────────────────────────────────────────

/// The part of a pool that leases and reaper notices point back to.
pub(crate) struct PoolShared<T> {
    id: PoolId,
    config: PoolConfig,
    heap: FairLock<OrderedFreeHeap<PoolEntry<T>>>,
    /// Mirror of `heap.len()` for the lock-free empty check.
    size: AtomicUsize,
    counters: PoolCounters,
    reaper: ReaperHandle,
}

type Heap<T> = OrderedFreeHeap<PoolEntry<T>>;

impl<T> PoolShared<T> {
    pub(crate) fn id(&self) -> PoolId {
        self.id
    }
}

impl<T: Send + Sync + 'static> PoolShared<T> {
    /// Hand out a pooled entry of exactly `order`, skipping reclaimed ones.
    fn take_pooled(self: &Arc<Self>, order: usize) -> Option<Lease<T>> {
        if self.size.load(Ordering::Acquire) == 0 {
            return None;
        }

        let mut heap = self.heap.lock();
        let mut from = 0;
        while let Some(found) = heap.find_by_order(order, from) {
            let entry = heap.remove_at(found.slot)?;
            self.size.store(heap.len(), Ordering::Release);

            match entry.stage() {
                Some(value) => {
                    entry.reset_lease();
                    self.counters.record_reused();
                    return Some(Lease::new(entry, value, Arc::clone(self)));
                }
                None => {
                    // Reclaimed before the reaper got to it.
                    entry.detach();
                    self.counters.record_stale();
                    from = found.resume;
                }
            }
        }
        None
    }

    /// Return a fully released entry to the free list.
    pub(crate) fn release(&self, entry: &Arc<PoolEntry<T>>, value: Arc<T>) {
        let mut heap = self.heap.lock();
        if !invariant(entry.slot() == SLOT_NONE, "released an entry that is already pooled") {
            return;
        }
        entry.restore(value);
        heap.insert(Arc::clone(entry));

        if let Some(limit) = self.config.soft_limit {
            if heap.len() > limit {
                let shed = self.shed(&mut heap, limit);
                log::debug!(
                    "pool '{}' over soft limit {limit}: reclaimed {shed} idle payloads",
                    self.config.name
                );
            }
        }
        self.size.store(heap.len(), Ordering::Release);
    }

    /// Reclaim the payloads of every pooled entry at slot `keep` or later.
    ///
    /// The entries stay in the heap and are excised by the reaper. If the
    /// reaper is gone they are excised here instead.
    fn shed(&self, heap: &mut Heap<T>, keep: usize) -> usize {
        let mut reclaimed = 0;
        let mut orphans = Vec::new();
        for slot in keep..heap.len() {
            let Some(entry) = heap.get(slot) else {
                break;
            };
            if !entry.reclaim() {
                continue;
            }
            reclaimed += 1;
            let notice: Arc<dyn Reclaimed> = Arc::clone(entry) as Arc<dyn Reclaimed>;
            if self.reaper.post(notice).is_err() {
                orphans.push(Arc::clone(entry));
            }
        }

        if !orphans.is_empty() {
            log::warn!(
                "pool '{}': reaper unavailable, excising {} entries inline",
                self.config.name,
                orphans.len()
            );
            for entry in orphans {
                entry.detach();
                if heap.remove_at(entry.slot()).is_some() {
                    self.counters.record_reaped();
                }
            }
        }

        self.counters.record_reclaimed(reclaimed as u64);
        reclaimed
    }

    /// Remove one reclaimed entry from the heap, if it is still there.
    fn excise(&self, heap: &mut Heap<T>, entry: Arc<dyn Reclaimed>, report: &mut ReaperReport) {
        let any: Arc<dyn Any + Send + Sync> = entry.into_any();
        let Ok(entry) = any.downcast::<PoolEntry<T>>() else {
            invariant(false, "reclamation notice routed to the wrong pool");
            return;
        };
        entry.detach();

        let slot = entry.slot();
        // Already dropped by an acquire that found it stale.
        if slot == SLOT_NONE {
            return;
        }
        let in_place = heap.get(slot).is_some_and(|e| Arc::ptr_eq(e, &entry));
        if !invariant(in_place, "reclaimed entry's slot points at another entry") {
            return;
        }
        heap.remove_at(slot);
        report.excised += 1;
        self.counters.record_reaped();
    }
}

impl<T: Send + Sync + 'static> Reap for PoolShared<T> {
    fn reap_batch(
        &self,
        first: Arc<dyn Reclaimed>,
        next: &mut dyn FnMut() -> Option<Notice>,
        report: &mut ReaperReport,
    ) -> Option<Notice> {
        let mut heap = self.heap.lock();
        let mut current = first;
        loop {
            self.excise(&mut heap, current, report);
            match next() {
                Some(Notice::Reclaimed(entry)) if entry.pool_id() == self.id => {
                    report.notices += 1;
                    current = entry;
                }
                other => {
                    self.size.store(heap.len(), Ordering::Release);
                    return other;
                }
            }
        }
    }
}

impl<T: Send + Sync + 'static> Reclaimed for PoolEntry<T> {
    fn pool_id(&self) -> PoolId {
        PoolEntry::pool_id(self)
    }

    fn pool(&self) -> Option<Arc<dyn Reap>> {
        self.owner().map(|pool| pool as Arc<dyn Reap>)
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

// ── Pool ────────────────────────────────────────────────────────

/// An order-indexed pool of reusable values.
///
/// [`acquire`](Self::acquire) hands out a [`Lease`] on an idle value of
/// exactly the requested order, or on a new one built by the factory.
/// When the last lease on a value is dropped, the value goes back into
/// the pool's free list.
///
/// Idle values can be dropped under memory pressure, either explicitly
/// ([`reclaim_idle`](Self::reclaim_idle)) or automatically when the free
/// list outgrows [`PoolConfig::soft_limit`]. The reaper then removes the
/// dead entries from the free list in the background.
///
/// # Example
///
/// ```
/// use pane_pool::Pool;
///
/// let pool = Pool::new(|len| vec![0u32; len]);
/// let first = pool.acquire(64);
/// let serial = first.serial();
/// drop(first);
///
/// // Same order: the idle value is reused.
/// assert_eq!(pool.acquire(64).serial(), serial);
/// ```
pub struct Pool<T: Send + Sync + 'static, F> {
    shared: Arc<PoolShared<T>>,
    factory: F,
}

// Compile-time assertion: pools can be shared across threads.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<Pool<Vec<u8>, fn(usize) -> Vec<u8>>>();
};

impl<T: Send + Sync + 'static, F: Factory<T>> Pool<T, F> {
    /// A pool with the default config, served by the global reaper.
    pub fn new(factory: F) -> Self {
        Self::from_parts(factory, PoolConfig::default(), Reaper::global())
    }

    /// A pool with `config`, served by the global reaper.
    pub fn with_config(factory: F, config: PoolConfig) -> Result<Self, PoolConfigError> {
        Self::builder(factory).config(config).build()
    }

    /// Start configuring a pool.
    pub fn builder(factory: F) -> PoolBuilder<T, F> {
        PoolBuilder {
            factory,
            config: PoolConfig::default(),
            reaper: None,
            _marker: PhantomData,
        }
    }

    fn from_parts(factory: F, config: PoolConfig, reaper: ReaperHandle) -> Self {
        let id = PoolId::next();
        log::debug!("pool '{}' created with id {id}", config.name);
        Self {
            shared: Arc::new(PoolShared {
                id,
                config,
                heap: FairLock::new(OrderedFreeHeap::new()),
                size: AtomicUsize::new(0),
                counters: PoolCounters::default(),
                reaper,
            }),
            factory,
        }
    }

    /// Lease a value of exactly `order`, building one if needed.
    ///
    /// Factory errors are returned as-is; the pool does not retry.
    pub fn try_acquire(&self, order: usize) -> Result<Lease<T>, F::Error> {
        if let Some(lease) = self.shared.take_pooled(order) {
            return Ok(lease);
        }

        let value = Arc::new(self.factory.make(order)?);
        let serial = self.shared.counters.record_created();
        log::trace!(
            "pool '{}' miss for order {order}: built entry {serial}",
            self.shared.config.name
        );
        let entry = PoolEntry::new_leased(order, serial, &self.shared);
        Ok(Lease::new(entry, value, Arc::clone(&self.shared)))
    }

    /// Reclaim the payloads of idle entries beyond the first `keep` slots.
    ///
    /// Returns the number of payloads dropped. The free list itself
    /// shrinks once the reaper has processed the notices.
    pub fn reclaim_idle(&self, keep: usize) -> usize {
        let mut heap = self.shared.heap.lock();
        let reclaimed = self.shared.shed(&mut heap, keep);
        self.shared.size.store(heap.len(), Ordering::Release);
        reclaimed
    }

    /// Reclaim every idle payload.
    pub fn reclaim_all(&self) -> usize {
        self.reclaim_idle(0)
    }
}

impl<T: Send + Sync + 'static, F: Factory<T, Error = Infallible>> Pool<T, F> {
    /// Lease a value of exactly `order` from an infallible factory.
    pub fn acquire(&self, order: usize) -> Lease<T> {
        match self.try_acquire(order) {
            Ok(lease) => lease,
            Err(never) => match never {},
        }
    }
}

impl<T: Send + Sync + 'static, F> Pool<T, F> {
    /// Unique id of this pool.
    pub fn id(&self) -> PoolId {
        self.shared.id
    }

    /// Diagnostic label.
    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    /// Entries in the free list, including reclaimed ones not yet reaped.
    pub fn len(&self) -> usize {
        self.shared.size.load(Ordering::Acquire)
    }

    /// Whether the free list is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Activity counters.
    pub fn stats(&self) -> PoolStats {
        self.shared.counters.snapshot(self.len())
    }

    /// The reaper this pool posts reclamation notices to.
    pub fn reaper(&self) -> &ReaperHandle {
        &self.shared.reaper
    }

    /// Verify the free list's heap ordering and slot bookkeeping, and that
    /// no entry in it is still leased.
    pub fn check_invariants(&self) -> Result<(), String> {
        let heap = self.shared.heap.lock();
        heap.check_invariants()?;
        for entry in heap.iter() {
            let leases = entry.ref_count();
            if leases != 0 || entry.is_leased() {
                return Err(format!(
                    "entry {} at slot {} is pooled with {leases} live leases",
                    entry.serial(),
                    entry.slot()
                ));
            }
        }
        if heap.len() != self.len() {
            return Err(format!(
                "size counter {} disagrees with heap length {}",
                self.len(),
                heap.len()
            ));
        }
        Ok(())
    }
}

impl<T: Send + Sync + 'static, F> fmt::Debug for Pool<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("id", &self.shared.id)
            .field("name", &self.shared.config.name)
            .field("pooled", &self.len())
            .finish_non_exhaustive()
    }
}

// ── Builder ─────────────────────────────────────────────────────

/// Configures and builds a [`Pool`].
pub struct PoolBuilder<T, F> {
    factory: F,
    config: PoolConfig,
    reaper: Option<ReaperHandle>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static, F: Factory<T>> PoolBuilder<T, F> {
    /// Replace the whole config.
    pub fn config(mut self, config: PoolConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the diagnostic label.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Set the memory-pressure threshold.
    pub fn soft_limit(mut self, limit: usize) -> Self {
        self.config.soft_limit = Some(limit);
        self
    }

    /// Post reclamation notices to `reaper` instead of the global one.
    pub fn reaper(mut self, reaper: ReaperHandle) -> Self {
        self.reaper = Some(reaper);
        self
    }

    /// Validate the config and build the pool.
    pub fn build(self) -> Result<Pool<T, F>, PoolConfigError> {
        self.config.validate()?;
        let reaper = self.reaper.unwrap_or_else(Reaper::global);
        Ok(Pool::from_parts(self.factory, self.config, reaper))
    }
}
