//! Order-indexed buffer pool with lease counting and background
//! reclamation.
//!
//! Protocol handlers borrow scratch buffers from a [`Pool`] by *order*
//! (a caller-chosen size class, typically the buffer length) and give
//! them back by dropping the [`Lease`]. Returned buffers wait in a
//! min-heap free list for the next request of the same order.
//!
//! # Architecture
//!
//! ```text
//! Pool<T, F>
//! ├── F: Factory<T>                       (builds values on a miss)
//! └── Arc<PoolShared<T>>
//!     ├── FairLock<OrderedFreeHeap>       (free list, FIFO-locked)
//!     │   └── Arc<PoolEntry<T>>[]         (pooled: owns the payload)
//!     ├── PoolCounters                    (PoolStats source)
//!     └── ReaperHandle ──notices──▶ Reaper thread (process-wide)
//!
//! Lease<T> ── Arc<PoolEntry<T>> + Arc<T>  (leased: leases own the payload)
//! ```
//!
//! # Memory pressure
//!
//! Idle payloads can be dropped while their entries are still in the
//! free list, either explicitly ([`Pool::reclaim_idle`]) or when the free
//! list exceeds [`PoolConfig::soft_limit`]. Each such entry is reported to
//! the [`Reaper`], which removes it from the heap under the pool lock.
//! An `acquire` that reaches a reclaimed entry first simply discards it
//! and keeps searching.
//!
//! # Lock order
//!
//! Each entry's lease count has its own lock. It is never held while the
//! pool lock is being acquired: the last lease drops the entry lock
//! before handing the value back to the pool.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod check;
pub mod config;
pub mod entry;
pub mod heap;
pub mod lease;
pub mod lock;
pub mod pool;
pub mod reaper;
pub mod stats;

pub use check::invariant;
pub use config::{PoolConfig, PoolConfigError};
pub use entry::PoolEntry;
pub use heap::{Found, HeapSlot, OrderedFreeHeap, SLOT_NONE};
pub use lease::Lease;
pub use lock::{FairGuard, FairLock};
pub use pool::{Factory, Pool, PoolBuilder, TryFactory};
pub use reaper::{Reaper, ReaperError, ReaperHandle, ReaperReport};
pub use stats::PoolStats;
