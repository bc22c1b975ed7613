//! Pane: screen-sharing building blocks around an order-indexed buffer pool.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the Pane sub-crates.
//!
//! # Quick start
//!
//! ```rust
//! use pane::prelude::*;
//!
//! // Buffers are leased by order (here: length) and come back on drop.
//! let pool = Pool::new(|len| vec![0u8; len]);
//! let mut lease = pool.acquire(1024);
//! lease.get_mut().unwrap()[0] = 0xff;
//! let serial = lease.serial();
//! drop(lease);
//!
//! let again = pool.acquire(1024);
//! assert_eq!(again.serial(), serial);
//! assert_eq!(again[0], 0xff);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `pane-core` | Ids, protocol events, event logging, `HandleError` |
//! | [`pool`] | `pane-pool` | `Pool`, `Lease`, `OrderedFreeHeap`, the reaper |
//! | [`proto`] | `pane-proto` | Handlers, dispatchers, framebuffer, clipboard |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core ids, events, and errors (`pane-core`).
pub use pane_core as types;

/// The buffer pool (`pane-pool`).
///
/// [`pool::Pool`] hands out [`pool::Lease`]s; idle values wait in an
/// [`pool::OrderedFreeHeap`] and are reconciled by the [`pool::Reaper`]
/// after reclamation.
pub use pane_pool as pool;

/// Protocol handlers and session state (`pane-proto`).
pub use pane_proto as proto;

/// Common imports for typical Pane usage.
///
/// ```rust
/// use pane::prelude::*;
/// ```
pub mod prelude {
    // Core
    pub use pane_core::{Arg, ClientEvent, ClientId, HandleError, Message, SegmentId, ServerEvent};

    // Pool
    pub use pane_pool::{
        Factory, Lease, Pool, PoolConfig, PoolStats, Reaper, ReaperHandle, TryFactory,
    };

    // Protocol
    pub use pane_proto::{
        client_dispatcher, server_dispatcher, Broadcaster, ClientConnection, ClientSession,
        Clipboard, ClipboardContents, ClipboardInterface, Dispatcher, Framebuffer, Handle,
        SessionConfig,
    };
}
