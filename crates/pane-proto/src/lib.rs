//! Protocol collaborators of the Pane buffer pool.
//!
//! Event handlers for both ends of a connection, the client display
//! buffer, and clipboard synchronisation. Transport, wire encoding, and
//! screen capture live elsewhere: handlers receive already-decoded
//! [`Message`](pane_core::Message)s and mutate session state.
//!
//! # Data flow
//!
//! ```text
//! server ──SCREEN_SEGMENT_UPDATE──▶ client_dispatcher()
//!                                     └─ ScreenSegmentUpdate
//!                                          ├─ lease Vec<u32> from PixelPool (order = pixel count)
//!                                          ├─ copy wire pixels into the lease
//!                                          ├─ Framebuffer::load_segment
//!                                          └─ release (buffer back to the pool)
//!
//! client ──SET_CLIPBOARD──▶ server_dispatcher()
//!                             └─ SetServerClipboard
//!                                  ├─ Clipboard::apply_remote (monitor suspended)
//!                                  └─ Broadcaster: CLIPBOARD_CHANGED to all others
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod client;
pub mod clipboard;
pub mod config;
pub mod framebuffer;
pub mod handle;
pub mod server;

pub use client::{
    client_dispatcher, pixel_buffer, ApplyServerClipboard, ClientSession, ConnectionClosed,
    PixelPool, ScreenSegmentUpdate,
};
pub use clipboard::{
    Clipboard, ClipboardContents, ClipboardInterface, ClipboardItem, ClipboardMonitor,
    MonitorSuspended,
};
pub use config::{ConfigError, SessionConfig};
pub use framebuffer::{Framebuffer, Rect};
pub use handle::{Dispatcher, Handle};
pub use server::{server_dispatcher, Broadcaster, ClientConnection, SetServerClipboard};
