//! Core types for the Pane screen-sharing stack.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by the buffer pool and the protocol handlers:
//! typed ids, the server/client event enums with their logging filter,
//! and the handler error type.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod event;
pub mod id;

pub use error::HandleError;
pub use event::{format_event, log_event, Arg, ClientEvent, EventKind, Message, ServerEvent};
pub use id::{ClientId, PoolId, SegmentId};
