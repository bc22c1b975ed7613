//! Benchmark workloads for the Pane buffer pool.
//!
//! - [`desktop_profile`]: 1920x1080 screen in 64x64 segments
//! - [`refresh_orders`]: the pool orders a full-screen refresh requests
//! - [`refresh_messages`]: the decoded messages for one full refresh

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use pane_core::{Arg, Message, SegmentId, ServerEvent};
use pane_proto::{Framebuffer, SessionConfig};

/// A 1080p desktop cut into 64x64 segments (30 x 17, bottom row clipped).
pub fn desktop_profile() -> SessionConfig {
    SessionConfig::new(1920, 1080, 64, 64)
}

/// Pixel counts of every segment of `config`, in segment id order.
pub fn refresh_orders(config: &SessionConfig) -> Vec<usize> {
    let fb = Framebuffer::new(config);
    (0..fb.segment_count() as i32)
        .filter_map(|id| fb.segment_len(SegmentId(id)))
        .collect()
}

/// One `SCREEN_SEGMENT_UPDATE` per segment of `config`.
pub fn refresh_messages(config: &SessionConfig) -> Vec<Message<ServerEvent>> {
    refresh_orders(config)
        .into_iter()
        .enumerate()
        .map(|(id, len)| {
            Message::new(
                ServerEvent::ScreenSegmentUpdate,
                vec![Arg::Int(id as i32), Arg::Pixels(vec![id as u32; len])],
            )
        })
        .collect()
}

/// A mix of `distinct` orders, cycled with a stride so consecutive
/// requests differ.
pub fn mixed_orders(distinct: usize, count: usize) -> Vec<usize> {
    (0..count).map(|i| 64 * (1 + (i * 7) % distinct)).collect()
}
