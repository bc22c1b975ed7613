//! Client side: session state and handlers for server events.

use std::sync::Arc;

use pane_core::{Arg, EventKind, HandleError, SegmentId, ServerEvent};
use pane_pool::{Pool, PoolStats, ReaperHandle};

use crate::clipboard::{Clipboard, ClipboardContents};
use crate::config::{ConfigError, SessionConfig};
use crate::framebuffer::Framebuffer;
use crate::handle::{Dispatcher, Handle};

/// Factory for segment pixel buffers: `order` is the pixel count.
pub fn pixel_buffer(order: usize) -> Vec<u32> {
    vec![0; order]
}

/// Pool of segment pixel buffers keyed by pixel count.
pub type PixelPool = Pool<Vec<u32>, fn(usize) -> Vec<u32>>;

/// State of one client's connection to a server.
#[derive(Debug)]
pub struct ClientSession {
    framebuffer: Framebuffer,
    pixels: PixelPool,
    clipboard: Arc<Clipboard>,
    synchronize_clipboard: bool,
    closed: bool,
}

impl ClientSession {
    /// Validate `config` and open a session served by the global reaper.
    pub fn new(config: &SessionConfig, clipboard: Arc<Clipboard>) -> Result<Self, ConfigError> {
        Self::build(config, clipboard, None)
    }

    /// Like [`new`](Self::new), with the pixel pool posting to `reaper`.
    pub fn with_reaper(
        config: &SessionConfig,
        clipboard: Arc<Clipboard>,
        reaper: ReaperHandle,
    ) -> Result<Self, ConfigError> {
        Self::build(config, clipboard, Some(reaper))
    }

    fn build(
        config: &SessionConfig,
        clipboard: Arc<Clipboard>,
        reaper: Option<ReaperHandle>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut builder =
            Pool::builder(pixel_buffer as fn(usize) -> Vec<u32>).config(config.pool.clone());
        if let Some(reaper) = reaper {
            builder = builder.reaper(reaper);
        }
        Ok(Self {
            framebuffer: Framebuffer::new(config),
            pixels: builder.build()?,
            clipboard,
            synchronize_clipboard: config.synchronize_clipboard,
            closed: false,
        })
    }

    /// The display buffer.
    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    /// The segment buffer pool.
    pub fn pixel_pool(&self) -> &PixelPool {
        &self.pixels
    }

    /// Segment buffer pool statistics.
    pub fn pool_stats(&self) -> PoolStats {
        self.pixels.stats()
    }

    /// The shared clipboard.
    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    /// Whether clipboard contents are exchanged with the server.
    pub fn is_clipboard_sync_enabled(&self) -> bool {
        self.synchronize_clipboard
    }

    /// Turn clipboard exchange on or off.
    pub fn set_clipboard_sync(&mut self, enabled: bool) {
        self.synchronize_clipboard = enabled;
    }

    /// Whether the server has closed the connection.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> Result<(), HandleError> {
        if self.closed {
            return Err(HandleError::SessionClosed);
        }
        Ok(())
    }
}

// ── Handlers ───────────────────────────────────────────────────────

/// `SCREEN_SEGMENT_UPDATE [segment_id, pixels]`.
///
/// The pixels are staged in a pooled buffer sized to the segment, then
/// copied onto the screen. Segment id `-1` replaces the whole screen.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScreenSegmentUpdate;

impl Handle<ClientSession> for ScreenSegmentUpdate {
    fn handle(&self, session: &mut ClientSession, args: &[Arg]) -> Result<(), HandleError> {
        let event = ServerEvent::ScreenSegmentUpdate.name();
        session.ensure_open()?;

        let [id, pixels] = args else {
            return Err(HandleError::bad_args(
                event,
                format!("expected 2 arguments, got {}", args.len()),
            ));
        };
        let id = id
            .as_int()
            .map(SegmentId)
            .ok_or_else(|| HandleError::bad_args(event, "segment id is not an integer"))?;
        let pixels = pixels
            .as_pixels()
            .ok_or_else(|| HandleError::bad_args(event, "payload is not a pixel array"))?;
        if id.0 < -1 {
            return Err(HandleError::bad_args(event, format!("segment id {id} below -1")));
        }
        let len = session
            .framebuffer
            .segment_len(id)
            .ok_or_else(|| HandleError::bad_args(event, format!("no segment {id}")))?;
        if pixels.len() != len {
            return Err(HandleError::bad_args(
                event,
                format!("segment {id} holds {len} pixels, got {}", pixels.len()),
            ));
        }

        let mut staged = session.pixels.acquire(len);
        match staged.get_mut() {
            Some(buf) => buf.copy_from_slice(pixels),
            None => {
                // A fresh lease is always unique; fall back to the wire copy.
                log::warn!("segment buffer for {id} is shared; loading directly");
                session.framebuffer.load_segment(id, pixels);
                return Ok(());
            }
        }
        session.framebuffer.load_segment(id, &staged);
        staged.release();
        Ok(())
    }
}

/// `SET_CLIPBOARD [flavor, data, ...]` from the server.
#[derive(Clone, Copy, Debug, Default)]
pub struct ApplyServerClipboard;

impl Handle<ClientSession> for ApplyServerClipboard {
    fn handle(&self, session: &mut ClientSession, args: &[Arg]) -> Result<(), HandleError> {
        session.ensure_open()?;
        let contents = ClipboardContents::from_args(ServerEvent::SetClipboard.name(), args)?;
        if !session.synchronize_clipboard {
            return Ok(());
        }
        session.clipboard.apply_remote(&contents);
        Ok(())
    }
}

/// `CONNECTION_CLOSED`: mark the session closed and drop pooled buffers.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConnectionClosed;

impl Handle<ClientSession> for ConnectionClosed {
    fn handle(&self, session: &mut ClientSession, _args: &[Arg]) -> Result<(), HandleError> {
        if session.closed {
            return Ok(());
        }
        session.closed = true;
        let dropped = session.pixels.reclaim_all();
        log::debug!("connection closed; released {dropped} pooled segment buffers");
        Ok(())
    }
}

/// The client's dispatcher for server events.
pub fn client_dispatcher() -> Dispatcher<ServerEvent, ClientSession> {
    Dispatcher::new("server")
        .with(ServerEvent::ScreenSegmentUpdate, ScreenSegmentUpdate)
        .with(ServerEvent::SetClipboard, ApplyServerClipboard)
        .with(ServerEvent::ConnectionClosed, ConnectionClosed)
}
