//! Server side: per-client connection state and handlers for client events.

use std::sync::Arc;

use pane_core::{Arg, ClientEvent, ClientId, EventKind, HandleError, Message, ServerEvent};

use crate::clipboard::{Clipboard, ClipboardContents};
use crate::handle::{Dispatcher, Handle};

/// Delivers server events to connected clients.
pub trait Broadcaster: Send + Sync {
    /// Send `message` to every connected client except `except`.
    fn send_to_all_except(&self, except: ClientId, message: Message<ServerEvent>);
}

/// The server's view of one connected client.
pub struct ClientConnection {
    id: ClientId,
    clipboard: Arc<Clipboard>,
    peers: Arc<dyn Broadcaster>,
    synchronize_clipboard: bool,
}

impl ClientConnection {
    /// State for client `id`, sharing the server clipboard and peer set.
    pub fn new(
        id: ClientId,
        clipboard: Arc<Clipboard>,
        peers: Arc<dyn Broadcaster>,
        synchronize_clipboard: bool,
    ) -> Self {
        Self {
            id,
            clipboard,
            peers,
            synchronize_clipboard,
        }
    }

    /// The client's id.
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// The server clipboard.
    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }
}

impl std::fmt::Debug for ClientConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConnection")
            .field("id", &self.id)
            .field("synchronize_clipboard", &self.synchronize_clipboard)
            .finish_non_exhaustive()
    }
}

/// `SET_CLIPBOARD [flavor, data, ...]` from a client.
///
/// Applies the contents to the server clipboard with the monitor
/// suspended, then tells every other client the clipboard changed.
#[derive(Clone, Copy, Debug, Default)]
pub struct SetServerClipboard;

impl Handle<ClientConnection> for SetServerClipboard {
    fn handle(&self, conn: &mut ClientConnection, args: &[Arg]) -> Result<(), HandleError> {
        let contents = ClipboardContents::from_args(ClientEvent::SetClipboard.name(), args)?;
        if !conn.synchronize_clipboard {
            return Ok(());
        }
        conn.clipboard.apply_remote(&contents);
        conn.peers
            .send_to_all_except(conn.id, Message::bare(ServerEvent::ClipboardChanged));
        Ok(())
    }
}

/// The server's dispatcher for events from one client.
pub fn server_dispatcher() -> Dispatcher<ClientEvent, ClientConnection> {
    Dispatcher::new("client").with(ClientEvent::SetClipboard, SetServerClipboard)
}
