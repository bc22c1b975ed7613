//! Protocol events exchanged between server and client, and the
//! event-logging filter.
//!
//! Events travel as a [`Message`]: an event kind plus an optional list of
//! loosely typed [`Arg`]s. The wire encoding is not defined here; the
//! transport hands already-decoded messages to the handler dispatch.

use std::fmt;
use std::hash::Hash;

/// One decoded event argument.
#[derive(Clone, Debug, PartialEq)]
pub enum Arg {
    /// A signed integer, e.g. a segment id.
    Int(i32),
    /// A boolean flag.
    Flag(bool),
    /// A text value, e.g. a clipboard flavour name.
    Text(String),
    /// An opaque byte payload, e.g. clipboard data.
    Bytes(Vec<u8>),
    /// A pixel array in `0xAARRGGBB` form.
    Pixels(Vec<u32>),
}

impl Arg {
    /// The integer value, if this is an [`Arg::Int`].
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// The pixel slice, if this is an [`Arg::Pixels`].
    pub fn as_pixels(&self) -> Option<&[u32]> {
        match self {
            Self::Pixels(p) => Some(p),
            _ => None,
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Flag(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Self::Pixels(p) => write!(f, "<{} pixels>", p.len()),
        }
    }
}

/// A decoded protocol message.
#[derive(Clone, Debug, PartialEq)]
pub struct Message<E> {
    /// The event kind.
    pub event: E,
    /// Arguments, or `None` for an argument-less event.
    pub args: Option<Vec<Arg>>,
}

impl<E> Message<E> {
    /// A message with arguments.
    pub fn new(event: E, args: Vec<Arg>) -> Self {
        Self {
            event,
            args: Some(args),
        }
    }

    /// A message without arguments.
    pub fn bare(event: E) -> Self {
        Self { event, args: None }
    }

    /// The argument slice, empty when the message has none.
    pub fn args(&self) -> &[Arg] {
        self.args.as_deref().unwrap_or(&[])
    }
}

/// Behaviour shared by [`ServerEvent`] and [`ClientEvent`].
pub trait EventKind: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// Upper-case wire name of the event.
    fn name(&self) -> &'static str;

    /// Whether this event is too frequent to log.
    ///
    /// `args` is the message's argument list; some events are only noisy
    /// for particular argument values.
    fn is_noisy(&self, args: Option<&[Arg]>) -> bool;
}

/// Events sent from the server to its clients.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ServerEvent {
    /// Pixel data for one segment, or the whole screen (segment `-1`).
    ScreenSegmentUpdate,
    /// A segment changed and can be requested.
    ScreenSegmentChanged,
    /// The pointer moved.
    CursorMove,
    /// The pointer left the shared screen.
    CursorGone,
    /// The server is ready to read queued input events.
    ReadInputEvents,
    /// Another peer changed the clipboard.
    ClipboardChanged,
    /// New clipboard contents for the client.
    SetClipboard,
    /// The server closed the connection.
    ConnectionClosed,
}

impl EventKind for ServerEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::ScreenSegmentUpdate => "SCREEN_SEGMENT_UPDATE",
            Self::ScreenSegmentChanged => "SCREEN_SEGMENT_CHANGED",
            Self::CursorMove => "CURSOR_MOVE",
            Self::CursorGone => "CURSOR_GONE",
            Self::ReadInputEvents => "READ_INPUT_EVENTS",
            Self::ClipboardChanged => "CLIPBOARD_CHANGED",
            Self::SetClipboard => "SET_CLIPBOARD",
            Self::ConnectionClosed => "CONNECTION_CLOSED",
        }
    }

    fn is_noisy(&self, args: Option<&[Arg]>) -> bool {
        match self {
            Self::ScreenSegmentChanged
            | Self::CursorMove
            | Self::CursorGone
            | Self::ReadInputEvents => true,
            Self::ScreenSegmentUpdate => !first_arg_is_whole_screen(args),
            _ => false,
        }
    }
}

/// Events sent from a client to the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClientEvent {
    /// Request pixel data for one segment, or the whole screen (`-1`).
    GetScreenSegment,
    /// Forward keyboard/pointer input to the server.
    OfferInput,
    /// Request the server's clipboard contents.
    GetClipboard,
    /// Push new clipboard contents to the server.
    SetClipboard,
}

impl EventKind for ClientEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::GetScreenSegment => "GET_SCREEN_SEGMENT",
            Self::OfferInput => "OFFER_INPUT",
            Self::GetClipboard => "GET_CLIPBOARD",
            Self::SetClipboard => "SET_CLIPBOARD",
        }
    }

    fn is_noisy(&self, args: Option<&[Arg]>) -> bool {
        match self {
            Self::OfferInput => true,
            Self::GetScreenSegment => !first_arg_is_whole_screen(args),
            _ => false,
        }
    }
}

fn first_arg_is_whole_screen(args: Option<&[Arg]>) -> bool {
    matches!(
        args.and_then(|a| a.first()).and_then(Arg::as_int),
        Some(-1)
    )
}

/// Render an event as `"<source> sent event: NAME - [a, b]"`.
///
/// Argument-less events render as `" - null"`.
pub fn format_event<E: EventKind>(source: &str, event: E, args: Option<&[Arg]>) -> String {
    let mut line = format!("{source} sent event: {}", event.name());
    match args {
        None => line.push_str(" - null"),
        Some(args) => {
            let rendered: Vec<String> = args.iter().map(Arg::to_string).collect();
            line.push_str(" - [");
            line.push_str(&rendered.join(", "));
            line.push(']');
        }
    }
    line
}

/// Log an event at `debug` level unless it is one of the high-rate
/// events filtered by [`EventKind::is_noisy`].
pub fn log_event<E: EventKind>(source: &str, event: E, args: Option<&[Arg]>) {
    if event.is_noisy(args) || !log::log_enabled!(log::Level::Debug) {
        return;
    }
    log::debug!("{}", format_event(source, event, args));
}
