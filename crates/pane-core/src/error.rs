//! Error types for protocol event handlers.

use std::error::Error;
use std::fmt;

/// Errors returned by a protocol event handler.
///
/// Handlers validate their arguments before touching shared state, so
/// any of these leaves the session unchanged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandleError {
    /// The event's arguments were missing, of the wrong kind, or out of range.
    BadArguments {
        /// Name of the event being handled.
        event: &'static str,
        /// What was wrong with the arguments.
        reason: String,
    },
    /// No handler is registered for the event.
    Unhandled {
        /// Name of the unhandled event.
        event: &'static str,
    },
    /// The session was closed before the event arrived.
    SessionClosed,
}

impl HandleError {
    /// Shorthand for [`HandleError::BadArguments`].
    pub fn bad_args(event: &'static str, reason: impl Into<String>) -> Self {
        Self::BadArguments {
            event,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for HandleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadArguments { event, reason } => {
                write!(f, "bad arguments for {event}: {reason}")
            }
            Self::Unhandled { event } => write!(f, "no handler registered for {event}"),
            Self::SessionClosed => write!(f, "session is closed"),
        }
    }
}

impl Error for HandleError {}
