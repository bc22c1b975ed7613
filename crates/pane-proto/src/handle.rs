//! Event handlers and dispatch.
//!
//! Each side of a connection owns a [`Dispatcher`] mapping the events it
//! receives to a [`Handle`] implementation. The dispatcher logs every
//! message through the noise filter in [`pane_core::log_event`], then
//! hands the arguments to the registered handler along with the
//! receiving side's session state.

use std::fmt;

use indexmap::IndexMap;
use pane_core::{log_event, Arg, EventKind, HandleError, Message};

/// Handles one kind of event against session state `S`.
pub trait Handle<S>: Send + Sync {
    /// Apply the event with arguments `args` (empty if it had none).
    fn handle(&self, state: &mut S, args: &[Arg]) -> Result<(), HandleError>;
}

impl<S, F> Handle<S> for F
where
    F: Fn(&mut S, &[Arg]) -> Result<(), HandleError> + Send + Sync,
{
    fn handle(&self, state: &mut S, args: &[Arg]) -> Result<(), HandleError> {
        self(state, args)
    }
}

/// Routes events of kind `E` to handlers over state `S`.
///
/// Handlers are kept in registration order, which is also the order
/// [`events`](Self::events) reports them in.
pub struct Dispatcher<E, S> {
    source: String,
    handlers: IndexMap<E, Box<dyn Handle<S>>>,
}

impl<E: EventKind, S> Dispatcher<E, S> {
    /// An empty dispatcher. `source` names the sending side in log lines
    /// (`"server"` for events a client receives, and vice versa).
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            handlers: IndexMap::new(),
        }
    }

    /// Register `handler` for `event`, replacing any earlier one.
    pub fn register(&mut self, event: E, handler: impl Handle<S> + 'static) -> &mut Self {
        self.handlers.insert(event, Box::new(handler));
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, event: E, handler: impl Handle<S> + 'static) -> Self {
        self.register(event, handler);
        self
    }

    /// Whether a handler is registered for `event`.
    pub fn handles(&self, event: E) -> bool {
        self.handlers.contains_key(&event)
    }

    /// Registered events, in registration order.
    pub fn events(&self) -> impl Iterator<Item = E> + '_ {
        self.handlers.keys().copied()
    }

    /// Log `message`, then run its handler against `state`.
    pub fn dispatch(&self, state: &mut S, message: &Message<E>) -> Result<(), HandleError> {
        log_event(&self.source, message.event, message.args.as_deref());
        let handler = self
            .handlers
            .get(&message.event)
            .ok_or(HandleError::Unhandled {
                event: message.event.name(),
            })?;
        handler.handle(state, message.args())
    }
}

impl<E: EventKind, S> fmt::Debug for Dispatcher<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("source", &self.source)
            .field("events", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
