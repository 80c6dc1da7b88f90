//! Inbound dispatch: callbacks keyed by command, plus condition/response triggers.
//!
//! For each frame the dispatcher collects, in order:
//!
//! 1. callbacks registered for [`Event::Any`], in registration order
//! 2. callbacks registered for the frame's command, in registration order
//! 3. responses of triggers whose condition holds, in registration order
//!
//! and spawns one task per invocation. The reader pump never waits for a
//! handler to finish, so handlers run concurrently with reading and with
//! each other. A handler that panics takes down only its own task.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use futures_util::future::BoxFuture;
use parking_lot::RwLock;
use tokio::sync::Semaphore;
use tracing::trace;

use crate::connection::Connection;
use crate::frame::Frame;

/// What a callback is subscribed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Event {
    /// Every inbound frame.
    Any,
    /// Frames with this command token (case-insensitive).
    Command(String),
}

impl Event {
    /// Subscribe to a specific command or numeric.
    pub fn command(command: impl Into<String>) -> Self {
        Event::Command(command.into().to_ascii_uppercase())
    }
}

impl From<&str> for Event {
    fn from(command: &str) -> Self {
        Event::command(command)
    }
}

/// Future returned by a [`Handler`].
pub type HandlerFuture = BoxFuture<'static, ()>;

/// Something that reacts to an inbound frame.
///
/// Implemented for any `Fn(Connection, Arc<Frame>) -> impl Future<Output = ()>`,
/// so plain async closures work:
///
/// ```ignore
/// conn.add_callback(Event::command("PRIVMSG"), |conn: Connection, msg: Arc<Frame>| async move {
///     if msg.trailing_text() == "hello" {
///         conn.reply(&msg, "Hi, How are you?");
///     }
/// });
/// ```
pub trait Handler: Send + Sync + 'static {
    fn call(&self, conn: Connection, frame: Arc<Frame>) -> HandlerFuture;
}

impl<F, Fut> Handler for F
where
    F: Fn(Connection, Arc<Frame>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn call(&self, conn: Connection, frame: Arc<Frame>) -> HandlerFuture {
        Box::pin((self)(conn, frame))
    }
}

type Condition = dyn Fn(&Connection, &Frame) -> bool + Send + Sync;

/// A condition/response pair evaluated against every inbound frame.
#[derive(Clone)]
pub struct Trigger {
    condition: Arc<Condition>,
    response: Arc<dyn Handler>,
}

impl Trigger {
    pub fn new<C, F, Fut>(condition: C, response: F) -> Self
    where
        C: Fn(&Connection, &Frame) -> bool + Send + Sync + 'static,
        F: Fn(Connection, Arc<Frame>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::with_handler(condition, response)
    }

    /// Build a trigger around any [`Handler`] implementation.
    pub fn with_handler<C, H>(condition: C, response: H) -> Self
    where
        C: Fn(&Connection, &Frame) -> bool + Send + Sync + 'static,
        H: Handler,
    {
        Self {
            condition: Arc::new(condition),
            response: Arc::new(response),
        }
    }

    fn matches(&self, conn: &Connection, frame: &Frame) -> bool {
        (self.condition)(conn, frame)
    }
}

impl std::fmt::Debug for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trigger").finish_non_exhaustive()
    }
}

/// How handler invocations are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpawnPolicy {
    /// One task per invocation, no limit.
    #[default]
    Unbounded,
    /// One task per invocation, at most this many running at once.
    /// Excess invocations queue in spawn order.
    Bounded(usize),
}

/// Routes inbound frames to registered callbacks and triggers.
pub struct Dispatcher {
    any: RwLock<Vec<Arc<dyn Handler>>>,
    keyed: DashMap<String, Vec<Arc<dyn Handler>>>,
    triggers: RwLock<Vec<Trigger>>,
    limit: RwLock<Option<Arc<Semaphore>>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            any: RwLock::new(Vec::new()),
            keyed: DashMap::new(),
            triggers: RwLock::new(Vec::new()),
            limit: RwLock::new(None),
        }
    }

    pub fn add_callback(&self, event: Event, handler: Arc<dyn Handler>) {
        match event {
            Event::Any => self.any.write().push(handler),
            Event::Command(command) => self
                .keyed
                .entry(command.to_ascii_uppercase())
                .or_default()
                .push(handler),
        }
    }

    pub fn add_trigger(&self, trigger: Trigger) {
        self.triggers.write().push(trigger);
    }

    pub fn set_spawn_policy(&self, policy: SpawnPolicy) {
        *self.limit.write() = match policy {
            SpawnPolicy::Unbounded => None,
            SpawnPolicy::Bounded(n) => Some(Arc::new(Semaphore::new(n.max(1)))),
        };
    }

    /// Handlers that should see `frame`, in dispatch order.
    pub(crate) fn handlers_for(&self, conn: &Connection, frame: &Frame) -> Vec<Arc<dyn Handler>> {
        let mut handlers: Vec<Arc<dyn Handler>> = self.any.read().clone();

        if let Some(keyed) = self.keyed.get(frame.command.as_str()) {
            handlers.extend(keyed.iter().cloned());
        }

        // Snapshot so a condition that registers a trigger cannot deadlock.
        let triggers = self.triggers.read().clone();
        handlers.extend(
            triggers
                .iter()
                .filter(|t| t.matches(conn, frame))
                .map(|t| Arc::clone(&t.response)),
        );

        handlers
    }

    /// Spawn every matching handler for `frame`.
    pub(crate) fn dispatch(&self, conn: &Connection, frame: &Arc<Frame>) {
        let handlers = self.handlers_for(conn, frame);
        if handlers.is_empty() {
            return;
        }
        trace!(command = %frame.command, handlers = handlers.len(), "Dispatching frame");

        let limit = self.limit.read().clone();
        for handler in handlers {
            let fut = handler.call(conn.clone(), Arc::clone(frame));
            match limit.clone() {
                None => {
                    tokio::spawn(fut);
                }
                Some(semaphore) => {
                    tokio::spawn(async move {
                        // The semaphore is never closed.
                        let Ok(_permit) = semaphore.acquire_owned().await else {
                            return;
                        };
                        fut.await;
                    });
                }
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("any", &self.any.read().len())
            .field("keyed", &self.keyed.len())
            .field("triggers", &self.triggers.read().len())
            .finish()
    }
}
