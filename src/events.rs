//! Subscription-based notifications.
//!
//! [`EventDispatcher`] is the primitive behind every engine notification:
//! stacks expose dispatchers for committed, undone and redone operations,
//! groups for focus changes. Handlers are invoked synchronously on the
//! thread that triggered the event, after all internal locks have been
//! released, so a handler may query the engine re-entrantly.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Handle returned by [`EventDispatcher::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A list of subscribers sharing one event payload type.
pub struct EventDispatcher<T> {
    handlers: Mutex<Vec<(SubscriberId, Handler<T>)>>,
    next_id: AtomicU64,
}

impl<T> EventDispatcher<T> {
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a handler. The handler stays registered until
    /// [`unsubscribe`](Self::unsubscribe) is called with the returned id.
    pub fn subscribe(&self, handler: impl Fn(&T) + Send + Sync + 'static) -> SubscriberId {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.lock().push((id, Arc::new(handler)));
        id
    }

    /// Removes a handler. Returns `false` if the id was not registered.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut handlers = self.handlers.lock();
        let before = handlers.len();
        handlers.retain(|(h, _)| *h != id);
        handlers.len() != before
    }

    /// Invokes every registered handler with `value`.
    ///
    /// The handler list is snapshotted first, so handlers may subscribe or
    /// unsubscribe from within a callback without deadlocking.
    pub fn emit(&self, value: &T) {
        let snapshot: Vec<Handler<T>> = self
            .handlers
            .lock()
            .iter()
            .map(|(_, h)| h.clone())
            .collect();
        for handler in snapshot {
            handler(value);
        }
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.lock().is_empty()
    }
}

impl<T> Default for EventDispatcher<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for EventDispatcher<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("subscribers", &self.len())
            .finish()
    }
}
