//! Named callback registry with synchronous fan-out.

use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error};

/// A registered callback.
pub type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Registry of callbacks keyed by event name.
///
/// Callbacks run on the emitting task, in registration order. A panicking
/// callback is reported and does not stop the callbacks after it. Once
/// [`close`](Self::close) is called no further callback starts, including the
/// rest of an emission already under way.
pub struct EventEmitter<E> {
    listeners: RwLock<HashMap<String, Vec<Listener<E>>>>,
    closed: AtomicBool,
}

impl<E> Default for EventEmitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for EventEmitter<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = self.listeners.read();
        let mut names: Vec<&String> = listeners.keys().collect();
        names.sort();
        f.debug_struct("EventEmitter").field("events", &names).finish()
    }
}

impl<E> EventEmitter<E> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Register a callback for `name`. Ignored once closed.
    pub fn on<F>(&self, name: impl Into<String>, callback: F)
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        if self.is_closed() {
            return;
        }
        self.listeners
            .write()
            .entry(name.into())
            .or_default()
            .push(Arc::new(callback));
    }

    /// Invoke every callback registered for `name`.
    ///
    /// Returns whether any callback was registered.
    pub fn emit(&self, name: &str, event: &E) -> bool {
        if self.is_closed() {
            return false;
        }

        // Snapshot so callbacks may register more listeners
        let listeners = match self.listeners.read().get(name) {
            Some(listeners) if !listeners.is_empty() => listeners.clone(),
            _ => return false,
        };

        for (index, listener) in listeners.iter().enumerate() {
            if self.is_closed() {
                debug!(event = name, skipped = listeners.len() - index, "Emitter closed mid-emit");
                break;
            }
            let result = panic::catch_unwind(AssertUnwindSafe(|| listener(event)));
            if let Err(payload) = result {
                error!(
                    event = name,
                    listener = index,
                    "Listener panicked: {}",
                    panic_message(payload.as_ref())
                );
            }
        }

        true
    }

    /// Number of callbacks registered for `name`.
    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners.read().get(name).map(Vec::len).unwrap_or(0)
    }

    /// Stop all further callbacks and drop every registered one. Idempotent.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.listeners.write().clear();
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
