//! Listener registry and synchronous fan-out.
//!
//! A listener is registered under a name; registering the same name again
//! replaces the previous handler. [`EventEmitter::emit`] delivers one event
//! to every listener registered at that moment. A listener that returns an
//! error or panics is logged and skipped; the others still receive the
//! event and nothing is returned to the producer.
//!
//! Producers should depend on [`EventSink`] rather than on the emitter, so
//! the daemon can put an asynchronous queue in between.

use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;

use crate::error::ListenerError;
use crate::event::{EventKind, ProjectEvent};

/// Something invocable with an event kind and its payload.
///
/// Implemented for any `Fn(EventKind, &Value) -> Result<(), ListenerError>`.
pub trait Listener: Send + Sync {
    fn handle(&self, kind: EventKind, payload: &Value) -> Result<(), ListenerError>;
}

impl<F> Listener for F
where
    F: Fn(EventKind, &Value) -> Result<(), ListenerError> + Send + Sync,
{
    fn handle(&self, kind: EventKind, payload: &Value) -> Result<(), ListenerError> {
        self(kind, payload)
    }
}

/// Pins a closure to the [`Listener`] signature so its argument and
/// return types are inferred.
pub fn listener_fn<F>(f: F) -> F
where
    F: Fn(EventKind, &Value) -> Result<(), ListenerError> + Send + Sync,
{
    f
}

/// Destination for produced events.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: ProjectEvent);
}

/// Outcome of one [`EventEmitter::emit`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitReport {
    pub kind: EventKind,
    pub delivered: usize,
    /// Names of listeners that returned an error or panicked.
    pub failed: Vec<String>,
}

type ListenerMap = HashMap<String, Arc<dyn Listener>>;

/// Process-wide listener registry. Clones share the same registry.
#[derive(Clone, Default)]
pub struct EventEmitter {
    listeners: Arc<RwLock<ListenerMap>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` under `name`. Returns `true` if a listener with
    /// that name was replaced.
    pub fn register_listener(
        &self,
        name: impl Into<String>,
        listener: impl Listener + 'static,
    ) -> bool {
        let name = name.into();
        tracing::debug!(listener = %name, "registering listener");
        self.write()
            .insert(name, Arc::new(listener))
            .is_some()
    }

    /// Remove the listener registered under `name`.
    pub fn remove_listener(&self, name: &str) -> bool {
        self.write().remove(name).is_some()
    }

    /// Registered names, sorted.
    pub fn listener_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn listener_count(&self) -> usize {
        self.read().len()
    }

    /// Deliver `event` to every currently registered listener.
    pub fn emit(&self, event: &ProjectEvent) -> EmitReport {
        let kind = event.kind();
        // Snapshot so listeners may (un)register while handling.
        let listeners: Vec<(String, Arc<dyn Listener>)> = self
            .read()
            .iter()
            .map(|(name, l)| (name.clone(), Arc::clone(l)))
            .collect();

        let payload = match event.payload() {
            Ok(payload) => payload,
            Err(err) => {
                tracing::error!(event = %kind, error = %err, "failed to encode event payload");
                return EmitReport {
                    kind,
                    delivered: 0,
                    failed: listeners.into_iter().map(|(name, _)| name).collect(),
                };
            }
        };

        let mut delivered = 0usize;
        let mut failed = Vec::new();
        for (name, listener) in listeners {
            match catch_unwind(AssertUnwindSafe(|| listener.handle(kind, &payload))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(err)) => {
                    tracing::warn!(listener = %name, event = %kind, error = %err, "listener failed");
                    failed.push(name);
                }
                Err(_) => {
                    tracing::warn!(listener = %name, event = %kind, "listener panicked");
                    failed.push(name);
                }
            }
        }

        tracing::debug!(
            event = %kind,
            project = ?event.project_id().map(|p| p.0.as_str()),
            delivered,
            failed = failed.len(),
            "event emitted",
        );
        EmitReport {
            kind,
            delivered,
            failed,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, ListenerMap> {
        self.listeners.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, ListenerMap> {
        self.listeners.write().unwrap_or_else(|p| p.into_inner())
    }
}

impl EventSink for EventEmitter {
    fn publish(&self, event: ProjectEvent) {
        self.emit(&event);
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("listeners", &self.listener_names())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{OperationStatus, Shutdown};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn shutdown() -> ProjectEvent {
        ProjectEvent::Shutdown(Shutdown {
            status: OperationStatus::Success,
            error: None,
        })
    }

    #[test]
    fn reregistering_a_name_replaces_handler() {
        let emitter = EventEmitter::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&first);
        assert!(!emitter.register_listener(
            "ui",
            listener_fn(move |_, _| {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        ));
        let c = Arc::clone(&second);
        assert!(emitter.register_listener(
            "ui",
            listener_fn(move |_, _| {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        ));

        emitter.emit(&shutdown());
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(emitter.listener_count(), 1);
    }

    #[test]
    fn emit_with_no_listeners_is_fine() {
        let report = EventEmitter::new().emit(&shutdown());
        assert_eq!(report.delivered, 0);
        assert!(report.failed.is_empty());
    }

    #[test]
    fn listener_may_unregister_itself_while_handling() {
        let emitter = EventEmitter::new();
        let handle = emitter.clone();
        emitter.register_listener(
            "once",
            listener_fn(move |_, _| {
                handle.remove_listener("once");
                Ok(())
            }),
        );

        assert_eq!(emitter.emit(&shutdown()).delivered, 1);
        assert_eq!(emitter.emit(&shutdown()).delivered, 0);
    }
}
