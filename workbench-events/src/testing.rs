//! Test helpers for code that produces events.

use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::emitter::{EventSink, Listener};
use crate::error::ListenerError;
use crate::event::{EventKind, ProjectEvent};

/// Listener that records every `(kind, payload)` it receives.
///
/// Clones share the same buffer, so one clone can be registered while the
/// test keeps another to inspect.
#[derive(Debug, Clone, Default)]
pub struct RecordingListener {
    received: Arc<Mutex<Vec<(EventKind, Value)>>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received(&self) -> Vec<(EventKind, Value)> {
        self.received.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.received().into_iter().map(|(kind, _)| kind).collect()
    }

    pub fn of_kind(&self, kind: EventKind) -> Vec<Value> {
        self.received()
            .into_iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, payload)| payload)
            .collect()
    }
}

impl Listener for RecordingListener {
    fn handle(&self, kind: EventKind, payload: &Value) -> Result<(), ListenerError> {
        if let Ok(mut received) = self.received.lock() {
            received.push((kind, payload.clone()));
        }
        Ok(())
    }
}

/// [`EventSink`] that keeps published events in memory, in order.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    events: Arc<Mutex<Vec<ProjectEvent>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProjectEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl EventSink for CollectingSink {
    fn publish(&self, event: ProjectEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
