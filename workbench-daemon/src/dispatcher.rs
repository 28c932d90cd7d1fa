//! Queue between event producers and the listener fan-out.
//!
//! Producers publish through [`EventDispatcher`], which never blocks and
//! never calls a listener on the producer's thread. A single worker drains
//! the queue in order and hands each event to [`EventEmitter::emit`] on the
//! blocking pool. On the shutdown signal, or once every dispatcher clone is
//! dropped, the queue stops accepting events and the worker exits after
//! delivering what was already queued.

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use workbench_events::{EventEmitter, EventSink, ProjectEvent};

use crate::error::DaemonError;

#[derive(Debug, Clone)]
pub struct EventDispatcher {
    tx: mpsc::UnboundedSender<ProjectEvent>,
}

impl EventDispatcher {
    /// Spawn the delivery worker on the current runtime.
    pub fn spawn(
        emitter: EventEmitter,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> (Self, JoinHandle<Result<usize, DaemonError>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(dispatch_task(emitter, rx, shutdown_rx));
        (Self { tx }, handle)
    }
}

impl EventSink for EventDispatcher {
    fn publish(&self, event: ProjectEvent) {
        let kind = event.kind();
        if self.tx.send(event).is_err() {
            tracing::warn!(event = %kind, "event dropped: dispatcher stopped");
        }
    }
}

/// Deliver queued events until the queue is closed and empty. Returns how
/// many events were handed to the emitter.
async fn dispatch_task(
    emitter: EventEmitter,
    mut rx: mpsc::UnboundedReceiver<ProjectEvent>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<usize, DaemonError> {
    let mut dispatched = 0usize;
    let mut closing = false;
    loop {
        let event = tokio::select! {
            biased;
            event = rx.recv() => event,
            _ = shutdown_rx.recv(), if !closing => {
                closing = true;
                rx.close();
                continue;
            }
        };
        let Some(event) = event else { break };
        let emitter = emitter.clone();
        let report = tokio::task::spawn_blocking(move || emitter.emit(&event))
            .await
            .map_err(|err| DaemonError::Runtime(format!("event delivery join error: {err}")))?;
        if !report.failed.is_empty() {
            tracing::debug!(
                event = %report.kind,
                failed = ?report.failed,
                "event delivered with listener failures",
            );
        }
        dispatched += 1;
    }
    tracing::debug!(dispatched, "event dispatcher stopped");
    Ok(dispatched)
}
