use thiserror::Error;

/// Failure reported by a single listener.
///
/// The emitter logs it and moves on to the next listener; it never reaches
/// the component that produced the event.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("listener rejected event: {0}")]
    Rejected(String),

    #[error("listener I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("listener JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
