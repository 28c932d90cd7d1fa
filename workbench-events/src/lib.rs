//! # workbench-events
//!
//! Lifecycle/status event taxonomy and the listener registry that fans
//! events out to subscribers.
//!
//! Build a [`ProjectEvent`], then hand it to an [`EventSink`]; the
//! [`EventEmitter`] is the synchronous sink that delivers to every
//! registered [`Listener`].

pub mod emitter;
pub mod error;
pub mod event;
pub mod testing;

pub use emitter::{listener_fn, EmitReport, EventEmitter, EventSink, Listener};
pub use error::ListenerError;
pub use event::{
    AppStatusChanged, BuildStatusChanged, EventKind, LogGroup, LogListChanged, LogOrigin,
    NewProjectAdded, OperationStatus, ProjectCreation, ProjectDeletion, ProjectEvent,
    ProjectRestartResult, ProjectValidated, QuickFix, SettingsChanged, Severity, Shutdown,
    ValidationResult,
};
