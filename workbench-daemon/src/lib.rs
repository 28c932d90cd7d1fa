//! Workbench daemon: per-project status tracking, the workspace of
//! projects and their links, asynchronous event delivery and log-list
//! watching.

pub mod config;
pub mod dispatcher;
mod error;
pub mod log_watcher;
pub mod paths;
mod runtime;
pub mod status;
pub mod workspace;

pub use config::DaemonConfig;
pub use dispatcher::EventDispatcher;
pub use error::DaemonError;
pub use log_watcher::{LogListTracker, LogTarget, LogWatchCommand};
pub use runtime::{event_log_listener, run, start_blocking, Daemon};
pub use status::{ProjectStatus, StatusChannel, StatusMachine, StatusUpdate};
pub use workspace::{ProjectSetting, RestartOutcome, Workspace};
