//! Workbench core library: domain types, project-metadata persistence, errors.
//!
//! - [`types`]: newtypes, links, status channels, project metadata
//! - [`error`]: [`ValidationError`] taxonomy and [`RegistryError`]
//! - [`registry`]: load / save / list / delete project metadata

pub mod error;
pub mod registry;
pub mod types;

pub use error::{ErrorKind, RegistryError, ValidationError};
pub use types::{
    AppState, BuildState, Link, LogDirs, NewLink, Ports, ProjectId, ProjectInfo,
};
