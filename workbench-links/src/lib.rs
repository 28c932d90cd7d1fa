//! # workbench-links
//!
//! Project-to-project links and their environment file.
//!
//! A [`LinkStore`] owns one project's ordered link list and rewrites
//! `.codewind-project-links.env` (see [`env_file`]) after every mutation.

pub mod env_file;
pub mod error;
pub mod store;

pub use env_file::ENV_FILE_NAME;
pub use error::LinkError;
pub use store::LinkStore;
