//! Domain types for the workbench project registry.
//!
//! All path fields use `PathBuf`. Wire names (`projectID`, `envName`,
//! `appStatus`, ...) are consumed verbatim by UI clients and are pinned with
//! explicit serde renames.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Opaque identifier of a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub String);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ProjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProjectId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl ProjectId {
    /// The id names a metadata file, so it must be a single non-empty path
    /// component: no separators, no `..`, no NUL.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let id = self.0.as_str();
        if id.trim().is_empty() {
            return Err(ValidationError::invalid_parameters("projectID is required"));
        }
        if id == "." || id.contains("..") || id.contains(['/', '\\', '\0']) {
            return Err(ValidationError::invalid_parameters(format!(
                "projectID '{}' must not contain path separators or '..'",
                id.escape_default()
            )));
        }
        Ok(())
    }
}

impl AsRef<str> for ProjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Links
// ---------------------------------------------------------------------------

/// A declared dependency from the owning project onto another project,
/// exposed to the owner's runtime as `envName=projectURL`.
///
/// `env_name` is the identity key within one project's link set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    #[serde(rename = "projectID")]
    pub project_id: String,
    #[serde(rename = "projectURL")]
    pub project_url: String,
    #[serde(rename = "envName")]
    pub env_name: String,
    /// Optional fields (link type, parent registry URL, ...) kept as-is.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Link {
    pub fn new(
        project_id: impl Into<String>,
        project_url: impl Into<String>,
        env_name: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            project_url: project_url.into(),
            env_name: env_name.into(),
            extra: BTreeMap::new(),
        }
    }

    /// `envName=projectURL`
    pub fn env_pair(&self) -> String {
        format!("{}={}", self.env_name, self.project_url)
    }
}

/// Unvalidated add-link request.
///
/// Every required field is optional so that an absent key, a JSON `null`
/// and an empty string all reach [`NewLink::validate`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewLink {
    #[serde(rename = "projectID", default)]
    pub project_id: Option<String>,
    #[serde(rename = "projectURL", default)]
    pub project_url: Option<String>,
    #[serde(rename = "envName", default)]
    pub env_name: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl NewLink {
    pub fn new(
        project_id: impl Into<String>,
        project_url: impl Into<String>,
        env_name: impl Into<String>,
    ) -> Self {
        Self {
            project_id: Some(project_id.into()),
            project_url: Some(project_url.into()),
            env_name: Some(env_name.into()),
            extra: BTreeMap::new(),
        }
    }

    /// Checks the three required fields and produces a [`Link`].
    ///
    /// Uniqueness of `envName` is the link store's concern, not this one.
    pub fn validate(self) -> Result<Link, ValidationError> {
        let project_id = required("projectID", self.project_id)?;
        let project_url = required("projectURL", self.project_url)?;
        let env_name = required("envName", self.env_name)?;
        Ok(Link {
            project_id,
            project_url,
            env_name,
            extra: self.extra,
        })
    }
}

impl From<Link> for NewLink {
    fn from(link: Link) -> Self {
        Self {
            project_id: Some(link.project_id),
            project_url: Some(link.project_url),
            env_name: Some(link.env_name),
            extra: link.extra,
        }
    }
}

fn required(field: &str, value: Option<String>) -> Result<String, ValidationError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        Some(_) => Err(ValidationError::invalid_parameters(format!(
            "{field} must not be empty"
        ))),
        None => Err(ValidationError::invalid_parameters(format!(
            "{field} is required"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Status channels
// ---------------------------------------------------------------------------

/// Application status channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AppState {
    Starting,
    Started,
    Stopping,
    Stopped,
    #[default]
    Unknown,
}

impl AppState {
    pub fn as_str(self) -> &'static str {
        match self {
            AppState::Starting => "starting",
            AppState::Started => "started",
            AppState::Stopping => "stopping",
            AppState::Stopped => "stopped",
            AppState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "starting" => Ok(AppState::Starting),
            "started" => Ok(AppState::Started),
            "stopping" => Ok(AppState::Stopping),
            "stopped" => Ok(AppState::Stopped),
            "unknown" => Ok(AppState::Unknown),
            other => Err(ValidationError::invalid_parameters(format!(
                "unknown app status '{other}'; expected: starting, started, stopping, stopped, unknown"
            ))),
        }
    }
}

/// Build status channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BuildState {
    InProgress,
    Success,
    Failed,
    BuildRequired,
}

impl BuildState {
    pub fn as_str(self) -> &'static str {
        match self {
            BuildState::InProgress => "inProgress",
            BuildState::Success => "success",
            BuildState::Failed => "failed",
            BuildState::BuildRequired => "buildRequired",
        }
    }
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inProgress" => Ok(BuildState::InProgress),
            "success" => Ok(BuildState::Success),
            "failed" => Ok(BuildState::Failed),
            "buildRequired" => Ok(BuildState::BuildRequired),
            other => Err(ValidationError::invalid_parameters(format!(
                "unknown build status '{other}'; expected: inProgress, success, failed, buildRequired"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Project metadata
// ---------------------------------------------------------------------------

/// Ports allocated to a running project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ports {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exposed_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_debug_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exposed_debug_port: Option<u16>,
}

impl Ports {
    pub fn is_empty(&self) -> bool {
        *self == Ports::default()
    }
}

/// Log directories, relative to the project root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogDirs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<PathBuf>,
}

/// Persisted metadata for one project, including its link list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    #[serde(rename = "projectID")]
    pub project_id: ProjectId,
    pub name: String,
    /// Absolute path to the project root on disk.
    pub location: PathBuf,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub app_status: AppState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_status: Option<BuildState>,
    #[serde(default = "default_context_root")]
    pub context_root: String,
    #[serde(default, skip_serializing_if = "Ports::is_empty")]
    pub ports: Ports,
    #[serde(default)]
    pub ignored_paths: Vec<String>,
    #[serde(default)]
    pub logs: LogDirs,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectInfo {
    pub fn new(project_id: impl Into<ProjectId>, name: impl Into<String>, location: PathBuf) -> Self {
        let now = Utc::now();
        Self {
            project_id: project_id.into(),
            name: name.into(),
            location,
            links: vec![],
            app_status: AppState::Unknown,
            build_status: None,
            context_root: default_context_root(),
            ports: Ports::default(),
            ignored_paths: vec![],
            logs: LogDirs::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Bumps `updated_at`.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn default_context_root() -> String {
    "/".to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
