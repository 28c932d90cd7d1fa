//! Lifecycle and status events.
//!
//! Each [`EventKind`] carries one fixed payload shape. Field names and
//! enumerated values are what UI clients and automation read, so they are
//! pinned with serde renames and must not drift:
//!
//! | Kind | Payload |
//! |------|---------|
//! | `project-creation` | [`ProjectCreation`] |
//! | `project-deletion` | [`ProjectDeletion`] |
//! | `project-validated` | [`ProjectValidated`] |
//! | `project-restart-result` | [`ProjectRestartResult`] |
//! | `app-status-changed` | [`AppStatusChanged`] |
//! | `build-status-changed` | [`BuildStatusChanged`] |
//! | `settings-changed` | [`SettingsChanged`] |
//! | `log-list-changed` | [`LogListChanged`] |
//! | `new-project-added` | [`NewProjectAdded`] |
//! | `shutdown` | [`Shutdown`] |

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use workbench_core::{AppState, BuildState, Ports, ProjectId};

// ---------------------------------------------------------------------------
// Kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    ProjectCreation,
    ProjectDeletion,
    ProjectValidated,
    ProjectRestartResult,
    AppStatusChanged,
    BuildStatusChanged,
    SettingsChanged,
    LogListChanged,
    NewProjectAdded,
    Shutdown,
}

impl EventKind {
    pub const ALL: [EventKind; 10] = [
        EventKind::ProjectCreation,
        EventKind::ProjectDeletion,
        EventKind::ProjectValidated,
        EventKind::ProjectRestartResult,
        EventKind::AppStatusChanged,
        EventKind::BuildStatusChanged,
        EventKind::SettingsChanged,
        EventKind::LogListChanged,
        EventKind::NewProjectAdded,
        EventKind::Shutdown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::ProjectCreation => "project-creation",
            EventKind::ProjectDeletion => "project-deletion",
            EventKind::ProjectValidated => "project-validated",
            EventKind::ProjectRestartResult => "project-restart-result",
            EventKind::AppStatusChanged => "app-status-changed",
            EventKind::BuildStatusChanged => "build-status-changed",
            EventKind::SettingsChanged => "settings-changed",
            EventKind::LogListChanged => "log-list-changed",
            EventKind::NewProjectAdded => "new-project-added",
            EventKind::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Shared payload pieces
// ---------------------------------------------------------------------------

/// Outcome of an operation reported through an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickFix {
    #[serde(rename = "fixID")]
    pub fix_id: String,
    pub realm: String,
    pub description: String,
}

/// One diagnostic produced by project validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub severity: Severity,
    pub filename: String,
    pub filepath: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quickfix: Option<QuickFix>,
}

/// Where a set of log files lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOrigin {
    Workspace,
    Container,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogGroup {
    pub origin: LogOrigin,
    pub files: Vec<String>,
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectCreation {
    #[serde(rename = "projectID")]
    pub project_id: ProjectId,
    pub status: OperationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<Ports>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDeletion {
    #[serde(rename = "projectID")]
    pub project_id: ProjectId,
    pub status: OperationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectValidated {
    #[serde(rename = "projectID")]
    pub project_id: ProjectId,
    pub status: OperationStatus,
    pub results: Vec<ValidationResult>,
}

/// Restart outcome. Ports are only reported on success; use the
/// constructors to keep it that way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRestartResult {
    #[serde(rename = "projectID")]
    pub project_id: ProjectId,
    pub status: OperationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<Ports>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
}

impl ProjectRestartResult {
    pub fn success(project_id: ProjectId, start_mode: impl Into<String>, ports: Ports) -> Self {
        Self {
            project_id,
            status: OperationStatus::Success,
            start_mode: Some(start_mode.into()),
            ports: Some(ports),
            error_msg: None,
        }
    }

    pub fn failed(project_id: ProjectId, error_msg: impl Into<String>) -> Self {
        Self {
            project_id,
            status: OperationStatus::Failed,
            start_mode: None,
            ports: None,
            error_msg: Some(error_msg.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppStatusChanged {
    #[serde(rename = "projectID")]
    pub project_id: ProjectId,
    pub app_status: AppState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_error_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detailed_app_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildStatusChanged {
    #[serde(rename = "projectID")]
    pub project_id: ProjectId,
    pub build_status: BuildState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detailed_build_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_image_last_build: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_image_last_build: Option<String>,
    #[serde(rename = "lastbuild", default, skip_serializing_if = "Option::is_none")]
    pub last_build: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsChanged {
    #[serde(rename = "projectID")]
    pub project_id: ProjectId,
    /// Setting name, e.g. `contextRoot` or `internalPort`.
    pub name: String,
    pub status: OperationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<Ports>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogListChanged {
    #[serde(rename = "projectID")]
    pub project_id: ProjectId,
    pub build: Vec<LogGroup>,
    pub app: Vec<LogGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProjectAdded {
    #[serde(rename = "projectID")]
    pub project_id: ProjectId,
    pub ignored_paths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shutdown {
    pub status: OperationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// ProjectEvent
// ---------------------------------------------------------------------------

/// One immutable lifecycle/status transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectEvent {
    ProjectCreation(ProjectCreation),
    ProjectDeletion(ProjectDeletion),
    ProjectValidated(ProjectValidated),
    ProjectRestartResult(ProjectRestartResult),
    AppStatusChanged(AppStatusChanged),
    BuildStatusChanged(BuildStatusChanged),
    SettingsChanged(SettingsChanged),
    LogListChanged(LogListChanged),
    NewProjectAdded(NewProjectAdded),
    Shutdown(Shutdown),
}

impl ProjectEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ProjectEvent::ProjectCreation(_) => EventKind::ProjectCreation,
            ProjectEvent::ProjectDeletion(_) => EventKind::ProjectDeletion,
            ProjectEvent::ProjectValidated(_) => EventKind::ProjectValidated,
            ProjectEvent::ProjectRestartResult(_) => EventKind::ProjectRestartResult,
            ProjectEvent::AppStatusChanged(_) => EventKind::AppStatusChanged,
            ProjectEvent::BuildStatusChanged(_) => EventKind::BuildStatusChanged,
            ProjectEvent::SettingsChanged(_) => EventKind::SettingsChanged,
            ProjectEvent::LogListChanged(_) => EventKind::LogListChanged,
            ProjectEvent::NewProjectAdded(_) => EventKind::NewProjectAdded,
            ProjectEvent::Shutdown(_) => EventKind::Shutdown,
        }
    }

    /// The project this event belongs to; `None` for daemon-wide events.
    pub fn project_id(&self) -> Option<&ProjectId> {
        match self {
            ProjectEvent::ProjectCreation(p) => Some(&p.project_id),
            ProjectEvent::ProjectDeletion(p) => Some(&p.project_id),
            ProjectEvent::ProjectValidated(p) => Some(&p.project_id),
            ProjectEvent::ProjectRestartResult(p) => Some(&p.project_id),
            ProjectEvent::AppStatusChanged(p) => Some(&p.project_id),
            ProjectEvent::BuildStatusChanged(p) => Some(&p.project_id),
            ProjectEvent::SettingsChanged(p) => Some(&p.project_id),
            ProjectEvent::LogListChanged(p) => Some(&p.project_id),
            ProjectEvent::NewProjectAdded(p) => Some(&p.project_id),
            ProjectEvent::Shutdown(_) => None,
        }
    }

    /// The payload as delivered to listeners.
    pub fn payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            ProjectEvent::ProjectCreation(p) => serde_json::to_value(p),
            ProjectEvent::ProjectDeletion(p) => serde_json::to_value(p),
            ProjectEvent::ProjectValidated(p) => serde_json::to_value(p),
            ProjectEvent::ProjectRestartResult(p) => serde_json::to_value(p),
            ProjectEvent::AppStatusChanged(p) => serde_json::to_value(p),
            ProjectEvent::BuildStatusChanged(p) => serde_json::to_value(p),
            ProjectEvent::SettingsChanged(p) => serde_json::to_value(p),
            ProjectEvent::LogListChanged(p) => serde_json::to_value(p),
            ProjectEvent::NewProjectAdded(p) => serde_json::to_value(p),
            ProjectEvent::Shutdown(p) => serde_json::to_value(p),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
