//! Per-project status channels.
//!
//! Each known project has two independent channels, `appState` and
//! `buildState`. Every accepted [`StatusUpdate`] becomes the current value
//! of its channel and yields exactly one status-changed event; repeated
//! identical updates are not suppressed here.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use workbench_core::{AppState, BuildState, ProjectId, ValidationError};
use workbench_events::{AppStatusChanged, BuildStatusChanged, ProjectEvent};

/// Which status channel an update targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusChannel {
    AppState,
    BuildState,
}

impl StatusChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusChannel::AppState => "appState",
            StatusChannel::BuildState => "buildState",
        }
    }
}

impl fmt::Display for StatusChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusChannel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "appState" => Ok(StatusChannel::AppState),
            "buildState" => Ok(StatusChannel::BuildState),
            other => Err(ValidationError::invalid_parameters(format!(
                "unknown status type '{other}'; expected: appState, buildState"
            ))),
        }
    }
}

/// An externally reported status change, as received.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    #[serde(rename = "projectID", default)]
    pub project_id: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detailed_app_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detailed_build_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_image_last_build: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_image_last_build: Option<String>,
    #[serde(rename = "lastbuild", default, skip_serializing_if = "Option::is_none")]
    pub last_build: Option<i64>,
}

impl StatusUpdate {
    pub fn app(project: impl Into<String>, state: AppState) -> Self {
        Self {
            project_id: Some(project.into()),
            kind: Some(StatusChannel::AppState.as_str().to_string()),
            status: Some(state.as_str().to_string()),
            ..Self::default()
        }
    }

    pub fn build(project: impl Into<String>, state: BuildState) -> Self {
        Self {
            project_id: Some(project.into()),
            kind: Some(StatusChannel::BuildState.as_str().to_string()),
            status: Some(state.as_str().to_string()),
            ..Self::default()
        }
    }
}

/// Current values of a project's two channels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectStatus {
    pub app: AppState,
    pub app_error: Option<String>,
    pub detailed_app_status: Option<String>,
    pub build: Option<BuildState>,
    pub detailed_build_status: Option<String>,
}

#[derive(Debug, Default)]
pub struct StatusMachine {
    projects: HashMap<ProjectId, ProjectStatus>,
}

impl StatusMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_project(&mut self, project: ProjectId, initial: ProjectStatus) {
        self.projects.insert(project, initial);
    }

    pub fn remove_project(&mut self, project: &ProjectId) -> Option<ProjectStatus> {
        self.projects.remove(project)
    }

    pub fn current(&self, project: &ProjectId) -> Option<&ProjectStatus> {
        self.projects.get(project)
    }

    pub fn contains(&self, project: &ProjectId) -> bool {
        self.projects.contains_key(project)
    }

    /// Record `update` and return the event describing it.
    ///
    /// Parameters are validated before the project is looked up, so a
    /// malformed update for an unknown project is `INVALID_PARAMETERS`.
    pub fn update(&mut self, update: &StatusUpdate) -> Result<ProjectEvent, ValidationError> {
        let project_id = present("projectID", update.project_id.as_deref())?;
        let channel: StatusChannel = present("type", update.kind.as_deref())?.parse()?;
        let status = present("status", update.status.as_deref())?;

        let project_id = ProjectId::from(project_id);
        let event = match channel {
            StatusChannel::AppState => {
                let app_status: AppState = status.parse()?;
                let current = self.lookup(&project_id)?;
                current.app = app_status;
                current.app_error = update.error.clone();
                current.detailed_app_status = update.detailed_app_status.clone();
                ProjectEvent::AppStatusChanged(AppStatusChanged {
                    project_id,
                    app_status,
                    app_error_status: update.error.clone(),
                    detailed_app_status: update.detailed_app_status.clone(),
                })
            }
            StatusChannel::BuildState => {
                let build_status: BuildState = status.parse()?;
                let current = self.lookup(&project_id)?;
                current.build = Some(build_status);
                current.detailed_build_status = update.detailed_build_status.clone();
                ProjectEvent::BuildStatusChanged(BuildStatusChanged {
                    project_id,
                    build_status,
                    detailed_build_status: update.detailed_build_status.clone(),
                    app_image_last_build: update.app_image_last_build.clone(),
                    build_image_last_build: update.build_image_last_build.clone(),
                    last_build: update.last_build,
                })
            }
        };

        tracing::debug!(
            project = ?event.project_id().map(|p| p.0.as_str()),
            channel = %channel,
            status,
            "status recorded",
        );
        Ok(event)
    }

    fn lookup(&mut self, project: &ProjectId) -> Result<&mut ProjectStatus, ValidationError> {
        self.projects
            .get_mut(project)
            .ok_or_else(|| ValidationError::not_found(format!("unknown project '{project}'")))
    }
}

fn present<'a>(field: &str, value: Option<&'a str>) -> Result<&'a str, ValidationError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ValidationError::invalid_parameters(format!(
            "{field} is required"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use workbench_core::ErrorKind;
    use workbench_events::EventKind;

    fn machine_with(project: &str) -> StatusMachine {
        let mut m = StatusMachine::new();
        m.register_project(ProjectId::from(project), ProjectStatus::default());
        m
    }

    #[test]
    fn app_update_on_known_project_yields_app_event() {
        let mut m = machine_with("p1");
        let update: StatusUpdate =
            serde_json::from_value(json!({"projectID": "p1", "type": "appState", "status": "started"}))
                .unwrap();

        let event = m.update(&update).unwrap();

        assert_eq!(event.kind(), EventKind::AppStatusChanged);
        assert_eq!(event.payload().unwrap()["appStatus"], "started");
        assert_eq!(m.current(&ProjectId::from("p1")).unwrap().app, AppState::Started);
    }

    #[test]
    fn unknown_project_is_not_found_and_nothing_recorded() {
        let mut m = machine_with("p1");
        let err = m.update(&StatusUpdate::app("p2", AppState::Started)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert!(!m.contains(&ProjectId::from("p2")));
    }

    #[test]
    fn missing_fields_are_invalid() {
        let mut m = machine_with("p1");
        for raw in [
            json!({"type": "appState", "status": "started"}),
            json!({"projectID": "p1", "status": "started"}),
            json!({"projectID": "p1", "type": "appState"}),
            json!({"projectID": null, "type": "appState", "status": "started"}),
            json!({"projectID": "p1", "type": "", "status": "started"}),
        ] {
            let update: StatusUpdate = serde_json::from_value(raw.clone()).unwrap();
            let err = m.update(&update).unwrap_err();
            assert_eq!(err.kind, ErrorKind::InvalidParameters, "{raw}");
        }
    }

    #[test]
    fn unknown_type_or_value_is_invalid() {
        let mut m = machine_with("p1");
        let mut update = StatusUpdate::app("p1", AppState::Started);
        update.kind = Some("deployState".to_string());
        assert_eq!(m.update(&update).unwrap_err().kind, ErrorKind::InvalidParameters);

        let mut update = StatusUpdate::build("p1", BuildState::Success);
        update.status = Some("started".to_string());
        assert_eq!(m.update(&update).unwrap_err().kind, ErrorKind::InvalidParameters);
    }

    #[test]
    fn build_update_carries_optional_fields() {
        let mut m = machine_with("p1");
        let mut update = StatusUpdate::build("p1", BuildState::Failed);
        update.detailed_build_status = Some("compile error".to_string());
        update.last_build = Some(42);

        let payload = m.update(&update).unwrap().payload().unwrap();

        assert_eq!(
            payload,
            json!({
                "projectID": "p1",
                "buildStatus": "failed",
                "detailedBuildStatus": "compile error",
                "lastbuild": 42,
            })
        );
        let current = m.current(&ProjectId::from("p1")).unwrap();
        assert_eq!(current.build, Some(BuildState::Failed));
        assert_eq!(current.app, AppState::Unknown, "channels are independent");
    }

    #[test]
    fn repeated_identical_updates_each_yield_an_event() {
        let mut m = machine_with("p1");
        let update = StatusUpdate::app("p1", AppState::Stopped);
        assert!(m.update(&update).is_ok());
        assert!(m.update(&update).is_ok());
    }
}
