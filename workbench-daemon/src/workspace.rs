//! The set of known projects and the operations callers perform on them.
//!
//! A [`Workspace`] owns one [`LinkStore`] per project, the
//! [`StatusMachine`], and the sink that lifecycle events are published to.
//! Project metadata (including each project's links and current status) is
//! persisted through the registry after every accepted change, separately
//! from the per-project environment file the link store maintains.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;

use workbench_core::{registry, Link, NewLink, Ports, ProjectId, ProjectInfo, ValidationError};
use workbench_events::{
    EventSink, NewProjectAdded, OperationStatus, ProjectCreation, ProjectDeletion, ProjectEvent,
    ProjectRestartResult, ProjectValidated, SettingsChanged, Severity, Shutdown,
    ValidationResult,
};
use workbench_links::{LinkError, LinkStore};

use crate::error::DaemonError;
use crate::log_watcher::{LogTarget, LogWatchCommand};
use crate::status::{ProjectStatus, StatusMachine, StatusUpdate};

/// A project setting that can be changed at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectSetting {
    ContextRoot(String),
    InternalPort(u16),
}

impl ProjectSetting {
    /// Wire name reported in `settings-changed`.
    pub fn name(&self) -> &'static str {
        match self {
            ProjectSetting::ContextRoot(_) => "contextRoot",
            ProjectSetting::InternalPort(_) => "internalPort",
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            ProjectSetting::ContextRoot(root) if !root.starts_with('/') => {
                Err(ValidationError::invalid_parameters(format!(
                    "contextRoot must start with '/', got '{root}'"
                )))
            }
            ProjectSetting::InternalPort(0) => Err(ValidationError::invalid_parameters(
                "internalPort must be between 1 and 65535",
            )),
            _ => Ok(()),
        }
    }
}

/// Outcome of restarting a project's application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartOutcome {
    Started { start_mode: String, ports: Ports },
    Failed(String),
}

#[derive(Debug)]
struct ProjectEntry {
    info: ProjectInfo,
    links: Arc<LinkStore>,
}

pub struct Workspace {
    home: PathBuf,
    projects: HashMap<ProjectId, ProjectEntry>,
    status: StatusMachine,
    sink: Arc<dyn EventSink>,
    log_watch: Option<mpsc::UnboundedSender<LogWatchCommand>>,
}

impl Workspace {
    /// An empty workspace persisting under `home`.
    pub fn new(home: impl Into<PathBuf>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            home: home.into(),
            projects: HashMap::new(),
            status: StatusMachine::new(),
            sink,
            log_watch: None,
        }
    }

    /// Reload every persisted project. No events are published.
    pub fn load(home: impl Into<PathBuf>, sink: Arc<dyn EventSink>) -> Result<Self, DaemonError> {
        let mut workspace = Self::new(home, sink);
        let projects_dir = registry::projects_dir_at(&workspace.home);
        if projects_dir.exists() {
            for info in registry::list_projects_at(&workspace.home)? {
                if let Err(err) = info.project_id.validate() {
                    tracing::warn!(error = %err, "skipping project metadata with unusable id");
                    continue;
                }
                workspace.insert(info);
            }
        }
        tracing::info!(
            projects = workspace.projects.len(),
            home = %workspace.home.display(),
            "workspace loaded",
        );
        Ok(workspace)
    }

    /// Forward log-directory changes to a running log watcher.
    pub fn attach_log_watcher(&mut self, tx: mpsc::UnboundedSender<LogWatchCommand>) {
        self.log_watch = Some(tx);
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Known project ids, sorted.
    pub fn project_ids(&self) -> Vec<ProjectId> {
        let mut ids: Vec<ProjectId> = self.projects.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn project(&self, id: &ProjectId) -> Result<&ProjectInfo, ValidationError> {
        self.entry(id).map(|entry| &entry.info)
    }

    pub fn status(&self, id: &ProjectId) -> Result<&ProjectStatus, ValidationError> {
        self.status.current(id).ok_or_else(|| unknown_project(id))
    }

    /// Log targets of every project that configures log directories.
    pub fn log_targets(&self) -> Vec<LogTarget> {
        let mut targets: Vec<LogTarget> = self
            .projects
            .values()
            .filter_map(|entry| LogTarget::for_project(&entry.info))
            .collect();
        targets.sort_by(|a, b| a.project_id.cmp(&b.project_id));
        targets
    }

    /// Register an existing project and publish `new-project-added`.
    pub fn add_project(&mut self, info: ProjectInfo) -> Result<(), DaemonError> {
        info.project_id.validate()?;
        if self.projects.contains_key(&info.project_id) {
            return Err(ValidationError::exists(format!(
                "project '{}' already exists",
                info.project_id
            ))
            .into());
        }

        registry::save_project_at(&self.home, &info)?;
        let event = ProjectEvent::NewProjectAdded(NewProjectAdded {
            project_id: info.project_id.clone(),
            ignored_paths: info.ignored_paths.clone(),
        });
        if let Some(target) = LogTarget::for_project(&info) {
            self.send_log_command(LogWatchCommand::Watch(target));
        }
        tracing::info!(project = %info.project_id, name = %info.name, "project added");
        self.insert(info);
        self.sink.publish(event);
        Ok(())
    }

    /// Add a newly created project and report the creation outcome with
    /// `project-creation`, whether it succeeded or not.
    pub fn create_project(&mut self, info: ProjectInfo) -> Result<(), DaemonError> {
        let project_id = info.project_id.clone();
        let ports = (!info.ports.is_empty()).then(|| info.ports.clone());
        match self.add_project(info) {
            Ok(()) => {
                self.sink.publish(ProjectEvent::ProjectCreation(ProjectCreation {
                    project_id,
                    status: OperationStatus::Success,
                    host: None,
                    ports,
                    error: None,
                }));
                Ok(())
            }
            Err(err) => {
                tracing::warn!(project = %project_id, error = %err, "project creation failed");
                self.sink.publish(ProjectEvent::ProjectCreation(ProjectCreation {
                    project_id,
                    status: OperationStatus::Failed,
                    host: None,
                    ports: None,
                    error: Some(err.to_string()),
                }));
                Err(err)
            }
        }
    }

    /// Forget a project and delete its metadata. Publishes
    /// `project-deletion` with the outcome once the project is known.
    pub fn remove_project(&mut self, id: &ProjectId) -> Result<ProjectInfo, DaemonError> {
        self.entry(id)?;

        if let Err(err) = registry::delete_project_at(&self.home, id) {
            tracing::error!(project = %id, error = %err, "failed to delete project metadata");
            self.sink.publish(ProjectEvent::ProjectDeletion(ProjectDeletion {
                project_id: id.clone(),
                status: OperationStatus::Failed,
                error: Some(err.to_string()),
            }));
            return Err(err.into());
        }

        self.status.remove_project(id);
        self.send_log_command(LogWatchCommand::Unwatch(id.clone()));
        let removed = self.projects.remove(id).map(|entry| entry.info);
        tracing::info!(project = %id, "project removed");
        self.sink.publish(ProjectEvent::ProjectDeletion(ProjectDeletion {
            project_id: id.clone(),
            status: OperationStatus::Success,
            error: None,
        }));
        removed.ok_or_else(|| unknown_project(id).into())
    }

    /// The project's link store.
    pub fn links(&self, id: &ProjectId) -> Result<Arc<LinkStore>, ValidationError> {
        self.entry(id).map(|entry| Arc::clone(&entry.links))
    }

    pub fn add_link(&mut self, id: &ProjectId, new_link: NewLink) -> Result<Link, DaemonError> {
        let store = self.links(id)?;
        let result = store.add(new_link);
        self.sync_links(id, &store, result)
    }

    pub fn update_link(
        &mut self,
        id: &ProjectId,
        env_name: &str,
        new_env_name: &str,
        new_project_url: &str,
    ) -> Result<Link, DaemonError> {
        let store = self.links(id)?;
        let result = store.update(env_name, new_env_name, new_project_url);
        self.sync_links(id, &store, result)
    }

    pub fn delete_link(&mut self, id: &ProjectId, env_name: &str) -> Result<Link, DaemonError> {
        let store = self.links(id)?;
        let result = store.delete(env_name);
        self.sync_links(id, &store, result)
    }

    /// Record a reported status change, persist it and publish the
    /// matching status-changed event.
    ///
    /// A rejected update publishes nothing. Once accepted, the event is
    /// published even if persisting the metadata fails; that failure is
    /// still returned.
    pub fn update_status(&mut self, update: &StatusUpdate) -> Result<(), DaemonError> {
        let event = self.status.update(update)?;
        let persisted = match event.project_id() {
            Some(id) => self.persist_status(id),
            None => Ok(()),
        };
        self.sink.publish(event);
        persisted
    }

    /// Apply a setting and publish `settings-changed` with the outcome.
    pub fn change_setting(
        &mut self,
        id: &ProjectId,
        setting: ProjectSetting,
    ) -> Result<(), DaemonError> {
        let name = setting.name().to_string();
        let entry = project_entry(&mut self.projects, id)?;

        if let Err(err) = setting.validate() {
            self.sink.publish(ProjectEvent::SettingsChanged(SettingsChanged {
                project_id: id.clone(),
                name,
                status: OperationStatus::Failed,
                ports: None,
                context_root: None,
                error: Some(err.message.clone()),
            }));
            return Err(err.into());
        }

        let (ports, context_root) = match setting {
            ProjectSetting::ContextRoot(root) => {
                entry.info.context_root = root.clone();
                (None, Some(root))
            }
            ProjectSetting::InternalPort(port) => {
                entry.info.ports.internal_port = Some(port);
                (Some(entry.info.ports.clone()), None)
            }
        };
        entry.info.touch();
        let saved = registry::save_project_at(&self.home, &entry.info);

        let event = match &saved {
            Ok(()) => SettingsChanged {
                project_id: id.clone(),
                name,
                status: OperationStatus::Success,
                ports,
                context_root,
                error: None,
            },
            Err(err) => SettingsChanged {
                project_id: id.clone(),
                name,
                status: OperationStatus::Failed,
                ports: None,
                context_root: None,
                error: Some(err.to_string()),
            },
        };
        tracing::info!(project = %id, setting = %event.name, status = ?event.status, "setting changed");
        self.sink.publish(ProjectEvent::SettingsChanged(event));
        saved.map_err(Into::into)
    }

    /// Publish `project-validated` for a known project. The status is
    /// failed when any result is an error.
    pub fn report_validation(
        &self,
        id: &ProjectId,
        results: Vec<ValidationResult>,
    ) -> Result<(), ValidationError> {
        self.entry(id)?;
        let status = if results.iter().any(|r| r.severity == Severity::Error) {
            OperationStatus::Failed
        } else {
            OperationStatus::Success
        };
        self.sink.publish(ProjectEvent::ProjectValidated(ProjectValidated {
            project_id: id.clone(),
            status,
            results,
        }));
        Ok(())
    }

    /// Publish `project-restart-result` for a known project, recording the
    /// allocated ports on success.
    pub fn report_restart(
        &mut self,
        id: &ProjectId,
        outcome: RestartOutcome,
    ) -> Result<(), DaemonError> {
        let entry = project_entry(&mut self.projects, id)?;
        let (event, saved) = match outcome {
            RestartOutcome::Started { start_mode, ports } => {
                entry.info.ports = ports.clone();
                entry.info.touch();
                let saved = registry::save_project_at(&self.home, &entry.info);
                (ProjectRestartResult::success(id.clone(), start_mode, ports), saved)
            }
            RestartOutcome::Failed(message) => {
                (ProjectRestartResult::failed(id.clone(), message), Ok(()))
            }
        };
        self.sink.publish(ProjectEvent::ProjectRestartResult(event));
        saved.map_err(Into::into)
    }

    /// Publish the daemon-wide `shutdown` event.
    pub fn shutdown(&self) {
        tracing::info!("workspace shutting down");
        self.sink.publish(ProjectEvent::Shutdown(Shutdown {
            status: OperationStatus::Success,
            error: None,
        }));
    }

    fn insert(&mut self, info: ProjectInfo) {
        let links = Arc::new(LinkStore::new(info.location.clone(), info.links.clone()));
        self.status.register_project(
            info.project_id.clone(),
            ProjectStatus {
                app: info.app_status,
                build: info.build_status,
                ..ProjectStatus::default()
            },
        );
        self.projects
            .insert(info.project_id.clone(), ProjectEntry { info, links });
    }

    /// Copy the store's list into metadata after a link mutation.
    ///
    /// A rejected request changed nothing, so only committed mutations
    /// (including ones whose env-file write failed) are persisted.
    fn sync_links(
        &mut self,
        id: &ProjectId,
        store: &LinkStore,
        result: Result<Link, LinkError>,
    ) -> Result<Link, DaemonError> {
        let result = match result {
            Err(LinkError::Validation(err)) => return Err(err.into()),
            other => other,
        };
        let entry = project_entry(&mut self.projects, id)?;
        entry.info.links = store.get_all();
        entry.info.touch();
        let saved = registry::save_project_at(&self.home, &entry.info);
        let link = result?;
        saved?;
        Ok(link)
    }

    fn persist_status(&mut self, id: &ProjectId) -> Result<(), DaemonError> {
        let Some(current) = self.status.current(id).cloned() else {
            return Ok(());
        };
        let entry = project_entry(&mut self.projects, id)?;
        entry.info.app_status = current.app;
        entry.info.build_status = current.build;
        entry.info.touch();
        registry::save_project_at(&self.home, &entry.info).map_err(Into::into)
    }

    fn send_log_command(&self, command: LogWatchCommand) {
        if let Some(tx) = &self.log_watch {
            if tx.send(command).is_err() {
                tracing::debug!("log watcher not running");
            }
        }
    }

    fn entry(&self, id: &ProjectId) -> Result<&ProjectEntry, ValidationError> {
        self.projects.get(id).ok_or_else(|| unknown_project(id))
    }

}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("home", &self.home)
            .field("projects", &self.project_ids())
            .finish()
    }
}

fn project_entry<'a>(
    projects: &'a mut HashMap<ProjectId, ProjectEntry>,
    id: &ProjectId,
) -> Result<&'a mut ProjectEntry, ValidationError> {
    projects.get_mut(id).ok_or_else(|| unknown_project(id))
}

fn unknown_project(id: &ProjectId) -> ValidationError {
    ValidationError::not_found(format!("unknown project '{id}'"))
}
