//! Watches project log directories and reports log-list changes.
//!
//! Each project may configure a build and an app log directory. The watcher
//! rescans a project's `*.log` files after filesystem activity settles for
//! the debounce window, and publishes `log-list-changed` only when the
//! listing differs from the last one published for that project.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;

use workbench_core::{ProjectId, ProjectInfo};
use workbench_events::{EventSink, LogGroup, LogListChanged, LogOrigin, ProjectEvent};

use crate::error::DaemonError;
use crate::paths::LOG_FILE_EXTENSION;

/// Log directories of one project, resolved against its location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogTarget {
    pub project_id: ProjectId,
    pub build_dir: Option<PathBuf>,
    pub app_dir: Option<PathBuf>,
}

impl LogTarget {
    /// `None` when the project configures no log directories.
    pub fn for_project(info: &ProjectInfo) -> Option<Self> {
        if info.logs.build.is_none() && info.logs.app.is_none() {
            return None;
        }
        let resolve = |dir: &PathBuf| canonical(&info.location.join(dir));
        Some(Self {
            project_id: info.project_id.clone(),
            build_dir: info.logs.build.as_ref().map(resolve),
            app_dir: info.logs.app.as_ref().map(resolve),
        })
    }

    pub fn dirs(&self) -> impl Iterator<Item = &Path> {
        self.build_dir
            .iter()
            .chain(self.app_dir.iter())
            .map(PathBuf::as_path)
    }

    /// True for a log directory, a file directly inside one, or a missing
    /// ancestor of one being created or removed.
    fn covers(&self, path: &Path) -> bool {
        self.dirs()
            .any(|dir| dir.starts_with(path) || path.parent() == Some(dir))
    }

    /// Current listing as a `log-list-changed` payload.
    pub fn snapshot(&self) -> LogListChanged {
        let group = |dir: &Option<PathBuf>| {
            dir.as_deref()
                .map(|d| {
                    vec![LogGroup {
                        origin: LogOrigin::Workspace,
                        files: scan_dir(d),
                    }]
                })
                .unwrap_or_default()
        };
        LogListChanged {
            project_id: self.project_id.clone(),
            build: group(&self.build_dir),
            app: group(&self.app_dir),
        }
    }
}

/// Requests sent to a running watcher as projects come and go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogWatchCommand {
    Watch(LogTarget),
    Unwatch(ProjectId),
}

/// Sorted paths of the `*.log` files directly inside `dir`. A missing or
/// unreadable directory lists as empty.
pub fn scan_dir(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return vec![];
    };
    let mut files: Vec<String> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_log_file(path))
        .map(|path| path.display().to_string())
        .collect();
    files.sort();
    files
}

fn is_log_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(LOG_FILE_EXTENSION))
        .unwrap_or(false)
}

/// Remembers the last published listing per project.
#[derive(Debug, Default)]
pub struct LogListTracker {
    last: HashMap<ProjectId, LogListChanged>,
}

impl LogListTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rescan `target`; returns an event only if the file lists changed.
    /// The baseline for an unseen project is "no files".
    pub fn observe(&mut self, target: &LogTarget) -> Option<ProjectEvent> {
        let current = target.snapshot();
        let changed = match self.last.get(&target.project_id) {
            Some(previous) => files_of(previous) != files_of(&current),
            None => files_of(&current).iter().any(|files| !files.is_empty()),
        };
        self.last.insert(target.project_id.clone(), current.clone());
        changed.then_some(ProjectEvent::LogListChanged(current))
    }

    pub fn forget(&mut self, project: &ProjectId) {
        self.last.remove(project);
    }
}

fn files_of(list: &LogListChanged) -> [Vec<&str>; 2] {
    fn flatten(groups: &[LogGroup]) -> Vec<&str> {
        groups
            .iter()
            .flat_map(|g| g.files.iter().map(String::as_str))
            .collect()
    }
    [flatten(&list.build), flatten(&list.app)]
}

/// Run the watcher until `shutdown_rx` fires.
///
/// Every target is scanned once at startup. Afterwards a target is
/// rescanned `debounce` after the first filesystem event touching one of
/// its directories; later events inside that window are folded into the
/// same rescan.
pub async fn watch_logs(
    initial_targets: Vec<LogTarget>,
    sink: Arc<dyn EventSink>,
    debounce: Duration,
    mut commands: mpsc::UnboundedReceiver<LogWatchCommand>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
    let mut watcher: RecommendedWatcher = recommended_watcher(move |event| {
        let _ = event_tx.send(event);
    })?;

    let mut targets: HashMap<ProjectId, LogTarget> = HashMap::new();
    let mut watched = HashSet::new();
    let mut tracker = LogListTracker::new();
    let mut pending: HashMap<ProjectId, Instant> = HashMap::new();
    let mut commands_open = true;

    for target in initial_targets {
        targets.insert(target.project_id.clone(), target);
    }
    sync_watches(&mut watcher, &mut watched, &targets);
    for target in targets.values() {
        publish_if_changed(&mut tracker, target, sink.as_ref());
    }

    loop {
        let next_due = pending.values().min().copied();
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            command = commands.recv(), if commands_open => match command {
                Some(LogWatchCommand::Watch(target)) => {
                    let id = target.project_id.clone();
                    targets.insert(id.clone(), target);
                    sync_watches(&mut watcher, &mut watched, &targets);
                    if let Some(target) = targets.get(&id) {
                        publish_if_changed(&mut tracker, target, sink.as_ref());
                    }
                }
                Some(LogWatchCommand::Unwatch(id)) => {
                    targets.remove(&id);
                    pending.remove(&id);
                    tracker.forget(&id);
                    sync_watches(&mut watcher, &mut watched, &targets);
                    tracing::debug!(project = %id, "stopped watching logs");
                }
                None => commands_open = false,
            },
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                let event = match event {
                    Ok(event) => event,
                    Err(err) => {
                        tracing::warn!(error = %err, "log watcher event error");
                        continue;
                    }
                };
                if !is_relevant_event_kind(&event.kind) {
                    continue;
                }
                let now = Instant::now();
                for path in &event.paths {
                    for target in targets.values() {
                        if target.covers(path) {
                            pending.entry(target.project_id.clone()).or_insert(now + debounce);
                        }
                    }
                }
                // A missing log directory or one of its ancestors may have
                // just appeared or gone away.
                sync_watches(&mut watcher, &mut watched, &targets);
            },
            _ = sleep_until(next_due) => {
                let now = Instant::now();
                let due: Vec<ProjectId> = pending
                    .iter()
                    .filter(|(_, at)| **at <= now)
                    .map(|(id, _)| id.clone())
                    .collect();
                sync_watches(&mut watcher, &mut watched, &targets);
                for id in due {
                    pending.remove(&id);
                    if let Some(target) = targets.get(&id) {
                        publish_if_changed(&mut tracker, target, sink.as_ref());
                    }
                }
            },
        }
    }

    tracing::debug!("log watcher stopped");
    Ok(())
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn publish_if_changed(tracker: &mut LogListTracker, target: &LogTarget, sink: &dyn EventSink) {
    if let Some(event) = tracker.observe(target) {
        tracing::info!(project = %target.project_id, "log list changed");
        sink.publish(event);
    }
}

/// Bring the notify registrations in line with `targets`: each log
/// directory is watched itself once it exists, and through its nearest
/// existing ancestor until then. Paths no target needs any more are
/// unwatched.
fn sync_watches(
    watcher: &mut RecommendedWatcher,
    watched: &mut HashSet<PathBuf>,
    targets: &HashMap<ProjectId, LogTarget>,
) {
    let wanted: HashSet<PathBuf> = targets
        .values()
        .flat_map(|target| target.dirs())
        .filter_map(nearest_existing)
        .collect();

    let stale: Vec<PathBuf> = watched.difference(&wanted).cloned().collect();
    for path in stale {
        if let Err(err) = watcher.unwatch(&path) {
            // Removing a watched directory drops its watch implicitly.
            tracing::debug!(path = %path.display(), error = %err, "unwatch failed");
        }
        watched.remove(&path);
    }

    for path in wanted {
        if watched.contains(&path) {
            continue;
        }
        match watcher.watch(&path, RecursiveMode::NonRecursive) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "watching log directory");
                watched.insert(path);
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to watch log directory");
            }
        }
    }
}

fn nearest_existing(dir: &Path) -> Option<PathBuf> {
    dir.ancestors().find(|p| p.is_dir()).map(Path::to_path_buf)
}

fn is_relevant_event_kind(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_))
    )
}

/// Canonical form of `path`, resolving its nearest existing ancestor when
/// `path` itself does not exist yet.
fn canonical(path: &Path) -> PathBuf {
    for ancestor in path.ancestors() {
        if let Ok(resolved) = fs::canonicalize(ancestor) {
            return match path.strip_prefix(ancestor) {
                Ok(rest) => resolved.join(rest),
                Err(_) => resolved,
            };
        }
    }
    path.to_path_buf()
}
