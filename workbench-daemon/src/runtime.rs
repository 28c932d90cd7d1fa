use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;

use workbench_events::{listener_fn, EventEmitter, EventKind, EventSink, Listener};

use crate::config::DaemonConfig;
use crate::dispatcher::EventDispatcher;
use crate::error::{io_err, DaemonError};
use crate::log_watcher::watch_logs;
use crate::paths::projects_root;
use crate::workspace::Workspace;

/// A running daemon: the workspace plus its background tasks.
pub struct Daemon {
    workspace: Arc<Mutex<Workspace>>,
    emitter: EventEmitter,
    shutdown_tx: broadcast::Sender<()>,
    watcher_stop_tx: broadcast::Sender<()>,
    dispatcher: JoinHandle<Result<usize, DaemonError>>,
    log_watcher: Option<JoinHandle<Result<(), DaemonError>>>,
}

impl Daemon {
    /// Load the workspace under `home` and start event delivery to the
    /// listeners registered on `emitter`, plus the log watcher if enabled.
    pub async fn start(
        home: PathBuf,
        config: &DaemonConfig,
        emitter: EventEmitter,
    ) -> Result<Self, DaemonError> {
        ensure_runtime_dirs(&home)?;

        let (shutdown_tx, _) = broadcast::channel::<()>(16);
        let (watcher_stop_tx, _) = broadcast::channel::<()>(1);
        let (dispatcher, dispatcher_handle) =
            EventDispatcher::spawn(emitter.clone(), shutdown_tx.subscribe());
        let sink: Arc<dyn EventSink> = Arc::new(dispatcher);

        let mut workspace = Workspace::load(&home, Arc::clone(&sink))?;

        let log_watcher = if config.watch_logs {
            let (tx, rx) = mpsc::unbounded_channel();
            workspace.attach_log_watcher(tx);
            let targets = workspace.log_targets();
            let debounce = config.log_debounce();
            let shutdown_rx = watcher_stop_tx.subscribe();
            let sink = Arc::clone(&sink);
            Some(tokio::spawn(async move {
                watch_logs(targets, sink, debounce, rx, shutdown_rx).await
            }))
        } else {
            tracing::info!("log watching disabled");
            None
        };

        tracing::info!(
            home = %home.display(),
            listeners = emitter.listener_count(),
            "daemon started",
        );
        Ok(Self {
            workspace: Arc::new(Mutex::new(workspace)),
            emitter,
            shutdown_tx,
            watcher_stop_tx,
            dispatcher: dispatcher_handle,
            log_watcher,
        })
    }

    pub fn workspace(&self) -> Arc<Mutex<Workspace>> {
        Arc::clone(&self.workspace)
    }

    pub fn emitter(&self) -> &EventEmitter {
        &self.emitter
    }

    /// Stop the log watcher, publish `shutdown`, then stop the dispatcher
    /// and wait for every queued event to be delivered. Returns how many
    /// events were delivered over the daemon's lifetime.
    pub async fn shutdown(self) -> Result<usize, DaemonError> {
        // Nothing the watcher publishes may follow `shutdown`.
        let _ = self.watcher_stop_tx.send(());
        let watcher_result = match self.log_watcher {
            Some(handle) => handle_join("log_watcher", handle.await),
            None => Ok(()),
        };

        self.workspace.lock().await.shutdown();
        let _ = self.shutdown_tx.send(());
        let dispatched = match self.dispatcher.await {
            Ok(result) => result,
            Err(err) => Err(DaemonError::Runtime(format!(
                "event_dispatcher task join failure: {err}"
            ))),
        };

        watcher_result?;
        let dispatched = dispatched?;
        tracing::info!(dispatched, "daemon stopped");
        Ok(dispatched)
    }
}

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(home: &Path) -> Result<(), DaemonError> {
    let config = DaemonConfig::load_at(home)?;
    init_tracing(&config);

    let emitter = EventEmitter::new();
    emitter.register_listener("event-log", event_log_listener());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(home.to_path_buf(), config, emitter))
}

/// Run the daemon until ctrl-c.
pub async fn run(
    home: PathBuf,
    config: DaemonConfig,
    emitter: EventEmitter,
) -> Result<(), DaemonError> {
    let daemon = Daemon::start(home, &config, emitter).await?;

    let signal = tokio::signal::ctrl_c().await;
    match &signal {
        Ok(()) => tracing::info!("received ctrl-c, shutting down daemon"),
        Err(err) => tracing::error!(error = %err, "ctrl-c handler failed, shutting down daemon"),
    }

    daemon.shutdown().await?;
    signal.map_err(|err| DaemonError::Runtime(format!("ctrl-c handler failed: {err}")))
}

/// Listener that writes every event to the daemon log.
pub fn event_log_listener() -> impl Listener {
    listener_fn(|kind: EventKind, payload| {
        tracing::info!(event = %kind, payload = %payload, "event");
        Ok(())
    })
}

fn ensure_runtime_dirs(home: &Path) -> Result<(), DaemonError> {
    let projects = projects_root(home);
    if !projects.exists() {
        fs::create_dir_all(&projects).map_err(|e| io_err(&projects, e))?;
    }
    Ok(())
}

fn handle_join(
    task: &str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Runtime(format!(
            "{task} task join failure: {err}"
        ))),
    }
}

fn init_tracing(config: &DaemonConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_filter.as_deref().unwrap_or("info")))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = if config.json_logs {
        fmt().json().with_env_filter(filter).try_init()
    } else {
        fmt().with_env_filter(filter).with_target(false).try_init()
    };
}
