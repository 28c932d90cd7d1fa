//! Optional daemon configuration at `<home>/.workbench/config.yaml`.
//!
//! ```yaml
//! log_debounce_ms: 500   # per-directory debounce for log-list rescans
//! watch_logs: true       # disable to skip the log watcher entirely
//! log_filter: debug      # tracing filter used when RUST_LOG is unset
//! json_logs: false       # emit daemon logs as JSON lines
//! ```
//!
//! A missing file means defaults; unknown keys are rejected.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, DaemonError};
use crate::paths::{config_path, LOG_DEBOUNCE_WINDOW};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonConfig {
    pub log_debounce_ms: u64,
    pub watch_logs: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
    pub json_logs: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_debounce_ms: LOG_DEBOUNCE_WINDOW.as_millis() as u64,
            watch_logs: true,
            log_filter: None,
            json_logs: false,
        }
    }
}

impl DaemonConfig {
    pub fn load_at(home: &Path) -> Result<Self, DaemonError> {
        let path = config_path(home);
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&contents).map_err(|source| DaemonError::Config { path, source })
    }

    pub fn log_debounce(&self) -> Duration {
        Duration::from_millis(self.log_debounce_ms)
    }
}
