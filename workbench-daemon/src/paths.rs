use std::path::{Path, PathBuf};
use std::time::Duration;

pub const LOG_DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);
pub const CONFIG_FILE: &str = "config.yaml";
pub const LOG_FILE_EXTENSION: &str = "log";

pub fn workbench_root(home: &Path) -> PathBuf {
    home.join(".workbench")
}

pub fn projects_root(home: &Path) -> PathBuf {
    workbench_core::registry::projects_dir_at(home)
}

pub fn config_path(home: &Path) -> PathBuf {
    workbench_root(home).join(CONFIG_FILE)
}
