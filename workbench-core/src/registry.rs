//! Per-project YAML metadata store.
//!
//! # Storage layout
//!
//! ```text
//! ~/.workbench/
//!   projects/
//!     <project_id>.yaml   (one file per project, mode 0600)
//! ```
//!
//! The link list is persisted here independently of the project's
//! environment file; the link store owns the latter.
//!
//! Every function takes the home directory explicitly (`fn_at(home, …)`);
//! the daemon resolves it once at startup and tests pass a `TempDir`.
//!
//! A project id becomes a file name, so load, save and delete refuse ids
//! that are not a single path component with `RegistryError::InvalidProjectId`.

use std::path::{Path, PathBuf};

use crate::error::RegistryError;
use crate::types::{ProjectId, ProjectInfo};

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.workbench/projects/`
pub fn projects_dir_at(home: &Path) -> PathBuf {
    home.join(".workbench").join("projects")
}

/// `<home>/.workbench/projects/<project_id>.yaml`, pure, no I/O.
pub fn project_path_at(home: &Path, project: &ProjectId) -> PathBuf {
    projects_dir_at(home).join(format!("{}.yaml", project.0))
}

/// `project_path_at` for an id that cannot leave the projects directory.
fn checked_path_at(home: &Path, project: &ProjectId) -> Result<PathBuf, RegistryError> {
    project.validate()?;
    Ok(project_path_at(home, project))
}

fn ensure_projects_dir(home: &Path) -> Result<PathBuf, RegistryError> {
    let dir = projects_dir_at(home);
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
        set_dir_permissions(&dir)?;
    }
    Ok(dir)
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load one project's metadata.
///
/// Returns `RegistryError::RegistryNotFound` if absent,
/// `RegistryError::Parse` naming the file if the YAML does not parse.
pub fn load_project_at(home: &Path, project: &ProjectId) -> Result<ProjectInfo, RegistryError> {
    let path = checked_path_at(home, project)?;
    if !path.exists() {
        return Err(RegistryError::RegistryNotFound { path });
    }
    let contents = std::fs::read_to_string(&path)?;
    serde_yaml::from_str(&contents).map_err(|e| RegistryError::Parse { path, source: e })
}

/// Read every `<home>/.workbench/projects/*.yaml`, sorted by file name.
pub fn list_projects_at(home: &Path) -> Result<Vec<ProjectInfo>, RegistryError> {
    let dir = projects_dir_at(home);
    if !dir.exists() {
        return Ok(vec![]);
    }

    let mut entries: Vec<_> = std::fs::read_dir(&dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .collect();
    entries.sort_by_key(|e| e.file_name());

    let mut result = Vec::new();
    for entry in entries {
        let fname = entry.file_name();
        if !fname.to_string_lossy().ends_with(".yaml") {
            continue;
        }
        let contents = std::fs::read_to_string(entry.path())?;
        let info: ProjectInfo = serde_yaml::from_str(&contents)
            .map_err(|e| RegistryError::Parse { path: entry.path(), source: e })?;
        result.push(info);
    }
    Ok(result)
}

// ---------------------------------------------------------------------------
// 3. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save a project's metadata.
///
/// Serialised to a `<id>.yaml.tmp` sibling, restricted to 0600, then
/// renamed over the previous file.
pub fn save_project_at(home: &Path, info: &ProjectInfo) -> Result<(), RegistryError> {
    let path = checked_path_at(home, &info.project_id)?;
    ensure_projects_dir(home)?;
    let tmp_path = path.with_file_name(format!("{}.yaml.tmp", info.project_id.0));

    let yaml = serde_yaml::to_string(info)?;
    std::fs::write(&tmp_path, yaml)?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// 4. Delete
// ---------------------------------------------------------------------------

/// Remove a project's metadata file.
pub fn delete_project_at(home: &Path, project: &ProjectId) -> Result<(), RegistryError> {
    let path = checked_path_at(home, project)?;
    if !path.exists() {
        return Err(RegistryError::RegistryNotFound { path });
    }
    std::fs::remove_file(&path)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), RegistryError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), RegistryError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), RegistryError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), RegistryError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Link;
    use tempfile::TempDir;

    fn make_home() -> TempDir {
        TempDir::new().expect("tempdir")
    }

    fn sample(id: &str) -> ProjectInfo {
        ProjectInfo::new(id, "api", PathBuf::from("/code/api"))
    }

    #[test]
    fn project_path_is_correct() {
        let home = make_home();
        let path = project_path_at(home.path(), &ProjectId::from("p1"));
        assert!(path.ends_with(".workbench/projects/p1.yaml"));
    }

    #[test]
    fn save_and_load_roundtrip_keeps_links() {
        let home = make_home();
        let mut info = sample("p1");
        info.links.push(Link::new("p2", "http://p2:9080", "P2_URL"));
        save_project_at(home.path(), &info).expect("save");

        let loaded = load_project_at(home.path(), &info.project_id).expect("load");
        assert_eq!(loaded.links, info.links);
        assert_eq!(loaded.location, info.location);
    }

    #[test]
    fn projects_dir_created_with_perms() {
        let home = make_home();
        save_project_at(home.path(), &sample("p1")).expect("save");
        let dir = projects_dir_at(home.path());
        assert!(dir.exists());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&dir).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o700);
        }
    }

    #[test]
    fn atomic_write_cleans_up_tmp() {
        let home = make_home();
        save_project_at(home.path(), &sample("p1")).expect("save");
        let tmp = project_path_at(home.path(), &ProjectId::from("p1")).with_file_name("p1.yaml.tmp");
        assert!(!tmp.exists(), "no tmp file left behind");
    }

    #[test]
    fn load_missing_project_returns_not_found() {
        let home = make_home();
        let err = load_project_at(home.path(), &ProjectId::from("nope")).unwrap_err();
        assert!(matches!(err, RegistryError::RegistryNotFound { .. }));
    }

    #[test]
    fn list_projects_empty_when_no_dir() {
        let home = make_home();
        assert!(list_projects_at(home.path()).expect("list").is_empty());
    }

    #[test]
    fn delete_removes_file() {
        let home = make_home();
        save_project_at(home.path(), &sample("p1")).expect("save");
        delete_project_at(home.path(), &ProjectId::from("p1")).expect("delete");
        assert!(!project_path_at(home.path(), &ProjectId::from("p1")).exists());
        let err = delete_project_at(home.path(), &ProjectId::from("p1")).unwrap_err();
        assert!(matches!(err, RegistryError::RegistryNotFound { .. }));
    }

    #[test]
    fn traversing_ids_never_touch_the_filesystem() {
        let home = make_home();
        let escaped = ProjectId::from("../../escaped");

        let err = save_project_at(home.path(), &sample("../../escaped")).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidProjectId(_)), "got: {err}");
        assert!(!projects_dir_at(home.path()).exists());
        assert!(!home.path().join("escaped.yaml").exists());

        std::fs::write(home.path().join("escaped.yaml"), "projectID: x\n").unwrap();
        let err = delete_project_at(home.path(), &escaped).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidProjectId(_)));
        assert!(home.path().join("escaped.yaml").exists());
        assert!(matches!(
            load_project_at(home.path(), &escaped).unwrap_err(),
            RegistryError::InvalidProjectId(_)
        ));
    }
}
