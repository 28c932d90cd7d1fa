//! Environment file writer.
//!
//! The file at `<project_dir>/.codewind-project-links.env` is a derived
//! projection of the link list: one `envName=projectURL` line per link, in
//! list order, each terminated by `\n`. No escaping is applied, so values
//! containing newlines are not supported.
//!
//! ## Write protocol
//!
//! 1. Render the whole file from the current list.
//! 2. Write to `<file>.tmp`.
//! 3. Rename over the final path (atomic on POSIX).
//!
//! Every call fully overwrites previous content.

use std::path::{Path, PathBuf};

use workbench_core::Link;

use crate::error::{io_err, LinkError};

/// File name, relative to the project root.
pub const ENV_FILE_NAME: &str = ".codewind-project-links.env";

/// `<project_dir>/.codewind-project-links.env`
pub fn env_file_path(project_dir: &Path) -> PathBuf {
    project_dir.join(ENV_FILE_NAME)
}

/// Render the file contents for `links`.
pub fn render(links: &[Link]) -> String {
    let mut out = String::new();
    for link in links {
        out.push_str(&link.env_pair());
        out.push('\n');
    }
    out
}

/// Overwrite the environment file under `project_dir` with `links`.
pub fn write_at(project_dir: &Path, links: &[Link]) -> Result<PathBuf, LinkError> {
    let path = env_file_path(project_dir);
    let tmp = PathBuf::from(format!("{}.tmp", path.display()));
    write_with_tmp(&path, &render(links), &tmp)?;
    Ok(path)
}

fn write_with_tmp(path: &Path, content: &str, tmp: &Path) -> Result<(), LinkError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }

    std::fs::write(tmp, content).map_err(|e| io_err(tmp, e))?;

    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(path, e));
    }

    tracing::debug!("wrote: {}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn render_empty_is_empty() {
        assert_eq!(render(&[]), "");
    }

    #[test]
    fn render_keeps_order_with_trailing_newline() {
        let links = vec![
            Link::new("b", "http://b", "B_URL"),
            Link::new("a", "http://a", "A_URL"),
        ];
        assert_eq!(render(&links), "B_URL=http://b\nA_URL=http://a\n");
    }

    #[test]
    fn write_overwrites_previous_content() {
        let dir = TempDir::new().unwrap();
        write_at(dir.path(), &[Link::new("a", "http://a", "A"), Link::new("b", "http://b", "B")])
            .unwrap();
        let path = write_at(dir.path(), &[Link::new("c", "http://c", "C")]).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "C=http://c\n");
    }

    #[test]
    fn tmp_file_removed_after_write() {
        let dir = TempDir::new().unwrap();
        let path = write_at(dir.path(), &[Link::new("a", "u", "A")]).unwrap();
        let tmp = PathBuf::from(format!("{}.tmp", path.display()));
        assert!(!tmp.exists(), ".tmp must be cleaned up");
    }

    #[test]
    #[cfg(unix)]
    fn rename_failure_leaves_original_and_cleans_tmp() {
        use std::os::unix::fs::PermissionsExt;

        let root = TempDir::new().unwrap();
        let readonly_dir = root.path().join("readonly");
        fs::create_dir_all(&readonly_dir).unwrap();
        let path = env_file_path(&readonly_dir);
        fs::write(&path, "OLD=value\n").unwrap();

        let mut perms = fs::metadata(&readonly_dir).unwrap().permissions();
        perms.set_mode(0o555);
        fs::set_permissions(&readonly_dir, perms).unwrap();

        // Privileged users ignore directory modes.
        if fs::write(readonly_dir.join("write-check"), "").is_ok() {
            return;
        }

        let tmp_dir = TempDir::new().unwrap();
        let tmp_path = tmp_dir.path().join("links.env.tmp");
        let err = write_with_tmp(&path, "NEW=value\n", &tmp_path)
            .expect_err("rename should fail on readonly dir");
        assert!(matches!(err, LinkError::Io { .. }));

        assert_eq!(fs::read_to_string(&path).unwrap(), "OLD=value\n");
        assert!(!tmp_path.exists(), ".tmp should be cleaned up");

        let mut perms = fs::metadata(&readonly_dir).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&readonly_dir, perms).unwrap();
    }
}
