//! Link store: CRUD over one project's link set.
//!
//! The in-memory list is the source of truth; the environment file is a
//! projection rewritten after every successful mutation. Each mutation and
//! its file write run under the same per-instance lock, so the file on disk
//! always reflects the most recently committed list.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use workbench_core::{Link, NewLink, ValidationError};

use crate::env_file;
use crate::error::LinkError;

/// Owns the link list of a single project.
#[derive(Debug)]
pub struct LinkStore {
    project_dir: PathBuf,
    env_file: PathBuf,
    links: Mutex<Vec<Link>>,
}

impl LinkStore {
    /// Create a store rooted at `project_dir`, seeded with `initial` links
    /// (typically reloaded from project metadata). Nothing is written.
    pub fn new(project_dir: impl Into<PathBuf>, initial: Vec<Link>) -> Self {
        let project_dir = project_dir.into();
        let env_file = env_file::env_file_path(&project_dir);
        Self {
            project_dir,
            env_file,
            links: Mutex::new(initial),
        }
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn env_file_path(&self) -> &Path {
        &self.env_file
    }

    /// Snapshot of all links, in insertion order.
    pub fn get_all(&self) -> Vec<Link> {
        self.lock().clone()
    }

    /// The link exposed as `env_name`.
    pub fn get(&self, env_name: &str) -> Result<Link, ValidationError> {
        let links = self.lock();
        links
            .iter()
            .find(|l| l.env_name == env_name)
            .cloned()
            .ok_or_else(|| not_found(env_name))
    }

    /// `envName=projectURL` for every link, in list order.
    pub fn get_env_pairs(&self) -> Vec<String> {
        self.lock().iter().map(Link::env_pair).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Validate and append `new_link`, then rewrite the environment file.
    pub fn add(&self, new_link: NewLink) -> Result<Link, LinkError> {
        let link = new_link.validate()?;

        let mut links = self.lock();
        if links.iter().any(|l| l.env_name == link.env_name) {
            return Err(ValidationError::exists(format!(
                "a link with envName '{}' already exists",
                link.env_name
            ))
            .into());
        }

        links.push(link.clone());
        tracing::info!(
            "link added: {} -> {} ({})",
            link.env_name,
            link.project_id,
            self.project_dir.display()
        );
        self.write_locked(&links)?;
        Ok(link)
    }

    /// Rename and/or repoint the link currently exposed as `env_name`.
    ///
    /// Uniqueness of `new_env_name` is only checked when it differs from
    /// `env_name`, and only against the other links.
    pub fn update(
        &self,
        env_name: &str,
        new_env_name: &str,
        new_project_url: &str,
    ) -> Result<Link, LinkError> {
        let mut links = self.lock();
        let index = links
            .iter()
            .position(|l| l.env_name == env_name)
            .ok_or_else(|| not_found(env_name))?;

        if new_env_name.trim().is_empty() || new_project_url.trim().is_empty() {
            return Err(ValidationError::invalid_parameters(
                "envName and projectURL must not be blank",
            )
            .into());
        }

        if new_env_name != env_name && links.iter().any(|l| l.env_name == new_env_name) {
            return Err(ValidationError::exists(format!(
                "a link with envName '{new_env_name}' already exists"
            ))
            .into());
        }

        let link = &mut links[index];
        link.env_name = new_env_name.to_string();
        link.project_url = new_project_url.to_string();
        let updated = link.clone();
        tracing::info!(
            "link updated: {} -> {}={}",
            env_name,
            updated.env_name,
            updated.project_url
        );
        self.write_locked(&links)?;
        Ok(updated)
    }

    /// Remove the link exposed as `env_name`, then rewrite the file.
    pub fn delete(&self, env_name: &str) -> Result<Link, LinkError> {
        let mut links = self.lock();
        let index = links
            .iter()
            .position(|l| l.env_name == env_name)
            .ok_or_else(|| not_found(env_name))?;

        let removed = links.remove(index);
        tracing::info!("link deleted: {}", removed.env_name);
        self.write_locked(&links)?;
        Ok(removed)
    }

    /// Rewrite the environment file from the current list.
    pub fn rewrite_env_file(&self) -> Result<PathBuf, LinkError> {
        let links = self.lock();
        env_file::write_at(&self.project_dir, &links)
    }

    fn write_locked(&self, links: &[Link]) -> Result<(), LinkError> {
        env_file::write_at(&self.project_dir, links).map(|_| ())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Link>> {
        // Mutations never leave the list half-modified.
        self.links.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn not_found(env_name: &str) -> ValidationError {
    ValidationError::not_found(format!("no link with envName '{env_name}'"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;
    use workbench_core::ErrorKind;

    fn store(dir: &TempDir) -> LinkStore {
        LinkStore::new(dir.path(), vec![])
    }

    #[test]
    fn new_store_does_not_write() {
        let dir = TempDir::new().unwrap();
        let s = LinkStore::new(dir.path(), vec![Link::new("a", "u", "A")]);
        assert_eq!(s.len(), 1);
        assert!(!s.env_file_path().exists());
    }

    #[test]
    fn get_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = store(&dir).get("NOPE").unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[test]
    fn failed_validation_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        let err = s.add(NewLink::new("p", "", "E")).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidParameters));
        assert!(!s.env_file_path().exists());
    }

    #[test]
    fn update_blank_values_are_invalid() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        s.add(NewLink::new("p", "u", "E")).unwrap();
        let err = s.update("E", "  ", "u2").unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidParameters));
        let err = s.update("E", "E2", "").unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidParameters));
        assert_eq!(s.get("E").unwrap().project_url, "u");
    }

    #[test]
    fn update_missing_link_is_not_found_before_blank_check() {
        let dir = TempDir::new().unwrap();
        let err = store(&dir).update("NOPE", "", "").unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::NotFound));
    }

    #[test]
    fn update_keeps_position_and_extra_fields() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        let mut first = NewLink::new("a", "http://a", "A");
        first
            .extra
            .insert("type".to_string(), serde_json::Value::from("local"));
        s.add(first).unwrap();
        s.add(NewLink::new("b", "http://b", "B")).unwrap();

        s.update("A", "A2", "http://a2").unwrap();
        let all = s.get_all();
        assert_eq!(all[0].env_name, "A2");
        assert_eq!(all[0].extra.get("type"), Some(&serde_json::Value::from("local")));
        assert_eq!(
            fs::read_to_string(s.env_file_path()).unwrap(),
            "A2=http://a2\nB=http://b\n"
        );
    }

    #[test]
    fn rewrite_env_file_reflects_current_list() {
        let dir = TempDir::new().unwrap();
        let s = LinkStore::new(dir.path(), vec![Link::new("a", "http://a", "A")]);
        let path = s.rewrite_env_file().unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "A=http://a\n");
    }

    #[test]
    fn concurrent_adds_leave_file_matching_list() {
        let dir = TempDir::new().unwrap();
        let s = Arc::new(store(&dir));
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let s = Arc::clone(&s);
                std::thread::spawn(move || {
                    s.add(NewLink::new(format!("p{i}"), format!("http://p{i}"), format!("P{i}")))
                        .unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let expected: String = s.get_env_pairs().iter().map(|p| format!("{p}\n")).collect();
        assert_eq!(s.len(), 16);
        assert_eq!(fs::read_to_string(s.env_file_path()).unwrap(), expected);
    }
}
