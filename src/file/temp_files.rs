// src/file/temp_files.rs
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Per-analysis scratch artifacts (plots, state files) written by the
/// backend under `<root>/<analysis id>/`.
#[derive(Debug, Clone)]
pub struct TempFiles {
    root: PathBuf,
}

impl TempFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Scratch directory under the system temp dir, one per process.
    pub fn for_session() -> Self {
        Self::new(std::env::temp_dir().join(format!("statdesk-{}", std::process::id())))
    }

    /// Guard that removes the whole scratch root when dropped.
    pub fn session_guard(&self) -> SessionGuard {
        SessionGuard { root: self.root.clone() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn analysis_dir(&self, id: usize) -> PathBuf {
        self.root.join(id.to_string())
    }

    /// Creates an empty artifact file and returns its path.
    pub fn create_file(&self, id: usize, name: &str) -> Result<PathBuf> {
        let dir = self.analysis_dir(id);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create temp directory {}", dir.display()))?;
        let path = dir.join(name);
        fs::write(&path, b"")
            .with_context(|| format!("Failed to create temp file {}", path.display()))?;
        Ok(path)
    }

    pub fn retrieve_list(&self, id: usize) -> Vec<PathBuf> {
        let mut files = Vec::new();
        collect_files(&self.analysis_dir(id), &mut files);
        files.sort();
        files
    }

    /// Deletes the given files; missing files are skipped.
    pub fn delete_list(&self, files: &[PathBuf]) -> usize {
        let mut deleted = 0;
        for file in files {
            match fs::remove_file(file) {
                Ok(()) => deleted += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("Failed to delete temp file {}: {}", file.display(), e),
            }
        }
        deleted
    }

    pub fn delete_all(&self, id: usize) {
        let dir = self.analysis_dir(id);
        if !dir.exists() {
            return;
        }
        if let Err(e) = fs::remove_dir_all(&dir) {
            tracing::warn!("Failed to purge temp directory {}: {}", dir.display(), e);
        }
    }
}

/// Owns the session scratch directory. Dropping it deletes the directory
/// and everything the backend left in it.
#[derive(Debug)]
pub struct SessionGuard {
    root: PathBuf,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if !self.root.exists() {
            return;
        }
        match fs::remove_dir_all(&self.root) {
            Ok(()) => tracing::debug!("Removed session temp directory {}", self.root.display()),
            Err(e) => tracing::warn!(
                "Failed to remove session temp directory {}: {}",
                self.root.display(),
                e
            ),
        }
    }
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, files);
        } else {
            files.push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_and_delete_are_scoped_to_one_analysis() {
        let dir = tempfile::tempdir().unwrap();
        let temp = TempFiles::new(dir.path());

        temp.create_file(1, "plot1.png").unwrap();
        temp.create_file(1, "state.rds").unwrap();
        temp.create_file(2, "plot1.png").unwrap();

        let files = temp.retrieve_list(1);
        assert_eq!(files.len(), 2);

        assert_eq!(temp.delete_list(&files), 2);
        assert!(temp.retrieve_list(1).is_empty());
        assert_eq!(temp.retrieve_list(2).len(), 1);
    }

    #[test]
    fn delete_all_removes_directory() {
        let dir = tempfile::tempdir().unwrap();
        let temp = TempFiles::new(dir.path());
        temp.create_file(3, "a").unwrap();

        temp.delete_all(3);

        assert!(!temp.analysis_dir(3).exists());
        temp.delete_all(3);
    }

    #[test]
    fn session_guard_removes_the_root_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let temp = TempFiles::new(dir.path().join("session"));
        let guard = temp.session_guard();
        temp.create_file(1, "plot1.png").unwrap();
        temp.create_file(2, "state.rds").unwrap();

        drop(guard);

        assert!(!temp.root().exists());
        drop(temp.session_guard());
    }
}
