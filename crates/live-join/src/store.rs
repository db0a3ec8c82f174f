//! File-backed storage for the watcher's persisted state.
//!
//! The watcher treats its state as an opaque byte buffer; this store keeps
//! that buffer in a single file and replaces it atomically on write.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{Error, Result};

/// A single state file.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored buffer. A missing file means there is no prior state.
    pub async fn read(&self) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No state file found");
                Ok(None)
            }
            Err(e) => Err(Error::io_path("reading", &self.path, e)),
        }
    }

    /// Replace the stored buffer.
    ///
    /// Writes a sibling temp file then renames it over the target so readers
    /// never observe a partial file.
    pub async fn write(&self, data: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io_path("creating directory", parent, e))?;
        }

        let tmp_path = self.tmp_path();
        tokio::fs::write(&tmp_path, data)
            .await
            .map_err(|e| Error::io_path("writing", &tmp_path, e))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| Error::io_path("renaming", &tmp_path, e))?;

        debug!(path = %self.path.display(), bytes = data.len(), "Saved state");
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        assert!(store.read().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_write_creates_parent_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("nested").join("state.json"));

        store.write(b"first").await.unwrap();
        store.write(b"second").await.unwrap();

        assert_eq!(store.read().await.unwrap().as_deref(), Some(&b"second"[..]));
        assert!(!dir.path().join("nested").join("state.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_read_directory_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let err = store.read().await.unwrap_err();
        assert!(matches!(err, Error::IoPath { op: "reading", .. }));
    }
}
