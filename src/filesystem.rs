//! File store used to read template sources and persist compiled artifacts

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::UNIX_EPOCH;

/// Storage the compiler reads sources from and writes artifacts to
pub trait FileStore: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    fn get(&self, path: &Path) -> Result<String>;

    /// Replace the whole file at `path`
    fn put(&self, path: &Path, contents: &str) -> Result<()>;

    /// Modification time in seconds since the Unix epoch
    fn last_modified(&self, path: &Path) -> Result<u64>;
}

/// File store backed by the local file system
#[derive(Debug, Clone, Default)]
pub struct LocalFileStore;

impl LocalFileStore {
    pub fn new() -> Self {
        Self
    }
}

impl FileStore for LocalFileStore {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn get(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).map_err(|e| Error::source_unreadable(path, e))
    }

    fn put(&self, path: &Path, contents: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, contents)?;
        Ok(())
    }

    fn last_modified(&self, path: &Path) -> Result<u64> {
        let modified = fs::metadata(path)?.modified()?;
        Ok(modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default())
    }
}

#[derive(Debug, Clone)]
struct MemoryFile {
    contents: String,
    modified: u64,
}

/// In-memory file store with a manual clock
///
/// Every `put` stamps the file with the current clock value, which only
/// moves through [`MemoryFileStore::advance`] or explicit timestamps.
#[derive(Debug, Default)]
pub struct MemoryFileStore {
    files: RwLock<HashMap<PathBuf, MemoryFile>>,
    clock: RwLock<u64>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a file with an explicit modification time
    pub fn put_with_mtime(&self, path: impl Into<PathBuf>, contents: &str, modified: u64) {
        if let Ok(mut files) = self.files.write() {
            files.insert(
                path.into(),
                MemoryFile {
                    contents: contents.to_string(),
                    modified,
                },
            );
        }
    }

    /// Set the modification time of an existing file
    pub fn touch(&self, path: &Path, modified: u64) -> Result<()> {
        let mut files = self
            .files
            .write()
            .map_err(|_| Error::internal("Memory file store lock poisoned"))?;
        let file = files
            .get_mut(path)
            .ok_or_else(|| Error::source_unreadable(path, not_found(path)))?;
        file.modified = modified;
        Ok(())
    }

    /// Move the store clock forward
    pub fn advance(&self, seconds: u64) {
        if let Ok(mut clock) = self.clock.write() {
            *clock += seconds;
        }
    }

    pub fn len(&self) -> usize {
        self.files.read().map(|f| f.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn not_found(path: &Path) -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("'{}' not found", path.display()),
    )
}

impl FileStore for MemoryFileStore {
    fn exists(&self, path: &Path) -> bool {
        self.files
            .read()
            .map(|files| files.contains_key(path))
            .unwrap_or(false)
    }

    fn get(&self, path: &Path) -> Result<String> {
        let files = self
            .files
            .read()
            .map_err(|_| Error::internal("Memory file store lock poisoned"))?;
        files
            .get(path)
            .map(|f| f.contents.clone())
            .ok_or_else(|| Error::source_unreadable(path, not_found(path)))
    }

    fn put(&self, path: &Path, contents: &str) -> Result<()> {
        let now = self
            .clock
            .read()
            .map(|c| *c)
            .map_err(|_| Error::internal("Memory file store lock poisoned"))?;
        self.put_with_mtime(path, contents, now);
        Ok(())
    }

    fn last_modified(&self, path: &Path) -> Result<u64> {
        let files = self
            .files
            .read()
            .map_err(|_| Error::internal("Memory file store lock poisoned"))?;
        files
            .get(path)
            .map(|f| f.modified)
            .ok_or_else(|| Error::Io(not_found(path)))
    }
}
