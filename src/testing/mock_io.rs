//! Temporary fixtures and an instrumented filesystem.

use crate::io::{FileStatus, FileSystem, InputHandle, LocalFileSystem};
use std::collections::HashMap;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tempfile::TempDir;

/// A temporary directory that is deleted when dropped.
pub struct TempDirPath {
    #[allow(dead_code)]
    temp_dir: TempDir,
    path: PathBuf,
}

impl TempDirPath {
    /// Create a new temporary directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary directory cannot be created.
    pub fn new() -> io::Result<Self> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().to_path_buf();
        Ok(Self { temp_dir, path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A path inside this directory.
    #[must_use]
    pub fn file_path(&self, filename: &str) -> PathBuf {
        self.path.join(filename)
    }
}

/// Write `content` to `dir/name` and return the path.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_text_file(dir: &Path, name: &str, content: &[u8]) -> io::Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, content)?;
    Ok(path)
}

#[derive(Default)]
struct Counts {
    opened: HashMap<PathBuf, usize>,
    closed: HashMap<PathBuf, usize>,
}

/// A [`LocalFileSystem`] that counts opened and released input handles per path.
#[derive(Default)]
pub struct CountingFileSystem {
    inner: LocalFileSystem,
    counts: Arc<Mutex<Counts>>,
}

impl CountingFileSystem {
    fn counts(&self) -> std::sync::MutexGuard<'_, Counts> {
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// How many input handles were opened for `path`.
    pub fn opened(&self, path: &Path) -> usize {
        self.counts().opened.get(path).copied().unwrap_or(0)
    }

    /// How many input handles for `path` were released.
    pub fn closed(&self, path: &Path) -> usize {
        self.counts().closed.get(path).copied().unwrap_or(0)
    }

    /// Handles opened but not yet released, over all paths.
    pub fn open_handles(&self) -> usize {
        let counts = self.counts();
        let opened: usize = counts.opened.values().sum();
        let closed: usize = counts.closed.values().sum();
        opened - closed
    }
}

impl FileSystem for CountingFileSystem {
    fn open(&self, path: &Path) -> io::Result<Box<dyn InputHandle>> {
        let inner = self.inner.open(path)?;
        *self.counts().opened.entry(path.to_path_buf()).or_default() += 1;
        Ok(Box::new(CountedHandle {
            inner,
            path: path.to_path_buf(),
            counts: Arc::clone(&self.counts),
        }))
    }

    fn create(&self, path: &Path) -> io::Result<Box<dyn Write + Send>> {
        self.inner.create(path)
    }

    fn status(&self, path: &Path) -> io::Result<FileStatus> {
        self.inner.status(path)
    }
}

struct CountedHandle {
    inner: Box<dyn InputHandle>,
    path: PathBuf,
    counts: Arc<Mutex<Counts>>,
}

impl Read for CountedHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Seek for CountedHandle {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

impl Drop for CountedHandle {
    fn drop(&mut self) {
        let mut counts = self.counts.lock().unwrap_or_else(PoisonError::into_inner);
        *counts.closed.entry(std::mem::take(&mut self.path)).or_default() += 1;
    }
}
