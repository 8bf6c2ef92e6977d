//! Filesystem access used by the reader, the writer and the partition planner.
//!
//! The engine embedding this crate usually owns the real filesystem layer
//! (object stores, HDFS, ...). [`FileSystem`] is the narrow seam the codec needs
//! from it; [`LocalFileSystem`] covers local disks and tests.

use std::fs::{File, create_dir_all};
use std::io::{self, Read, Seek, Write};
use std::path::{Path, PathBuf};

/// A readable, seekable input handle.
pub trait InputHandle: Read + Seek + Send {}

impl<T: Read + Seek + Send> InputHandle for T {}

/// Size and location of one input file.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FileStatus {
    pub path: PathBuf,
    pub len: u64,
}

/// The filesystem operations the text codec relies on.
pub trait FileSystem: Send + Sync {
    /// Open `path` for reading, positioned at offset 0.
    fn open(&self, path: &Path) -> io::Result<Box<dyn InputHandle>>;

    /// Create (or truncate) `path` for writing, creating parent directories.
    fn create(&self, path: &Path) -> io::Result<Box<dyn Write + Send>>;

    /// Size of `path`.
    fn status(&self, path: &Path) -> io::Result<FileStatus>;
}

/// [`FileSystem`] over `std::fs`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn open(&self, path: &Path) -> io::Result<Box<dyn InputHandle>> {
        Ok(Box::new(File::open(path)?))
    }

    fn create(&self, path: &Path) -> io::Result<Box<dyn Write + Send>> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            create_dir_all(parent)?;
        }
        Ok(Box::new(File::create(path)?))
    }

    fn status(&self, path: &Path) -> io::Result<FileStatus> {
        let meta = std::fs::metadata(path)?;
        Ok(FileStatus {
            path: path.to_path_buf(),
            len: meta.len(),
        })
    }
}
