//! Byte-level plumbing: filesystem access, compression codecs, input listing.

pub mod compression;
pub mod fs;
pub mod glob;

pub use fs::{FileStatus, FileSystem, InputHandle, LocalFileSystem};
