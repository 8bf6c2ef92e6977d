//! File partitions and split planning.
//!
//! A [`FilePartition`] is the unit of read work: one byte range of one file,
//! handled by one worker. [`plan_partitions`] cuts input files into partitions
//! the way a query engine's scan planner does, honoring the text format's
//! splittability rules.

use crate::io::FileSystem;
use crate::io::compression::codec_for_path;
use crate::options::TextOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Byte range `[start, start + length)` of one file.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilePartition {
    pub path: PathBuf,
    pub start: u64,
    pub length: u64,
}

impl FilePartition {
    pub fn new(path: impl Into<PathBuf>, start: u64, length: u64) -> Self {
        Self {
            path: path.into(),
            start,
            length,
        }
    }

    /// A partition spanning the whole file.
    pub fn whole(path: impl Into<PathBuf>, len: u64) -> Self {
        Self::new(path, 0, len)
    }

    /// Exclusive end offset.
    pub fn end(&self) -> u64 {
        self.start.saturating_add(self.length)
    }
}

/// Text splittability: a file read in whole-text mode is one row, so it must
/// never be cut, whatever the base rules say.
pub fn is_splittable(base_splittable: bool, whole_text: bool) -> bool {
    base_splittable && !whole_text
}

/// Base splittability of a file: compressed streams cannot be entered mid-way.
pub fn base_splittable(path: &Path) -> bool {
    codec_for_path(path).is_none()
}

/// Sizing knobs of the split planner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Upper bound on bytes per partition.
    pub max_partition_bytes: u64,
    /// Estimated cost of opening a file, expressed in bytes.
    pub open_cost_in_bytes: u64,
    /// Number of workers the planner tries to keep busy.
    pub parallelism: usize,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            max_partition_bytes: 128 * 1024 * 1024,
            open_cost_in_bytes: 4 * 1024 * 1024,
            parallelism: num_cpus::get().max(1),
        }
    }
}

impl SplitConfig {
    /// Split size for an input of `files` totalling `total_len` bytes:
    /// small inputs are spread over all workers, large ones capped at
    /// `max_partition_bytes`.
    pub fn max_split_bytes(&self, total_len: u64, files: usize) -> u64 {
        let total = total_len + files as u64 * self.open_cost_in_bytes;
        let per_worker = total / self.parallelism.max(1) as u64;
        self.max_partition_bytes
            .min(self.open_cost_in_bytes.max(per_worker))
            .max(1)
    }
}

/// Cut `files` into partitions.
///
/// Splittable files are cut into ranges of at most
/// [`SplitConfig::max_split_bytes`]; other files become a single partition.
/// Empty files produce no partition, except in whole-text mode where every
/// file is one row, empty or not. Partitions keep file order, then offset order.
///
/// # Errors
/// Returns an error when a file's size cannot be determined.
pub fn plan_partitions(
    fs: &dyn FileSystem,
    files: &[PathBuf],
    options: &TextOptions,
    config: &SplitConfig,
) -> Result<Vec<FilePartition>> {
    let statuses = files
        .iter()
        .map(|p| fs.status(p).with_context(|| format!("stat {}", p.display())))
        .collect::<Result<Vec<_>>>()?;
    let total: u64 = statuses.iter().map(|s| s.len).sum();
    let split = config.max_split_bytes(total, statuses.len());

    let mut out = Vec::new();
    for status in statuses {
        let splittable = is_splittable(base_splittable(&status.path), options.whole_text);
        if options.whole_text {
            out.push(FilePartition::whole(&status.path, status.len));
            continue;
        }
        if status.len == 0 {
            continue;
        }
        if !splittable {
            out.push(FilePartition::whole(&status.path, status.len));
            continue;
        }
        let mut offset = 0;
        while offset < status.len {
            let length = split.min(status.len - offset);
            out.push(FilePartition::new(&status.path, offset, length));
            offset += length;
        }
    }
    debug!(
        files = files.len(),
        total_bytes = total,
        split_bytes = split,
        partitions = out.len(),
        "planned text partitions"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_text_is_never_splittable() {
        for base in [false, true] {
            assert!(!is_splittable(base, true));
            assert_eq!(is_splittable(base, false), base);
        }
    }

    #[test]
    fn split_size_bounds() {
        let config = SplitConfig {
            max_partition_bytes: 1000,
            open_cost_in_bytes: 10,
            parallelism: 4,
        };
        // tiny input: the open cost floor wins
        assert_eq!(config.max_split_bytes(0, 1), 10);
        // medium input: spread over the workers
        assert_eq!(config.max_split_bytes(390, 1), 100);
        // huge input: capped
        assert_eq!(config.max_split_bytes(1_000_000, 1), 1000);
    }

    #[test]
    fn partition_end() {
        let p = FilePartition::new("f.txt", 10, 5);
        assert_eq!(p.end(), 15);
    }
}
