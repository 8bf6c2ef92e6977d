//! Multi-threaded reading and writing with [`rayon`].
//!
//! Each partition (or output file) gets its own [`TaskContext`] and is handled by
//! one worker. Results come back in partition order, so parallel runs are
//! deterministic.

use crate::format::PartitionReader;
use crate::partition::FilePartition;
use crate::reader::TextRowReader;
use crate::row::OwnedRow;
use crate::task::TaskContext;
use crate::writer::TextOutputWriterFactory;
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Read `partitions` in parallel with the reader function from
/// [`crate::TextFileFormat::build_reader`].
///
/// Returns one `Vec` of rows per partition, in the order of `partitions`.
///
/// # Errors
/// The first partition that fails, with its path in the context.
pub fn read_partitions_par<F>(
    partitions: &[FilePartition],
    open: &F,
) -> Result<Vec<Vec<OwnedRow>>>
where
    F: PartitionReader + ?Sized,
{
    partitions
        .par_iter()
        .enumerate()
        .map(|(i, partition)| {
            let task = TaskContext::new(i);
            let rows = open(partition, &task).and_then(TextRowReader::collect_rows);
            task.mark_completed();
            rows.with_context(|| {
                format!(
                    "read partition {i} ({}, {}+{})",
                    partition.path.display(),
                    partition.start,
                    partition.length
                )
            })
        })
        .collect()
}

/// Write each group of `parts` to its own `part-NNNNN` file under `dir`, in parallel.
///
/// Groups without rows create no file. Returns the paths of the files created,
/// in group order.
///
/// # Errors
/// The first group that fails to write or close.
pub fn write_parts_par(
    factory: &TextOutputWriterFactory,
    dir: impl AsRef<Path>,
    parts: &[Vec<OwnedRow>],
) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let ext = factory.extension();
    let written: Vec<Option<PathBuf>> = parts
        .par_iter()
        .enumerate()
        .map(|(i, rows)| -> Result<Option<PathBuf>> {
            let task = TaskContext::new(i);
            let mut writer = factory.new_writer(dir.join(format!("part-{i:05}{ext}")), &task);
            let wrote = rows.iter().try_for_each(|row| writer.write(row.as_record()));
            let opened = writer.is_open();
            let closed = writer.close();
            task.mark_completed();
            wrote.and(closed)?;
            Ok(opened.then(|| writer.path().to_path_buf()))
        })
        .collect::<Result<_>>()?;
    let files: Vec<PathBuf> = written.into_iter().flatten().collect();
    debug!(
        dir = %dir.display(),
        groups = parts.len(),
        files = files.len(),
        "wrote text parts"
    );
    Ok(files)
}
