//! Read path: partitions in, row records out.
//!
//! [`TextRowReader`] is a lending iterator: each [`RowRecord`] borrows the
//! reader's buffer and must be dropped (or copied with
//! [`RowRecord::into_owned`]) before the next call to
//! [`TextRowReader::next_row`]. [`TextRowReader::into_rows`] adapts it into a
//! standard [`Iterator`] of [`OwnedRow`]s when rows need to outlive the loop.

pub mod segment;

use crate::io::FileSystem;
use crate::options::TextOptions;
use crate::partition::FilePartition;
use crate::row::{OwnedRow, RowEncoder, RowRecord};
use crate::schema::RequiredColumns;
use crate::task::TaskContext;
use anyhow::Result;
use segment::SegmentReader;
use tracing::trace;

pub use segment::InputSlot;

/// Rows of one file partition, in file order.
pub struct TextRowReader {
    segments: SegmentReader,
    encoder: RowEncoder,
    rows: u64,
}

impl TextRowReader {
    /// Open `partition` and tie its input to `task`: the handle is released when
    /// the rows are exhausted, when the reader is dropped, or when the task
    /// completes, whichever happens first.
    ///
    /// # Errors
    /// Failures opening or positioning the input.
    pub fn open(
        fs: &dyn FileSystem,
        partition: &FilePartition,
        options: &TextOptions,
        required: RequiredColumns,
        task: &TaskContext,
    ) -> Result<Self> {
        let segments = SegmentReader::open(
            fs,
            partition,
            options.whole_text,
            options.line_separator_in_read(),
        )?;
        let input = segments.input().clone();
        task.add_completion_listener(move || {
            input.close();
        });
        Ok(Self {
            segments,
            encoder: RowEncoder::new(required),
            rows: 0,
        })
    }

    /// The next row, or `None` once the partition is exhausted.
    ///
    /// # Errors
    /// Read and decompression failures.
    pub fn next_row(&mut self) -> Result<Option<RowRecord<'_>>> {
        match self.segments.next_segment()? {
            Some(segment) => {
                self.rows += 1;
                Ok(Some(self.encoder.encode(segment)))
            }
            None => {
                trace!(rows = self.rows, "text partition exhausted");
                Ok(None)
            }
        }
    }

    /// Rows produced so far.
    pub fn rows_read(&self) -> u64 {
        self.rows
    }

    /// The reader's input handle.
    pub fn input(&self) -> &InputSlot {
        self.segments.input()
    }

    /// Release the input early. Later calls to `next_row` return `None`.
    pub fn close(&mut self) {
        self.segments.close();
    }

    /// Copy every row out, as a standard iterator.
    pub fn into_rows(self) -> OwnedRows {
        OwnedRows {
            reader: self,
            failed: false,
        }
    }

    /// Read and copy all remaining rows.
    ///
    /// # Errors
    /// The first read failure.
    pub fn collect_rows(self) -> Result<Vec<OwnedRow>> {
        self.into_rows().collect()
    }
}

/// Owning iterator over the rows of a [`TextRowReader`]. Stops after the first
/// error.
pub struct OwnedRows {
    reader: TextRowReader,
    failed: bool,
}

impl Iterator for OwnedRows {
    type Item = Result<OwnedRow>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.reader.next_row() {
            Ok(row) => row.map(|r| Ok(r.into_owned())),
            Err(e) => {
                self.failed = true;
                self.reader.close();
                Some(Err(e))
            }
        }
    }
}
