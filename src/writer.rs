//! Write path: row records in, separated bytes out.
//!
//! A [`TextOutputWriter`] owns one output file. The file is not created until the
//! first row arrives, so a task that writes nothing leaves nothing behind.
//! [`TextOutputWriter::close`] finishes the stream (compression trailers
//! included) exactly once.

use crate::io::FileSystem;
use crate::io::compression::{CompressionCodec, OutputStream, plain_stream};
use crate::options::TextOptions;
use crate::row::RowRecord;
use crate::task::TaskContext;
use anyhow::{Context, Result, bail};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Base extension of text output files.
pub const TEXT_EXTENSION: &str = ".txt";

/// Creates one [`TextOutputWriter`] per output path of a write job.
///
/// Obtained from [`crate::TextFileFormat::prepare_write`], which validates the
/// schema first.
#[derive(Clone)]
pub struct TextOutputWriterFactory {
    fs: Arc<dyn FileSystem>,
    separator: Arc<[u8]>,
    codec: Option<Arc<dyn CompressionCodec>>,
}

impl TextOutputWriterFactory {
    pub(crate) fn new(fs: Arc<dyn FileSystem>, options: &TextOptions) -> Result<Self> {
        let codec = options.output_codec()?;
        Ok(Self {
            fs,
            separator: Arc::from(options.line_separator_in_write()),
            codec,
        })
    }

    /// File extension for output files: `.txt` plus the codec suffix.
    pub fn extension(&self) -> String {
        match &self.codec {
            Some(codec) => format!("{TEXT_EXTENSION}{}", codec.default_extension()),
            None => TEXT_EXTENSION.to_string(),
        }
    }

    /// A writer for `path`. Nothing is opened yet.
    ///
    /// `task` only identifies the writer in logs. Unlike readers, writers are not
    /// tied to task completion: the caller must call [`TextOutputWriter::close`]
    /// on success and on failure, since finishing a stream can itself fail and
    /// that error has to reach the task. A writer dropped without `close` may
    /// leave a truncated file behind.
    pub fn new_writer(&self, path: impl AsRef<Path>, task: &TaskContext) -> TextOutputWriter {
        let path = path.as_ref().to_path_buf();
        debug!(path = %path.display(), partition = task.partition_id(), "new text writer");
        TextOutputWriter {
            fs: Arc::clone(&self.fs),
            path,
            separator: Arc::clone(&self.separator),
            codec: self.codec.clone(),
            stream: None,
            rows: 0,
            closed: false,
        }
    }
}

/// Writes rows of one output path.
pub struct TextOutputWriter {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
    separator: Arc<[u8]>,
    codec: Option<Arc<dyn CompressionCodec>>,
    stream: Option<Box<dyn OutputStream>>,
    rows: u64,
    closed: bool,
}

impl TextOutputWriter {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows_written(&self) -> u64 {
        self.rows
    }

    /// Whether the output file has been created.
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn open(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }
        let raw = self
            .fs
            .create(&self.path)
            .with_context(|| format!("create {}", self.path.display()))?;
        let stream = match &self.codec {
            Some(codec) => codec
                .wrap_writer(raw)
                .with_context(|| format!("wrap writer with {} codec", codec.name()))?,
            None => plain_stream(raw),
        };
        debug!(
            path = %self.path.display(),
            codec = self.codec.as_ref().map(|c| c.name()),
            "opened text output"
        );
        self.stream = Some(stream);
        Ok(())
    }

    /// Write the row's value followed by the separator. A null value writes only
    /// the separator.
    ///
    /// # Errors
    /// I/O failures, a write after [`close`](Self::close), or a row without a
    /// column.
    pub fn write(&mut self, row: RowRecord<'_>) -> Result<()> {
        if self.closed {
            bail!("write to closed text writer for {}", self.path.display());
        }
        if row.num_fields() != 1 {
            bail!(
                "text writer expects rows with one column, got {}",
                row.num_fields()
            );
        }
        self.open()?;
        let Self {
            stream,
            path,
            separator,
            ..
        } = &mut *self;
        let stream = stream.as_mut().context("output stream missing after open")?;
        if let Some(value) = row.value() {
            stream
                .write_all(value)
                .with_context(|| format!("write {}", path.display()))?;
        }
        stream
            .write_all(&separator[..])
            .with_context(|| format!("write {}", path.display()))?;
        self.rows += 1;
        Ok(())
    }

    /// Finish and release the output. Only the first call does anything; without
    /// any prior write no file exists and none is created.
    ///
    /// # Errors
    /// Failures flushing or finishing the stream.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if let Some(stream) = self.stream.take() {
            stream
                .finish()
                .with_context(|| format!("close {}", self.path.display()))?;
            debug!(path = %self.path.display(), rows = self.rows, "closed text output");
        }
        Ok(())
    }
}
