//! Raw segment extraction: lines of a byte range, or a whole file.
//!
//! ## Partition boundaries
//!
//! A partition `[start, end)` owns every line whose first byte lies in
//! `(start, end]`; the partition starting at 0 also owns the line at offset 0.
//! A reader therefore
//! - drops the (possibly partial) line that contains `start`, unless `start == 0`;
//! - keeps reading past `end` to finish the last line it owns.
//!
//! Every line of a file is produced by exactly one of its partitions, however the
//! file was cut. With a separator that can overlap itself (`||`, `\n\n`) the
//! reader cannot resynchronize mid-file and skips lines from offset 0 instead.
//!
//! Compressed files are read from offset 0 to the end of the decompressed stream.

use crate::io::FileSystem;
use crate::io::compression::codec_for_path;
use crate::options::ReadSeparator;
use crate::partition::FilePartition;
use anyhow::{Context, Result, bail};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, trace};

type Stream = Box<dyn BufRead + Send>;

/// The open input of one reader, shared with the task's completion hook.
///
/// Whoever closes first (the reader on exhaustion or drop, or the hook) drops the
/// handle; every later close is a no-op.
#[derive(Clone)]
pub struct InputSlot {
    stream: Arc<Mutex<Option<Stream>>>,
    path: Arc<PathBuf>,
}

impl InputSlot {
    fn new(stream: Stream, path: &Path) -> Self {
        Self {
            stream: Arc::new(Mutex::new(Some(stream))),
            path: Arc::new(path.to_path_buf()),
        }
    }

    /// Run `f` on the open stream, or return `Ok(None)` when already closed.
    fn with_stream<R>(
        &self,
        f: impl FnOnce(&mut dyn BufRead) -> io::Result<R>,
    ) -> io::Result<Option<R>> {
        let mut guard = self.stream.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_mut() {
            Some(stream) => f(&mut **stream).map(Some),
            None => Ok(None),
        }
    }

    /// Release the handle. Returns whether this call did it.
    pub fn close(&self) -> bool {
        let taken = self
            .stream
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if taken.is_some() {
            trace!(path = %self.path.display(), "closed input");
        }
        taken.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.stream
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

/// Read one line terminated by exactly `sep` into `out` (terminator stripped).
/// Returns the number of bytes consumed including the terminator; 0 at EOF.
fn read_exact_line(r: &mut dyn BufRead, sep: &[u8], out: &mut Vec<u8>) -> io::Result<usize> {
    let last = sep[sep.len() - 1];
    let mut consumed = 0;
    loop {
        let n = r.read_until(last, out)?;
        consumed += n;
        if n == 0 {
            return Ok(consumed);
        }
        if out.ends_with(sep) {
            out.truncate(out.len() - sep.len());
            return Ok(consumed);
        }
        if out.last() != Some(&last) {
            // EOF inside the line
            return Ok(consumed);
        }
    }
}

/// Read one line terminated by `\n`, `\r` or `\r\n` into `out` (terminator
/// stripped). Returns the number of bytes consumed; 0 at EOF.
fn read_auto_line(r: &mut dyn BufRead, out: &mut Vec<u8>) -> io::Result<usize> {
    let mut consumed = 0;
    loop {
        let (used, terminator) = {
            let available = r.fill_buf()?;
            if available.is_empty() {
                return Ok(consumed);
            }
            match available.iter().position(|&b| b == b'\n' || b == b'\r') {
                Some(i) => {
                    out.extend_from_slice(&available[..i]);
                    (i + 1, Some(available[i]))
                }
                None => {
                    out.extend_from_slice(available);
                    (available.len(), None)
                }
            }
        };
        r.consume(used);
        consumed += used;
        match terminator {
            Some(b'\r') => {
                if r.fill_buf()?.first() == Some(&b'\n') {
                    r.consume(1);
                    consumed += 1;
                }
                return Ok(consumed);
            }
            Some(_) => return Ok(consumed),
            None => {}
        }
    }
}

fn read_line(r: &mut dyn BufRead, sep: &ReadSeparator, out: &mut Vec<u8>) -> io::Result<usize> {
    match sep {
        ReadSeparator::Auto => read_auto_line(r, out),
        ReadSeparator::Exact(sep) => read_exact_line(r, sep, out),
    }
}

/// Opens `partition` positioned at `offset`, decompressing when the file
/// extension names a codec. Returns the stream and whether it is compressed.
fn open_stream(
    fs: &dyn FileSystem,
    partition: &FilePartition,
    offset: u64,
) -> Result<(Stream, bool)> {
    let path = &partition.path;
    let mut handle = fs
        .open(path)
        .with_context(|| format!("open {}", path.display()))?;
    if let Some(codec) = codec_for_path(path) {
        if partition.start != 0 {
            bail!(
                "cannot read compressed file {} from offset {}",
                path.display(),
                partition.start
            );
        }
        let decoded = codec
            .wrap_reader(Box::new(handle))
            .with_context(|| format!("wrap reader with {} codec", codec.name()))?;
        return Ok((Box::new(BufReader::new(decoded)), true));
    }
    if offset > 0 {
        handle
            .seek(SeekFrom::Start(offset))
            .with_context(|| format!("seek {} to {offset}", path.display()))?;
    }
    Ok((Box::new(BufReader::new(handle)), false))
}

/// Lines of one partition.
pub struct LineReader {
    input: InputSlot,
    separator: ReadSeparator,
    /// Absolute offset of the next unread byte (decompressed offset for
    /// compressed input).
    pos: u64,
    /// A line starting at or before this offset belongs to this partition.
    end: u64,
    line: Vec<u8>,
    done: bool,
}

impl LineReader {
    /// Open `partition` and skip to its first owned line.
    ///
    /// # Errors
    /// Open, seek and read failures, and compressed input with a non-zero start.
    pub fn open(
        fs: &dyn FileSystem,
        partition: &FilePartition,
        separator: ReadSeparator,
    ) -> Result<Self> {
        let start = partition.start;
        // A terminator that ends after `start` begins no earlier than this. A
        // self-overlapping separator can match out of step with a scan from the
        // file start, so those partitions rescan from offset 0.
        let seek_to = if start == 0 || separator.overlaps_itself() {
            0
        } else {
            (start + 1).saturating_sub(separator.max_len() as u64)
        };
        let (stream, compressed) = open_stream(fs, partition, seek_to)?;
        let mut reader = Self {
            input: InputSlot::new(stream, &partition.path),
            separator,
            pos: if compressed { 0 } else { seek_to },
            end: if compressed { u64::MAX } else { partition.end() },
            line: Vec::new(),
            done: false,
        };
        if start > 0 {
            while reader.pos <= start {
                if reader.advance()? == 0 {
                    break;
                }
            }
        }
        debug!(
            path = %partition.path.display(),
            start,
            end = partition.end(),
            first_line = reader.pos,
            "opened line reader"
        );
        Ok(reader)
    }

    /// Read the next line into `self.line`; returns bytes consumed.
    fn advance(&mut self) -> Result<usize> {
        self.line.clear();
        let separator = &self.separator;
        let line = &mut self.line;
        let n = self
            .input
            .with_stream(|r| read_line(r, separator, line))
            .with_context(|| format!("read {}", self.input.path.display()))?
            .unwrap_or(0);
        self.pos += n as u64;
        Ok(n)
    }

    /// The next line owned by this partition, without its terminator.
    ///
    /// The input is closed as soon as the last line has been read.
    ///
    /// # Errors
    /// Read failures.
    pub fn next_line(&mut self) -> Result<Option<&[u8]>> {
        if self.done {
            return Ok(None);
        }
        if self.pos > self.end || self.advance()? == 0 {
            self.finish();
            return Ok(None);
        }
        Ok(Some(self.line.as_slice()))
    }

    fn finish(&mut self) {
        self.done = true;
        self.input.close();
    }
}

/// The entire content of one file, as a single segment.
pub struct WholeFileReader {
    input: InputSlot,
    content: Vec<u8>,
    done: bool,
}

impl WholeFileReader {
    /// Open the file of `partition`; its byte range is ignored.
    ///
    /// # Errors
    /// Open failures.
    pub fn open(fs: &dyn FileSystem, partition: &FilePartition) -> Result<Self> {
        let whole = FilePartition::whole(&partition.path, partition.length);
        let (stream, _) = open_stream(fs, &whole, 0)?;
        debug!(path = %partition.path.display(), "opened whole-file reader");
        Ok(Self {
            input: InputSlot::new(stream, &partition.path),
            content: Vec::new(),
            done: false,
        })
    }

    /// The file content on the first call, `None` afterwards.
    ///
    /// # Errors
    /// Read and decompression failures.
    pub fn next_segment(&mut self) -> Result<Option<&[u8]>> {
        if self.done {
            return Ok(None);
        }
        self.done = true;
        let content = &mut self.content;
        let read = self
            .input
            .with_stream(|r| r.read_to_end(content))
            .with_context(|| format!("read {}", self.input.path.display()));
        self.input.close();
        match read? {
            Some(_) => Ok(Some(self.content.as_slice())),
            // closed by the task before the first read
            None => Ok(None),
        }
    }
}

/// The two ways of cutting a file into segments, chosen once per partition.
pub enum SegmentReader {
    Delimited(LineReader),
    WholeFile(WholeFileReader),
}

impl SegmentReader {
    /// Open `partition` in whole-file mode or delimited by `separator`.
    ///
    /// # Errors
    /// See [`LineReader::open`] and [`WholeFileReader::open`].
    pub fn open(
        fs: &dyn FileSystem,
        partition: &FilePartition,
        whole_text: bool,
        separator: ReadSeparator,
    ) -> Result<Self> {
        if whole_text {
            WholeFileReader::open(fs, partition).map(Self::WholeFile)
        } else {
            LineReader::open(fs, partition, separator).map(Self::Delimited)
        }
    }

    /// The next raw segment.
    ///
    /// # Errors
    /// Read failures.
    pub fn next_segment(&mut self) -> Result<Option<&[u8]>> {
        match self {
            Self::Delimited(r) => r.next_line(),
            Self::WholeFile(r) => r.next_segment(),
        }
    }

    /// A handle on the open input, for registering cleanup elsewhere.
    pub fn input(&self) -> &InputSlot {
        match self {
            Self::Delimited(r) => &r.input,
            Self::WholeFile(r) => &r.input,
        }
    }

    /// Release the input. Safe to call any number of times.
    pub fn close(&self) {
        self.input().close();
    }
}

impl Drop for SegmentReader {
    fn drop(&mut self) {
        self.close();
    }
}
