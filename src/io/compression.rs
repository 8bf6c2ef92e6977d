//! Pluggable compression codecs for text input and output.
//!
//! Codecs are looked up two ways:
//! - **by name** when writing, from the `compression` option (`gzip`, `zstd`, ...);
//! - **by file extension** when reading, so `part-00000.txt.gz` is decompressed
//!   transparently.
//!
//! ## Built-in Codecs
//!
//! When enabled via feature flags:
//! - **Gzip** (`.gz`) - via `flate2` (feature: `compression-gzip`)
//! - **Zstd** (`.zst`) - via `zstd` (feature: `compression-zstd`)
//! - **Bzip2** (`.bz2`) - via `bzip2` (feature: `compression-bzip2`)
//! - **Xz** (`.xz`) - via `xz2` (feature: `compression-xz`)
//!
//! Compressed streams cannot be entered at an arbitrary byte offset, which is why a
//! compressed file is never split into several partitions.
//!
//! ## Custom Codecs
//! ```
//! use textcodec::io::compression::{register_codec, CompressionCodec, OutputStream};
//! use std::io::{Read, Write};
//! use std::sync::Arc;
//!
//! struct Identity;
//!
//! impl CompressionCodec for Identity {
//!     fn name(&self) -> &str { "identity" }
//!     fn extensions(&self) -> &[&str] { &[".id"] }
//!     fn wrap_reader(&self, r: Box<dyn Read + Send>) -> std::io::Result<Box<dyn Read + Send>> {
//!         Ok(r)
//!     }
//!     fn wrap_writer(
//!         &self,
//!         w: Box<dyn Write + Send>,
//!     ) -> std::io::Result<Box<dyn OutputStream>> {
//!         Ok(textcodec::io::compression::plain_stream(w))
//!     }
//! }
//!
//! register_codec(Arc::new(Identity));
//! ```

use crate::options::OptionsError;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Global codec registry.
static CODEC_REGISTRY: RwLock<Option<Vec<Arc<dyn CompressionCodec>>>> = RwLock::new(None);

/// Names that mean "write without compression".
const NO_COMPRESSION: &[&str] = &["none", "uncompressed"];

fn init_registry() -> Vec<Arc<dyn CompressionCodec>> {
    vec![
        #[cfg(feature = "compression-gzip")]
        Arc::new(GzipCodec),
        #[cfg(feature = "compression-zstd")]
        Arc::new(ZstdCodec),
        #[cfg(feature = "compression-bzip2")]
        Arc::new(Bzip2Codec),
        #[cfg(feature = "compression-xz")]
        Arc::new(XzCodec),
    ]
}

/// Run `f` over the registered codecs under the read lock. Only the first call
/// in a process takes the write lock, to install the built-in codecs.
fn with_registry<R>(f: impl FnOnce(&[Arc<dyn CompressionCodec>]) -> R) -> R {
    {
        let lock = CODEC_REGISTRY.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(codecs) = lock.as_deref() {
            return f(codecs);
        }
    }
    let mut lock = CODEC_REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    f(lock.get_or_insert_with(init_registry))
}

/// Register a custom compression codec globally.
///
/// Later registrations do not shadow earlier ones: lookups return the first
/// codec whose name or extension matches.
pub fn register_codec(codec: Arc<dyn CompressionCodec>) {
    let mut lock = CODEC_REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    lock.get_or_insert_with(init_registry).push(codec);
}

/// A compressed (or plain, buffered) output stream that must be finished explicitly.
///
/// `finish` writes any trailer the format needs and flushes everything to the
/// underlying sink, reporting failures that a silent drop would swallow.
pub trait OutputStream: Write + Send {
    fn finish(self: Box<Self>) -> io::Result<()>;
}

/// Pluggable compression codec.
///
/// Implementations must be `Send + Sync`: they live in a global registry and are
/// shared by every worker.
pub trait CompressionCodec: Send + Sync {
    /// Codec name as accepted by the `compression` option (lowercase).
    fn name(&self) -> &str;

    /// File extensions with leading dot, lowercase. The first one is used when
    /// naming output files.
    fn extensions(&self) -> &[&str];

    /// Wrap a reader with decompression.
    fn wrap_reader(&self, reader: Box<dyn Read + Send>) -> io::Result<Box<dyn Read + Send>>;

    /// Wrap a writer with compression.
    fn wrap_writer(&self, writer: Box<dyn Write + Send>) -> io::Result<Box<dyn OutputStream>>;

    /// Suffix appended to output file names.
    fn default_extension(&self) -> &str {
        self.extensions().first().copied().unwrap_or_default()
    }
}

/// Resolve the `compression` option value to a codec.
///
/// `none` and `uncompressed` resolve to `Ok(None)`. Matching is case-insensitive.
///
/// # Errors
/// [`OptionsError::UnknownCodec`] when no registered codec has that name.
pub fn codec_by_name(name: &str) -> Result<Option<Arc<dyn CompressionCodec>>, OptionsError> {
    let wanted = name.trim().to_lowercase();
    if NO_COMPRESSION.contains(&wanted.as_str()) {
        return Ok(None);
    }
    with_registry(|codecs| {
        if let Some(codec) = codecs.iter().find(|c| c.name() == wanted) {
            return Ok(Some(Arc::clone(codec)));
        }
        let mut known: Vec<String> = NO_COMPRESSION.iter().map(|s| (*s).to_string()).collect();
        known.extend(codecs.iter().map(|c| c.name().to_string()));
        Err(OptionsError::UnknownCodec {
            name: name.to_string(),
            known: known.join(", "),
        })
    })
}

/// Detect the codec of an input file from its extension (case-insensitive).
pub fn codec_for_path(path: impl AsRef<Path>) -> Option<Arc<dyn CompressionCodec>> {
    let path_str = path.as_ref().to_string_lossy().to_lowercase();
    let found = with_registry(|codecs| {
        codecs
            .iter()
            .find(|codec| codec.extensions().iter().any(|ext| path_str.ends_with(ext)))
            .cloned()
    });
    if let Some(codec) = &found {
        debug!(path = %path_str, codec = codec.name(), "detected input compression");
    }
    found
}

/// Buffered pass-through output stream, used when no codec is configured.
pub fn plain_stream(writer: Box<dyn Write + Send>) -> Box<dyn OutputStream> {
    Box::new(Plain(BufWriter::new(writer)))
}

struct Plain(BufWriter<Box<dyn Write + Send>>);

impl Write for Plain {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl OutputStream for Plain {
    fn finish(self: Box<Self>) -> io::Result<()> {
        let mut inner = self.0.into_inner().map_err(|e| e.into_error())?;
        inner.flush()
    }
}

// ============================================================================
// Built-in Codec Implementations
// ============================================================================

#[cfg(feature = "compression-gzip")]
struct GzipCodec;

#[cfg(feature = "compression-gzip")]
impl CompressionCodec for GzipCodec {
    fn name(&self) -> &str {
        "gzip"
    }

    fn extensions(&self) -> &[&str] {
        &[".gz", ".gzip"]
    }

    fn wrap_reader(&self, reader: Box<dyn Read + Send>) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(flate2::read::MultiGzDecoder::new(reader)))
    }

    fn wrap_writer(&self, writer: Box<dyn Write + Send>) -> io::Result<Box<dyn OutputStream>> {
        use flate2::Compression;
        use flate2::write::GzEncoder;
        Ok(Box::new(GzEncoder::new(writer, Compression::default())))
    }
}

#[cfg(feature = "compression-gzip")]
impl OutputStream for flate2::write::GzEncoder<Box<dyn Write + Send>> {
    fn finish(self: Box<Self>) -> io::Result<()> {
        let mut inner = (*self).finish()?;
        inner.flush()
    }
}

#[cfg(feature = "compression-zstd")]
struct ZstdCodec;

#[cfg(feature = "compression-zstd")]
impl CompressionCodec for ZstdCodec {
    fn name(&self) -> &str {
        "zstd"
    }

    fn extensions(&self) -> &[&str] {
        &[".zst", ".zstd"]
    }

    fn wrap_reader(&self, reader: Box<dyn Read + Send>) -> io::Result<Box<dyn Read + Send>> {
        zstd::stream::read::Decoder::new(reader).map(|d| Box::new(d) as Box<dyn Read + Send>)
    }

    fn wrap_writer(&self, writer: Box<dyn Write + Send>) -> io::Result<Box<dyn OutputStream>> {
        zstd::stream::write::Encoder::new(writer, 3).map(|e| Box::new(e) as Box<dyn OutputStream>)
    }
}

#[cfg(feature = "compression-zstd")]
impl OutputStream for zstd::stream::write::Encoder<'static, Box<dyn Write + Send>> {
    fn finish(self: Box<Self>) -> io::Result<()> {
        let mut inner = (*self).finish()?;
        inner.flush()
    }
}

#[cfg(feature = "compression-bzip2")]
struct Bzip2Codec;

#[cfg(feature = "compression-bzip2")]
impl CompressionCodec for Bzip2Codec {
    fn name(&self) -> &str {
        "bzip2"
    }

    fn extensions(&self) -> &[&str] {
        &[".bz2", ".bzip2"]
    }

    fn wrap_reader(&self, reader: Box<dyn Read + Send>) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(bzip2::read::MultiBzDecoder::new(reader)))
    }

    fn wrap_writer(&self, writer: Box<dyn Write + Send>) -> io::Result<Box<dyn OutputStream>> {
        use bzip2::Compression;
        use bzip2::write::BzEncoder;
        Ok(Box::new(BzEncoder::new(writer, Compression::default())))
    }
}

#[cfg(feature = "compression-bzip2")]
impl OutputStream for bzip2::write::BzEncoder<Box<dyn Write + Send>> {
    fn finish(self: Box<Self>) -> io::Result<()> {
        let mut inner = (*self).finish()?;
        inner.flush()
    }
}

#[cfg(feature = "compression-xz")]
struct XzCodec;

#[cfg(feature = "compression-xz")]
impl CompressionCodec for XzCodec {
    fn name(&self) -> &str {
        "xz"
    }

    fn extensions(&self) -> &[&str] {
        &[".xz"]
    }

    fn wrap_reader(&self, reader: Box<dyn Read + Send>) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(xz2::read::XzDecoder::new_multi_decoder(reader)))
    }

    fn wrap_writer(&self, writer: Box<dyn Write + Send>) -> io::Result<Box<dyn OutputStream>> {
        Ok(Box::new(xz2::write::XzEncoder::new(writer, 6)))
    }
}

#[cfg(feature = "compression-xz")]
impl OutputStream for xz2::write::XzEncoder<Box<dyn Write + Send>> {
    fn finish(self: Box<Self>) -> io::Result<()> {
        let mut inner = (*self).finish()?;
        inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_run_under_the_read_lock() {
        with_registry(|_| ());
        let held = CODEC_REGISTRY.read().unwrap();
        // a second reader on another thread must not wait for `held`
        let found = std::thread::spawn(|| {
            (
                codec_for_path("part-00000.txt").is_none(),
                codec_by_name("lzma-turbo").is_err(),
            )
        })
        .join()
        .unwrap();
        drop(held);
        assert_eq!(found, (true, true));
    }

    #[cfg(feature = "compression-gzip")]
    #[test]
    fn detects_by_name_and_extension() {
        let by_name = codec_by_name(" GZIP ").unwrap().unwrap();
        assert_eq!(by_name.name(), "gzip");
        let by_path = codec_for_path("logs/part-00000.TXT.GZ").unwrap();
        assert_eq!(by_path.default_extension(), ".gz");
        assert!(codec_by_name("uncompressed").unwrap().is_none());
    }
}
