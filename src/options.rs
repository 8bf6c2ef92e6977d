//! Options of the text format.
//!
//! Options arrive as a string-keyed map (keys are case-insensitive), are parsed
//! once when the format is set up, and are immutable afterwards. A parsed
//! [`TextOptions`] holds no open resources: share it across workers with an
//! `Arc`, or ship it to another process as JSON via serde.
//!
//! | key           | meaning                                        | default            |
//! |---------------|------------------------------------------------|--------------------|
//! | `wholetext`   | read each file as one row                      | `false`            |
//! | `lineSep`     | row separator for both reading and writing     | read: auto, write: `\n` |
//! | `compression` | output codec (`codec` is accepted as an alias) | none               |

use crate::io::compression::{CompressionCodec, codec_by_name};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

pub const WHOLE_TEXT: &str = "wholetext";
pub const LINE_SEP: &str = "linesep";
pub const COMPRESSION: &str = "compression";
pub const CODEC: &str = "codec";

/// Separator written after every row when none is configured.
pub const DEFAULT_WRITE_SEPARATOR: &[u8] = b"\n";

/// Invalid option values, reported when the options are parsed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OptionsError {
    #[error("option `{key}` must be `true` or `false`, got `{value}`")]
    InvalidBool { key: String, value: String },
    #[error("option `lineSep` must not be empty")]
    EmptyLineSeparator,
    #[error("codec `{name}` is not available; known codecs are: {known}")]
    UnknownCodec { name: String, known: String },
}

/// How the reader finds row boundaries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadSeparator {
    /// Accept `\n`, `\r` and `\r\n` as line terminators.
    Auto,
    /// Split on exactly these bytes.
    Exact(Vec<u8>),
}

impl ReadSeparator {
    /// Longest terminator this separator can match, in bytes.
    pub fn max_len(&self) -> usize {
        match self {
            Self::Auto => 2,
            Self::Exact(sep) => sep.len(),
        }
    }

    /// Whether a match can start inside another match, as in `||` or `\n\n`:
    /// some proper prefix of the separator is also a suffix of it.
    ///
    /// Such a separator only splits consistently when scanned from the start of
    /// the file.
    pub fn overlaps_itself(&self) -> bool {
        match self {
            Self::Auto => false,
            Self::Exact(sep) => (1..sep.len()).any(|k| sep[..k] == sep[sep.len() - k..]),
        }
    }
}

/// Parsed options of one text read or write job.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextOptions {
    pub whole_text: bool,
    /// Read separator; `None` means auto-detection.
    pub read_separator: Option<Vec<u8>>,
    /// Write separator; `None` means [`DEFAULT_WRITE_SEPARATOR`].
    pub write_separator: Option<Vec<u8>>,
    /// Normalized codec name, `None` when output is uncompressed.
    pub compression: Option<String>,
}

impl TextOptions {
    /// Parse options from a string map. Unknown keys are ignored: the same map
    /// usually carries options of the surrounding engine.
    ///
    /// # Errors
    /// See [`OptionsError`].
    pub fn from_map<K, V>(options: &HashMap<K, V>) -> Result<Self, OptionsError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let lookup: HashMap<String, &str> = options
            .iter()
            .map(|(k, v)| (k.as_ref().to_lowercase(), v.as_ref()))
            .collect();

        let mut parsed = Self::default();
        if let Some(value) = lookup.get(WHOLE_TEXT) {
            parsed.whole_text = parse_bool(WHOLE_TEXT, value)?;
        }
        if let Some(sep) = lookup.get(LINE_SEP) {
            parsed = parsed.with_line_separator(sep.as_bytes())?;
        }
        if let Some(name) = lookup.get(COMPRESSION).or_else(|| lookup.get(CODEC)) {
            parsed = parsed.with_compression(name)?;
        }
        Ok(parsed)
    }

    #[must_use]
    pub fn with_whole_text(mut self, whole_text: bool) -> Self {
        self.whole_text = whole_text;
        self
    }

    /// Use `sep` as both the read and the write separator.
    ///
    /// # Errors
    /// [`OptionsError::EmptyLineSeparator`] for an empty separator.
    pub fn with_line_separator(self, sep: impl Into<Vec<u8>>) -> Result<Self, OptionsError> {
        let sep = sep.into();
        self.with_read_separator(sep.clone())?
            .with_write_separator(sep)
    }

    /// Set only the read separator.
    ///
    /// # Errors
    /// [`OptionsError::EmptyLineSeparator`] for an empty separator.
    pub fn with_read_separator(mut self, sep: impl Into<Vec<u8>>) -> Result<Self, OptionsError> {
        self.read_separator = Some(non_empty(sep.into())?);
        Ok(self)
    }

    /// Set only the write separator.
    ///
    /// # Errors
    /// [`OptionsError::EmptyLineSeparator`] for an empty separator.
    pub fn with_write_separator(mut self, sep: impl Into<Vec<u8>>) -> Result<Self, OptionsError> {
        self.write_separator = Some(non_empty(sep.into())?);
        Ok(self)
    }

    /// Compress output with the named codec (`none` clears it).
    ///
    /// # Errors
    /// [`OptionsError::UnknownCodec`] when the codec is not registered.
    pub fn with_compression(mut self, name: &str) -> Result<Self, OptionsError> {
        self.compression = codec_by_name(name)?.map(|c| c.name().to_string());
        Ok(self)
    }

    /// The read separator, falling back to auto-detection.
    pub fn line_separator_in_read(&self) -> ReadSeparator {
        match &self.read_separator {
            Some(sep) => ReadSeparator::Exact(sep.clone()),
            None => ReadSeparator::Auto,
        }
    }

    /// The write separator, falling back to a single `\n`.
    pub fn line_separator_in_write(&self) -> &[u8] {
        self.write_separator
            .as_deref()
            .unwrap_or(DEFAULT_WRITE_SEPARATOR)
    }

    /// The configured output codec.
    ///
    /// # Errors
    /// [`OptionsError::UnknownCodec`] if the codec was deregistered since parsing,
    /// which only happens for options deserialized in a process with fewer codecs.
    pub fn output_codec(&self) -> Result<Option<Arc<dyn CompressionCodec>>, OptionsError> {
        match &self.compression {
            Some(name) => codec_by_name(name),
            None => Ok(None),
        }
    }

    /// Serialize for shipping to workers.
    ///
    /// # Errors
    /// Fails only if serde_json fails, which it does not for this type.
    pub fn to_broadcast(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Inverse of [`TextOptions::to_broadcast`].
    ///
    /// # Errors
    /// Fails on malformed input.
    pub fn from_broadcast(payload: &str) -> serde_json::Result<Self> {
        serde_json::from_str(payload)
    }
}

/// Read and write separators of `options`, each with its default applied.
pub fn resolve_line_separators(options: &TextOptions) -> (ReadSeparator, Vec<u8>) {
    (
        options.line_separator_in_read(),
        options.line_separator_in_write().to_vec(),
    )
}

fn parse_bool(key: &str, value: &str) -> Result<bool, OptionsError> {
    match value.trim().to_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(OptionsError::InvalidBool {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn non_empty(sep: Vec<u8>) -> Result<Vec<u8>, OptionsError> {
    if sep.is_empty() {
        return Err(OptionsError::EmptyLineSeparator);
    }
    Ok(sep)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let opts = TextOptions::from_map(&HashMap::<String, String>::new()).unwrap();
        assert!(!opts.whole_text);
        assert_eq!(opts.line_separator_in_read(), ReadSeparator::Auto);
        assert_eq!(opts.line_separator_in_write(), b"\n");
        assert!(opts.output_codec().unwrap().is_none());
    }

    #[test]
    fn keys_are_case_insensitive() {
        let map = HashMap::from([("WholeText", "TRUE"), ("LINESEP", "||")]);
        let opts = TextOptions::from_map(&map).unwrap();
        assert!(opts.whole_text);
        assert_eq!(
            opts.line_separator_in_read(),
            ReadSeparator::Exact(b"||".to_vec())
        );
        assert_eq!(opts.line_separator_in_write(), b"||");
    }

    #[test]
    fn separators_are_independent() {
        let opts = TextOptions::default()
            .with_read_separator(b"\r\n".to_vec())
            .unwrap();
        let (read, write) = resolve_line_separators(&opts);
        assert_eq!(read, ReadSeparator::Exact(b"\r\n".to_vec()));
        assert_eq!(write, b"\n");
    }

    #[test]
    fn rejects_bad_values() {
        let bad_bool = HashMap::from([("wholetext", "yes")]);
        assert!(matches!(
            TextOptions::from_map(&bad_bool),
            Err(OptionsError::InvalidBool { .. })
        ));
        let empty_sep = HashMap::from([("lineSep", "")]);
        assert_eq!(
            TextOptions::from_map(&empty_sep),
            Err(OptionsError::EmptyLineSeparator)
        );
        let codec = HashMap::from([("compression", "lzma-turbo")]);
        assert!(matches!(
            TextOptions::from_map(&codec),
            Err(OptionsError::UnknownCodec { .. })
        ));
    }

    #[test]
    fn self_overlapping_separators() {
        for sep in [&b"||"[..], &b"\n\n"[..], &b"aba"[..], &b"abcab"[..]] {
            assert!(ReadSeparator::Exact(sep.to_vec()).overlaps_itself(), "{sep:?}");
        }
        for sep in [&b"\n"[..], &b"\r\n"[..], &b"<>"[..], &b"abc"[..], &b"aab"[..]] {
            assert!(!ReadSeparator::Exact(sep.to_vec()).overlaps_itself(), "{sep:?}");
        }
        assert!(!ReadSeparator::Auto.overlaps_itself());
    }

    #[test]
    fn uncompressed_aliases() {
        for name in ["none", "Uncompressed"] {
            let opts = TextOptions::from_map(&HashMap::from([("codec", name)])).unwrap();
            assert_eq!(opts.compression, None);
        }
    }

    #[test]
    fn survives_broadcast() {
        let opts = TextOptions::default()
            .with_whole_text(true)
            .with_line_separator(vec![0x00, 0xff])
            .unwrap();
        let shipped = opts.to_broadcast().unwrap();
        assert_eq!(TextOptions::from_broadcast(&shipped).unwrap(), opts);
    }
}
