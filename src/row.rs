//! Row records and the read-side row encoder.
//!
//! A text row has either no columns (the engine only counts rows) or exactly
//! one column holding the raw line bytes, possibly null on the write side.
//!
//! [`RowEncoder`] copies each line into one buffer it reuses for the whole
//! partition. The [`RowRecord`] it returns borrows that buffer, so the borrow
//! checker enforces that a record is dropped (or copied out with
//! [`RowRecord::into_owned`]) before the next line is encoded.

use crate::schema::RequiredColumns;
use std::borrow::Cow;

/// A borrowed row record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RowRecord<'a> {
    /// A row with no columns.
    Empty,
    /// A row with one column; `None` is a null value.
    Value(Option<&'a [u8]>),
}

/// The record every zero-column row is represented by.
pub const EMPTY_ROW: RowRecord<'static> = RowRecord::Empty;

impl<'a> RowRecord<'a> {
    pub fn num_fields(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Value(_) => 1,
        }
    }

    /// The column value, or `None` for null values and zero-column rows.
    pub fn value(&self) -> Option<&'a [u8]> {
        match self {
            Self::Empty => None,
            Self::Value(v) => *v,
        }
    }

    /// The column value as text. Invalid UTF-8 is replaced, not rejected.
    pub fn value_str(&self) -> Option<Cow<'a, str>> {
        self.value().map(String::from_utf8_lossy)
    }

    /// Copy the record out of the encoder's buffer.
    pub fn into_owned(self) -> OwnedRow {
        match self {
            Self::Empty => OwnedRow::Empty,
            Self::Value(v) => OwnedRow::Value(v.map(<[u8]>::to_vec)),
        }
    }
}

/// A row record that owns its bytes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum OwnedRow {
    Empty,
    Value(Option<Vec<u8>>),
}

impl OwnedRow {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Value(Some(bytes.into()))
    }

    pub fn null() -> Self {
        Self::Value(None)
    }

    pub fn as_record(&self) -> RowRecord<'_> {
        match self {
            Self::Empty => EMPTY_ROW,
            Self::Value(v) => RowRecord::Value(v.as_deref()),
        }
    }

    pub fn value(&self) -> Option<&[u8]> {
        self.as_record().value()
    }

    pub fn value_str(&self) -> Option<Cow<'_, str>> {
        self.as_record().value_str()
    }
}

impl From<&str> for OwnedRow {
    fn from(s: &str) -> Self {
        Self::from_bytes(s)
    }
}

impl From<String> for OwnedRow {
    fn from(s: String) -> Self {
        Self::from_bytes(s)
    }
}

impl<'a> From<RowRecord<'a>> for OwnedRow {
    fn from(row: RowRecord<'a>) -> Self {
        row.into_owned()
    }
}

/// Turns raw lines into row records, one partition at a time.
#[derive(Debug)]
pub struct RowEncoder {
    required: RequiredColumns,
    buf: Vec<u8>,
}

impl RowEncoder {
    pub fn new(required: RequiredColumns) -> Self {
        Self {
            required,
            buf: Vec::new(),
        }
    }

    pub fn required(&self) -> RequiredColumns {
        self.required
    }

    /// Encode one line.
    ///
    /// With no required columns this returns [`EMPTY_ROW`] without touching the
    /// line. Otherwise the buffer is truncated and `line` copied in; the result
    /// stays valid until the next call.
    pub fn encode(&mut self, line: &[u8]) -> RowRecord<'_> {
        match self.required {
            RequiredColumns::None => EMPTY_ROW,
            RequiredColumns::Value => {
                self.buf.clear();
                self.buf.extend_from_slice(line);
                RowRecord::Value(Some(self.buf.as_slice()))
            }
        }
    }

    /// Bytes currently reserved by the reusable buffer.
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_columns_never_copy() {
        let mut enc = RowEncoder::new(RequiredColumns::None);
        for line in [&b"first"[..], &b""[..], &b"a much longer line than the others"[..]] {
            let row = enc.encode(line);
            assert_eq!(row, EMPTY_ROW);
            assert_eq!(row.num_fields(), 0);
            assert_eq!(row.value(), None);
        }
        assert_eq!(enc.capacity(), 0);
    }

    #[test]
    fn buffer_is_reused_between_rows() {
        let mut enc = RowEncoder::new(RequiredColumns::Value);
        let first = enc.encode(b"a fairly long first line").into_owned();
        let cap = enc.capacity();
        let second = enc.encode(b"short");
        assert_eq!(second.value(), Some(&b"short"[..]));
        assert_eq!(enc.capacity(), cap);
        assert_eq!(first.value_str().as_deref(), Some("a fairly long first line"));
    }

    #[test]
    fn lossy_text_view() {
        let row = OwnedRow::from_bytes(vec![b'o', b'k', 0xff]);
        assert_eq!(row.value_str().as_deref(), Some("ok\u{fffd}"));
        assert_eq!(OwnedRow::null().value_str(), None);
    }
}
