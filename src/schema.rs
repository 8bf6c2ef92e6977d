//! The fixed one-column schema of the text format and its write-side checks.
//!
//! Text files carry no structure the reader could inspect, so the schema is not
//! inferred from data: every text source exposes exactly one string column named
//! [`VALUE_COLUMN`]. Writers accept any schema whose only column is a string,
//! whatever its name.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Name of the single column produced by the text source.
pub const VALUE_COLUMN: &str = "value";

/// Column types the surrounding engine can declare.
///
/// The text codec only produces and consumes [`DataType::String`]; the other
/// variants exist so that a caller handing over an arbitrary schema gets a
/// precise [`SchemaError`] instead of a silent coercion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    String,
    Binary,
    Boolean,
    Int64,
    Float64,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Binary => "binary",
            Self::Boolean => "boolean",
            Self::Int64 => "bigint",
            Self::Float64 => "double",
        };
        f.write_str(name)
    }
}

/// A named, typed column.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
        }
    }
}

/// An ordered list of columns.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// The schema with no columns, as requested by pure row-count queries.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Number of columns a query actually needs from the text source.
///
/// Row-count queries ask for zero columns; everything else asks for the single
/// `value` column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequiredColumns {
    None,
    Value,
}

impl RequiredColumns {
    /// Derive the requirement from the schema the engine asks the reader to produce.
    ///
    /// # Errors
    /// Returns [`SchemaError::WrongColumnCount`] when more than one column is requested.
    pub fn from_schema(required: &Schema) -> Result<Self, SchemaError> {
        match required.len() {
            0 => Ok(Self::None),
            1 => Ok(Self::Value),
            n => Err(SchemaError::WrongColumnCount(n)),
        }
    }

    pub fn count(self) -> usize {
        match self {
            Self::None => 0,
            Self::Value => 1,
        }
    }
}

/// Rejections of a schema handed to the text sink (or requested from the source).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("text data source supports only a single column, and you have {0} columns")]
    WrongColumnCount(usize),
    #[error("text data source does not support {data_type} data type (column `{column}`)")]
    UnsupportedType { column: String, data_type: DataType },
}

/// The schema of every text source: one nullable string column named `value`.
///
/// No file is inspected; the result is the same for every input.
pub fn infer_schema() -> Schema {
    Schema::new(vec![Field::new(VALUE_COLUMN, DataType::String, true)])
}

/// Check that `schema` can be written as text.
///
/// Must be called once per write job, before any output writer is constructed.
///
/// # Errors
/// - [`SchemaError::WrongColumnCount`] unless the schema has exactly one column.
/// - [`SchemaError::UnsupportedType`] when that column is not a string.
pub fn validate_write_schema(schema: &Schema) -> Result<(), SchemaError> {
    if schema.len() != 1 {
        return Err(SchemaError::WrongColumnCount(schema.len()));
    }
    let field = &schema.fields()[0];
    if field.data_type != DataType::String {
        return Err(SchemaError::UnsupportedType {
            column: field.name.clone(),
            data_type: field.data_type,
        });
    }
    Ok(())
}
