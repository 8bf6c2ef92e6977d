//! # textcodec
//!
//! A **line-oriented text file format** for batch query engines: a data source
//! that turns files into single-column rows, and a sink that turns rows back into
//! delimited files.
//!
//! ## Key Features
//!
//! - **One-column schema** - every row is the raw bytes of one line, as column `value`
//! - **Byte-range partitions** - large files are cut into ranges read by separate
//!   workers, and every line is read by exactly one of them
//! - **Whole-text mode** - each file becomes a single row (never split)
//! - **Configurable separators** - auto-detected `\n` / `\r` / `\r\n` by default,
//!   any multi-byte sequence on request, independently for reading and writing
//! - **Transparent compression** - gzip, zstd, bzip2 and xz (optional via feature flags)
//! - **Row-count fast path** - zero-column scans never copy line bytes
//! - **Lazy outputs** - files are created on the first row only
//!
//! ## Quick Start
//!
//! ```no_run
//! use textcodec::*;
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! # fn main() -> anyhow::Result<()> {
//! let format = TextFileFormat::default();
//! let options = TextOptions::from_map(&HashMap::from([("lineSep", "\n")]))?;
//!
//! // Read: plan partitions, then open each one inside its task
//! let partitions = format.plan("logs/*.txt", &options, &SplitConfig::default())?;
//! let open = format.build_reader(&format.infer_schema(), Arc::new(options.clone()))?;
//! for (i, partition) in partitions.iter().enumerate() {
//!     let task = TaskContext::new(i);
//!     let mut rows = open(partition, &task)?;
//!     while let Some(row) = rows.next_row()? {
//!         println!("{:?}", row.value_str());
//!     }
//!     task.mark_completed();
//! }
//!
//! // Write: validate the schema, then one writer per output file
//! let factory = format.prepare_write(&format.infer_schema(), &options)?;
//! let task = TaskContext::new(0);
//! let mut writer = factory.new_writer(format!("out/part-00000{}", factory.extension()), &task);
//! writer.write(OwnedRow::from("hello").as_record())?;
//! writer.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `compression-gzip`, `compression-zstd`, `compression-bzip2`, `compression-xz` -
//!   built-in codecs
//! - `parallel-io` - [`read_partitions_par`] and [`write_parts_par`]
//!
//! ## Module Overview
//!
//! - [`schema`] - the fixed `value` schema and write-side validation
//! - [`options`] - option parsing and separator resolution
//! - [`partition`] - byte-range partitions and split planning
//! - [`reader`] - segment readers and the row reader
//! - [`row`] - row records and the reusable row encoder
//! - [`writer`] - lazily opened output writers
//! - [`io`] - filesystem seam, compression codecs, input listing
//! - [`task`] - per-task completion hooks

pub mod format;
pub mod io;
pub mod options;
pub mod partition;
pub mod reader;
pub mod row;
pub mod schema;
pub mod task;
pub mod testing;
pub mod writer;

#[cfg_attr(docsrs, doc(cfg(feature = "parallel-io")))]
#[cfg(feature = "parallel-io")]
pub mod parallel;

pub use format::{PartitionReader, TextFileFormat};
pub use io::{FileSystem, LocalFileSystem};
pub use options::{OptionsError, ReadSeparator, TextOptions, resolve_line_separators};
pub use partition::{FilePartition, SplitConfig, is_splittable, plan_partitions};
pub use reader::TextRowReader;
pub use row::{EMPTY_ROW, OwnedRow, RowEncoder, RowRecord};
pub use schema::{
    DataType, Field, RequiredColumns, Schema, SchemaError, VALUE_COLUMN, infer_schema,
    validate_write_schema,
};
pub use task::TaskContext;
pub use writer::{TextOutputWriter, TextOutputWriterFactory};

#[cfg(feature = "parallel-io")]
pub use parallel::{read_partitions_par, write_parts_par};
