//! The `text` file format: entry point for scan planning, reading and writing.

use crate::io::glob::list_input_files;
use crate::io::{FileSystem, LocalFileSystem};
use crate::options::TextOptions;
use crate::partition::{
    FilePartition, SplitConfig, base_splittable, is_splittable, plan_partitions,
};
use crate::reader::TextRowReader;
use crate::row::OwnedRow;
use crate::schema::{RequiredColumns, Schema, infer_schema, validate_write_schema};
use crate::task::TaskContext;
use crate::writer::TextOutputWriterFactory;
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Opens the rows of one partition inside one task.
pub trait PartitionReader:
    Fn(&FilePartition, &TaskContext) -> Result<TextRowReader> + Send + Sync
{
}

impl<F> PartitionReader for F where
    F: Fn(&FilePartition, &TaskContext) -> Result<TextRowReader> + Send + Sync
{
}

/// Line-oriented text files as a data source and sink.
#[derive(Clone)]
pub struct TextFileFormat {
    fs: Arc<dyn FileSystem>,
}

impl Default for TextFileFormat {
    fn default() -> Self {
        Self::new(Arc::new(LocalFileSystem))
    }
}

impl TextFileFormat {
    /// Name under which the engine registers this format.
    pub const SHORT_NAME: &'static str = "text";

    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    pub fn file_system(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// The one-column string schema; independent of the files.
    pub fn infer_schema(&self) -> Schema {
        infer_schema()
    }

    /// Whether `path` may be cut into several partitions under `options`.
    pub fn is_splittable(&self, options: &TextOptions, path: &Path) -> bool {
        is_splittable(base_splittable(path), options.whole_text)
    }

    /// Validate `schema` and set up writers for a write job.
    ///
    /// # Errors
    /// A [`crate::SchemaError`] (downcastable from the returned error) when the
    /// schema is not a single string column; nothing is created in that case.
    pub fn prepare_write(
        &self,
        schema: &Schema,
        options: &TextOptions,
    ) -> Result<TextOutputWriterFactory> {
        validate_write_schema(schema)?;
        TextOutputWriterFactory::new(Arc::clone(&self.fs), options)
    }

    /// Build the per-partition reader function of a scan.
    ///
    /// `required` is the schema the query needs: empty for row counts, the
    /// `value` column otherwise. The returned function can be shared by all
    /// workers; each call opens one partition and ties its input to the task.
    ///
    /// # Errors
    /// [`crate::SchemaError::WrongColumnCount`] for more than one required column.
    pub fn build_reader(
        &self,
        required: &Schema,
        options: Arc<TextOptions>,
    ) -> Result<impl PartitionReader + Clone + use<>> {
        let required = RequiredColumns::from_schema(required)?;
        let fs = Arc::clone(&self.fs);
        debug!(?required, whole_text = options.whole_text, "built text reader");
        Ok(move |partition: &FilePartition, task: &TaskContext| {
            TextRowReader::open(fs.as_ref(), partition, &options, required, task)
        })
    }

    /// List the files at `location` (file, directory or glob) and plan partitions.
    ///
    /// # Errors
    /// Listing and stat failures.
    pub fn plan(
        &self,
        location: &str,
        options: &TextOptions,
        config: &SplitConfig,
    ) -> Result<Vec<FilePartition>> {
        let files = list_input_files(location)?;
        plan_partitions(self.fs.as_ref(), &files, options, config)
    }

    /// Read every row at `location` sequentially, in partition order.
    ///
    /// # Errors
    /// Listing, open and read failures.
    pub fn read_all(&self, location: &str, options: TextOptions) -> Result<Vec<OwnedRow>> {
        let partitions = self.plan(location, &options, &SplitConfig::default())?;
        let open = self.build_reader(&infer_schema(), Arc::new(options))?;
        let mut rows = Vec::new();
        for (i, partition) in partitions.iter().enumerate() {
            let task = TaskContext::new(i);
            let read = open(partition, &task).and_then(TextRowReader::collect_rows);
            task.mark_completed();
            rows.extend(read.with_context(|| format!("read {}", partition.path.display()))?);
        }
        Ok(rows)
    }
}
