//! Testing utilities for code built on the text codec.
//!
//! - **Temporary files**: [`TempDirPath`] and [`write_text_file`] for fixtures
//! - **Handle accounting**: [`CountingFileSystem`] records how often every input
//!   handle it hands out is opened and released
//! - **Logging**: [`init_test_tracing`] routes `tracing` output to the test harness
//!
//! # Example
//!
//! ```
//! use textcodec::testing::*;
//! use textcodec::*;
//! use std::sync::Arc;
//!
//! # fn main() -> anyhow::Result<()> {
//! let dir = TempDirPath::new()?;
//! let file = write_text_file(dir.path(), "in.txt", b"a\nb\n")?;
//!
//! let fs = Arc::new(CountingFileSystem::default());
//! let format = TextFileFormat::new(fs.clone());
//! let open = format.build_reader(&format.infer_schema(), Arc::new(TextOptions::default()))?;
//! let task = TaskContext::default();
//! let rows = open(&FilePartition::whole(&file, 4), &task)?.collect_rows()?;
//!
//! assert_eq!(rows.len(), 2);
//! assert_eq!(fs.closed(&file), 1);
//! # Ok(())
//! # }
//! ```

mod mock_io;

pub use mock_io::{CountingFileSystem, TempDirPath, write_text_file};

use std::sync::Once;

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Honors `RUST_LOG`; safe to call from every test.
pub fn init_test_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
