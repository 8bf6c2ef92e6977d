//! Writing rows as delimited text.

use std::collections::HashMap;
use std::sync::Arc;
use textcodec::testing::*;
use textcodec::*;

fn write_all(
    factory: &TextOutputWriterFactory,
    path: &std::path::Path,
    rows: &[OwnedRow],
) -> anyhow::Result<()> {
    let task = TaskContext::new(0);
    let mut writer = factory.new_writer(path, &task);
    for row in rows {
        writer.write(row.as_record())?;
    }
    writer.close()
}

#[test]
fn writes_values_followed_by_newline() -> anyhow::Result<()> {
    let dir = TempDirPath::new()?;
    let format = TextFileFormat::default();
    let factory = format.prepare_write(&format.infer_schema(), &TextOptions::default())?;
    let path = dir.file_path("out.txt");

    let rows: Vec<OwnedRow> = ["a", "b", "c"].into_iter().map(OwnedRow::from).collect();
    write_all(&factory, &path, &rows)?;

    assert_eq!(std::fs::read(&path)?, b"a\nb\nc\n");
    Ok(())
}

#[test]
fn written_file_reads_back_identically() -> anyhow::Result<()> {
    let dir = TempDirPath::new()?;
    let original = write_text_file(dir.path(), "in.txt", b"a\nb\nc\n")?;
    let format = TextFileFormat::default();

    let rows = format.read_all(&original.to_string_lossy(), TextOptions::default())?;
    let factory = format.prepare_write(&format.infer_schema(), &TextOptions::default())?;
    let copy = dir.file_path("copy.txt");
    write_all(&factory, &copy, &rows)?;

    assert_eq!(std::fs::read(&copy)?, std::fs::read(&original)?);
    Ok(())
}

#[test]
fn null_value_writes_only_the_separator() -> anyhow::Result<()> {
    let dir = TempDirPath::new()?;
    let format = TextFileFormat::default();
    let factory = format.prepare_write(&format.infer_schema(), &TextOptions::default())?;
    let path = dir.file_path("nulls.txt");

    write_all(
        &factory,
        &path,
        &[OwnedRow::from("x"), OwnedRow::null(), OwnedRow::from("y")],
    )?;
    assert_eq!(std::fs::read(&path)?, b"x\n\ny\n");

    let rows = format.read_all(&path.to_string_lossy(), TextOptions::default())?;
    assert_eq!(rows[1], OwnedRow::from(""));
    Ok(())
}

#[test]
fn no_file_without_rows() -> anyhow::Result<()> {
    let dir = TempDirPath::new()?;
    let format = TextFileFormat::default();
    let factory = format.prepare_write(&format.infer_schema(), &TextOptions::default())?;
    let path = dir.file_path("nested/empty.txt");

    let task = TaskContext::new(0);
    let mut writer = factory.new_writer(&path, &task);
    assert!(!writer.is_open());
    writer.close()?;
    writer.close()?;

    assert!(!path.exists());
    assert!(!dir.file_path("nested").exists());
    Ok(())
}

#[test]
fn file_created_on_first_write() -> anyhow::Result<()> {
    let dir = TempDirPath::new()?;
    let format = TextFileFormat::default();
    let factory = format.prepare_write(&format.infer_schema(), &TextOptions::default())?;
    let path = dir.file_path("nested/deeper/out.txt");

    let task = TaskContext::new(0);
    let mut writer = factory.new_writer(&path, &task);
    assert!(!path.exists());
    writer.write(OwnedRow::from("only").as_record())?;
    assert!(writer.is_open());
    assert!(path.exists());
    writer.close()?;

    assert_eq!(writer.rows_written(), 1);
    assert_eq!(std::fs::read(&path)?, b"only\n");
    Ok(())
}

#[test]
fn close_is_idempotent_and_final() -> anyhow::Result<()> {
    let dir = TempDirPath::new()?;
    let format = TextFileFormat::default();
    let factory = format.prepare_write(&format.infer_schema(), &TextOptions::default())?;
    let path = dir.file_path("out.txt");

    let task = TaskContext::new(0);
    let mut writer = factory.new_writer(&path, &task);
    writer.write(OwnedRow::from("v").as_record())?;
    writer.close()?;
    writer.close()?;

    let err = writer.write(OwnedRow::from("late").as_record()).unwrap_err();
    assert!(err.to_string().contains("closed"));
    assert_eq!(std::fs::read(&path)?, b"v\n");
    Ok(())
}

#[test]
fn task_completion_leaves_writer_to_its_owner() -> anyhow::Result<()> {
    let dir = TempDirPath::new()?;
    let format = TextFileFormat::default();
    let factory = format.prepare_write(&format.infer_schema(), &TextOptions::default())?;
    let path = dir.file_path("out.txt");

    let task = TaskContext::new(7);
    let mut writer = factory.new_writer(&path, &task);
    writer.write(OwnedRow::from("before").as_record())?;
    task.mark_completed();

    assert!(writer.is_open());
    writer.write(OwnedRow::from("after").as_record())?;
    writer.close()?;
    assert_eq!(std::fs::read(&path)?, b"before\nafter\n");
    Ok(())
}

#[test]
fn zero_column_rows_cannot_be_written() -> anyhow::Result<()> {
    let dir = TempDirPath::new()?;
    let format = TextFileFormat::default();
    let factory = format.prepare_write(&format.infer_schema(), &TextOptions::default())?;
    let task = TaskContext::new(0);
    let mut writer = factory.new_writer(dir.file_path("out.txt"), &task);

    assert!(writer.write(EMPTY_ROW).is_err());
    assert!(!writer.is_open());
    writer.close()?;
    Ok(())
}

#[test]
fn schema_is_validated_before_any_output() -> anyhow::Result<()> {
    let format = TextFileFormat::default();
    for n in [0, 2, 3] {
        let schema = Schema::new(
            (0..n)
                .map(|i| Field::new(format!("c{i}"), DataType::String, true))
                .collect(),
        );
        let err = format
            .prepare_write(&schema, &TextOptions::default())
            .err()
            .expect("schema must be rejected");
        assert_eq!(
            err.downcast_ref::<SchemaError>(),
            Some(&SchemaError::WrongColumnCount(n))
        );
    }

    let renamed = Schema::new(vec![Field::new("line", DataType::String, false)]);
    assert!(format.prepare_write(&renamed, &TextOptions::default()).is_ok());
    Ok(())
}

#[test]
fn custom_write_separator() -> anyhow::Result<()> {
    let dir = TempDirPath::new()?;
    let format = TextFileFormat::default();
    let options = TextOptions::from_map(&HashMap::from([("lineSep", "\r\n")]))?;
    let factory = format.prepare_write(&format.infer_schema(), &options)?;
    let path = dir.file_path("crlf.txt");

    write_all(&factory, &path, &[OwnedRow::from("a"), OwnedRow::from("b")])?;
    assert_eq!(std::fs::read(&path)?, b"a\r\nb\r\n");

    let rows = format.read_all(&path.to_string_lossy(), options)?;
    assert_eq!(rows, vec![OwnedRow::from("a"), OwnedRow::from("b")]);
    Ok(())
}

#[test]
fn asymmetric_separators_change_row_boundaries() -> anyhow::Result<()> {
    let dir = TempDirPath::new()?;
    let format = TextFileFormat::default();
    let path = dir.file_path("asym.txt");

    // written with a two-byte separator, read back with a one-byte one
    let write_opts = TextOptions::default().with_write_separator(b"\r\n".to_vec())?;
    let factory = format.prepare_write(&format.infer_schema(), &write_opts)?;
    write_all(&factory, &path, &[OwnedRow::from("a"), OwnedRow::from("b")])?;

    let lf_only = TextOptions::default().with_read_separator(b"\n".to_vec())?;
    let rows = format.read_all(&path.to_string_lossy(), lf_only)?;
    assert_eq!(rows, vec![OwnedRow::from("a\r"), OwnedRow::from("b\r")]);

    // a separator that is a prefix of the written one splits rows into pieces
    let write_opts = TextOptions::default().with_write_separator(b"##".to_vec())?;
    let factory = format.prepare_write(&format.infer_schema(), &write_opts)?;
    write_all(&factory, &path, &[OwnedRow::from("x"), OwnedRow::from("y")])?;

    let hash = TextOptions::default().with_read_separator(b"#".to_vec())?;
    let rows = format.read_all(&path.to_string_lossy(), hash)?;
    assert_eq!(
        rows,
        vec![
            OwnedRow::from("x"),
            OwnedRow::from(""),
            OwnedRow::from("y"),
            OwnedRow::from("")
        ]
    );

    // auto-detection finds no terminator at all
    let rows = format.read_all(&path.to_string_lossy(), TextOptions::default())?;
    assert_eq!(rows, vec![OwnedRow::from("x##y##")]);
    Ok(())
}

#[test]
fn value_ending_in_separator_prefix_does_not_roundtrip() -> anyhow::Result<()> {
    let dir = TempDirPath::new()?;
    let format = TextFileFormat::default();
    let options = TextOptions::default().with_line_separator(b"||".to_vec())?;
    let factory = format.prepare_write(&format.infer_schema(), &options)?;
    let path = dir.file_path("ambiguous.txt");

    write_all(&factory, &path, &[OwnedRow::from("a|"), OwnedRow::from("b")])?;
    assert_eq!(std::fs::read(&path)?, b"a|||b||");

    // the first `||` is matched as early as possible, moving the `|` to the next row
    let rows = format.read_all(&path.to_string_lossy(), options)?;
    assert_eq!(rows, vec![OwnedRow::from("a"), OwnedRow::from("|b")]);
    Ok(())
}

#[test]
fn output_extension_follows_codec() -> anyhow::Result<()> {
    let format = TextFileFormat::default();
    let plain = format.prepare_write(&format.infer_schema(), &TextOptions::default())?;
    assert_eq!(plain.extension(), ".txt");

    #[cfg(feature = "compression-gzip")]
    {
        let gz = TextOptions::default().with_compression("gzip")?;
        let factory = format.prepare_write(&format.infer_schema(), &gz)?;
        assert_eq!(factory.extension(), ".txt.gz");
    }
    #[cfg(feature = "compression-zstd")]
    {
        let zst = TextOptions::from_map(&HashMap::from([("codec", "ZSTD")]))?;
        let factory = format.prepare_write(&format.infer_schema(), &zst)?;
        assert_eq!(factory.extension(), ".txt.zst");
    }
    Ok(())
}

#[test]
fn factory_is_shareable_across_threads() -> anyhow::Result<()> {
    let dir = TempDirPath::new()?;
    let format = TextFileFormat::default();
    let factory = Arc::new(format.prepare_write(&format.infer_schema(), &TextOptions::default())?);

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let factory = Arc::clone(&factory);
            let path = dir.file_path(&format!("part-{i}.txt"));
            std::thread::spawn(move || -> anyhow::Result<()> {
                let task = TaskContext::new(i);
                let mut writer = factory.new_writer(&path, &task);
                writer.write(OwnedRow::from(format!("row {i}")).as_record())?;
                writer.close()
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("writer thread panicked")?;
    }

    for i in 0..4 {
        let content = std::fs::read_to_string(dir.file_path(&format!("part-{i}.txt")))?;
        assert_eq!(content, format!("row {i}\n"));
    }
    Ok(())
}
