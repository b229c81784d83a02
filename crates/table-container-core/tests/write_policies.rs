//! Non-clobbering write policies: existing files, existing tables, groups.
#![cfg(feature = "parquet")]
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;

use arrow::array::{ArrayRef, Int32Array, IntervalMonthDayNanoArray, UnionArray};
use arrow::buffer::ScalarBuffer;
use arrow::datatypes::{DataType, Field, IntervalMonthDayNano, UnionFields};
use table_container_core::container::{ContainerFile, Group};
use table_container_core::error::TableIoError;
use table_container_core::table::{Table, TableError, TableSet};
use table_container_core::write::WriteOptions;
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn table(name: &str, values: Vec<i32>) -> Table {
    let mut t = Table::named(name);
    let col: ArrayRef = Arc::new(Int32Array::from(values));
    t.add_column("v", col).expect("column");
    t
}

fn read(path: &std::path::Path, name: &str) -> Result<Table, TableIoError> {
    let mut t = Table::new();
    t.read_from_container(path, Some(name))?;
    Ok(t)
}

#[test]
fn second_write_of_same_name_is_refused() -> TestResult {
    let tmp = TempDir::new()?;
    let path = tmp.path().join("data.tcf");
    let append = WriteOptions::new().with_append(true);

    table("X", vec![1, 2, 3]).write_to_container(&path, &append)?;
    let err = table("X", vec![9, 9])
        .write_to_container(&path, &append)
        .expect_err("duplicate table");
    assert!(matches!(
        err,
        TableIoError::TableAlreadyExists { ref name, .. } if name == "X"
    ));

    let kept = read(&path, "X")?;
    assert_eq!(kept.num_rows(), 3);
    Ok(())
}

#[test]
fn existing_file_requires_append_or_overwrite() -> TestResult {
    let tmp = TempDir::new()?;
    let path = tmp.path().join("data.tcf");
    table("A", vec![1]).write_to_container(&path, &WriteOptions::new())?;

    let err = table("B", vec![2])
        .write_to_container(&path, &WriteOptions::new())
        .expect_err("file exists");
    assert!(matches!(err, TableIoError::FileExists { .. }));

    table("B", vec![2]).write_to_container(&path, &WriteOptions::new().with_overwrite(true))?;
    let file = ContainerFile::open(&path)?;
    assert_eq!(file.root().names().collect::<Vec<_>>(), ["B"]);
    Ok(())
}

#[test]
fn append_adds_next_to_existing_tables() -> TestResult {
    let tmp = TempDir::new()?;
    let path = tmp.path().join("data.tcf");
    let append = WriteOptions::new().with_append(true);
    table("A", vec![1]).write_to_container(&path, &append)?;
    table("B", vec![2, 3]).write_to_container(&path, &append)?;

    assert_eq!(read(&path, "A")?.num_rows(), 1);
    assert_eq!(read(&path, "B")?.num_rows(), 2);
    Ok(())
}

#[test]
fn ignore_groups_flattens_the_name() -> TestResult {
    let tmp = TempDir::new()?;
    let path = tmp.path().join("flat.tcf");
    let opts = WriteOptions::new().with_group("target").with_ignore_groups(true);
    table("grp/sub/Name", vec![1, 2]).write_to_container(&path, &opts)?;

    let file = ContainerFile::open(&path)?;
    let target = file.root().group("target").expect("target group");
    assert_eq!(target.names().collect::<Vec<_>>(), ["Name"]);
    assert!(file.root().group("target/grp").is_none());
    assert!(file.root().group("grp").is_none());
    Ok(())
}

#[test]
fn group_portion_of_name_becomes_nested_groups() -> TestResult {
    let tmp = TempDir::new()?;
    let path = tmp.path().join("nested.tcf");
    table("grp/sub/Name", vec![1]).write_to_container(&path, &WriteOptions::new())?;

    let file = ContainerFile::open(&path)?;
    assert!(file.root().group("grp/sub").is_some());
    assert!(file.root().dataset("grp/sub/Name").is_some_and(|d| d.is_record()));
    Ok(())
}

#[test]
fn table_cannot_replace_a_group() -> TestResult {
    let tmp = TempDir::new()?;
    let path = tmp.path().join("clash.tcf");
    let append = WriteOptions::new().with_append(true);
    table("grp/Name", vec![1]).write_to_container(&path, &append)?;

    let err = table("grp", vec![2])
        .write_to_container(&path, &append)
        .expect_err("group in the way");
    assert!(matches!(err, TableIoError::TableAlreadyExists { .. }));
    Ok(())
}

#[test]
fn borrowed_group_is_written_but_not_closed() -> TestResult {
    let tmp = TempDir::new()?;
    let path = tmp.path().join("borrowed.tcf");
    let mut file = ContainerFile::create(&path)?;

    table("A", vec![1]).write_to_container(&mut file, &WriteOptions::new())?;
    table("B", vec![2]).write_to_container(&mut file, &WriteOptions::new().with_group("g"))?;

    // Nothing is persisted until the caller closes its own handle.
    assert!(ContainerFile::open(&path)?.root().is_empty());
    assert!(file.root().dataset("A").is_some());
    assert!(file.root().dataset("g/B").is_some());
    file.close()?;

    assert_eq!(read(&path, "g/B")?.num_rows(), 1);
    Ok(())
}

#[test]
fn in_memory_group_accepts_tables() -> TestResult {
    let mut root = Group::new();
    table("t", vec![1, 2]).write_to_container(&mut root, &WriteOptions::new())?;

    let mut loaded = Table::new();
    loaded.read_from_container(&root, None)?;
    assert_eq!(loaded.table_name, "t");
    assert_eq!(loaded.num_rows(), 2);
    Ok(())
}

#[test]
fn union_column_fails_cleanly_and_creates_no_file() -> TestResult {
    let tmp = TempDir::new()?;
    let path = tmp.path().join("union.tcf");
    let union = UnionArray::try_new(
        UnionFields::new(vec![0], vec![Field::new("i", DataType::Int32, false)]),
        ScalarBuffer::from(vec![0i8, 0]),
        None,
        vec![Arc::new(Int32Array::from(vec![1, 2])) as ArrayRef],
    )?;
    let mut t = table("mixed", vec![1, 2]);
    t.add_column("u", Arc::new(union))?;

    let err = t
        .write_to_container(&path, &WriteOptions::new())
        .expect_err("union column");
    assert!(matches!(
        err,
        TableIoError::Model {
            source: TableError::UnsupportedType { .. },
            ..
        }
    ));
    assert!(!path.exists());
    Ok(())
}

#[test]
fn unencodable_table_fails_at_write_time_on_a_borrowed_file() -> TestResult {
    let tmp = TempDir::new()?;
    let path = tmp.path().join("borrowed.tcf");
    let mut file = ContainerFile::create(&path)?;
    table("good", vec![1, 2, 3]).write_to_container(&mut file, &WriteOptions::new())?;

    let mut bad = Table::named("bad");
    let spans: ArrayRef = Arc::new(IntervalMonthDayNanoArray::from(vec![
        IntervalMonthDayNano::new(1, 2, 3),
    ]));
    bad.add_column("span", spans)?;
    let err = bad
        .write_to_container(&mut file, &WriteOptions::new().with_group("late"))
        .expect_err("interval column");
    assert!(matches!(err, TableIoError::Model { .. }));
    assert_eq!(file.root().names().collect::<Vec<_>>(), ["good"]);

    // The earlier table is still persisted by the caller's close.
    file.close()?;
    assert_eq!(read(&path, "good")?.num_rows(), 3);
    Ok(())
}

#[test]
fn failed_overwrite_keeps_the_original_file() -> TestResult {
    let tmp = TempDir::new()?;
    let path = tmp.path().join("keep.tcf");
    table("original", vec![7]).write_to_container(&path, &WriteOptions::new())?;

    let mut set = TableSet::new();
    set.append(table("a", vec![1]));
    set.append(table("a", vec![2]));
    let err = set
        .write_to_container(&path, &WriteOptions::new().with_overwrite(true))
        .expect_err("duplicate name");
    assert!(matches!(err, TableIoError::TableAlreadyExists { .. }));

    assert_eq!(read(&path, "original")?.num_rows(), 1);
    Ok(())
}
