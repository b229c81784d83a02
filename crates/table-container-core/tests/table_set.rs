//! Table sets: fallback naming, file-level keywords and group placement.
#![cfg(feature = "parquet")]
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;

use arrow::array::{ArrayRef, Int64Array};
use table_container_core::container::ContainerFile;
use table_container_core::error::TableIoError;
use table_container_core::table::{Table, TableSet};
use table_container_core::write::WriteOptions;
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn table(name: &str, rows: i64) -> Table {
    let mut t = Table::named(name);
    let col: ArrayRef = Arc::new(Int64Array::from_iter_values(0..rows));
    t.add_column("n", col).expect("column");
    t
}

fn unnamed_set() -> TableSet {
    let mut set = TableSet::new();
    for rows in [1, 2, 3] {
        set.append(table("", rows));
    }
    set.keywords.insert("origin".into(), "pipeline-7".into());
    set.keywords.insert("version".into(), 2i64.into());
    set
}

#[test]
fn unnamed_tables_get_positional_names() -> TestResult {
    let tmp = TempDir::new()?;
    let path = tmp.path().join("set.tcf");
    unnamed_set().write_to_container(&path, &WriteOptions::new())?;

    let file = ContainerFile::open(&path)?;
    assert_eq!(
        file.root().names().collect::<Vec<_>>(),
        ["Table_00", "Table_01", "Table_02"]
    );
    assert_eq!(
        file.root().attrs().get("origin").and_then(|v| v.as_str()),
        Some("pipeline-7")
    );

    let mut loaded = TableSet::new();
    loaded.read_from_container(&path, None)?;
    assert_eq!(loaded.len(), 3);
    let rows: Vec<usize> = loaded.iter().map(Table::num_rows).collect();
    assert_eq!(rows, [1, 2, 3]);
    assert_eq!(loaded.keywords, unnamed_set().keywords);
    Ok(())
}

#[test]
fn set_read_replaces_previous_contents() -> TestResult {
    let tmp = TempDir::new()?;
    let path = tmp.path().join("set.tcf");
    unnamed_set().write_to_container(&path, &WriteOptions::new())?;

    let mut loaded = TableSet::new();
    loaded.append(table("stale", 5));
    loaded.keywords.insert("stale".into(), true.into());
    loaded.read_from_container(&path, None)?;

    assert_eq!(loaded.len(), 3);
    assert!(!loaded.keywords.contains_key("stale"));
    assert!(loaded.iter().all(|t| t.table_name.starts_with("Table_")));
    Ok(())
}

#[test]
fn set_written_under_a_group_reads_back_from_it() -> TestResult {
    let tmp = TempDir::new()?;
    let path = tmp.path().join("grouped.tcf");
    let mut set = unnamed_set();
    set.append(table("extra/named", 4));
    set.write_to_container(&path, &WriteOptions::new().with_group("run1"))?;

    let file = ContainerFile::open(&path)?;
    assert!(file.root().attrs().is_empty());
    assert!(file.root().group("run1").is_some_and(|g| g.attrs().contains_key("origin")));

    let mut loaded = TableSet::new();
    loaded.read_from_container(&path, Some("run1"))?;
    let names: Vec<&str> = loaded.iter().map(|t| t.table_name.as_str()).collect();
    assert_eq!(names, ["Table_00", "Table_01", "Table_02", "extra/named"]);
    Ok(())
}

#[test]
fn duplicate_names_in_a_set_leave_the_file_untouched() -> TestResult {
    let tmp = TempDir::new()?;
    let path = tmp.path().join("dup.tcf");
    table("keep", 1).write_to_container(&path, &WriteOptions::new())?;

    let mut set = TableSet::new();
    set.append(table("a", 1));
    set.append(table("a", 2));
    let err = set
        .write_to_container(&path, &WriteOptions::new().with_append(true))
        .expect_err("duplicate");
    assert!(matches!(err, TableIoError::TableAlreadyExists { .. }));

    let file = ContainerFile::open(&path)?;
    assert_eq!(file.root().names().collect::<Vec<_>>(), ["keep"]);
    Ok(())
}

#[test]
fn reading_a_missing_group_fails() -> TestResult {
    let tmp = TempDir::new()?;
    let path = tmp.path().join("set.tcf");
    unnamed_set().write_to_container(&path, &WriteOptions::new())?;

    let err = TableSet::new()
        .read_from_container(&path, Some("nope"))
        .expect_err("missing group");
    assert!(matches!(err, TableIoError::GroupNotFound { .. }));
    Ok(())
}

#[test]
fn ignore_groups_collision_is_refused() -> TestResult {
    let tmp = TempDir::new()?;
    let path = tmp.path().join("flat.tcf");
    let mut set = TableSet::new();
    set.append(table("a/T", 1));
    set.append(table("b/T", 2));

    let err = set
        .write_to_container(&path, &WriteOptions::new().with_ignore_groups(true))
        .expect_err("same leaf twice");
    assert!(matches!(
        err,
        TableIoError::TableAlreadyExists { ref name, .. } if name == "T"
    ));
    assert!(!path.exists());
    Ok(())
}

#[test]
fn overwrite_replaces_a_previous_set() -> TestResult {
    let tmp = TempDir::new()?;
    let path = tmp.path().join("set.tcf");
    unnamed_set().write_to_container(&path, &WriteOptions::new())?;

    let mut replacement = TableSet::new();
    replacement.append(table("fresh", 9));
    replacement.write_to_container(&path, &WriteOptions::new().with_overwrite(true))?;

    let mut loaded = TableSet::new();
    loaded.read_from_container(&path, None)?;
    assert_eq!(loaded.len(), 1);
    assert!(loaded.keywords.is_empty());
    let fresh = loaded.get(0).expect("one table");
    assert_eq!(fresh.table_name, "fresh");
    assert_eq!(fresh.num_rows(), 9);
    Ok(())
}
