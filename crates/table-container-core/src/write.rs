//! Write orchestrators: store a table or a table set in a container.
//!
//! Writing never replaces a node: a table whose resolved path already exists
//! under the target group fails with `TableAlreadyExists`. Whole-file
//! replacement is opt-in through [`WriteOptions::overwrite`].
use std::path::Path;

use arrow::record_batch::RecordBatch;
use log::debug;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::access::{self, ContainerTarget, OpenMode};
use crate::backend;
use crate::container::{Dataset, DatasetData, Group};
use crate::error::{
    ContainerSnafu, InvalidTableNameSnafu, ModelSnafu, TableAlreadyExistsSnafu, TableIoResult,
};
use crate::keywords::Keywords;
use crate::paths;
use crate::table::{Table, TableSet};

/// Name used for a table with an empty `table_name`.
pub const DEFAULT_TABLE_NAME: &str = "Table";

/// Name used for the `index`-th table of a set when it has no name.
pub fn fallback_table_name(index: usize) -> String {
    format!("Table_{index:02}")
}

/// Options for writing tables and table sets.
///
/// Every field defaults to `false`/empty, so a partial JSON document such as
/// `{"append": true}` deserializes into a complete set of options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteOptions {
    /// Request compression for every dataset written.
    pub compression: bool,
    /// Group below the container root to write into; empty for the root.
    pub group: String,
    /// Add to an existing file instead of creating a new one.
    pub append: bool,
    /// Replace an existing file (ignored when `append` is set).
    pub overwrite: bool,
    /// Drop the directory portion of table names and write leaves directly
    /// into the target group.
    pub ignore_groups: bool,
}

impl WriteOptions {
    /// Default options: new file, root group, uncompressed, groups honored.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set [`WriteOptions::compression`].
    pub fn with_compression(mut self, compression: bool) -> Self {
        self.compression = compression;
        self
    }

    /// Set [`WriteOptions::group`].
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Set [`WriteOptions::append`].
    pub fn with_append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    /// Set [`WriteOptions::overwrite`].
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Set [`WriteOptions::ignore_groups`].
    pub fn with_ignore_groups(mut self, ignore_groups: bool) -> Self {
        self.ignore_groups = ignore_groups;
        self
    }

    /// How a path target is opened under these options.
    pub fn open_mode(&self) -> OpenMode {
        if self.append {
            OpenMode::WriteAppend
        } else {
            OpenMode::WriteExclusive {
                overwrite: self.overwrite,
            }
        }
    }
}

/// Where a table lands below the target group.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TablePath {
    dir: String,
    leaf: String,
}

impl TablePath {
    fn full(&self) -> String {
        if self.dir.is_empty() {
            self.leaf.clone()
        } else {
            format!("{}/{}", self.dir, self.leaf)
        }
    }
}

fn resolve_write_path(name: &str, ignore_groups: bool) -> TableIoResult<TablePath> {
    if ignore_groups {
        let leaf = paths::strip_path(name);
        ensure!(!leaf.is_empty(), InvalidTableNameSnafu { name });
        return Ok(TablePath {
            dir: String::new(),
            leaf: leaf.to_string(),
        });
    }
    let (dir, leaf) = paths::split_table_path(name).context(InvalidTableNameSnafu { name })?;
    Ok(TablePath {
        dir,
        leaf: leaf.to_string(),
    })
}

/// A table ready to be stored: resolved path, payload and attributes.
struct PreparedTable<'t> {
    path: TablePath,
    batch: RecordBatch,
    keywords: &'t Keywords,
}

fn prepare<'t>(
    table: &'t Table,
    name: &str,
    ignore_groups: bool,
) -> TableIoResult<PreparedTable<'t>> {
    table.ensure_storable().context(ModelSnafu)?;
    Ok(PreparedTable {
        path: resolve_write_path(name, ignore_groups)?,
        batch: table.to_record_batch().context(ModelSnafu)?,
        keywords: &table.keywords,
    })
}

/// Create one record dataset under `group`, refusing to replace a node.
///
/// The payload is encoded before any directory group is created, so a table
/// that cannot be stored leaves `group` unchanged.
fn write_dataset(
    group: &mut Group,
    group_label: &str,
    table: PreparedTable<'_>,
    compression: bool,
) -> TableIoResult<()> {
    let full = table.path.full();
    ensure!(
        !group.contains(&full),
        TableAlreadyExistsSnafu {
            group: group_label,
            name: full.as_str(),
        }
    );

    let rows = table.batch.num_rows();
    let mut dataset = Dataset::new(&full, DatasetData::Records(table.batch), compression)
        .context(ContainerSnafu)?;
    dataset
        .attrs_mut()
        .extend(table.keywords.iter().map(|(k, v)| (k.clone(), v.clone())));

    let parent = paths::ensure_path(group, &table.path.dir).context(ContainerSnafu)?;
    parent
        .insert_dataset(&table.path.leaf, dataset)
        .context(ContainerSnafu)?;

    debug!("wrote table {group_label}/{full} ({rows} rows, compression={compression})");
    Ok(())
}

impl Table {
    /// Store this table in a container.
    ///
    /// `target` is a file path (opened per `options`) or an already-open
    /// group, which is written into but not closed. The table is stored under
    /// `table_name` (or [`DEFAULT_TABLE_NAME`]) below `options.group`; the
    /// directory portion of the name becomes nested groups unless
    /// `options.ignore_groups` is set. Keywords become dataset attributes.
    pub fn write_to_container<'a>(
        &self,
        target: impl Into<ContainerTarget<'a>>,
        options: &WriteOptions,
    ) -> TableIoResult<()> {
        backend::ensure_available()?;
        let name = if self.table_name.is_empty() {
            DEFAULT_TABLE_NAME
        } else {
            self.table_name.as_str()
        };
        let prepared = prepare(self, name, options.ignore_groups)?;

        let mut opened =
            access::open_or_create(target.into(), &options.group, options.open_mode())?;
        let label = opened.group_path().to_string();
        write_dataset(opened.group_mut()?, &label, prepared, options.compression)?;
        opened.close()
    }
}

impl TableSet {
    /// Store every table of this set in one container file.
    ///
    /// The set's keywords become attributes of `options.group` (the file root
    /// by default). Unnamed tables are stored as `Table_00`, `Table_01`, ...
    /// by position. The file is opened once and closed after the last table.
    pub fn write_to_container(
        &self,
        path: impl AsRef<Path>,
        options: &WriteOptions,
    ) -> TableIoResult<()> {
        backend::ensure_available()?;
        let prepared = self
            .iter()
            .enumerate()
            .map(|(i, table)| {
                let name = if table.table_name.is_empty() {
                    fallback_table_name(i)
                } else {
                    table.table_name.clone()
                };
                prepare(table, &name, options.ignore_groups)
            })
            .collect::<TableIoResult<Vec<_>>>()?;

        let mut opened =
            access::open_or_create(path.as_ref().into(), &options.group, options.open_mode())?;
        let label = opened.group_path().to_string();
        let group = opened.group_mut()?;
        group
            .attrs_mut()
            .extend(self.keywords.iter().map(|(k, v)| (k.clone(), v.clone())));
        for table in prepared {
            write_dataset(group, &label, table, options.compression)?;
        }
        opened.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ContainerError;
    use crate::error::TableIoError;
    use crate::table::TableError;
    use arrow::array::{ArrayRef, Int32Array, IntervalMonthDayNanoArray, UnionArray};
    use arrow::buffer::ScalarBuffer;
    use arrow::datatypes::{DataType, Field, IntervalMonthDayNano, UnionFields};
    use std::sync::Arc;

    fn table(name: &str) -> Table {
        let mut t = Table::named(name);
        let col: ArrayRef = Arc::new(Int32Array::from(vec![1, 2, 3]));
        t.add_column("x", col).expect("column");
        t
    }

    #[test]
    fn options_deserialize_from_partial_json() {
        let opts: WriteOptions =
            serde_json::from_str(r#"{"append": true, "group": "g"}"#).expect("json");
        assert_eq!(opts, WriteOptions::new().with_append(true).with_group("g"));
        assert_eq!(opts.open_mode(), OpenMode::WriteAppend);
    }

    #[test]
    fn open_mode_follows_overwrite_when_not_appending() {
        let opts = WriteOptions::new().with_overwrite(true);
        assert_eq!(
            opts.open_mode(),
            OpenMode::WriteExclusive { overwrite: true }
        );
        assert_eq!(
            WriteOptions::new().open_mode(),
            OpenMode::WriteExclusive { overwrite: false }
        );
    }

    #[test]
    fn write_paths_honor_ignore_groups() {
        let nested = resolve_write_path("grp/sub/Name", false).expect("nested");
        assert_eq!(nested.full(), "grp/sub/Name");
        let flat = resolve_write_path("grp/sub/Name", true).expect("flat");
        assert_eq!(flat.full(), "Name");

        let err = resolve_write_path("//", false).expect_err("no leaf");
        assert!(matches!(err, TableIoError::InvalidTableName { .. }));
        let err = resolve_write_path("grp/", true).expect_err("flat, no leaf");
        assert!(matches!(err, TableIoError::InvalidTableName { .. }));
    }

    #[test]
    fn fallback_names_are_zero_padded() {
        assert_eq!(fallback_table_name(0), "Table_00");
        assert_eq!(fallback_table_name(7), "Table_07");
        assert_eq!(fallback_table_name(123), "Table_123");
    }

    #[cfg(feature = "parquet")]
    #[test]
    fn dataset_write_refuses_existing_node() {
        let mut root = Group::new();
        let t = table("grp/T");
        write_dataset(&mut root, "", prepare(&t, "grp/T", false).expect("prep"), false)
            .expect("first");

        let err = write_dataset(&mut root, "", prepare(&t, "grp/T", false).expect("prep"), false)
            .expect_err("second");
        assert!(matches!(
            err,
            TableIoError::TableAlreadyExists { ref name, .. } if name == "grp/T"
        ));
        assert_eq!(root.group("grp").map(Group::len), Some(1));
    }

    #[test]
    fn union_column_is_rejected_while_preparing() {
        let union = UnionArray::try_new(
            UnionFields::new(vec![0], vec![Field::new("i", DataType::Int32, false)]),
            ScalarBuffer::from(vec![0i8, 0, 0]),
            None,
            vec![Arc::new(Int32Array::from(vec![1, 2, 3])) as ArrayRef],
        )
        .expect("union");
        let mut t = table("mixed");
        t.add_column("u", Arc::new(union)).expect("union column");

        let err = prepare(&t, "mixed", false).err().expect("unsupported");
        assert!(matches!(
            err,
            TableIoError::Model {
                source: TableError::UnsupportedType { ref column, .. },
                ..
            } if column == "u"
        ));
    }

    #[test]
    fn failed_encode_creates_no_groups() {
        let intervals: ArrayRef = Arc::new(IntervalMonthDayNanoArray::from(vec![
            IntervalMonthDayNano::new(1, 2, 3),
        ]));
        let batch = RecordBatch::try_from_iter(vec![("span", intervals)]).expect("batch");
        let keywords = Keywords::new();
        let prepared = PreparedTable {
            path: resolve_write_path("grp/sub/T", false).expect("path"),
            batch,
            keywords: &keywords,
        };

        let mut root = Group::new();
        let err = write_dataset(&mut root, "", prepared, false).expect_err("unencodable");
        assert!(matches!(
            err,
            TableIoError::Container {
                source: ContainerError::UnsupportedType { .. },
                ..
            }
        ));
        assert!(root.is_empty());
    }

    #[test]
    fn empty_table_cannot_be_written() {
        let err = prepare(&Table::named("t"), "t", false)
            .err()
            .expect("no columns");
        assert!(matches!(err, TableIoError::Model { .. }));
    }
}
