//! In-memory table model.
//!
//! A [`Table`] is an ordered list of named Arrow columns of equal length plus
//! a `table_name` and a keyword mapping. A [`TableSet`] is an ordered list of
//! tables plus its own file-level keywords. Both are owned by the caller: the
//! write paths only read from them and the read paths replace their contents
//! wholesale.
//!
//! The read/write entry points are additional `impl` blocks on these types
//! (see [`crate::write`] for the write options).
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, new_null_array};
use arrow::datatypes::{DataType, Field, FieldRef, Schema, SchemaRef};
use arrow::error::ArrowError;
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use snafu::prelude::*;

use crate::container::format::supports_type;
use crate::keywords::Keywords;

/// Errors raised by the in-memory table model.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TableError {
    /// A column with this name is already present.
    #[snafu(display("Column {name} already exists in the table"))]
    DuplicateColumn {
        /// Name of the duplicated column.
        name: String,
    },

    /// No column with this name is present.
    #[snafu(display("Column {name} does not exist in the table"))]
    UnknownColumn {
        /// Name of the missing column.
        name: String,
    },

    /// A column's length does not match the table's row count.
    #[snafu(display("Column {column} has {actual} rows, expected {expected}"))]
    ColumnLength {
        /// Name of the offending column.
        column: String,
        /// Row count of the table.
        expected: usize,
        /// Row count of the supplied column.
        actual: usize,
    },

    /// A replacement column's type does not match the allocated layout.
    #[snafu(display("Column {column} has type {actual}, expected {expected}"))]
    ColumnType {
        /// Name of the offending column.
        column: String,
        /// Data type from the allocated layout.
        expected: DataType,
        /// Data type of the supplied column.
        actual: DataType,
    },

    /// A column type that cannot be stored in a container.
    #[snafu(display("Column {column} has type {data_type}, which containers cannot store"))]
    UnsupportedType {
        /// Name of the offending column.
        column: String,
        /// The rejected Arrow data type.
        data_type: DataType,
    },

    /// The table has no columns and cannot be materialized as a record.
    #[snafu(display("Table {name:?} has no columns"))]
    NoColumns {
        /// Name of the empty table.
        name: String,
    },

    /// Arrow failed to assemble the columns into a record batch.
    #[snafu(display("Arrow error while assembling table {name:?}: {source}"))]
    Assemble {
        /// Name of the table being assembled.
        name: String,
        /// Underlying Arrow error.
        source: ArrowError,
    },
}

/// Convenience result alias for table model operations.
pub type TableResult<T> = Result<T, TableError>;

/// A named collection of equal-length columns plus scalar metadata.
#[derive(Debug, Clone, Default)]
pub struct Table {
    /// Logical name, possibly path-like (`"survey/2024/objects"`); may be empty.
    pub table_name: String,
    /// Table-level metadata written as dataset attributes.
    pub keywords: Keywords,
    fields: Vec<FieldRef>,
    columns: Vec<ArrayRef>,
    num_rows: usize,
}

impl Table {
    /// Create an empty, unnamed table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty table with the given name.
    pub fn named(name: impl Into<String>) -> Self {
        Table {
            table_name: name.into(),
            ..Self::default()
        }
    }

    /// Build a table from an Arrow record batch, keeping its field layout.
    pub fn from_record_batch(name: impl Into<String>, batch: &RecordBatch) -> Self {
        Table {
            table_name: name.into(),
            keywords: Keywords::new(),
            fields: batch.schema().fields().iter().cloned().collect(),
            columns: batch.columns().to_vec(),
            num_rows: batch.num_rows(),
        }
    }

    /// Drop all columns, keywords and the table name.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Number of rows shared by every column.
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Number of columns.
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Column names in insertion order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name().as_str())
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&ArrayRef> {
        self.position(name).map(|i| &self.columns[i])
    }

    /// Arrow schema describing the current column layout.
    pub fn schema(&self) -> SchemaRef {
        Arc::new(Schema::new(self.fields.clone()))
    }

    /// Append a nullable column named `name`.
    pub fn add_column(&mut self, name: impl Into<String>, array: ArrayRef) -> TableResult<()> {
        let field = Field::new(name, array.data_type().clone(), true);
        self.add_field(Arc::new(field), array)
    }

    /// Append a column with an explicit field definition.
    ///
    /// The first column fixes the table's row count; later columns must match it.
    pub fn add_field(&mut self, field: FieldRef, array: ArrayRef) -> TableResult<()> {
        let name = field.name();
        ensure!(
            self.position(name).is_none(),
            DuplicateColumnSnafu { name: name.clone() }
        );
        if !self.columns.is_empty() {
            ensure!(
                array.len() == self.num_rows,
                ColumnLengthSnafu {
                    column: name.clone(),
                    expected: self.num_rows,
                    actual: array.len(),
                }
            );
        }
        self.num_rows = array.len();
        self.fields.push(field);
        self.columns.push(array);
        Ok(())
    }

    /// Size storage for `num_rows` rows of the given field layout.
    ///
    /// Existing columns are discarded and every field gets a null-filled
    /// column; callers then fill columns with [`Table::set_column`].
    pub fn allocate(&mut self, schema: &Schema, num_rows: usize) {
        self.fields = schema.fields().iter().cloned().collect();
        self.columns = self
            .fields
            .iter()
            .map(|f| new_null_array(f.data_type(), num_rows))
            .collect();
        self.num_rows = num_rows;
    }

    /// Replace the data of an existing column.
    pub fn set_column(&mut self, name: &str, array: ArrayRef) -> TableResult<()> {
        let idx = self
            .position(name)
            .context(UnknownColumnSnafu { name })?;
        ensure!(
            array.len() == self.num_rows,
            ColumnLengthSnafu {
                column: name,
                expected: self.num_rows,
                actual: array.len(),
            }
        );
        let expected = self.fields[idx].data_type();
        ensure!(
            array.data_type() == expected,
            ColumnTypeSnafu {
                column: name,
                expected: expected.clone(),
                actual: array.data_type().clone(),
            }
        );
        self.columns[idx] = array;
        Ok(())
    }

    /// Fail with `UnsupportedType` on the first column a container cannot
    /// store (checked recursively through nested types).
    pub fn ensure_storable(&self) -> TableResult<()> {
        for field in &self.fields {
            ensure!(
                supports_type(field.data_type()),
                UnsupportedTypeSnafu {
                    column: field.name().as_str(),
                    data_type: field.data_type().clone(),
                }
            );
        }
        Ok(())
    }

    /// Assemble the columns into a single Arrow record batch.
    pub fn to_record_batch(&self) -> TableResult<RecordBatch> {
        ensure!(
            !self.columns.is_empty(),
            NoColumnsSnafu {
                name: self.table_name.clone(),
            }
        );
        let options = RecordBatchOptions::new().with_row_count(Some(self.num_rows));
        RecordBatch::try_new_with_options(self.schema(), self.columns.clone(), &options).context(
            AssembleSnafu {
                name: self.table_name.clone(),
            },
        )
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name() == name)
    }
}

/// An ordered collection of tables plus file-level keywords.
#[derive(Debug, Clone, Default)]
pub struct TableSet {
    /// File-level metadata written as container/group attributes.
    pub keywords: Keywords,
    tables: Vec<Table>,
}

impl TableSet {
    /// Create an empty table set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all tables and keywords.
    pub fn reset(&mut self) {
        self.tables.clear();
        self.keywords.clear();
    }

    /// Append a table, preserving insertion order.
    pub fn append(&mut self, table: Table) {
        self.tables.push(table);
    }

    /// Tables in stored order.
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Table at position `index`.
    pub fn get(&self, index: usize) -> Option<&Table> {
        self.tables.get(index)
    }

    /// Iterate over tables in stored order.
    pub fn iter(&self) -> std::slice::Iter<'_, Table> {
        self.tables.iter()
    }

    /// Number of tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// True when the set holds no tables.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl<'a> IntoIterator for &'a TableSet {
    type Item = &'a Table;
    type IntoIter = std::slice::Iter<'a, Table>;

    fn into_iter(self) -> Self::IntoIter {
        self.tables.iter()
    }
}
