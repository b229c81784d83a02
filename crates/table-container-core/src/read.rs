//! Read orchestrators: load a table or a table set from a container.
//!
//! Both entry points validate the container and resolve the requested table
//! before touching the caller's object, so a failed read leaves it as it was.
use std::path::Path;

use log::debug;
use snafu::prelude::*;

use crate::access::{self, ContainerSource};
use crate::backend;
use crate::container::Group;
use crate::discovery;
use crate::error::{
    AmbiguousTableSnafu, ModelSnafu, NotATableSnafu, TableIoResult, TableNotFoundSnafu,
};
use crate::table::{Table, TableSet};

/// Pick the table to read: the requested one, or the only one discovered.
fn resolve_table_name(group: &Group, requested: Option<&str>) -> TableIoResult<String> {
    if let Some(name) = requested {
        return Ok(name.to_string());
    }
    let mut candidates = discovery::list_tables(group);
    if candidates.len() == 1 {
        return Ok(candidates.swap_remove(0));
    }
    AmbiguousTableSnafu { candidates }.fail()
}

/// Materialize the record dataset at `name` as a new table.
///
/// The table takes its name from `name`, its columns from the dataset's
/// fields (in stored order) and its keywords from the dataset attributes.
fn load_table(group: &Group, name: &str) -> TableIoResult<Table> {
    let node = group.get(name).context(TableNotFoundSnafu { name })?;
    let dataset = node.as_dataset().context(NotATableSnafu { name })?;
    let batch = dataset.records().context(NotATableSnafu { name })?;

    let schema = batch.schema();
    let mut table = Table::named(name);
    table.allocate(&schema, batch.num_rows());
    for (field, column) in schema.fields().iter().zip(batch.columns()) {
        table
            .set_column(field.name(), column.clone())
            .context(ModelSnafu)?;
    }
    table.keywords = dataset.attrs().clone();
    Ok(table)
}

impl Table {
    /// Replace this table's contents with a table stored in a container.
    ///
    /// `source` is a file path or an already-open group. With `table` set to
    /// `None` the container (or group) must hold exactly one table, otherwise
    /// the read fails with `AmbiguousTable` listing every candidate. The
    /// dataset's attributes become this table's keywords.
    pub fn read_from_container<'a>(
        &mut self,
        source: impl Into<ContainerSource<'a>>,
        table: Option<&str>,
    ) -> TableIoResult<()> {
        backend::ensure_available()?;
        let opened = access::open_source(source.into(), "")?;

        let loaded = {
            let group = opened.group()?;
            let name = resolve_table_name(group, table)?;
            load_table(group, &name)?
        };
        opened.close()?;

        debug!(
            "read table {:?} ({} columns, {} rows)",
            loaded.table_name,
            loaded.num_columns(),
            loaded.num_rows()
        );
        *self = loaded;
        Ok(())
    }
}

impl TableSet {
    /// Replace this set's contents with every table stored in a container.
    ///
    /// Tables are discovered below `group` (the file root when `None`) and
    /// appended in discovery order; that group's attributes become the set's
    /// keywords. The file is opened once for the whole read.
    pub fn read_from_container(
        &mut self,
        path: impl AsRef<Path>,
        group: Option<&str>,
    ) -> TableIoResult<()> {
        backend::ensure_available()?;
        let opened = access::open_source(path.as_ref().into(), group.unwrap_or_default())?;

        let (keywords, tables) = {
            let root = opened.group()?;
            let tables = discovery::list_tables(root)
                .iter()
                .map(|name| load_table(root, name))
                .collect::<TableIoResult<Vec<_>>>()?;
            (root.attrs().clone(), tables)
        };
        opened.close()?;

        debug!("read {} tables from {}", tables.len(), path.as_ref().display());
        self.reset();
        self.keywords = keywords;
        for table in tables {
            self.append(table);
        }
        Ok(())
    }
}
