//! Error types and SNAFU context selectors for the read/write orchestrators.
//!
//! `TableIoError` is the single error type returned by the public read and
//! write entry points. Lower layers keep their own enums
//! ([`ContainerError`], [`TableError`]) and are wrapped here with context so
//! callers can still match on the root cause.
use snafu::prelude::*;

use crate::container::ContainerError;
use crate::table::TableError;

fn describe_candidates(candidates: &[String]) -> String {
    if candidates.is_empty() {
        "No tables found in the container".to_string()
    } else {
        format!(
            "Container holds {} tables ({}); specify which one to read",
            candidates.len(),
            candidates.join(", ")
        )
    }
}

/// Errors from reading or writing tables and table sets.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TableIoError {
    /// The container backend was not compiled in.
    #[snafu(display("Cannot read/write container files: the {backend} backend is not available"))]
    CapabilityUnavailable {
        /// Name of the missing backend.
        backend: &'static str,
    },

    /// Reading from a path that does not exist.
    #[snafu(display("File not found: {path}"))]
    FileNotFound {
        /// The missing path.
        path: String,
    },

    /// Writing to an existing path without `overwrite` or `append`.
    #[snafu(display("File exists: {path}"))]
    FileExists {
        /// The existing path.
        path: String,
    },

    /// No table name was given and discovery did not find exactly one table.
    ///
    /// `candidates` holds every discovered table so the caller can retry with
    /// an explicit name.
    #[snafu(display("{}", describe_candidates(candidates)))]
    AmbiguousTable {
        /// Full paths of the discovered tables, in discovery order.
        candidates: Vec<String>,
    },

    /// A node already exists where the table would be written.
    #[snafu(display("Table {group}/{name} already exists"))]
    TableAlreadyExists {
        /// Group the write was rooted at (empty for the file root).
        group: String,
        /// Table path below that group.
        name: String,
    },

    /// The requested table does not exist.
    #[snafu(display("Table {name} not found in container"))]
    TableNotFound {
        /// The requested table path.
        name: String,
    },

    /// The requested path is a group or a dataset without named fields.
    #[snafu(display("{name} is not a table (no named fields)"))]
    NotATable {
        /// The requested path.
        name: String,
    },

    /// The requested root group does not exist.
    #[snafu(display("Group {group:?} not found in container"))]
    GroupNotFound {
        /// The requested group path.
        group: String,
    },

    /// The table name has no usable leaf segment.
    #[snafu(display("Invalid table name {name:?}"))]
    InvalidTableName {
        /// The rejected name.
        name: String,
    },

    /// Failure inside the container engine.
    #[snafu(display("Container error: {source}"))]
    Container {
        /// Underlying container error.
        #[snafu(source, backtrace)]
        source: ContainerError,
    },

    /// The in-memory table could not be read or populated.
    #[snafu(display("Table model error: {source}"))]
    Model {
        /// Underlying table model error.
        source: TableError,
    },
}

impl TableIoError {
    /// Discovered table names carried by [`TableIoError::AmbiguousTable`].
    pub fn candidates(&self) -> Option<&[String]> {
        match self {
            TableIoError::AmbiguousTable { candidates } => Some(candidates),
            _ => None,
        }
    }
}

/// Result alias for the read/write orchestrators.
pub type TableIoResult<T> = Result<T, TableIoError>;
