//! # table-container-format
//!
//! Store column tables and table sets in hierarchical container files.
//!
//! This crate is the supported public entry point and provides a small, stable surface.
//!
//! ## Features
//!
//! - `parquet` (default): Enables the dataset codec. Without it every read
//!   and write fails with `TableIoError::CapabilityUnavailable`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use table_container_format::prelude::*;
//!
//! let mut table = Table::named("survey/objects");
//! table.add_column("id", ids)?;
//! table.write_to_container("catalog.tcf", &WriteOptions::new().with_compression(true))?;
//!
//! let mut loaded = Table::new();
//! loaded.read_from_container("catalog.tcf", None)?;
//! ```

/// Convenience prelude with the stable, supported surface.
pub mod prelude;

/// Container engine namespace (groups, datasets, files).
pub mod container {
    pub use table_container_core::container::{
        ContainerError, ContainerFile, Dataset, DatasetData, FileMode, Group, Node,
    };
}

pub use table_container_core::access::{ContainerSource, ContainerTarget, OpenMode};
pub use table_container_core::backend::BACKEND_AVAILABLE;
pub use table_container_core::discovery::list_tables;
pub use table_container_core::error::TableIoError;
pub use table_container_core::keywords::{KeywordValue, Keywords};
pub use table_container_core::table::{Table, TableError, TableSet};
pub use table_container_core::write::WriteOptions;
