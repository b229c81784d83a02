//! Wrapper prelude.
//!
//! The `table-container-format` crate is the supported public entry point.
//! Downstream code should prefer importing from this prelude instead of
//! depending on internal core module paths.

pub use crate::container;
pub use crate::{
    ContainerSource, ContainerTarget, KeywordValue, Keywords, Table, TableError, TableIoError,
    TableSet, WriteOptions,
};
