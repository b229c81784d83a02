//! Errors raised by the container engine.
use std::{error::Error, io};

use arrow::datatypes::DataType;
use arrow::error::ArrowError;
use snafu::{Backtrace, prelude::*};

/// Errors produced by the container engine.
///
/// File-level variants carry the path and the underlying I/O error; node-level
/// variants carry the slash-joined path of the node inside the container.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ContainerError {
    /// The container file does not exist.
    #[snafu(display("Container file not found: {path}"))]
    NotFound {
        /// Path of the missing file.
        path: String,
        /// Underlying I/O error.
        source: io::Error,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// The container file already exists and exclusive creation was requested.
    #[snafu(display("Container file already exists: {path}"))]
    AlreadyExists {
        /// Path of the existing file.
        path: String,
        /// Underlying I/O error.
        source: io::Error,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// Any other filesystem failure.
    #[snafu(display("Container I/O error at {path}: {source}"))]
    Io {
        /// Path where the I/O error occurred.
        path: String,
        /// Underlying I/O error.
        source: io::Error,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// A group or dataset with this name already exists.
    #[snafu(display("Node already exists: {path}"))]
    NodeExists {
        /// Path of the existing node.
        path: String,
    },

    /// No node exists at this path.
    #[snafu(display("Node not found: {path}"))]
    NodeNotFound {
        /// Path that was looked up.
        path: String,
    },

    /// The node at this path is a dataset where a group was required.
    #[snafu(display("Node {path} is not a group"))]
    NotAGroup {
        /// Path of the offending node.
        path: String,
    },

    /// Group and dataset names must be non-empty and contain no `/`.
    #[snafu(display("Invalid node name {name:?}"))]
    InvalidName {
        /// The rejected name.
        name: String,
    },

    /// The file is not a container or its manifest is inconsistent.
    #[snafu(display("Corrupt container {path}: {msg}"))]
    Corrupt {
        /// Path of the file being decoded.
        path: String,
        /// Description of the inconsistency.
        msg: String,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// The JSON manifest could not be encoded or decoded.
    #[snafu(display("Container manifest error in {path}: {source}"))]
    Manifest {
        /// Path of the file being encoded or decoded.
        path: String,
        /// Underlying serde_json error.
        source: serde_json::Error,
    },

    /// The dataset payload codec failed.
    #[snafu(display("Failed to encode or decode dataset {name}: {source}"))]
    Codec {
        /// Path of the dataset inside the container.
        name: String,
        /// Underlying codec error.
        source: Box<dyn Error + Send + Sync>,
    },

    /// Arrow failed while assembling a decoded dataset.
    #[snafu(display("Arrow error in dataset {name}: {source}"))]
    Arrow {
        /// Path of the dataset inside the container.
        name: String,
        /// Underlying Arrow error.
        source: ArrowError,
    },

    /// A column type the dataset codec cannot store.
    #[snafu(display("Dataset {name}: column {column} has unsupported type {data_type}"))]
    UnsupportedType {
        /// Path of the dataset inside the container.
        name: String,
        /// Name of the offending column.
        column: String,
        /// The rejected Arrow data type.
        data_type: DataType,
    },

    /// The crate was built without a dataset codec.
    #[snafu(display("Container backend unavailable: built without the `parquet` feature"))]
    BackendUnavailable,
}

/// Result alias for container engine operations.
pub type ContainerResult<T> = Result<T, ContainerError>;
