//! Core engine for persisting column tables in hierarchical containers.
//!
//! This crate provides the foundational pieces for `table-container-format`:
//!
//! - An in-memory table model: named Arrow columns plus scalar keywords
//!   (`table` and `keywords` modules).
//! - A self-contained container file of groups and datasets, stored as a
//!   JSON manifest followed by Parquet payloads (`container` module).
//! - Path resolution for slash-delimited table names and recursive table
//!   discovery (`paths` and `discovery` modules).
//! - Read and write entry points on `Table` / `TableSet` that resolve a
//!   target (a file path or an open group), apply non-clobbering write
//!   policies and release any file they opened (`access` and `write`
//!   modules).
//!
//! The container codec sits behind the default `parquet` feature; without it
//! every entry point fails with `TableIoError::CapabilityUnavailable`.
#![deny(missing_docs)]
pub mod access;
pub mod backend;
pub mod container;
pub mod discovery;
pub mod error;
pub mod keywords;
pub mod paths;
mod read;
pub mod table;
pub mod write;
