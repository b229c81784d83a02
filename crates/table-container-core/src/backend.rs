//! Capability check for the container backend.
//!
//! The dataset codec is an optional dependency (cargo feature `parquet`).
//! Availability is fixed at compile time; every read/write entry point calls
//! [`ensure_available`] before touching the filesystem.
use snafu::prelude::*;

use crate::error::{CapabilityUnavailableSnafu, TableIoResult};

/// Name reported when the backend is missing.
pub const BACKEND_NAME: &str = "parquet";

/// True when the crate was built with a dataset codec.
pub const BACKEND_AVAILABLE: bool = cfg!(feature = "parquet");

/// Fail with `CapabilityUnavailable` when the backend is not compiled in.
pub fn ensure_available() -> TableIoResult<()> {
    ensure!(
        BACKEND_AVAILABLE,
        CapabilityUnavailableSnafu {
            backend: BACKEND_NAME
        }
    );
    Ok(())
}
