//! Single-file hierarchical container engine.
//!
//! A container is a tree of named groups holding named datasets, each node
//! carrying its own attributes. [`ContainerFile`] owns the tree of one file
//! on disk:
//!
//! - [`ContainerFile::open`] loads an existing file read-only.
//! - [`ContainerFile::open_rw`] loads an existing file for in-place
//!   modification.
//! - [`ContainerFile::create`] creates a new file (failing if it exists) and
//!   immediately writes an empty container so the file is valid from the
//!   start.
//! - [`ContainerFile::staged`] starts an empty container in memory that
//!   replaces whatever is at its path when closed.
//!
//! Modifications live in memory until [`ContainerFile::close`] (or
//! [`ContainerFile::flush`]) persists them with a write-then-rename
//! sequence. Dropping a writable handle without closing it releases the file
//! without persisting anything, so an operation that fails half-way leaves the
//! file exactly as it was when opened.
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use log::debug;
use snafu::prelude::*;

pub mod error;
pub mod format;
pub mod node;

pub use error::{ContainerError, ContainerResult};
pub use node::{Dataset, DatasetData, Group, Node};

use error::{AlreadyExistsSnafu, IoSnafu, NotFoundSnafu};

/// Access mode of an open container file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    /// Changes are never persisted.
    ReadOnly,
    /// Changes are persisted by `flush`/`close`.
    ReadWrite,
}

/// Guard that removes a temporary file on drop unless disarmed.
/// Used to ensure cleanup on error paths during atomic writes.
struct TempFileGuard {
    path: PathBuf,
    armed: bool,
}

impl TempFileGuard {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    /// Disarm the guard so the file is NOT removed on drop.
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if self.armed {
            // Best-effort cleanup; we are already returning another error.
            let _ = fs::remove_file(&self.path);
        }
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `contents` to `path` through a synced temporary file and a rename.
fn write_atomic(path: &Path, contents: &[u8]) -> ContainerResult<()> {
    let tmp_path = tmp_path_for(path);
    let mut guard = TempFileGuard::new(tmp_path.clone());

    {
        let mut file = File::create(&tmp_path).context(IoSnafu {
            path: tmp_path.display().to_string(),
        })?;
        file.write_all(contents).context(IoSnafu {
            path: tmp_path.display().to_string(),
        })?;
        file.sync_all().context(IoSnafu {
            path: tmp_path.display().to_string(),
        })?;
    }

    fs::rename(&tmp_path, path).context(IoSnafu {
        path: path.display().to_string(),
    })?;

    guard.disarm();
    Ok(())
}

fn read_all(path: &Path) -> ContainerResult<Vec<u8>> {
    let path_str = path.display().to_string();
    match fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(e).context(NotFoundSnafu { path: path_str })
        }
        Err(e) => Err(e).context(IoSnafu { path: path_str }),
    }
}

/// An open container file and its in-memory group tree.
#[derive(Debug)]
pub struct ContainerFile {
    path: PathBuf,
    mode: FileMode,
    root: Group,
}

impl ContainerFile {
    /// Open an existing container read-only.
    pub fn open(path: impl AsRef<Path>) -> ContainerResult<Self> {
        Self::load(path.as_ref(), FileMode::ReadOnly)
    }

    /// Open an existing container for in-place modification.
    pub fn open_rw(path: impl AsRef<Path>) -> ContainerResult<Self> {
        Self::load(path.as_ref(), FileMode::ReadWrite)
    }

    /// Create a new, empty container; fails if `path` already exists.
    pub fn create(path: impl AsRef<Path>) -> ContainerResult<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(e).context(AlreadyExistsSnafu { path: path_str });
            }
            Err(e) => return Err(e).context(IoSnafu { path: path_str }),
        };

        let root = Group::new();
        let bytes = format::encode_container(&path_str, &root)?;
        file.write_all(&bytes)
            .and_then(|()| file.sync_all())
            .context(IoSnafu {
                path: path_str.clone(),
            })?;

        debug!("created container {path_str}");
        Ok(ContainerFile {
            path: path.to_path_buf(),
            mode: FileMode::ReadWrite,
            root,
        })
    }

    /// Start an empty, writable container for `path` without touching the
    /// filesystem.
    ///
    /// Nothing exists on disk until [`ContainerFile::close`], which atomically
    /// replaces any file at `path`. Dropping the handle first leaves `path`
    /// exactly as it was.
    pub fn staged(path: impl AsRef<Path>) -> Self {
        ContainerFile {
            path: path.as_ref().to_path_buf(),
            mode: FileMode::ReadWrite,
            root: Group::new(),
        }
    }

    fn load(path: &Path, mode: FileMode) -> ContainerResult<Self> {
        let path_str = path.display().to_string();
        let bytes = Bytes::from(read_all(path)?);
        let len = bytes.len();
        let root = format::decode_container(&path_str, bytes)?;
        debug!("opened container {path_str} ({mode:?}, {len} bytes)");
        Ok(ContainerFile {
            path: path.to_path_buf(),
            mode,
            root,
        })
    }

    /// Filesystem path of the container.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Access mode the file was opened with.
    pub fn mode(&self) -> FileMode {
        self.mode
    }

    /// The root group.
    pub fn root(&self) -> &Group {
        &self.root
    }

    /// The root group, mutably. Changes to a read-only file are discarded.
    pub fn root_mut(&mut self) -> &mut Group {
        &mut self.root
    }

    /// Persist the current tree without closing. No-op when read-only.
    pub fn flush(&self) -> ContainerResult<()> {
        if self.mode == FileMode::ReadOnly {
            return Ok(());
        }
        let path_str = self.path.display().to_string();
        let bytes = format::encode_container(&path_str, &self.root)?;
        write_atomic(&self.path, &bytes)?;
        debug!("flushed container {path_str} ({} bytes)", bytes.len());
        Ok(())
    }

    /// Persist (when writable) and release the file.
    pub fn close(self) -> ContainerResult<()> {
        self.flush()?;
        debug!("closed container {}", self.path.display());
        Ok(())
    }
}

/// Report whether `path` exists, mapping lookup failures to [`ContainerError::Io`].
pub(crate) fn exists(path: &Path) -> ContainerResult<bool> {
    path.try_exists().context(IoSnafu {
        path: path.display().to_string(),
    })
}
