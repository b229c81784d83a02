//! Container accessor: turn a caller-supplied target into an open group.
//!
//! Writes go through [`open_or_create`] with a [`ContainerTarget`]: a
//! filesystem path, opened or created according to an [`OpenMode`], or a
//! group the caller holds open mutably. Reads go through [`open_source`] with
//! a [`ContainerSource`], which only needs shared access to a caller's group.
//!
//! Either way the result records who owns the container: an owned file is
//! released by `close` (or simply dropped on an error path, which persists
//! nothing), a borrowed group is never closed because the caller keeps
//! using it.
use std::path::{Path, PathBuf};

use log::{debug, warn};
use snafu::prelude::*;

use crate::container::{self, ContainerFile, Group};
use crate::error::{
    ContainerSnafu, FileExistsSnafu, FileNotFoundSnafu, GroupNotFoundSnafu, TableIoResult,
};
use crate::paths;

/// Where to write to.
#[derive(Debug)]
pub enum ContainerTarget<'a> {
    /// A container file on disk, opened and closed by the operation.
    Path(PathBuf),
    /// A group of a container the caller already has open.
    Group(&'a mut Group),
}

impl From<&Path> for ContainerTarget<'_> {
    fn from(path: &Path) -> Self {
        ContainerTarget::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for ContainerTarget<'_> {
    fn from(path: PathBuf) -> Self {
        ContainerTarget::Path(path)
    }
}

impl From<&PathBuf> for ContainerTarget<'_> {
    fn from(path: &PathBuf) -> Self {
        ContainerTarget::Path(path.clone())
    }
}

impl From<&str> for ContainerTarget<'_> {
    fn from(path: &str) -> Self {
        ContainerTarget::Path(PathBuf::from(path))
    }
}

impl From<&String> for ContainerTarget<'_> {
    fn from(path: &String) -> Self {
        ContainerTarget::Path(PathBuf::from(path))
    }
}

impl<'a> From<&'a mut Group> for ContainerTarget<'a> {
    fn from(group: &'a mut Group) -> Self {
        ContainerTarget::Group(group)
    }
}

impl<'a> From<&'a mut ContainerFile> for ContainerTarget<'a> {
    fn from(file: &'a mut ContainerFile) -> Self {
        ContainerTarget::Group(file.root_mut())
    }
}

/// Where to read from.
#[derive(Debug)]
pub enum ContainerSource<'a> {
    /// A container file on disk, opened read-only by the operation.
    Path(PathBuf),
    /// A group of a container the caller already has open.
    Group(&'a Group),
}

impl From<&Path> for ContainerSource<'_> {
    fn from(path: &Path) -> Self {
        ContainerSource::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for ContainerSource<'_> {
    fn from(path: PathBuf) -> Self {
        ContainerSource::Path(path)
    }
}

impl From<&PathBuf> for ContainerSource<'_> {
    fn from(path: &PathBuf) -> Self {
        ContainerSource::Path(path.clone())
    }
}

impl From<&str> for ContainerSource<'_> {
    fn from(path: &str) -> Self {
        ContainerSource::Path(PathBuf::from(path))
    }
}

impl From<&String> for ContainerSource<'_> {
    fn from(path: &String) -> Self {
        ContainerSource::Path(PathBuf::from(path))
    }
}

impl<'a> From<&'a Group> for ContainerSource<'a> {
    fn from(group: &'a Group) -> Self {
        ContainerSource::Group(group)
    }
}

impl<'a> From<&'a ContainerFile> for ContainerSource<'a> {
    fn from(file: &'a ContainerFile) -> Self {
        ContainerSource::Group(file.root())
    }
}

/// How a path target is opened for writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Start a new file. An existing file is an error unless `overwrite`,
    /// in which case it is replaced when the new file is closed.
    WriteExclusive {
        /// Permit replacing an existing file.
        overwrite: bool,
    },
    /// Open an existing file for modification, or start it if missing.
    WriteAppend,
}

/// Ownership of a container opened for writing.
#[derive(Debug)]
pub enum ContainerHandle<'a> {
    /// Opened by this operation; must be closed by it.
    Owned(ContainerFile),
    /// Supplied by the caller; never closed here.
    Borrowed(&'a mut Group),
}

/// A container opened for writing together with its working group.
#[derive(Debug)]
pub struct OpenContainer<'a> {
    handle: ContainerHandle<'a>,
    group_path: String,
}

impl OpenContainer<'_> {
    /// True if closing this container is this operation's job.
    pub fn is_owned(&self) -> bool {
        matches!(self.handle, ContainerHandle::Owned(_))
    }

    /// Normalized path of the working group below the container root.
    pub fn group_path(&self) -> &str {
        &self.group_path
    }

    /// The working group, mutably.
    pub fn group_mut(&mut self) -> TableIoResult<&mut Group> {
        let root: &mut Group = match &mut self.handle {
            ContainerHandle::Owned(file) => file.root_mut(),
            ContainerHandle::Borrowed(group) => &mut **group,
        };
        root.group_mut(&self.group_path).context(GroupNotFoundSnafu {
            group: self.group_path.as_str(),
        })
    }

    /// Persist and release an owned file; a borrowed group is left alone.
    pub fn close(self) -> TableIoResult<()> {
        match self.handle {
            ContainerHandle::Owned(file) => file.close().context(ContainerSnafu),
            ContainerHandle::Borrowed(_) => Ok(()),
        }
    }
}

/// Ownership of a container opened for reading.
#[derive(Debug)]
pub enum SourceHandle<'a> {
    /// Opened read-only by this operation.
    Owned(ContainerFile),
    /// Supplied by the caller.
    Borrowed(&'a Group),
}

/// A container opened for reading together with its working group.
#[derive(Debug)]
pub struct OpenSource<'a> {
    handle: SourceHandle<'a>,
    group_path: String,
}

impl OpenSource<'_> {
    /// True if closing this container is this operation's job.
    pub fn is_owned(&self) -> bool {
        matches!(self.handle, SourceHandle::Owned(_))
    }

    /// The working group.
    pub fn group(&self) -> TableIoResult<&Group> {
        let root: &Group = match &self.handle {
            SourceHandle::Owned(file) => file.root(),
            SourceHandle::Borrowed(group) => *group,
        };
        root.group(&self.group_path).context(GroupNotFoundSnafu {
            group: self.group_path.as_str(),
        })
    }

    /// Release an owned file.
    pub fn close(self) -> TableIoResult<()> {
        match self.handle {
            SourceHandle::Owned(file) => file.close().context(ContainerSnafu),
            SourceHandle::Borrowed(_) => Ok(()),
        }
    }
}

/// Open `source` for reading; `group_path` must exist below its root.
///
/// A missing file is `FileNotFound`, a missing group `GroupNotFound`.
pub fn open_source<'a>(
    source: ContainerSource<'a>,
    group_path: &str,
) -> TableIoResult<OpenSource<'a>> {
    let handle = match source {
        ContainerSource::Group(root) => SourceHandle::Borrowed(root),
        ContainerSource::Path(path) => {
            let path_str = path.display().to_string();
            let exists = container::exists(&path).context(ContainerSnafu)?;
            ensure!(exists, FileNotFoundSnafu { path: path_str });
            let file = ContainerFile::open(&path).context(ContainerSnafu)?;
            debug!("opened {path_str} for reading");
            SourceHandle::Owned(file)
        }
    };

    let opened = OpenSource {
        handle,
        group_path: paths::normalize(group_path),
    };
    opened.group()?;
    Ok(opened)
}

/// Open `target` for writing and resolve `group_path` below its root.
///
/// For an already-open group `group_path` is reused or created. For a path:
///
/// - `WriteExclusive`: an existing file is `FileExists` unless `overwrite`;
///   `group_path` is created fresh in a new, empty container.
/// - `WriteAppend`: an existing file is opened in place, a missing one is
///   started empty; `group_path` is reused if present, otherwise created.
///
/// New containers are staged in memory: nothing on disk changes until the
/// returned container is closed, so a write that fails part-way leaves any
/// existing file untouched.
pub fn open_or_create<'a>(
    target: ContainerTarget<'a>,
    group_path: &str,
    mode: OpenMode,
) -> TableIoResult<OpenContainer<'a>> {
    let handle = match target {
        ContainerTarget::Group(root) => {
            paths::ensure_path(root, group_path).context(ContainerSnafu)?;
            ContainerHandle::Borrowed(root)
        }
        ContainerTarget::Path(path) => ContainerHandle::Owned(open_path(&path, group_path, mode)?),
    };

    Ok(OpenContainer {
        handle,
        group_path: paths::normalize(group_path),
    })
}

fn open_path(path: &Path, group_path: &str, mode: OpenMode) -> TableIoResult<ContainerFile> {
    let path_str = path.display().to_string();
    let exists = container::exists(path).context(ContainerSnafu)?;

    let file = match mode {
        OpenMode::WriteExclusive { overwrite } => {
            if exists {
                ensure!(overwrite, FileExistsSnafu { path: path_str });
                warn!("existing container {path_str} will be replaced (overwrite requested)");
            }
            let mut file = ContainerFile::staged(path);
            let mut group = file.root_mut();
            for seg in paths::segments(group_path) {
                group = group.create_group(seg).context(ContainerSnafu)?;
            }
            file
        }
        OpenMode::WriteAppend => {
            let mut file = if exists {
                ContainerFile::open_rw(path).context(ContainerSnafu)?
            } else {
                ContainerFile::staged(path)
            };
            paths::ensure_path(file.root_mut(), group_path).context(ContainerSnafu)?;
            file
        }
    };

    debug!(
        "opened {path_str} with {mode:?}, working group {:?}",
        paths::normalize(group_path)
    );
    Ok(file)
}
