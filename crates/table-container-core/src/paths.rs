//! Path resolution for slash-delimited table names.
//!
//! A table name such as `"survey/2024/objects"` is split into a directory
//! portion (`"survey/2024"`), which becomes a chain of groups, and a leaf
//! (`"objects"`), which becomes the dataset name. Empty segments produced by
//! leading, trailing or doubled slashes are ignored.
use crate::container::{ContainerResult, Group};

/// Non-empty segments of a slash-delimited path.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Canonical form of `path`: non-empty segments joined by single slashes.
pub fn normalize(path: &str) -> String {
    segments(path).collect::<Vec<_>>().join("/")
}

/// The final segment of `name`, or `""` if it has none.
///
/// Used for "ignore groups" naming: no group is created for the prefix.
pub fn strip_path(name: &str) -> &str {
    segments(name).last().unwrap_or("")
}

/// Everything before the final segment of `name`, normalized.
pub fn parent_path(name: &str) -> String {
    let segs: Vec<&str> = segments(name).collect();
    match segs.split_last() {
        Some((_, dir)) => dir.join("/"),
        None => String::new(),
    }
}

/// Split a table name into its normalized directory portion and leaf.
///
/// Returns `None` when `name` has no non-empty segment.
pub fn split_table_path(name: &str) -> Option<(String, &str)> {
    let leaf = segments(name).last()?;
    Some((parent_path(name), leaf))
}

/// Make sure the group chain `path` exists under `group`, creating missing
/// groups, and return the innermost one.
///
/// Existing groups are reused, so calling this twice with the same path
/// creates nothing the second time. A segment naming an existing dataset
/// fails with `ContainerError::NotAGroup`.
pub fn ensure_path<'g>(group: &'g mut Group, path: &str) -> ContainerResult<&'g mut Group> {
    let mut current = group;
    for seg in segments(path) {
        current = current.require_group(seg)?;
    }
    Ok(current)
}
