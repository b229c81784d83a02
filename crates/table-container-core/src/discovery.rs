//! Table discovery.
//!
//! A table is any dataset whose element type has named fields. Discovery
//! walks a group depth-first (children in name order) and returns the full
//! path of every such dataset relative to that group.
use crate::container::{Dataset, Group};

/// Full paths of every record dataset below `group`, in visit order.
pub fn list_tables(group: &Group) -> Vec<String> {
    let mut tables = Vec::new();
    group.visit(|path, node| {
        if node.as_dataset().is_some_and(Dataset::is_record) {
            tables.push(path.to_string());
        }
    });
    tables
}
