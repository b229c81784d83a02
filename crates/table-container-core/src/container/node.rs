//! Group/dataset tree held in memory while a container is open.
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use arrow::array::{Array, ArrayRef};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use snafu::prelude::*;

use crate::container::error::{
    ContainerResult, InvalidNameSnafu, NodeExistsSnafu, NotAGroupSnafu,
};
use crate::container::format;
use crate::keywords::Keywords;
use crate::paths::segments;

fn validate_name(name: &str) -> ContainerResult<()> {
    ensure!(
        !name.is_empty() && !name.contains('/') && name != "." && name != "..",
        InvalidNameSnafu { name }
    );
    Ok(())
}

/// Payload of a dataset.
#[derive(Debug, Clone)]
pub enum DatasetData {
    /// A structured record with named fields; this is what a table is.
    Records(RecordBatch),
    /// A plain array without field names.
    Array(ArrayRef),
}

impl DatasetData {
    /// Number of rows (elements for a plain array).
    pub fn num_rows(&self) -> usize {
        match self {
            DatasetData::Records(batch) => batch.num_rows(),
            DatasetData::Array(array) => array.len(),
        }
    }

    /// Field names of a record dataset, `None` for a plain array.
    pub fn field_names(&self) -> Option<Vec<String>> {
        match self {
            DatasetData::Records(batch) => Some(
                batch
                    .schema()
                    .fields()
                    .iter()
                    .map(|f| f.name().clone())
                    .collect(),
            ),
            DatasetData::Array(_) => None,
        }
    }
}

/// A named, typed array node with its own attributes.
///
/// The encoded payload is produced when the dataset is built, so a dataset
/// that exists in a tree is always one the file can store.
#[derive(Debug, Clone)]
pub struct Dataset {
    data: DatasetData,
    attrs: Keywords,
    compressed: bool,
    payload: Bytes,
}

impl Dataset {
    /// Encode `data` for storage; `compressed` is a request forwarded to the
    /// codec and `name` only labels errors.
    pub fn new(name: &str, data: DatasetData, compressed: bool) -> ContainerResult<Self> {
        let payload = format::encode_dataset(name, &data, compressed)?;
        Ok(Self::from_parts(data, compressed, payload))
    }

    pub(crate) fn from_parts(data: DatasetData, compressed: bool, payload: Bytes) -> Self {
        Dataset {
            data,
            attrs: Keywords::new(),
            compressed,
            payload,
        }
    }

    pub(crate) fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// The dataset payload.
    pub fn data(&self) -> &DatasetData {
        &self.data
    }

    /// The record payload, if this dataset has named fields.
    pub fn records(&self) -> Option<&RecordBatch> {
        match &self.data {
            DatasetData::Records(batch) => Some(batch),
            DatasetData::Array(_) => None,
        }
    }

    /// True if the element type has named fields.
    pub fn is_record(&self) -> bool {
        matches!(self.data, DatasetData::Records(_))
    }

    /// Whether compression was requested when the dataset was created.
    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// Dataset attributes.
    pub fn attrs(&self) -> &Keywords {
        &self.attrs
    }

    /// Mutable dataset attributes.
    pub fn attrs_mut(&mut self) -> &mut Keywords {
        &mut self.attrs
    }

    pub(crate) fn with_attrs(mut self, attrs: Keywords) -> Self {
        self.attrs = attrs;
        self
    }
}

/// A child of a group.
#[derive(Debug, Clone)]
pub enum Node {
    /// A nested group.
    Group(Group),
    /// A dataset.
    Dataset(Dataset),
}

impl Node {
    /// Borrow as a group.
    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Node::Group(g) => Some(g),
            Node::Dataset(_) => None,
        }
    }

    /// Mutably borrow as a group.
    pub fn as_group_mut(&mut self) -> Option<&mut Group> {
        match self {
            Node::Group(g) => Some(g),
            Node::Dataset(_) => None,
        }
    }

    /// Borrow as a dataset.
    pub fn as_dataset(&self) -> Option<&Dataset> {
        match self {
            Node::Dataset(d) => Some(d),
            Node::Group(_) => None,
        }
    }
}

/// A directory-like node holding named groups and datasets.
///
/// Children are kept in name order, which is also the order used by
/// [`Group::visit`].
#[derive(Debug, Clone, Default)]
pub struct Group {
    attrs: Keywords,
    children: BTreeMap<String, Node>,
}

impl Group {
    /// Create an empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Group attributes.
    pub fn attrs(&self) -> &Keywords {
        &self.attrs
    }

    /// Mutable group attributes.
    pub fn attrs_mut(&mut self) -> &mut Keywords {
        &mut self.attrs
    }

    /// Names of the direct children.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    /// Direct children with their names.
    pub fn children(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.children.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of direct children.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// True when the group has no children.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Look up a descendant by slash-delimited path.
    pub fn get(&self, path: &str) -> Option<&Node> {
        let mut segs = segments(path);
        let mut node = self.children.get(segs.next()?)?;
        for seg in segs {
            node = node.as_group()?.children.get(seg)?;
        }
        Some(node)
    }

    /// Mutable variant of [`Group::get`].
    pub fn get_mut(&mut self, path: &str) -> Option<&mut Node> {
        let mut segs = segments(path);
        let mut node = self.children.get_mut(segs.next()?)?;
        for seg in segs {
            node = node.as_group_mut()?.children.get_mut(seg)?;
        }
        Some(node)
    }

    /// True if any node exists at `path`.
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Look up a descendant group; an empty path is this group.
    pub fn group(&self, path: &str) -> Option<&Group> {
        if segments(path).next().is_none() {
            return Some(self);
        }
        self.get(path)?.as_group()
    }

    /// Mutable variant of [`Group::group`].
    pub fn group_mut(&mut self, path: &str) -> Option<&mut Group> {
        if segments(path).next().is_none() {
            return Some(self);
        }
        self.get_mut(path)?.as_group_mut()
    }

    /// Look up a descendant dataset.
    pub fn dataset(&self, path: &str) -> Option<&Dataset> {
        self.get(path)?.as_dataset()
    }

    /// Create a new child group; fails if the name is taken.
    pub fn create_group(&mut self, name: &str) -> ContainerResult<&mut Group> {
        validate_name(name)?;
        match self.children.entry(name.to_string()) {
            Entry::Occupied(_) => NodeExistsSnafu { path: name }.fail(),
            Entry::Vacant(slot) => slot
                .insert(Node::Group(Group::new()))
                .as_group_mut()
                .context(NotAGroupSnafu { path: name }),
        }
    }

    /// Open the child group `name`, creating it if missing.
    pub fn require_group(&mut self, name: &str) -> ContainerResult<&mut Group> {
        validate_name(name)?;
        self.children
            .entry(name.to_string())
            .or_insert_with(|| Node::Group(Group::new()))
            .as_group_mut()
            .context(NotAGroupSnafu { path: name })
    }

    /// Create a new child dataset; fails if the name is taken or the codec
    /// cannot store `data`. Nothing is inserted on failure.
    pub fn create_dataset(
        &mut self,
        name: &str,
        data: DatasetData,
        compressed: bool,
    ) -> ContainerResult<&mut Dataset> {
        validate_name(name)?;
        ensure!(
            !self.children.contains_key(name),
            NodeExistsSnafu { path: name }
        );
        let dataset = Dataset::new(name, data, compressed)?;
        self.insert_dataset(name, dataset)
    }

    pub(crate) fn insert_dataset(
        &mut self,
        name: &str,
        dataset: Dataset,
    ) -> ContainerResult<&mut Dataset> {
        validate_name(name)?;
        match self.children.entry(name.to_string()) {
            Entry::Occupied(_) => NodeExistsSnafu { path: name }.fail(),
            Entry::Vacant(slot) => match slot.insert(Node::Dataset(dataset)) {
                Node::Dataset(d) => Ok(d),
                Node::Group(_) => NodeExistsSnafu { path: name }.fail(),
            },
        }
    }

    pub(crate) fn insert_group(&mut self, name: &str, group: Group) -> ContainerResult<()> {
        validate_name(name)?;
        match self.children.entry(name.to_string()) {
            Entry::Occupied(_) => NodeExistsSnafu { path: name }.fail(),
            Entry::Vacant(slot) => {
                slot.insert(Node::Group(group));
                Ok(())
            }
        }
    }

    pub(crate) fn with_attrs(mut self, attrs: Keywords) -> Self {
        self.attrs = attrs;
        self
    }

    /// Visit every descendant depth-first, passing its full path.
    pub fn visit<F: FnMut(&str, &Node)>(&self, mut f: F) {
        self.visit_with_prefix("", &mut f);
    }

    fn visit_with_prefix<F: FnMut(&str, &Node)>(&self, prefix: &str, f: &mut F) {
        for (name, node) in &self.children {
            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}/{name}")
            };
            f(&path, node);
            if let Node::Group(g) = node {
                g.visit_with_prefix(&path, f);
            }
        }
    }
}
