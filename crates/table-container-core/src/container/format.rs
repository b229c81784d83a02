//! On-disk encoding of a container.
//!
//! Layout of a container file:
//!
//! ```text
//! "TCF1" | u32 LE format version | u64 LE manifest length |
//! manifest (JSON) | dataset payloads | "TCF1"
//! ```
//!
//! The manifest mirrors the group tree: each group records its attributes and
//! children, each dataset records its layout, row count, compression request,
//! attributes and the `(offset, length)` of its payload inside the payload
//! region. Payloads are Parquet files written with the Arrow writer, so column
//! types (including nested and string types) round-trip through the Arrow
//! schema embedded in each blob.
//!
//! Payloads are encoded when a dataset is created, not when the file is
//! written, so a dataset the codec cannot store is rejected up front. Decoded
//! datasets keep a slice of the file buffer as their payload.
use std::collections::BTreeMap;
use std::ops::Range;

use arrow::datatypes::{DataType, IntervalUnit};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::container::error::{
    ContainerResult, CorruptSnafu, ManifestSnafu, UnsupportedTypeSnafu,
};
use crate::container::node::{Dataset, DatasetData, Group, Node};
use crate::keywords::Keywords;

/// Leading and trailing magic bytes of every container file.
pub const MAGIC: &[u8; 4] = b"TCF1";

/// Current container format version.
///
/// Bumped only on breaking changes to the manifest or the byte layout.
pub const FORMAT_VERSION: u32 = 1;

const PREFIX_LEN: usize = MAGIC.len() + 4 + 8;

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    format_version: u32,
    written_at: DateTime<Utc>,
    root: GroupEntry,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct GroupEntry {
    #[serde(default, skip_serializing_if = "Keywords::is_empty")]
    attrs: Keywords,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    children: BTreeMap<String, NodeEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
enum NodeEntry {
    Group(GroupEntry),
    Dataset(DatasetEntry),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum DatasetLayout {
    Records,
    Array,
}

#[derive(Debug, Serialize, Deserialize)]
struct DatasetEntry {
    layout: DatasetLayout,
    num_rows: u64,
    compressed: bool,
    offset: u64,
    length: u64,
    #[serde(default, skip_serializing_if = "Keywords::is_empty")]
    attrs: Keywords,
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

fn le_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(buf)
}

fn le_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buf)
}

fn payload_range(offset: u64, length: u64, payload_len: usize) -> Option<Range<usize>> {
    let start = usize::try_from(offset).ok()?;
    let end = start.checked_add(usize::try_from(length).ok()?)?;
    (end <= payload_len).then_some(start..end)
}

/// True if columns of `data_type` can be stored in a dataset.
///
/// Nested types are accepted when every child type is.
pub fn supports_type(data_type: &DataType) -> bool {
    match data_type {
        DataType::Union(_, _)
        | DataType::RunEndEncoded(_, _)
        | DataType::ListView(_)
        | DataType::LargeListView(_)
        | DataType::Interval(IntervalUnit::MonthDayNano) => false,
        DataType::List(field)
        | DataType::LargeList(field)
        | DataType::FixedSizeList(field, _)
        | DataType::Map(field, _) => supports_type(field.data_type()),
        DataType::Struct(fields) => fields.iter().all(|f| supports_type(f.data_type())),
        DataType::Dictionary(_, values) => supports_type(values),
        _ => true,
    }
}

/// Encode one dataset payload; `name` is only used for error messages.
pub(crate) fn encode_dataset(
    name: &str,
    data: &DatasetData,
    compressed: bool,
) -> ContainerResult<Bytes> {
    match data {
        DatasetData::Records(batch) => {
            for field in batch.schema().fields() {
                ensure!(
                    supports_type(field.data_type()),
                    UnsupportedTypeSnafu {
                        name,
                        column: field.name().as_str(),
                        data_type: field.data_type().clone(),
                    }
                );
            }
        }
        DatasetData::Array(array) => {
            ensure!(
                supports_type(array.data_type()),
                UnsupportedTypeSnafu {
                    name,
                    column: codec::ARRAY_FIELD,
                    data_type: array.data_type().clone(),
                }
            );
        }
    }
    codec::encode_dataset(name, data, compressed).map(Bytes::from)
}

/// Encode the tree rooted at `root` into container bytes.
///
/// `path` is only used for error messages.
pub(crate) fn encode_container(path: &str, root: &Group) -> ContainerResult<Vec<u8>> {
    let mut payload = Vec::new();
    let manifest = Manifest {
        format_version: FORMAT_VERSION,
        written_at: Utc::now(),
        root: encode_group(root, "", &mut payload)?,
    };
    let json = serde_json::to_vec(&manifest).context(ManifestSnafu { path })?;

    let mut out = Vec::with_capacity(PREFIX_LEN + json.len() + payload.len() + MAGIC.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&(json.len() as u64).to_le_bytes());
    out.extend_from_slice(&json);
    out.extend_from_slice(&payload);
    out.extend_from_slice(MAGIC);
    Ok(out)
}

fn encode_group(group: &Group, prefix: &str, payload: &mut Vec<u8>) -> ContainerResult<GroupEntry> {
    let mut children = BTreeMap::new();
    for (name, node) in group.children() {
        let node_path = join(prefix, name);
        let entry = match node {
            Node::Group(g) => NodeEntry::Group(encode_group(g, &node_path, payload)?),
            Node::Dataset(d) => {
                let layout = match d.data() {
                    DatasetData::Records(_) => DatasetLayout::Records,
                    DatasetData::Array(_) => DatasetLayout::Array,
                };
                let bytes = d.payload();
                let entry = DatasetEntry {
                    layout,
                    num_rows: d.data().num_rows() as u64,
                    compressed: d.is_compressed(),
                    offset: payload.len() as u64,
                    length: bytes.len() as u64,
                    attrs: d.attrs().clone(),
                };
                payload.extend_from_slice(bytes);
                NodeEntry::Dataset(entry)
            }
        };
        children.insert(name.to_string(), entry);
    }
    Ok(GroupEntry {
        attrs: group.attrs().clone(),
        children,
    })
}

/// Decode container bytes read from `path` into a root group.
pub(crate) fn decode_container(path: &str, bytes: Bytes) -> ContainerResult<Group> {
    ensure!(
        bytes.len() >= PREFIX_LEN + MAGIC.len(),
        CorruptSnafu {
            path,
            msg: format!("file too short ({} bytes)", bytes.len()),
        }
    );
    let tail_start = bytes.len() - MAGIC.len();
    ensure!(
        &bytes[..MAGIC.len()] == MAGIC && &bytes[tail_start..] == MAGIC,
        CorruptSnafu {
            path,
            msg: "missing container magic bytes",
        }
    );

    let version = le_u32(&bytes[MAGIC.len()..]);
    ensure!(
        version == FORMAT_VERSION,
        CorruptSnafu {
            path,
            msg: format!("unsupported format version {version}"),
        }
    );

    let manifest_len = le_u64(&bytes[MAGIC.len() + 4..]);
    let manifest_range = payload_range(PREFIX_LEN as u64, manifest_len, tail_start).context(
        CorruptSnafu {
            path,
            msg: format!("manifest length {manifest_len} out of range"),
        },
    )?;
    let manifest: Manifest =
        serde_json::from_slice(&bytes[manifest_range.clone()]).context(ManifestSnafu { path })?;
    ensure!(
        manifest.format_version == version,
        CorruptSnafu {
            path,
            msg: format!(
                "manifest version {} does not match header version {version}",
                manifest.format_version
            ),
        }
    );

    let payload = bytes.slice(manifest_range.end..tail_start);
    decode_group(path, "", manifest.root, &payload)
}

fn decode_group(
    file: &str,
    prefix: &str,
    entry: GroupEntry,
    payload: &Bytes,
) -> ContainerResult<Group> {
    let mut group = Group::new().with_attrs(entry.attrs);
    for (name, child) in entry.children {
        let node_path = join(prefix, &name);
        match child {
            NodeEntry::Group(g) => {
                let sub = decode_group(file, &node_path, g, payload)?;
                group.insert_group(&name, sub)?;
            }
            NodeEntry::Dataset(d) => {
                let range = payload_range(d.offset, d.length, payload.len()).context(
                    CorruptSnafu {
                        path: file,
                        msg: format!("payload of dataset {node_path} out of range"),
                    },
                )?;
                let blob = payload.slice(range);
                let data = codec::decode_dataset(file, &node_path, d.layout, blob.clone())?;
                ensure!(
                    data.num_rows() as u64 == d.num_rows,
                    CorruptSnafu {
                        path: file,
                        msg: format!(
                            "dataset {node_path} has {} rows, manifest says {}",
                            data.num_rows(),
                            d.num_rows
                        ),
                    }
                );
                let dataset = Dataset::from_parts(data, d.compressed, blob).with_attrs(d.attrs);
                group.insert_dataset(&name, dataset)?;
            }
        }
    }
    Ok(group)
}

#[cfg(feature = "parquet")]
mod codec {
    use std::sync::Arc;

    use arrow::array::Array;
    use arrow::compute::concat_batches;
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use bytes::Bytes;
    use parquet::arrow::ArrowWriter;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use parquet::basic::Compression;
    use parquet::file::properties::WriterProperties;
    use snafu::prelude::*;

    use super::DatasetLayout;
    use crate::container::error::{ArrowSnafu, CodecSnafu, ContainerResult, CorruptSnafu};
    use crate::container::node::DatasetData;

    /// Column name used to carry a plain array through Parquet.
    pub(super) const ARRAY_FIELD: &str = "values";

    pub(super) fn encode_dataset(
        name: &str,
        data: &DatasetData,
        compressed: bool,
    ) -> ContainerResult<Vec<u8>> {
        let batch = match data {
            DatasetData::Records(batch) => batch.clone(),
            DatasetData::Array(array) => {
                let field = Field::new(ARRAY_FIELD, array.data_type().clone(), true);
                RecordBatch::try_new(Arc::new(Schema::new(vec![field])), vec![array.clone()])
                    .context(ArrowSnafu { name })?
            }
        };

        let compression = if compressed {
            Compression::SNAPPY
        } else {
            Compression::UNCOMPRESSED
        };
        let props = WriterProperties::builder()
            .set_compression(compression)
            .build();

        let mut buf = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buf, batch.schema(), Some(props))
            .boxed()
            .context(CodecSnafu { name })?;
        writer.write(&batch).boxed().context(CodecSnafu { name })?;
        writer.close().boxed().context(CodecSnafu { name })?;
        Ok(buf)
    }

    pub(super) fn decode_dataset(
        file: &str,
        name: &str,
        layout: DatasetLayout,
        bytes: Bytes,
    ) -> ContainerResult<DatasetData> {
        let builder = ParquetRecordBatchReaderBuilder::try_new(bytes)
            .boxed()
            .context(CodecSnafu { name })?;
        let schema = builder.schema().clone();
        let reader = builder.build().boxed().context(CodecSnafu { name })?;
        let batches = reader
            .collect::<Result<Vec<_>, _>>()
            .context(ArrowSnafu { name })?;
        let batch = concat_batches(&schema, &batches).context(ArrowSnafu { name })?;

        match layout {
            DatasetLayout::Records => Ok(DatasetData::Records(batch)),
            DatasetLayout::Array => {
                ensure!(
                    batch.num_columns() == 1,
                    CorruptSnafu {
                        path: file,
                        msg: format!(
                            "array dataset {name} has {} columns",
                            batch.num_columns()
                        ),
                    }
                );
                Ok(DatasetData::Array(batch.column(0).clone()))
            }
        }
    }
}

#[cfg(not(feature = "parquet"))]
mod codec {
    use bytes::Bytes;

    use super::DatasetLayout;
    use crate::container::error::{BackendUnavailableSnafu, ContainerResult};
    use crate::container::node::DatasetData;

    pub(super) const ARRAY_FIELD: &str = "values";

    pub(super) fn encode_dataset(
        _name: &str,
        _data: &DatasetData,
        _compressed: bool,
    ) -> ContainerResult<Vec<u8>> {
        BackendUnavailableSnafu.fail()
    }

    pub(super) fn decode_dataset(
        _file: &str,
        _name: &str,
        _layout: DatasetLayout,
        _bytes: Bytes,
    ) -> ContainerResult<DatasetData> {
        BackendUnavailableSnafu.fail()
    }
}
