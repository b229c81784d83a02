//! Scalar metadata ("keywords") attached to tables, table sets, groups and
//! datasets.
//!
//! Keywords are stored in the container manifest as attributes. The JSON
//! representation is adjacently tagged (`{"type": "int", "value": 3}`) so the
//! scalar type survives a round-trip exactly: an `Int(1)` never comes back as
//! a `Float(1.0)` or a `UInt(1)`. Non-finite floats are written as the strings
//! `"NaN"`, `"inf"` and `"-inf"` because JSON has no literal for them.
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Keyword mapping used for table, table-set, group and dataset metadata.
///
/// A `BTreeMap` keeps attribute order deterministic in the manifest.
pub type Keywords = BTreeMap<String, KeywordValue>;

/// A single scalar keyword value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum KeywordValue {
    /// Boolean flag.
    Bool(bool),
    /// Signed 64-bit integer.
    Int(i64),
    /// Unsigned 64-bit integer.
    UInt(u64),
    /// 64-bit float, including non-finite values.
    Float(#[serde(with = "float_repr")] f64),
    /// UTF-8 string.
    Str(String),
}

impl KeywordValue {
    /// Returns the string payload, if this is a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            KeywordValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for KeywordValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeywordValue::Bool(v) => write!(f, "{v}"),
            KeywordValue::Int(v) => write!(f, "{v}"),
            KeywordValue::UInt(v) => write!(f, "{v}"),
            KeywordValue::Float(v) => write!(f, "{v}"),
            KeywordValue::Str(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<bool> for KeywordValue {
    fn from(v: bool) -> Self {
        KeywordValue::Bool(v)
    }
}

impl From<i32> for KeywordValue {
    fn from(v: i32) -> Self {
        KeywordValue::Int(i64::from(v))
    }
}

impl From<i64> for KeywordValue {
    fn from(v: i64) -> Self {
        KeywordValue::Int(v)
    }
}

impl From<u32> for KeywordValue {
    fn from(v: u32) -> Self {
        KeywordValue::UInt(u64::from(v))
    }
}

impl From<u64> for KeywordValue {
    fn from(v: u64) -> Self {
        KeywordValue::UInt(v)
    }
}

impl From<f64> for KeywordValue {
    fn from(v: f64) -> Self {
        KeywordValue::Float(v)
    }
}

impl From<&str> for KeywordValue {
    fn from(v: &str) -> Self {
        KeywordValue::Str(v.to_string())
    }
}

impl From<String> for KeywordValue {
    fn from(v: String) -> Self {
        KeywordValue::Str(v)
    }
}

mod float_repr {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    const NAN: &str = "NaN";
    const POS_INF: &str = "inf";
    const NEG_INF: &str = "-inf";

    pub(super) fn serialize<S: Serializer>(value: &f64, s: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            s.serialize_f64(*value)
        } else if value.is_nan() {
            s.serialize_str(NAN)
        } else if value.is_sign_positive() {
            s.serialize_str(POS_INF)
        } else {
            s.serialize_str(NEG_INF)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        match Repr::deserialize(d)? {
            Repr::Number(v) => Ok(v),
            Repr::Text(text) => match text.as_str() {
                NAN => Ok(f64::NAN),
                POS_INF => Ok(f64::INFINITY),
                NEG_INF => Ok(f64::NEG_INFINITY),
                other => Err(D::Error::custom(format!(
                    "invalid float keyword value {other:?}"
                ))),
            },
        }
    }
}
