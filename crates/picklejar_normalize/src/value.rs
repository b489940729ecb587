//! The normalized output tree.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::summary::ArraySummary;

/// A JSON-representable value.
///
/// Floats are always finite; non-finite floats become [`Null`](Self::Null)
/// during normalization. Tuples, sets and small arrays all become
/// [`Seq`](Self::Seq).
#[derive(Clone, Debug, PartialEq)]
pub enum NormalizedValue {
    /// `null`.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Unsigned integer from an unsigned array element.
    UInt(u64),
    /// Integer outside the 64-bit range, as a decimal string.
    BigInt(String),
    /// Finite float.
    Float(f64),
    /// Text.
    Str(Arc<str>),
    /// Raw bytes, emitted as a tagged base64 object.
    Bytes(Arc<[u8]>),
    /// Ordered sequence.
    Seq(Vec<NormalizedValue>),
    /// String-keyed mapping in insertion order.
    Map(IndexMap<String, NormalizedValue>),
    /// Stand-in for an oversized numeric array.
    ArraySummary(Box<ArraySummary>),
    /// A permitted global that was never invoked, as `namespace.symbol`.
    Global(String),
}

impl NormalizedValue {
    /// Converts a float, mapping NaN and the infinities to `Null`.
    #[must_use]
    pub fn float(f: f64) -> Self {
        if f.is_finite() { Self::Float(f) } else { Self::Null }
    }

    /// Returns true if this is `Null`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Attempts to extract a sequence.
    #[must_use]
    pub fn as_seq(&self) -> Option<&[NormalizedValue]> {
        match self {
            Self::Seq(items) => Some(items),
            _ => None,
        }
    }

    /// Attempts to extract a mapping.
    #[must_use]
    pub const fn as_map(&self) -> Option<&IndexMap<String, NormalizedValue>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Attempts to extract an array summary.
    #[must_use]
    pub fn as_summary(&self) -> Option<&ArraySummary> {
        match self {
            Self::ArraySummary(summary) => Some(summary),
            _ => None,
        }
    }

    /// Looks up a key in a mapping.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&NormalizedValue> {
        self.as_map().and_then(|map| map.get(key))
    }

    /// Base64 text of a bytes value.
    #[must_use]
    pub fn base64(&self) -> Option<String> {
        match self {
            Self::Bytes(bytes) => Some(STANDARD.encode(bytes)),
            _ => None,
        }
    }
}

impl Serialize for NormalizedValue {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(n) => serializer.serialize_i64(*n),
            Self::UInt(n) => serializer.serialize_u64(*n),
            Self::BigInt(decimal) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("__bigint__", &true)?;
                map.serialize_entry("decimal", decimal)?;
                map.end()
            }
            // Non-finite floats never reach here through `normalize`.
            Self::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            Self::Float(_) => serializer.serialize_unit(),
            Self::Str(s) => serializer.serialize_str(s),
            Self::Bytes(bytes) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("__bytes__", &true)?;
                map.serialize_entry("base64", &STANDARD.encode(bytes))?;
                map.end()
            }
            Self::Seq(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Self::ArraySummary(summary) => summary.serialize(serializer),
            Self::Global(name) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("__global__", name)?;
                map.end()
            }
        }
    }
}
