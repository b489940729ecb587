//! Core value type of the object graph.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use num_bigint::BigInt;

use crate::array::{Dtype, NumericArray};
use crate::collections::{PjMap, PjSet, PjVec};

/// A node of the object graph produced by interpreting one pickle stream.
///
/// Values are immutable and cheaply cloneable (O(1) for every variant).
/// Subgraphs shared through the memo are shared here too.
#[derive(Clone)]
pub enum Value {
    /// `None`.
    None,
    /// Boolean value.
    Bool(bool),
    /// Integer that fits in 64 bits.
    Int(i64),
    /// Integer outside the `i64` range.
    BigInt(Arc<BigInt>),
    /// 64-bit floating point (may be NaN or infinite).
    Float(f64),
    /// Text string.
    Str(Arc<str>),
    /// Byte string (`bytes` and `bytearray`).
    Bytes(Arc<[u8]>),
    /// Mutable sequence.
    List(PjVec<Value>),
    /// Immutable sequence.
    Tuple(PjVec<Value>),
    /// Key-unique mapping in insertion order.
    Dict(PjMap<Value, Value>),
    /// `set` or `frozenset`.
    Set(PjSet<Value>),
    /// Reconstructed numeric array.
    Array(Arc<NumericArray>),
    /// Dtype descriptor that was not consumed by an array.
    Dtype(Dtype),
    /// A permitted global that was referenced but never invoked.
    Global(GlobalRef),
}

/// A `(namespace, symbol)` reference to an external name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GlobalRef {
    /// Module path, e.g. `numpy.core.multiarray`.
    pub namespace: Arc<str>,
    /// Attribute name within the module, e.g. `_reconstruct`.
    pub symbol: Arc<str>,
}

impl GlobalRef {
    /// Creates a new reference.
    #[must_use]
    pub fn new(namespace: impl Into<Arc<str>>, symbol: impl Into<Arc<str>>) -> Self {
        Self {
            namespace: namespace.into(),
            symbol: symbol.into(),
        }
    }
}

impl fmt::Display for GlobalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.symbol)
    }
}

impl Value {
    /// Short name of the variant, for diagnostics.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bool(_) => "bool",
            Self::Int(_) | Self::BigInt(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
            Self::Tuple(_) => "tuple",
            Self::Dict(_) => "dict",
            Self::Set(_) => "set",
            Self::Array(_) => "ndarray",
            Self::Dtype(_) => "dtype",
            Self::Global(_) => "global",
        }
    }

    /// Returns true if this value is `None`.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Attempts to extract a boolean value.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Attempts to extract an integer value.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Attempts to extract a float value.
    #[must_use]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Attempts to extract a string reference.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Attempts to extract a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Attempts to extract the elements of a list or tuple.
    #[must_use]
    pub const fn as_seq(&self) -> Option<&PjVec<Value>> {
        match self {
            Self::List(v) | Self::Tuple(v) => Some(v),
            _ => None,
        }
    }

    /// Attempts to extract a dict.
    #[must_use]
    pub const fn as_dict(&self) -> Option<&PjMap<Value, Value>> {
        match self {
            Self::Dict(m) => Some(m),
            _ => None,
        }
    }

    /// Attempts to extract a numeric array.
    #[must_use]
    pub fn as_array(&self) -> Option<&NumericArray> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Normalizes an arbitrary-precision integer, narrowing to `Int` when it fits.
    #[must_use]
    pub fn from_bigint(n: BigInt) -> Self {
        i64::try_from(&n).map_or_else(|_| Self::BigInt(Arc::new(n)), Self::Int)
    }
}

// Implement PartialEq manually to handle float comparison
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::BigInt(a), Self::BigInt(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::List(a), Self::List(b)) | (Self::Tuple(a), Self::Tuple(b)) => a == b,
            (Self::Dict(a), Self::Dict(b)) => a == b,
            (Self::Set(a), Self::Set(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Dtype(a), Self::Dtype(b)) => a == b,
            (Self::Global(a), Self::Global(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::None => {}
            Self::Bool(b) => b.hash(state),
            Self::Int(n) => n.hash(state),
            Self::BigInt(n) => n.hash(state),
            Self::Float(n) => n.to_bits().hash(state),
            Self::Str(s) => s.hash(state),
            Self::Bytes(b) => b.hash(state),
            Self::List(v) | Self::Tuple(v) => v.hash(state),
            Self::Dict(m) => m.hash(state),
            Self::Set(s) => s.hash(state),
            Self::Array(a) => a.hash(state),
            Self::Dtype(d) => d.hash(state),
            Self::Global(g) => g.hash(state),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::BigInt(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n:?}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Bytes(b) => write!(f, "b{:?}", String::from_utf8_lossy(b)),
            Self::List(v) => write!(f, "{v:?}"),
            Self::Tuple(v) => {
                write!(f, "(")?;
                for (i, item) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item:?}")?;
                }
                if v.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Self::Dict(m) => write!(f, "{m:?}"),
            Self::Set(s) => write!(f, "{s:?}"),
            Self::Array(a) => write!(f, "ndarray({}, shape={:?})", a.dtype(), a.shape()),
            Self::Dtype(d) => write!(f, "dtype({d})"),
            Self::Global(g) => write!(f, "<global {g}>"),
        }
    }
}

// Convenience From implementations

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s.into())
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Self::Bytes(b.into())
    }
}

impl From<NumericArray> for Value {
    fn from(a: NumericArray) -> Self {
        Self::Array(Arc::new(a))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}
