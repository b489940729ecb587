//! Allow-list gate for name resolution.
//!
//! A pickle stream can name any importable callable. The interpreter only
//! ever resolves the fixed `(namespace, symbol)` pairs listed here, each of
//! which maps to a [`CallShape`] the interpreter implements natively. Nothing
//! outside this table is importable, and nothing in it runs foreign code.
//!
//! The table is built once per process on first use and is read-only after.

use std::collections::HashMap;
use std::sync::OnceLock;

/// What a permitted global does when the stream calls it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallShape {
    /// Only usable as an argument (e.g. the array class passed to the
    /// array reconstructor).
    NotCallable,
    /// `set()` / `set(iterable)`
    Set,
    /// `frozenset()` / `frozenset(iterable)`
    FrozenSet,
    /// `list()` / `list(iterable)`
    List,
    /// `tuple()` / `tuple(iterable)`
    Tuple,
    /// `dict()` / `dict(mapping)`
    Dict,
    /// `bytearray()` / `bytearray(bytes)` / `bytearray(text, encoding)`
    ByteArray,
    /// `OrderedDict()` / `OrderedDict(pairs)`
    OrderedDict,
    /// Array reconstructor: `(cls, shape, typecode)`, state arrives by BUILD.
    ArrayReconstruct,
    /// Array from buffer: `(buffer, dtype, shape, order)`.
    ArrayFromBuffer,
    /// Dtype constructor: `(descr, align, copy)`, byte order arrives by BUILD.
    Dtype,
    /// Numeric scalar: `(dtype, raw_bytes)`.
    NumericScalar,
    /// Text codec helper: `(text, encoding)` to bytes.
    CodecsEncode,
}

/// One permitted `(namespace, symbol)` pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllowListEntry {
    /// Module path.
    pub namespace: &'static str,
    /// Attribute within the module.
    pub symbol: &'static str,
    /// Native behavior when called.
    pub shape: CallShape,
}

const fn entry(namespace: &'static str, symbol: &'static str, shape: CallShape) -> AllowListEntry {
    AllowListEntry {
        namespace,
        symbol,
        shape,
    }
}

/// The complete allow-list.
const ENTRIES: &[AllowListEntry] = &[
    // Builtin containers, under both the current and the legacy module name
    entry("builtins", "set", CallShape::Set),
    entry("builtins", "frozenset", CallShape::FrozenSet),
    entry("builtins", "list", CallShape::List),
    entry("builtins", "tuple", CallShape::Tuple),
    entry("builtins", "dict", CallShape::Dict),
    entry("builtins", "bytearray", CallShape::ByteArray),
    entry("__builtin__", "set", CallShape::Set),
    entry("__builtin__", "frozenset", CallShape::FrozenSet),
    entry("__builtin__", "list", CallShape::List),
    entry("__builtin__", "tuple", CallShape::Tuple),
    entry("__builtin__", "dict", CallShape::Dict),
    entry("__builtin__", "bytearray", CallShape::ByteArray),
    entry("collections", "OrderedDict", CallShape::OrderedDict),
    // Numeric arrays (numpy 1.x and 2.x module layouts)
    entry("numpy", "ndarray", CallShape::NotCallable),
    entry("numpy", "dtype", CallShape::Dtype),
    entry("numpy.core.multiarray", "_reconstruct", CallShape::ArrayReconstruct),
    entry("numpy._core.multiarray", "_reconstruct", CallShape::ArrayReconstruct),
    entry("numpy.core.multiarray", "scalar", CallShape::NumericScalar),
    entry("numpy._core.multiarray", "scalar", CallShape::NumericScalar),
    entry("numpy.core.numeric", "_frombuffer", CallShape::ArrayFromBuffer),
    entry("numpy._core.numeric", "_frombuffer", CallShape::ArrayFromBuffer),
    // Bytes carried as latin-1 text by protocols 0 through 2
    entry("_codecs", "encode", CallShape::CodecsEncode),
];

/// Process-wide lookup table: namespace, then symbol.
#[derive(Debug)]
pub struct AllowList {
    by_namespace: HashMap<&'static str, HashMap<&'static str, CallShape>>,
}

impl AllowList {
    fn build() -> Self {
        let mut by_namespace: HashMap<&'static str, HashMap<&'static str, CallShape>> = HashMap::new();
        for e in ENTRIES {
            by_namespace.entry(e.namespace).or_default().insert(e.symbol, e.shape);
        }
        Self { by_namespace }
    }

    /// Returns true if the pair may be resolved.
    #[must_use]
    pub fn permit(&self, namespace: &str, symbol: &str) -> bool {
        self.permitted_call_shape(namespace, symbol).is_some()
    }

    /// Returns the call shape of a permitted pair, or `None` if denied.
    #[must_use]
    pub fn permitted_call_shape(&self, namespace: &str, symbol: &str) -> Option<CallShape> {
        self.by_namespace.get(namespace)?.get(symbol).copied()
    }

    /// Every permitted entry, in table order.
    pub fn entries(&self) -> impl Iterator<Item = &'static AllowListEntry> {
        ENTRIES.iter()
    }
}

/// Returns the shared allow-list, building it on first use.
pub fn allow_list() -> &'static AllowList {
    static TABLE: OnceLock<AllowList> = OnceLock::new();
    TABLE.get_or_init(AllowList::build)
}

/// Returns true if `namespace.symbol` may be resolved.
#[must_use]
pub fn permit(namespace: &str, symbol: &str) -> bool {
    allow_list().permit(namespace, symbol)
}

/// Returns the call shape of `namespace.symbol`, or `None` if denied.
#[must_use]
pub fn permitted_call_shape(namespace: &str, symbol: &str) -> Option<CallShape> {
    allow_list().permitted_call_shape(namespace, symbol)
}
