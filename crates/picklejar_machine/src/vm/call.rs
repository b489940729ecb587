//! Native implementations of the permitted callables, and BUILD.

use std::sync::Arc;

use indexmap::IndexMap;
use num_bigint::BigInt;
use picklejar_foundation::{ByteOrder, Dtype, Element, Error, NumericArray, ResourceLimit, Result, Value};
use tracing::debug;

use super::Vm;
use super::arena::{Callable, FreezeMode, Node, NodeId, Obj};
use crate::gate::CallShape;

fn arity(callable: &Callable, expected: &str, got: usize) -> Error {
    Error::malformed(format!(
        "{}() takes {expected} arguments, got {got}",
        callable.reference
    ))
}

fn element_value(element: Element) -> Value {
    match element {
        Element::Bool(b) => Value::Bool(b),
        Element::Int(n) => Value::Int(n),
        Element::UInt(n) => i64::try_from(n).map_or_else(|_| Value::from_bigint(BigInt::from(n)), Value::Int),
        Element::Float(f) => Value::Float(f),
    }
}

/// Encodes text with one of the codecs pickles use to carry bytes.
fn encode_text(text: &str, encoding: &str) -> Result<Vec<u8>> {
    let normalized: String = encoding
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .flat_map(char::to_lowercase)
        .collect();
    match normalized.as_str() {
        "latin1" | "latin" | "iso88591" | "l1" => text
            .chars()
            .map(|c| u8::try_from(u32::from(c)).ok())
            .collect::<Option<Vec<u8>>>()
            .ok_or_else(|| Error::malformed("text is not representable in latin-1")),
        "utf8" | "u8" => Ok(text.as_bytes().to_vec()),
        "ascii" | "usascii" => {
            if text.is_ascii() {
                Ok(text.as_bytes().to_vec())
            } else {
                Err(Error::malformed("text is not representable in ascii"))
            }
        }
        _ => Err(Error::malformed(format!("unsupported codec {encoding:?}"))),
    }
}

impl Vm {
    fn describe(&self, obj: &Obj) -> &'static str {
        match obj {
            Obj::Scalar(value) => value.type_name(),
            Obj::Node(id) => self.arena.get(*id).type_name(),
            Obj::Global(_) => "global",
        }
    }

    /// Counts items a call is about to allocate.
    ///
    /// Arena nodes are never freed within a run, so copies made by calls are
    /// charged even when the result is popped straight away.
    fn charge(&mut self, items: usize) -> Result<()> {
        self.allocated = self.allocated.saturating_add(items);
        if self.allocated > self.config.max_allocated_items {
            return Err(Error::limit_exceeded(ResourceLimit::MaxAllocatedItems {
                limit: self.config.max_allocated_items,
            }));
        }
        Ok(())
    }

    pub(super) fn hashable(&mut self, obj: &Obj) -> Result<Value> {
        self.arena.freeze(obj, FreezeMode::Hashable, &self.config)
    }

    /// Items of a list, tuple, set or dict (keys) node.
    fn iter_items(&self, obj: &Obj) -> Result<Vec<Obj>> {
        if let Obj::Node(id) = obj {
            match self.arena.get(*id) {
                Node::List(items) | Node::Tuple(items) => return Ok(items.clone()),
                Node::Set { members, .. } => return Ok(members.values().cloned().collect()),
                Node::Dict(map) => return Ok(map.values().map(|(k, _)| k.clone()).collect()),
                _ => {}
            }
        }
        Err(Error::malformed(format!("'{}' is not iterable here", self.describe(obj))))
    }

    /// Items of a tuple node.
    pub(super) fn tuple_items(&self, obj: &Obj, what: &str) -> Result<Vec<Obj>> {
        match obj {
            Obj::Node(id) => match self.arena.get(*id) {
                Node::Tuple(items) => Ok(items.clone()),
                other => Err(Error::malformed(format!("{what} must be a tuple, got '{}'", other.type_name()))),
            },
            other => Err(Error::malformed(format!(
                "{what} must be a tuple, got '{}'",
                self.describe(other)
            ))),
        }
    }

    fn scalar<'o>(obj: &'o Obj) -> Option<&'o Value> {
        match obj {
            Obj::Scalar(value) => Some(value),
            _ => None,
        }
    }

    fn text_arg<'o>(&self, obj: &'o Obj, what: &str) -> Result<&'o str> {
        Self::scalar(obj)
            .and_then(Value::as_str)
            .ok_or_else(|| Error::malformed(format!("{what} must be a string, got '{}'", self.describe(obj))))
    }

    /// Raw bytes of a bytes scalar. Text is taken as its UTF-8 encoding, which
    /// recovers the original bytes of a legacy byte string decoded as text.
    fn raw_bytes(&self, obj: &Obj, what: &str) -> Result<Arc<[u8]>> {
        match Self::scalar(obj) {
            Some(Value::Bytes(bytes)) => Ok(Arc::clone(bytes)),
            Some(Value::Str(text)) => Ok(Arc::from(text.as_bytes())),
            _ => Err(Error::unsupported_build(format!(
                "{what} must be bytes, got '{}'",
                self.describe(obj)
            ))),
        }
    }

    fn truthy(&self, obj: &Obj, what: &str) -> Result<bool> {
        match Self::scalar(obj) {
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::Int(n)) => Ok(*n != 0),
            _ => Err(Error::malformed(format!("{what} must be a boolean, got '{}'", self.describe(obj)))),
        }
    }

    /// Shape from a tuple or list of non-negative integers.
    fn shape_arg(&self, obj: &Obj) -> Result<Vec<usize>> {
        let items = match obj {
            Obj::Node(id) => match self.arena.get(*id) {
                Node::Tuple(items) | Node::List(items) => items,
                other => return Err(Error::malformed(format!("shape must be a tuple, got '{}'", other.type_name()))),
            },
            other => {
                return Err(Error::malformed(format!(
                    "shape must be a tuple, got '{}'",
                    self.describe(other)
                )));
            }
        };
        items
            .iter()
            .map(|item| match Self::scalar(item) {
                Some(Value::Int(n)) => {
                    usize::try_from(*n).map_err(|_| Error::malformed(format!("negative dimension {n} in shape")))
                }
                _ => Err(Error::malformed("shape dimensions must be integers")),
            })
            .collect()
    }

    fn dtype_arg(&self, obj: &Obj) -> Result<Dtype> {
        match obj {
            Obj::Node(id) => match self.arena.get(*id) {
                Node::Dtype { dtype, .. } => Ok(*dtype),
                other => Err(Error::malformed(format!("expected a dtype, got '{}'", other.type_name()))),
            },
            other => Err(Error::malformed(format!("expected a dtype, got '{}'", self.describe(other)))),
        }
    }

    fn hashed_members(&mut self, items: Vec<Obj>) -> Result<IndexMap<Value, Obj>> {
        let mut members = IndexMap::with_capacity(items.len());
        for item in items {
            let key = self.hashable(&item)?;
            members.entry(key).or_insert(item);
        }
        Ok(members)
    }

    pub(super) fn insert_pairs(&mut self, dict: NodeId, pairs: Vec<(Obj, Obj)>) -> Result<()> {
        let mut hashed = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            hashed.push((self.hashable(&key)?, key, value));
        }
        match self.arena.get_mut(dict) {
            Node::Dict(map) => {
                for (hash, key, value) in hashed {
                    map.entry(hash)
                        .and_modify(|slot| slot.1 = value.clone())
                        .or_insert((key, value));
                }
                Ok(())
            }
            other => Err(Error::malformed(format!("cannot set items on '{}'", other.type_name()))),
        }
    }

    pub(super) fn add_members(&mut self, set: NodeId, items: Vec<Obj>) -> Result<()> {
        let hashed = self.hashed_members(items)?;
        match self.arena.get_mut(set) {
            Node::Set { members, frozen: false } => {
                for (hash, item) in hashed {
                    members.entry(hash).or_insert(item);
                }
                Ok(())
            }
            other => Err(Error::malformed(format!("cannot add items to '{}'", other.type_name()))),
        }
    }

    fn pairs_of(&self, obj: &Obj) -> Result<Vec<(Obj, Obj)>> {
        if let Obj::Node(id) = obj {
            if let Node::Dict(map) = self.arena.get(*id) {
                return Ok(map.values().cloned().collect());
            }
        }
        self.iter_items(obj)?
            .iter()
            .map(|pair| match self.iter_items(pair)?.as_slice() {
                [k, v] => Ok((k.clone(), v.clone())),
                _ => Err(Error::malformed("mapping items must be key/value pairs")),
            })
            .collect()
    }

    /// Applies a permitted callable to its arguments.
    pub(super) fn call(&mut self, callable: &Callable, args: Vec<Obj>) -> Result<Obj> {
        match callable.shape {
            CallShape::NotCallable => Err(Error::malformed(format!(
                "{} is not callable",
                callable.reference
            ))),
            CallShape::Set | CallShape::FrozenSet => {
                let items = match args.as_slice() {
                    [] => Vec::new(),
                    [iterable] => self.iter_items(iterable)?,
                    _ => return Err(arity(callable, "at most 1", args.len())),
                };
                self.charge(items.len())?;
                let members = self.hashed_members(items)?;
                let frozen = callable.shape == CallShape::FrozenSet;
                Ok(Obj::Node(self.arena.alloc(Node::Set { members, frozen })))
            }
            CallShape::List | CallShape::Tuple => {
                let items = match args.as_slice() {
                    [] => Vec::new(),
                    [iterable] => self.iter_items(iterable)?,
                    _ => return Err(arity(callable, "at most 1", args.len())),
                };
                self.charge(items.len())?;
                let node = if callable.shape == CallShape::List {
                    Node::List(items)
                } else {
                    Node::Tuple(items)
                };
                Ok(Obj::Node(self.arena.alloc(node)))
            }
            CallShape::Dict | CallShape::OrderedDict => {
                let pairs = match args.as_slice() {
                    [] => Vec::new(),
                    [mapping] => self.pairs_of(mapping)?,
                    _ => return Err(arity(callable, "at most 1", args.len())),
                };
                self.charge(pairs.len())?;
                let id = self.arena.alloc(Node::Dict(IndexMap::new()));
                self.insert_pairs(id, pairs)?;
                Ok(Obj::Node(id))
            }
            CallShape::ByteArray => {
                let bytes: Vec<u8> = match args.as_slice() {
                    [] => Vec::new(),
                    [source] => match Self::scalar(source) {
                        Some(Value::Bytes(bytes)) => bytes.to_vec(),
                        _ => self
                            .iter_items(source)?
                            .iter()
                            .map(|item| match Self::scalar(item) {
                                Some(Value::Int(n)) => u8::try_from(*n).ok(),
                                _ => None,
                            })
                            .collect::<Option<_>>()
                            .ok_or_else(|| Error::malformed("bytearray items must be integers in 0..=255"))?,
                    },
                    [text, encoding] => encode_text(self.text_arg(text, "text")?, self.text_arg(encoding, "encoding")?)?,
                    _ => return Err(arity(callable, "at most 2", args.len())),
                };
                self.charge(bytes.len())?;
                Ok(Obj::Scalar(Value::from(bytes.as_slice())))
            }
            CallShape::CodecsEncode => {
                let bytes = match args.as_slice() {
                    [text] => encode_text(self.text_arg(text, "text")?, "utf-8")?,
                    [text, encoding] | [text, encoding, _] => {
                        encode_text(self.text_arg(text, "text")?, self.text_arg(encoding, "encoding")?)?
                    }
                    _ => return Err(arity(callable, "1 to 3", args.len())),
                };
                self.charge(bytes.len())?;
                Ok(Obj::Scalar(Value::from(bytes.as_slice())))
            }
            CallShape::ArrayReconstruct => {
                let [class, shape, _typecode] = args.as_slice() else {
                    return Err(arity(callable, "3", args.len()));
                };
                match class {
                    Obj::Global(c) if c.shape == CallShape::NotCallable => {}
                    other => {
                        return Err(Error::malformed(format!(
                            "{} expects the array class, got '{}'",
                            callable.reference,
                            self.describe(other)
                        )));
                    }
                }
                self.shape_arg(shape)?;
                Ok(Obj::Node(self.arena.alloc(Node::PendingArray)))
            }
            CallShape::ArrayFromBuffer => {
                let [buffer, dtype, shape, order] = args.as_slice() else {
                    return Err(arity(callable, "4", args.len()));
                };
                let raw = self.raw_bytes(buffer, "array buffer")?;
                let dtype = self.dtype_arg(dtype)?;
                let shape = self.shape_arg(shape)?;
                let fortran = match self.text_arg(order, "order")? {
                    "C" | "A" | "K" => false,
                    "F" => true,
                    other => return Err(Error::malformed(format!("unknown array order {other:?}"))),
                };
                self.charge(raw.len() / dtype.itemsize())?;
                let array = NumericArray::from_raw(dtype, shape, &raw, fortran)?;
                debug!(dtype = %array.dtype(), len = array.len(), "array reconstructed from buffer");
                Ok(Obj::Node(self.arena.alloc(Node::Array(Arc::new(array)))))
            }
            CallShape::Dtype => {
                let descr = match args.as_slice() {
                    [descr] | [descr, _] | [descr, _, _] => self.text_arg(descr, "dtype descriptor")?,
                    _ => return Err(arity(callable, "1 to 3", args.len())),
                };
                let dtype = Dtype::from_descr(descr)
                    .ok_or_else(|| Error::unsupported_build(format!("dtype {descr:?} is not a plain numeric type")))?;
                Ok(Obj::Node(self.arena.alloc(Node::Dtype { dtype, built: false })))
            }
            CallShape::NumericScalar => {
                let [dtype, payload] = args.as_slice() else {
                    return Err(arity(callable, "2", args.len()));
                };
                let dtype = self.dtype_arg(dtype)?;
                let raw = self.raw_bytes(payload, "scalar payload")?;
                Ok(Obj::Scalar(element_value(dtype.decode_scalar(&raw)?)))
            }
        }
    }

    /// Applies BUILD state to an array or dtype awaiting it.
    pub(super) fn build(&mut self, target: &Obj, state: &Obj) -> Result<()> {
        let Obj::Node(id) = target else {
            return Err(Error::unsupported_build(format!(
                "cannot apply state to '{}'",
                self.describe(target)
            )));
        };
        let id = *id;
        match self.arena.get(id) {
            Node::PendingArray => {
                let array = self.array_from_state(state)?;
                self.charge(array.len())?;
                debug!(dtype = %array.dtype(), shape = ?array.shape(), "array reconstructed");
                *self.arena.get_mut(id) = Node::Array(Arc::new(array));
                Ok(())
            }
            Node::Dtype { dtype, built: false } => {
                let dtype = self.dtype_from_state(*dtype, state)?;
                *self.arena.get_mut(id) = Node::Dtype { dtype, built: true };
                Ok(())
            }
            Node::Dtype { built: true, .. } | Node::Array(_) => Err(Error::unsupported_build(format!(
                "'{}' already received its state",
                self.arena.get(id).type_name()
            ))),
            other => Err(Error::unsupported_build(format!(
                "cannot apply state to '{}'",
                other.type_name()
            ))),
        }
    }

    /// Array state: `([version,] shape, dtype, is_fortran, raw)`.
    fn array_from_state(&self, state: &Obj) -> Result<NumericArray> {
        let items = self.tuple_items(state, "array state")?;
        let (shape, dtype, fortran, raw) = match items.as_slice() {
            [_, shape, dtype, fortran, raw] | [shape, dtype, fortran, raw] => (shape, dtype, fortran, raw),
            _ => return Err(Error::malformed(format!("array state has {} items", items.len()))),
        };
        if matches!(raw, Obj::Node(id) if matches!(self.arena.get(*id), Node::List(_))) {
            return Err(Error::unsupported_build("object arrays are not supported"));
        }
        let shape = self.shape_arg(shape)?;
        let dtype = self.dtype_arg(dtype)?;
        let fortran = self.truthy(fortran, "is_fortran")?;
        let raw = self.raw_bytes(raw, "array data")?;
        NumericArray::from_raw(dtype, shape, &raw, fortran)
    }

    /// Dtype state: `(version, byteorder, subarray, names, fields, ...)`.
    fn dtype_from_state(&self, dtype: Dtype, state: &Obj) -> Result<Dtype> {
        let items = self.tuple_items(state, "dtype state")?;
        let order = items
            .get(1)
            .ok_or_else(|| Error::malformed("dtype state has no byte order"))
            .and_then(|o| self.text_arg(o, "dtype byte order"))?;
        for (index, what) in [(2, "subarray"), (3, "structured")] {
            let present = match items.get(index) {
                None => false,
                Some(Obj::Scalar(value)) => !value.is_none(),
                Some(_) => true,
            };
            if present {
                return Err(Error::unsupported_build(format!("{what} dtypes are not supported")));
            }
        }
        let mut chars = order.chars();
        let byte_order = match (chars.next(), chars.next()) {
            (Some(c), None) => ByteOrder::from_char(c),
            _ => None,
        }
        .ok_or_else(|| Error::malformed(format!("invalid byte order {order:?}")))?;
        Ok(dtype.with_byte_order(byte_order))
    }
}
