//! Numeric arrays and their dtype descriptors.
//!
//! A [`NumericArray`] is the object-graph form of a reconstructed numpy
//! `ndarray`: a [`Dtype`], a shape, and a flat buffer in row-major order.
//! Elements are widened on load (`i64`, `u64`, `f64`) while the dtype keeps
//! the original width for reporting.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]

use std::fmt;
use std::hash::{Hash, Hasher};

use half::f16;

use crate::Result;
use crate::error::Error;

/// Element category of a dtype.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DtypeKind {
    /// `numpy.bool_` (one byte, zero or nonzero).
    Bool,
    /// Signed integer.
    Int,
    /// Unsigned integer.
    UInt,
    /// IEEE 754 float (half, single or double precision).
    Float,
}

/// Byte order of multi-byte elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    /// `<`
    Little,
    /// `>`
    Big,
    /// `|`: single-byte elements have no byte order.
    NotApplicable,
}

impl ByteOrder {
    /// Parses a numpy byte-order character. `=` resolves to the host order.
    #[must_use]
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '<' => Some(Self::Little),
            '>' => Some(Self::Big),
            '|' => Some(Self::NotApplicable),
            '=' if cfg!(target_endian = "big") => Some(Self::Big),
            '=' => Some(Self::Little),
            _ => None,
        }
    }

    /// The numpy byte-order character.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Little => '<',
            Self::Big => '>',
            Self::NotApplicable => '|',
        }
    }
}

/// A numeric dtype descriptor (`numpy.dtype`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Dtype {
    kind: DtypeKind,
    itemsize: usize,
    byte_order: ByteOrder,
}

impl Dtype {
    /// Creates a dtype, rejecting widths numpy does not use for the kind.
    #[must_use]
    pub fn new(kind: DtypeKind, itemsize: usize, byte_order: ByteOrder) -> Option<Self> {
        let valid = match kind {
            DtypeKind::Bool => itemsize == 1,
            DtypeKind::Int | DtypeKind::UInt => matches!(itemsize, 1 | 2 | 4 | 8),
            DtypeKind::Float => matches!(itemsize, 2 | 4 | 8),
        };
        if !valid {
            return None;
        }
        let byte_order = if itemsize == 1 {
            ByteOrder::NotApplicable
        } else if byte_order == ByteOrder::NotApplicable {
            ByteOrder::Little
        } else {
            byte_order
        };
        Some(Self {
            kind,
            itemsize,
            byte_order,
        })
    }

    /// Parses a type string such as `f8`, `<i4`, `|b1`, `u1` or `?`.
    ///
    /// Returns `None` for anything that is not a plain numeric dtype
    /// (object, string, complex, datetime, structured).
    #[must_use]
    pub fn from_descr(descr: &str) -> Option<Self> {
        let mut chars = descr.chars();
        let (order, rest) = match chars.next()? {
            c @ ('<' | '>' | '|' | '=') => (ByteOrder::from_char(c)?, chars.as_str()),
            _ => (ByteOrder::from_char('=')?, descr),
        };
        if rest == "?" {
            return Self::new(DtypeKind::Bool, 1, order);
        }
        let mut rest_chars = rest.chars();
        let kind = match rest_chars.next()? {
            'b' => DtypeKind::Bool,
            'i' => DtypeKind::Int,
            'u' => DtypeKind::UInt,
            'f' => DtypeKind::Float,
            _ => return None,
        };
        let itemsize: usize = rest_chars.as_str().parse().ok()?;
        Self::new(kind, itemsize, order)
    }

    /// Returns a copy with a different byte order (ignored for 1-byte items).
    #[must_use]
    pub fn with_byte_order(self, byte_order: ByteOrder) -> Self {
        Self::new(self.kind, self.itemsize, byte_order).unwrap_or(self)
    }

    /// The element category.
    #[must_use]
    pub const fn kind(&self) -> DtypeKind {
        self.kind
    }

    /// Bytes per element.
    #[must_use]
    pub const fn itemsize(&self) -> usize {
        self.itemsize
    }

    /// Byte order of elements.
    #[must_use]
    pub const fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// The numpy name, e.g. `float64`, `uint8`, `bool`.
    #[must_use]
    pub fn name(&self) -> String {
        let bits = self.itemsize * 8;
        match self.kind {
            DtypeKind::Bool => "bool".to_string(),
            DtypeKind::Int => format!("int{bits}"),
            DtypeKind::UInt => format!("uint{bits}"),
            DtypeKind::Float => format!("float{bits}"),
        }
    }

    /// Decodes one element from exactly `itemsize` bytes.
    fn decode(&self, raw: &[u8]) -> Element {
        let mut buf = [0u8; 8];
        buf[..raw.len()].copy_from_slice(raw);
        if self.byte_order == ByteOrder::Big {
            buf[..raw.len()].reverse();
        }
        let bits = u64::from_le_bytes(buf);
        match self.kind {
            DtypeKind::Bool => Element::Bool(bits != 0),
            DtypeKind::UInt => Element::UInt(bits),
            DtypeKind::Int => {
                let shift = 64 - 8 * self.itemsize as u32;
                Element::Int(((bits << shift) as i64) >> shift)
            }
            DtypeKind::Float => Element::Float(match self.itemsize {
                2 => f16::from_bits(bits as u16).to_f64(),
                4 => f64::from(f32::from_bits(bits as u32)),
                _ => f64::from_bits(bits),
            }),
        }
    }

    /// Decodes a single scalar (the payload of a numpy scalar value).
    ///
    /// # Errors
    /// Returns a shape mismatch if `raw` is not exactly one element long.
    pub fn decode_scalar(&self, raw: &[u8]) -> Result<Element> {
        if raw.len() != self.itemsize {
            return Err(Error::shape_mismatch(
                Vec::new(),
                Some(self.itemsize),
                raw.len(),
            ));
        }
        Ok(self.decode(raw))
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// A single array element, widened to 64 bits.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Element {
    /// Boolean element.
    Bool(bool),
    /// Signed integer element.
    Int(i64),
    /// Unsigned integer element.
    UInt(u64),
    /// Floating point element (may be non-finite).
    Float(f64),
}

/// Typed, flat element storage in row-major order.
#[derive(Clone, Debug, PartialEq)]
pub enum ArrayBuffer {
    /// Boolean elements.
    Bool(Vec<bool>),
    /// Signed integer elements.
    Int(Vec<i64>),
    /// Unsigned integer elements.
    UInt(Vec<u64>),
    /// Floating point elements.
    Float(Vec<f64>),
}

impl ArrayBuffer {
    fn with_capacity(kind: DtypeKind, capacity: usize) -> Self {
        match kind {
            DtypeKind::Bool => Self::Bool(Vec::with_capacity(capacity)),
            DtypeKind::Int => Self::Int(Vec::with_capacity(capacity)),
            DtypeKind::UInt => Self::UInt(Vec::with_capacity(capacity)),
            DtypeKind::Float => Self::Float(Vec::with_capacity(capacity)),
        }
    }

    fn push(&mut self, element: Element) {
        match (self, element) {
            (Self::Bool(v), Element::Bool(x)) => v.push(x),
            (Self::Int(v), Element::Int(x)) => v.push(x),
            (Self::UInt(v), Element::UInt(x)) => v.push(x),
            (Self::Float(v), Element::Float(x)) => v.push(x),
            _ => unreachable!("element kind always follows the buffer's dtype"),
        }
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Bool(v) => v.len(),
            Self::Int(v) => v.len(),
            Self::UInt(v) => v.len(),
            Self::Float(v) => v.len(),
        }
    }

    /// Returns true if there are no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Gets an element by flat index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Element> {
        match self {
            Self::Bool(v) => v.get(index).copied().map(Element::Bool),
            Self::Int(v) => v.get(index).copied().map(Element::Int),
            Self::UInt(v) => v.get(index).copied().map(Element::UInt),
            Self::Float(v) => v.get(index).copied().map(Element::Float),
        }
    }

    /// Iterates elements in flat order.
    pub fn iter(&self) -> impl Iterator<Item = Element> + '_ {
        (0..self.len()).filter_map(|i| self.get(i))
    }

    fn reorder_fortran(&self, shape: &[usize]) -> Self {
        match self {
            Self::Bool(v) => Self::Bool(fortran_to_c(v, shape)),
            Self::Int(v) => Self::Int(fortran_to_c(v, shape)),
            Self::UInt(v) => Self::UInt(fortran_to_c(v, shape)),
            Self::Float(v) => Self::Float(fortran_to_c(v, shape)),
        }
    }
}

/// Converts column-major element order to row-major order.
fn fortran_to_c<T: Copy>(src: &[T], shape: &[usize]) -> Vec<T> {
    let mut strides = Vec::with_capacity(shape.len());
    let mut stride = 1usize;
    for &dim in shape {
        strides.push(stride);
        stride *= dim;
    }

    let mut out = Vec::with_capacity(src.len());
    let mut index = vec![0usize; shape.len()];
    for _ in 0..src.len() {
        let offset: usize = index.iter().zip(&strides).map(|(i, s)| i * s).sum();
        out.push(src[offset]);
        // Odometer increment, last axis fastest.
        for axis in (0..shape.len()).rev() {
            index[axis] += 1;
            if index[axis] < shape[axis] {
                break;
            }
            index[axis] = 0;
        }
    }
    out
}

/// A reconstructed numeric array.
///
/// Equality compares float elements bitwise, so an array containing NaN
/// equals itself.
#[derive(Clone, Debug)]
pub struct NumericArray {
    dtype: Dtype,
    shape: Vec<usize>,
    buffer: ArrayBuffer,
}

impl NumericArray {
    /// Builds an array from raw element bytes.
    ///
    /// The shape product is checked against `raw.len()` with overflow-checked
    /// arithmetic before any element storage is allocated. `fortran_order`
    /// marks `raw` as column-major; the stored buffer is always row-major.
    ///
    /// # Errors
    /// Returns [`ErrorKind::ShapeMismatch`](crate::ErrorKind::ShapeMismatch)
    /// if the buffer length differs from `product(shape) * itemsize` or the
    /// product overflows.
    pub fn from_raw(dtype: Dtype, shape: Vec<usize>, raw: &[u8], fortran_order: bool) -> Result<Self> {
        let expected = shape
            .iter()
            .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
            .and_then(|count| count.checked_mul(dtype.itemsize));
        if expected != Some(raw.len()) {
            return Err(Error::shape_mismatch(shape, expected, raw.len()));
        }

        let count = raw.len() / dtype.itemsize;
        let mut buffer = ArrayBuffer::with_capacity(dtype.kind, count);
        for chunk in raw.chunks_exact(dtype.itemsize) {
            buffer.push(dtype.decode(chunk));
        }
        if fortran_order && shape.len() > 1 {
            buffer = buffer.reorder_fortran(&shape);
        }

        Ok(Self {
            dtype,
            shape,
            buffer,
        })
    }

    /// The element dtype.
    #[must_use]
    pub const fn dtype(&self) -> Dtype {
        self.dtype
    }

    /// Dimension sizes.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Flat element storage.
    #[must_use]
    pub const fn buffer(&self) -> &ArrayBuffer {
        &self.buffer
    }

    /// Total number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if the array has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl PartialEq for NumericArray {
    fn eq(&self, other: &Self) -> bool {
        self.dtype == other.dtype
            && self.shape == other.shape
            && self.buffer.len() == other.buffer.len()
            && self.buffer.iter().zip(other.buffer.iter()).all(|pair| match pair {
                (Element::Float(a), Element::Float(b)) => a.to_bits() == b.to_bits(),
                (a, b) => a == b,
            })
    }
}

impl Eq for NumericArray {}

impl Hash for NumericArray {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.dtype.hash(state);
        self.shape.hash(state);
        for element in self.buffer.iter() {
            match element {
                Element::Bool(b) => b.hash(state),
                Element::Int(n) => n.hash(state),
                Element::UInt(n) => n.hash(state),
                Element::Float(f) => f.to_bits().hash(state),
            }
        }
    }
}
