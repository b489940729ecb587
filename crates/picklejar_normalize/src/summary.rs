//! Numeric array output: full materialization or a bounded summary.

use picklejar_foundation::{ArrayBuffer, Element, NumericArray};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::value::NormalizedValue;

/// Compact stand-in for an array above the element threshold.
#[derive(Clone, Debug, PartialEq)]
pub struct ArraySummary {
    /// Dtype name, e.g. `float64`.
    pub dtype: String,
    /// Declared shape.
    pub shape: Vec<usize>,
    /// Smallest finite element, or `Null` when there is none.
    pub min: NormalizedValue,
    /// Largest finite element, or `Null` when there is none.
    pub max: NormalizedValue,
    /// Leading elements of the flattened array, sanitized.
    pub sample: Vec<NormalizedValue>,
}

impl ArraySummary {
    /// Summarizes an array, keeping the first `sample_size` elements.
    #[must_use]
    pub fn of(array: &NumericArray, sample_size: usize) -> Self {
        let (min, max) = extremes(array.buffer());
        debug!(dtype = %array.dtype(), len = array.len(), "array summarized");
        Self {
            dtype: array.dtype().name(),
            shape: array.shape().to_vec(),
            min,
            max,
            sample: array.buffer().iter().take(sample_size).map(element).collect(),
        }
    }
}

impl Serialize for ArraySummary {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(6))?;
        map.serialize_entry("__ndarray__", &true)?;
        map.serialize_entry("dtype", &self.dtype)?;
        map.serialize_entry("shape", &self.shape)?;
        map.serialize_entry("min", &self.min)?;
        map.serialize_entry("max", &self.max)?;
        map.serialize_entry("sample", &self.sample)?;
        map.end()
    }
}

/// Normalizes one array element.
#[must_use]
pub fn element(element: Element) -> NormalizedValue {
    match element {
        Element::Bool(b) => NormalizedValue::Bool(b),
        Element::Int(n) => NormalizedValue::Int(n),
        Element::UInt(n) => NormalizedValue::UInt(n),
        Element::Float(f) => NormalizedValue::float(f),
    }
}

/// Min and max over finite elements, keeping the element kind.
fn extremes(buffer: &ArrayBuffer) -> (NormalizedValue, NormalizedValue) {
    fn pair<T>(min: Option<T>, max: Option<T>, wrap: impl Fn(T) -> NormalizedValue) -> (NormalizedValue, NormalizedValue) {
        (
            min.map_or(NormalizedValue::Null, &wrap),
            max.map_or(NormalizedValue::Null, &wrap),
        )
    }

    match buffer {
        ArrayBuffer::Bool(v) => pair(v.iter().copied().min(), v.iter().copied().max(), NormalizedValue::Bool),
        ArrayBuffer::Int(v) => pair(v.iter().copied().min(), v.iter().copied().max(), NormalizedValue::Int),
        ArrayBuffer::UInt(v) => pair(v.iter().copied().min(), v.iter().copied().max(), NormalizedValue::UInt),
        ArrayBuffer::Float(v) => {
            let finite = || v.iter().copied().filter(|f| f.is_finite());
            pair(finite().reduce(f64::min), finite().reduce(f64::max), NormalizedValue::Float)
        }
    }
}

/// Every element, nested to match the shape.
///
/// A 0-dimensional array becomes its single element; a zero-length axis
/// yields correctly nested empty sequences.
#[must_use]
pub fn materialize(array: &NumericArray) -> NormalizedValue {
    let shape = array.shape();
    let mut level: Vec<NormalizedValue> = array.buffer().iter().map(element).collect();
    let Some((&outer, inner)) = shape.split_first() else {
        return level.pop().unwrap_or(NormalizedValue::Null);
    };

    // Group from the innermost axis outwards.
    for axis in (0..inner.len()).rev() {
        let dim = inner[axis];
        let groups = outer * inner[..axis].iter().product::<usize>();
        let mut items = level.into_iter();
        level = (0..groups)
            .map(|_| NormalizedValue::Seq(items.by_ref().take(dim).collect()))
            .collect();
    }
    NormalizedValue::Seq(level)
}
