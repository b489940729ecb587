//! Conversion from the object graph to the normalized tree.
//!
//! The walk is iterative: containers push a build task followed by their
//! children, and each build task collects its finished children from the
//! top of an output stack. Arbitrarily deep graphs never touch the call stack.

use std::sync::Arc;

use indexmap::IndexMap;
use picklejar_foundation::config::{DEFAULT_ELEMENT_THRESHOLD, DEFAULT_SAMPLE_SIZE};
use picklejar_foundation::{NumericArray, ParseConfig, Value};

use crate::keys::key_string;
use crate::summary::{ArraySummary, materialize};
use crate::value::NormalizedValue;

/// Output shaping for [`normalize`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Arrays with more elements than this are summarized.
    pub element_threshold: usize,
    /// Leading elements kept in a summary's sample.
    pub sample_size: usize,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            element_threshold: DEFAULT_ELEMENT_THRESHOLD,
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }
}

impl From<&ParseConfig> for NormalizeOptions {
    fn from(config: &ParseConfig) -> Self {
        Self {
            element_threshold: config.element_threshold,
            sample_size: config.sample_size,
        }
    }
}

impl NormalizeOptions {
    /// Creates options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the summarization threshold.
    #[must_use]
    pub fn with_element_threshold(mut self, threshold: usize) -> Self {
        self.element_threshold = threshold;
        self
    }

    /// Sets the summary sample size.
    #[must_use]
    pub fn with_sample_size(mut self, size: usize) -> Self {
        self.sample_size = size;
        self
    }
}

enum Task<'v> {
    Visit(&'v Value),
    /// Collect this many finished values into a sequence.
    Seq(usize),
    /// Collect one finished value per key into a mapping.
    Map(Vec<String>),
}

/// Normalizes an object graph into a JSON-safe tree.
///
/// Pure and deterministic: the same graph always yields the same tree.
#[must_use]
pub fn normalize(value: &Value, options: &NormalizeOptions) -> NormalizedValue {
    let mut tasks = vec![Task::Visit(value)];
    let mut done: Vec<NormalizedValue> = Vec::new();

    while let Some(task) = tasks.pop() {
        match task {
            Task::Visit(value) => match value {
                Value::List(items) | Value::Tuple(items) => {
                    tasks.push(Task::Seq(items.len()));
                    tasks.extend(items.iter().rev().map(Task::Visit));
                }
                Value::Set(members) => {
                    tasks.push(Task::Seq(members.len()));
                    tasks.extend(members.iter().rev().map(Task::Visit));
                }
                Value::Dict(map) => {
                    tasks.push(Task::Map(map.keys().map(key_string).collect()));
                    tasks.extend(map.values().rev().map(Task::Visit));
                }
                Value::None => done.push(NormalizedValue::Null),
                Value::Bool(b) => done.push(NormalizedValue::Bool(*b)),
                Value::Int(n) => done.push(NormalizedValue::Int(*n)),
                Value::BigInt(n) => done.push(NormalizedValue::BigInt(n.to_string())),
                Value::Float(f) => done.push(NormalizedValue::float(*f)),
                Value::Str(s) => done.push(NormalizedValue::Str(Arc::clone(s))),
                Value::Bytes(bytes) => done.push(NormalizedValue::Bytes(Arc::clone(bytes))),
                Value::Array(array) => done.push(normalize_array(array, options)),
                Value::Dtype(dtype) => done.push(NormalizedValue::Str(Arc::from(dtype.name()))),
                Value::Global(reference) => done.push(NormalizedValue::Global(reference.to_string())),
            },
            Task::Seq(len) => {
                let items = done.split_off(done.len().saturating_sub(len));
                done.push(NormalizedValue::Seq(items));
            }
            Task::Map(keys) => {
                let values = done.split_off(done.len().saturating_sub(keys.len()));
                let mut map = IndexMap::with_capacity(keys.len());
                // Keys that collide once stringified: last write wins.
                for (key, value) in keys.into_iter().zip(values) {
                    map.insert(key, value);
                }
                done.push(NormalizedValue::Map(map));
            }
        }
    }
    done.pop().unwrap_or(NormalizedValue::Null)
}

fn normalize_array(array: &NumericArray, options: &NormalizeOptions) -> NormalizedValue {
    if array.len() > options.element_threshold {
        NormalizedValue::ArraySummary(Box::new(ArraySummary::of(array, options.sample_size)))
    } else {
        materialize(array)
    }
}
