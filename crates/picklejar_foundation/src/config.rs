//! Parse configuration: output shaping and resource ceilings.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Arrays with more elements than this are summarized.
pub const DEFAULT_ELEMENT_THRESHOLD: usize = 20_000;
/// Elements kept in an array summary's sample.
pub const DEFAULT_SAMPLE_SIZE: usize = 10;
/// Opcodes a single parse may dispatch.
pub const DEFAULT_MAX_OPCODES: u64 = 50_000_000;
/// Live operand-stack items, marks included.
pub const DEFAULT_MAX_STACK_DEPTH: usize = 1 << 20;
/// Largest accepted input.
pub const DEFAULT_MAX_INPUT_BYTES: usize = 256 * 1024 * 1024;
/// Deepest container nesting in the object graph.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 512;
/// Nodes in the expanded output tree.
pub const DEFAULT_MAX_OUTPUT_NODES: usize = 10_000_000;
/// Container items and array elements that permitted calls may allocate.
pub const DEFAULT_MAX_ALLOCATED_ITEMS: usize = 1 << 24;

/// Configuration bundle for one parse.
///
/// Every field has a default, so a partial JSON object deserializes.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct ParseConfig {
    /// Arrays with more elements than this are summarized.
    pub element_threshold: usize,
    /// Number of leading elements kept in a summary's sample.
    pub sample_size: usize,
    /// Maximum opcodes dispatched before the parse is aborted.
    pub max_opcodes: u64,
    /// Maximum live operand-stack depth, marks included.
    pub max_stack_depth: usize,
    /// Maximum input size in bytes.
    pub max_input_bytes: usize,
    /// Maximum container nesting in the finished object graph.
    pub max_nesting_depth: usize,
    /// Maximum node count of the expanded output tree.
    pub max_output_nodes: usize,
    /// Maximum container items and array elements allocated by calls,
    /// counted over the whole parse whether or not the result is kept.
    pub max_allocated_items: usize,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            element_threshold: DEFAULT_ELEMENT_THRESHOLD,
            sample_size: DEFAULT_SAMPLE_SIZE,
            max_opcodes: DEFAULT_MAX_OPCODES,
            max_stack_depth: DEFAULT_MAX_STACK_DEPTH,
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            max_output_nodes: DEFAULT_MAX_OUTPUT_NODES,
            max_allocated_items: DEFAULT_MAX_ALLOCATED_ITEMS,
        }
    }
}

impl ParseConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the array summarization threshold.
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

    /// Sets the opcode ceiling.
    #[must_use]
    pub fn with_max_opcodes(mut self, max: u64) -> Self {
        self.max_opcodes = max;
        self
    }

    /// Sets the stack depth ceiling.
    #[must_use]
    pub fn with_max_stack_depth(mut self, max: usize) -> Self {
        self.max_stack_depth = max;
        self
    }

    /// Sets the input size ceiling.
    #[must_use]
    pub fn with_max_input_bytes(mut self, max: usize) -> Self {
        self.max_input_bytes = max;
        self
    }

    /// Sets the nesting depth ceiling.
    #[must_use]
    pub fn with_max_nesting_depth(mut self, max: usize) -> Self {
        self.max_nesting_depth = max;
        self
    }

    /// Sets the output size ceiling.
    #[must_use]
    pub fn with_max_output_nodes(mut self, max: usize) -> Self {
        self.max_output_nodes = max;
        self
    }

    /// Sets the call allocation ceiling.
    #[must_use]
    pub fn with_max_allocated_items(mut self, max: usize) -> Self {
        self.max_allocated_items = max;
        self
    }

    /// Output-tree weight of an array with the given shape.
    ///
    /// A summarized array costs one node plus its sample. A materialized one
    /// costs its elements plus one sequence per index prefix, so a shape like
    /// `(n, 0)` is charged for its `n` empty rows.
    #[must_use]
    pub fn array_weight(&self, shape: &[usize]) -> usize {
        let len = if shape.contains(&0) {
            0
        } else {
            shape.iter().try_fold(1usize, |acc, &dim| acc.checked_mul(dim)).unwrap_or(usize::MAX)
        };
        if len > self.element_threshold {
            return len.min(self.sample_size).saturating_add(1);
        }
        let mut sequences = 0usize;
        let mut prefix = 1usize;
        for &dim in shape {
            sequences = sequences.saturating_add(prefix);
            prefix = prefix.saturating_mul(dim);
            if prefix == 0 {
                break;
            }
        }
        sequences.saturating_add(len).max(1)
    }
}
