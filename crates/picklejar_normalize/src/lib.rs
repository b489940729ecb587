//! JSON-safe normalization for picklejar object graphs.
//!
//! This crate provides:
//! - [`NormalizedValue`] - The output tree, serializable with `serde`
//! - [`normalize`] - Iterative conversion from a [`Value`](picklejar_foundation::Value)
//! - [`ArraySummary`] - The bounded stand-in for an oversized numeric array
//!
//! Normalization never fails: every value the interpreter produces is
//! already bounded in size and depth.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod keys;
pub mod normalize;
pub mod summary;
pub mod value;

pub use keys::key_string;
pub use normalize::{NormalizeOptions, normalize};
pub use summary::ArraySummary;
pub use value::NormalizedValue;
