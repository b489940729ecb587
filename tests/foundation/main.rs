//! Integration tests for Layer 0: Foundation
//!
//! Tests for core types: Value, NumericArray, Error, and persistent collections.

mod arrays;
mod errors;
mod values;
