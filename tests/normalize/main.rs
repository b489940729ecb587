//! Integration tests for Layer 2: Normalize
//!
//! Tests the JSON-safe tree built from interpreted object graphs.

mod arrays;
mod keys;
mod trees;
