//! Cross-layer integration tests for picklejar
//!
//! Tests that verify the full pipeline from bytes to transport envelope.

mod envelope;
mod limits;
mod properties;
