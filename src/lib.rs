//! Picklejar - Untrusted pickle streams as JSON-safe trees
//!
//! This crate re-exports all layers of the picklejar system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 3: picklejar_runtime     parse_bytes pipeline, envelope, CLI
//! Layer 2: picklejar_normalize   Graph to JSON-safe tree, array summaries
//! Layer 1: picklejar_machine     Opcode reader, allow-list gate, stack machine
//! Layer 0: picklejar_foundation  Core types (Value, NumericArray, Error, ParseConfig)
//! ```

pub use picklejar_foundation as foundation;
pub use picklejar_machine as machine;
pub use picklejar_normalize as normalize;
pub use picklejar_runtime as runtime;

pub use picklejar_foundation::{Error, ErrorKind, ParseConfig, Value};
pub use picklejar_machine::CancelToken;
pub use picklejar_runtime::{Outcome, parse_bytes};
