//! Object graph values, numeric arrays, errors, and limits for picklejar.
//!
//! This crate provides:
//! - [`Value`] - The object graph produced by interpreting a pickle stream
//! - [`NumericArray`] and [`Dtype`] - Reconstructed numpy arrays
//! - [`Error`] - Error kinds with byte-offset context
//! - [`ParseConfig`] - Output shaping and resource ceilings
//! - Persistent collections ([`PjVec`], [`PjMap`], [`PjSet`])

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod array;
pub mod collections;
pub mod config;
pub mod error;
pub mod value;

pub use array::{ArrayBuffer, ByteOrder, Dtype, DtypeKind, Element, NumericArray};
pub use collections::{PjMap, PjSet, PjVec};
pub use config::ParseConfig;
pub use error::{Error, ErrorContext, ErrorKind, ResourceLimit};
pub use value::{GlobalRef, Value};

/// Result type for picklejar operations.
pub type Result<T> = std::result::Result<T, Error>;
