//! Opcode reader, allow-list gate, and interpreter for pickle streams.
//!
//! This crate provides:
//! - [`Opcode`] and [`OpcodeReader`] - Bounded decoding of the wire format
//! - [`gate`] - The fixed table of names a stream may resolve
//! - [`Vm`] - The stack machine that turns a stream into a [`Value`](picklejar_foundation::Value)
//! - [`disasm`] - An instruction listing for inspection
//! - [`CancelToken`] - Cooperative cancellation polled per opcode

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod cancel;
pub mod disasm;
pub mod gate;
mod literal;
pub mod opcode;
pub mod reader;
pub mod vm;


pub use cancel::CancelToken;
pub use disasm::{disassemble, disassemble_to_string};
pub use gate::{AllowListEntry, CallShape, permit, permitted_call_shape};
pub use opcode::{HIGHEST_PROTOCOL, Opcode, assemble, opcode_name};
pub use reader::{OpcodeReader, Positioned};
pub use vm::{Vm, interpret};
