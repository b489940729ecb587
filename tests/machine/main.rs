//! Integration tests for Layer 1: Machine
//!
//! Tests the interpreter against streams written by CPython's pickle module,
//! the allow-list table, and the disassembler.

mod disasm;
mod fixtures;
mod gate;
