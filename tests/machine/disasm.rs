//! Disassembler tests over CPython-generated fixtures

use picklejar_machine::{disassemble, disassemble_to_string};

const SAMPLE_P2: &[u8] = include_bytes!("../fixtures/sample_p2.pkl");
const EXPLOIT_P0: &[u8] = include_bytes!("../fixtures/exploit_p0.pkl");
const ARRAY_F8_P5: &[u8] = include_bytes!("../fixtures/array_f8_p5.pkl");

#[test]
fn listing_names_every_instruction() {
    let listing = disassemble_to_string(SAMPLE_P2);
    let first = listing.lines().next().unwrap();
    assert!(first.contains("PROTO"));
    assert!(first.trim_start().starts_with("0:"));
    assert!(listing.lines().last().unwrap().contains("STOP"));
    assert!(listing.contains("SETITEMS"));
}

#[test]
fn blocked_globals_are_listed_not_resolved() {
    let listing = disassemble_to_string(EXPLOIT_P0);
    assert!(listing.contains("GLOBAL"));
    assert!(listing.contains("posix system"));
    assert!(listing.contains("REDUCE"));
    assert!(!listing.contains("error"));
}

#[test]
fn long_operands_are_elided() {
    let listing = disassemble_to_string(ARRAY_F8_P5);
    assert!(listing.contains("BYTEARRAY8"));
    assert!(listing.contains("FRAME"));
    assert!(listing.contains("STACK_GLOBAL"));
}

#[test]
fn truncated_stream_ends_with_error_line() {
    let listing = disassemble_to_string(&SAMPLE_P2[..SAMPLE_P2.len() / 2]);
    assert!(listing.lines().last().unwrap().starts_with("error at byte"));
}

#[test]
fn writer_variant_reports_the_error() {
    let mut out = String::new();
    assert!(disassemble(SAMPLE_P2, &mut out).is_ok());
    let mut partial = String::new();
    assert!(disassemble(&SAMPLE_P2[..3], &mut partial).is_err());
    assert!(partial.contains("PROTO"));
}
