//! Interpreter tests over CPython-generated fixtures
//!
//! The fixtures are produced by `tests/fixtures/generate.py`.

use picklejar_foundation::{Dtype, Element, ErrorKind, NumericArray, ParseConfig, Value};
use picklejar_machine::{Vm, interpret};

const SAMPLE_P0: &[u8] = include_bytes!("../fixtures/sample_p0.pkl");
const SAMPLE_P2: &[u8] = include_bytes!("../fixtures/sample_p2.pkl");
const SAMPLE_P4: &[u8] = include_bytes!("../fixtures/sample_p4.pkl");
const SAMPLE_P5: &[u8] = include_bytes!("../fixtures/sample_p5.pkl");
const MIXED_P2: &[u8] = include_bytes!("../fixtures/mixed_p2.pkl");
const MIXED_P4: &[u8] = include_bytes!("../fixtures/mixed_p4.pkl");
const MIXED_P5: &[u8] = include_bytes!("../fixtures/mixed_p5.pkl");
const SHARED_P2: &[u8] = include_bytes!("../fixtures/shared_p2.pkl");
const RECURSIVE_P2: &[u8] = include_bytes!("../fixtures/recursive_p2.pkl");
const EXPLOIT_P0: &[u8] = include_bytes!("../fixtures/exploit_p0.pkl");
const EXPLOIT_P2: &[u8] = include_bytes!("../fixtures/exploit_p2.pkl");
const ARRAY_F8_P2: &[u8] = include_bytes!("../fixtures/array_f8_p2.pkl");
const ARRAY_F8_P5: &[u8] = include_bytes!("../fixtures/array_f8_p5.pkl");
const ARRAY_F8_FORTRAN_P2: &[u8] = include_bytes!("../fixtures/array_f8_fortran_p2.pkl");
const ARRAY_U1_LARGE_P4: &[u8] = include_bytes!("../fixtures/array_u1_large_p4.pkl");
const SCALAR_I8_P2: &[u8] = include_bytes!("../fixtures/scalar_i8_p2.pkl");

fn run(data: &[u8]) -> Value {
    interpret(data, &ParseConfig::default()).unwrap_or_else(|e| panic!("fixture failed: {e}"))
}

fn get<'v>(value: &'v Value, key: &str) -> &'v Value {
    value
        .as_dict()
        .and_then(|d| d.get(&Value::from(key)))
        .unwrap_or_else(|| panic!("missing key {key}"))
}

fn array(value: &Value) -> &NumericArray {
    value.as_array().expect("expected an array")
}

// =============================================================================
// Plain Objects
// =============================================================================

#[test]
fn sample_dict_contents() {
    let value = run(SAMPLE_P2);
    assert_eq!(get(&value, "name").as_str(), Some("示例数据"));
    assert_eq!(get(&value, "version").as_float(), Some(1.0));
    let details = get(&value, "details");
    assert_eq!(get(details, "value").as_float(), Some(123.45));
    assert_eq!(get(details, "status").as_bool(), Some(true));
    let items: Vec<_> = get(details, "items").as_seq().unwrap().iter().filter_map(Value::as_str).collect();
    assert_eq!(items, vec!["item1", "item2", "item3"]);
    let numbers: Vec<_> = get(&value, "list_of_numbers").as_seq().unwrap().iter().filter_map(Value::as_int).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
}

#[test]
fn all_protocols_agree() {
    let expected = run(SAMPLE_P2);
    for data in [SAMPLE_P0, SAMPLE_P4, SAMPLE_P5] {
        assert_eq!(run(data), expected);
    }
}

#[test]
fn sample_keys_keep_insertion_order() {
    let value = run(SAMPLE_P0);
    let keys: Vec<_> = value.as_dict().unwrap().keys().filter_map(Value::as_str).collect();
    assert_eq!(keys, vec!["name", "version", "details", "list_of_numbers"]);
}

#[test]
fn mixed_value_types() {
    let value = run(MIXED_P2);
    assert_eq!(get(&value, "b").as_bytes(), Some(&b"\x01\x02"[..]));
    assert!(matches!(get(&value, "big"), Value::BigInt(n) if n.to_string() == "1267650600228229401496703205376"));
    assert!(matches!(get(&value, "neg"), Value::BigInt(n) if n.to_string() == "-1180591620717411303424"));
    assert!(matches!(get(&value, "t"), Value::Tuple(items) if items.len() == 2));
    assert!(matches!(get(&value, "fs"), Value::Set(members) if members.is_empty()));

    let dict = value.as_dict().unwrap();
    let tuple_key = Value::Tuple([Value::Int(1), Value::from("k")].into_iter().collect());
    assert_eq!(dict.get(&tuple_key).and_then(Value::as_str), Some("tuple key"));
    assert_eq!(dict.get(&Value::Int(3)).and_then(Value::as_str), Some("int key"));
}

#[test]
fn mixed_protocols_agree() {
    let expected = run(MIXED_P2);
    assert_eq!(run(MIXED_P4), expected);
    assert_eq!(run(MIXED_P5), expected);
}

#[test]
fn memo_sharing_is_preserved() {
    let value = run(SHARED_P2);
    assert_eq!(get(&value, "first"), get(&value, "second"));
    assert_eq!(get(&value, "first").as_seq().map(|s| s.len()), Some(2));
}

#[test]
fn self_reference_is_malformed() {
    let err = interpret(RECURSIVE_P2, &ParseConfig::default()).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::MalformedStream(ref m) if m.contains("cycle")));
}

// =============================================================================
// Blocked References
// =============================================================================

#[test]
fn os_system_is_blocked_at_protocol_2() {
    let err = interpret(EXPLOIT_P2, &ParseConfig::default()).unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::BlockedSymbol {
            namespace: "posix".to_string(),
            symbol: "system".to_string(),
        }
    );
    assert_eq!(err.offset(), Some(2));
}

#[test]
fn os_system_is_blocked_at_protocol_0() {
    let err = interpret(EXPLOIT_P0, &ParseConfig::default()).unwrap_err();
    assert_eq!(err.kind.name(), "BlockedSymbol");
    assert_eq!(err.offset(), Some(0));
}

// =============================================================================
// Arrays
// =============================================================================

#[test]
fn reconstructed_matrix() {
    let value = run(ARRAY_F8_P2);
    let matrix = array(&value);
    assert_eq!(matrix.dtype(), Dtype::from_descr("<f8").unwrap());
    assert_eq!(matrix.shape(), &[2, 3]);
    let elements: Vec<_> = matrix.buffer().iter().collect();
    assert_eq!(elements[0], Element::Float(1.0));
    assert!(matches!(elements[1], Element::Float(f) if f.is_nan()));
    assert_eq!(elements[3], Element::Float(f64::INFINITY));
    assert_eq!(elements[5], Element::Float(0.5));
}

#[test]
fn frombuffer_matches_reconstruct() {
    assert_eq!(array(&run(ARRAY_F8_P5)), array(&run(ARRAY_F8_P2)));
}

#[test]
fn fortran_matrix_is_reordered() {
    assert_eq!(array(&run(ARRAY_F8_FORTRAN_P2)), array(&run(ARRAY_F8_P2)));
}

#[test]
fn large_uint8_vector() {
    let value = run(ARRAY_U1_LARGE_P4);
    let vector = array(&value);
    assert_eq!(vector.dtype().name(), "uint8");
    assert_eq!(vector.shape(), &[20_001]);
    assert_eq!(vector.buffer().get(251), Some(Element::UInt(0)));
    assert_eq!(vector.buffer().get(250), Some(Element::UInt(250)));
}

#[test]
fn numeric_scalar() {
    assert_eq!(run(SCALAR_I8_P2), Value::Int(7));
}

// =============================================================================
// Limits and Reuse
// =============================================================================

#[test]
fn opcode_limit_on_a_real_stream() {
    let err = interpret(SAMPLE_P2, &ParseConfig::new().with_max_opcodes(10)).unwrap_err();
    match err.kind {
        ErrorKind::ResourceLimitExceeded(limit) => assert_eq!(limit.key(), "max_opcodes"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn input_limit_is_checked_first() {
    let err = interpret(ARRAY_U1_LARGE_P4, &ParseConfig::new().with_max_input_bytes(1024)).unwrap_err();
    assert_eq!(err.kind.name(), "ResourceLimitExceeded");
}

#[test]
fn one_vm_runs_many_streams() {
    let mut vm = Vm::new(ParseConfig::default());
    let first = vm.run(SAMPLE_P2).unwrap();
    assert!(vm.run(EXPLOIT_P2).is_err());
    let second = vm.run(SAMPLE_P2).unwrap();
    assert_eq!(first, second);
    assert_eq!(vm.protocol(), 2);
}
