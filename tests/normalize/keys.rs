//! Dict key stringification

use picklejar_foundation::{PjVec, Value};
use picklejar_normalize::key_string;

fn tuple(items: Vec<Value>) -> Value {
    Value::Tuple(items.into_iter().collect::<PjVec<_>>())
}

#[test]
fn string_keys_pass_through() {
    assert_eq!(key_string(&Value::from("plain")), "plain");
    assert_eq!(key_string(&Value::from("")), "");
    assert_eq!(key_string(&Value::from("示例")), "示例");
}

#[test]
fn numeric_and_boolean_keys() {
    assert_eq!(key_string(&Value::Int(0)), "0");
    assert_eq!(key_string(&Value::Bool(false)), "false");
    assert_eq!(key_string(&Value::Float(2.5)), "2.5");
    assert_eq!(key_string(&Value::Float(f64::INFINITY)), "Infinity");
    assert_eq!(key_string(&Value::Float(1e16)), "1e+16");
    assert_eq!(key_string(&Value::Float(-3e-5)), "-3e-05");
}

#[test]
fn bigint_keys_are_decimal() {
    let big = Value::from_bigint("-99999999999999999999".parse().unwrap());
    assert_eq!(key_string(&big), "-99999999999999999999");
}

#[test]
fn composite_keys_use_python_repr() {
    let key = tuple(vec![Value::from("it's"), tuple(vec![]), Value::from(&b"\xff"[..])]);
    assert_eq!(key_string(&key), r"('it\'s', (), b'\xff')");
}

#[test]
fn deeply_nested_tuple_key() {
    let mut key = Value::Int(1);
    for _ in 0..200 {
        key = tuple(vec![key]);
    }
    let text = key_string(&key);
    assert!(text.starts_with("(((("));
    assert!(text.ends_with(",),)"));
}
