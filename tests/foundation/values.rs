//! Integration tests for Value
//!
//! Tests construction, accessors, equality, and hashing of graph values.

use std::collections::HashSet;

use num_bigint::BigInt;
use picklejar_foundation::{Dtype, GlobalRef, NumericArray, PjVec, Value};

// =============================================================================
// Construction
// =============================================================================

#[test]
fn from_conversions() {
    assert_eq!(Value::from(true), Value::Bool(true));
    assert_eq!(Value::from(7i32), Value::Int(7));
    assert_eq!(Value::from(7i64), Value::Int(7));
    assert_eq!(Value::from(0.5), Value::Float(0.5));
    assert_eq!(Value::from("s").as_str(), Some("s"));
    assert_eq!(Value::from(String::from("s")).as_str(), Some("s"));
    assert_eq!(Value::from(&b"ab"[..]).as_bytes(), Some(&b"ab"[..]));
    assert_eq!(Value::from(vec![1i64, 2]).as_seq().map(PjVec::len), Some(2));
}

#[test]
fn bigint_narrows_when_it_fits() {
    assert_eq!(Value::from_bigint(BigInt::from(42)), Value::Int(42));
    assert_eq!(Value::from_bigint(BigInt::from(i64::MIN)), Value::Int(i64::MIN));
    let huge = BigInt::from(i64::MAX) + 1;
    assert!(matches!(Value::from_bigint(huge), Value::BigInt(_)));
}

#[test]
fn type_names() {
    assert_eq!(Value::None.type_name(), "none");
    assert_eq!(Value::from_bigint(BigInt::from(u64::MAX)).type_name(), "int");
    assert_eq!(Value::Tuple(PjVec::new()).type_name(), "tuple");
    assert_eq!(Value::Global(GlobalRef::new("numpy", "ndarray")).type_name(), "global");
}

// =============================================================================
// Accessors
// =============================================================================

#[test]
fn accessors_reject_other_variants() {
    assert_eq!(Value::Int(1).as_str(), None);
    assert_eq!(Value::from("1").as_int(), None);
    assert_eq!(Value::None.as_bool(), None);
    assert!(Value::Int(1).as_dict().is_none());
    assert!(Value::Int(1).as_array().is_none());
}

#[test]
fn tuple_and_list_both_expose_items() {
    let items: PjVec<Value> = [Value::Int(1)].into_iter().collect();
    assert!(Value::List(items.clone()).as_seq().is_some());
    assert!(Value::Tuple(items).as_seq().is_some());
}

#[test]
fn array_accessor() {
    let dtype = Dtype::from_descr("<i8").unwrap();
    let array = NumericArray::from_raw(dtype, vec![1], &5i64.to_le_bytes(), false).unwrap();
    let value = Value::from(array);
    assert_eq!(value.as_array().map(NumericArray::len), Some(1));
    assert_eq!(value.type_name(), "ndarray");
}

// =============================================================================
// Equality and Hashing
// =============================================================================

#[test]
fn list_and_tuple_are_distinct() {
    let items: PjVec<Value> = [Value::Int(1)].into_iter().collect();
    assert_ne!(Value::List(items.clone()), Value::Tuple(items));
}

#[test]
fn nan_equals_itself_bitwise() {
    assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
    assert_ne!(Value::Float(0.0), Value::Float(-0.0));
}

#[test]
fn values_hash_as_set_members() {
    let mut seen = HashSet::new();
    seen.insert(Value::from("a"));
    seen.insert(Value::Tuple([Value::Int(1), Value::None].into_iter().collect()));
    seen.insert(Value::from("a"));
    assert_eq!(seen.len(), 2);
}

#[test]
fn global_ref_display() {
    let global = GlobalRef::new("collections", "OrderedDict");
    assert_eq!(global.to_string(), "collections.OrderedDict");
}
