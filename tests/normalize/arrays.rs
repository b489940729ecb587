//! Array materialization and summaries over fixtures

use picklejar_foundation::ParseConfig;
use picklejar_machine::interpret;
use picklejar_normalize::{NormalizeOptions, NormalizedValue, normalize};

const ARRAY_F8_P2: &[u8] = include_bytes!("../fixtures/array_f8_p2.pkl");
const ARRAY_F8_FORTRAN_P2: &[u8] = include_bytes!("../fixtures/array_f8_fortran_p2.pkl");
const ARRAY_U1_LARGE_P4: &[u8] = include_bytes!("../fixtures/array_u1_large_p4.pkl");
const SCALAR_I8_P2: &[u8] = include_bytes!("../fixtures/scalar_i8_p2.pkl");

fn tree(data: &[u8], options: &NormalizeOptions) -> NormalizedValue {
    normalize(&interpret(data, &ParseConfig::default()).unwrap(), options)
}

fn json(value: &NormalizedValue) -> String {
    serde_json::to_string(value).unwrap()
}

#[test]
fn matrix_is_nested_with_nulls_for_non_finite() {
    let value = tree(ARRAY_F8_P2, &NormalizeOptions::default());
    assert_eq!(json(&value), "[[1.0,null,3.0],[null,-2.0,0.5]]");
}

#[test]
fn fortran_matrix_normalizes_identically() {
    let options = NormalizeOptions::default();
    assert_eq!(tree(ARRAY_F8_FORTRAN_P2, &options), tree(ARRAY_F8_P2, &options));
}

#[test]
fn matrix_summary_when_over_threshold() {
    let options = NormalizeOptions::new().with_element_threshold(5).with_sample_size(4);
    let value = tree(ARRAY_F8_P2, &options);
    assert_eq!(
        json(&value),
        r#"{"__ndarray__":true,"dtype":"float64","shape":[2,3],"min":-2.0,"max":3.0,"sample":[1.0,null,3.0,null]}"#
    );
}

#[test]
fn large_vector_is_summarized_by_default() {
    let value = tree(ARRAY_U1_LARGE_P4, &NormalizeOptions::default());
    let summary = value.as_summary().expect("20001 elements exceed the default threshold");
    assert_eq!(summary.dtype, "uint8");
    assert_eq!(summary.shape, vec![20_001]);
    assert_eq!(summary.min, NormalizedValue::UInt(0));
    assert_eq!(summary.max, NormalizedValue::UInt(250));
    assert_eq!(json(&NormalizedValue::Seq(summary.sample.clone())), "[0,1,2,3,4,5,6,7,8,9]");
}

#[test]
fn large_vector_in_full_with_higher_threshold() {
    let value = tree(ARRAY_U1_LARGE_P4, &NormalizeOptions::new().with_element_threshold(20_001));
    let items = value.as_seq().expect("materialized");
    assert_eq!(items.len(), 20_001);
    assert_eq!(items[20_000], NormalizedValue::UInt((20_000 % 251) as u64));
}

#[test]
fn numeric_scalar_is_a_plain_number() {
    assert_eq!(json(&tree(SCALAR_I8_P2, &NormalizeOptions::default())), "7");
}
