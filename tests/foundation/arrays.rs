//! Integration tests for NumericArray and Dtype
//!
//! Tests descriptor parsing, element decoding, and shape validation.

use picklejar_foundation::{ByteOrder, Dtype, DtypeKind, Element, ErrorKind, NumericArray};

fn i4_bytes(values: &[i32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

// =============================================================================
// Dtype Descriptors
// =============================================================================

#[test]
fn dtype_from_descr_common_types() {
    let cases = [
        ("<f8", DtypeKind::Float, 8, "float64"),
        ("<f4", DtypeKind::Float, 4, "float32"),
        ("<f2", DtypeKind::Float, 2, "float16"),
        ("<i8", DtypeKind::Int, 8, "int64"),
        (">i2", DtypeKind::Int, 2, "int16"),
        ("|u1", DtypeKind::UInt, 1, "uint8"),
        ("|b1", DtypeKind::Bool, 1, "bool"),
        ("?", DtypeKind::Bool, 1, "bool"),
    ];
    for (descr, kind, itemsize, name) in cases {
        let dtype = Dtype::from_descr(descr).unwrap_or_else(|| panic!("{descr} should parse"));
        assert_eq!(dtype.kind(), kind, "{descr}");
        assert_eq!(dtype.itemsize(), itemsize, "{descr}");
        assert_eq!(dtype.name(), name, "{descr}");
    }
}

#[test]
fn dtype_rejects_non_numeric() {
    for descr in ["<U4", "O", "<c16", "<M8", "<f3", "<i16", ""] {
        assert!(Dtype::from_descr(descr).is_none(), "{descr} should be rejected");
    }
}

#[test]
fn single_byte_dtypes_have_no_byte_order() {
    let dtype = Dtype::from_descr("<u1").unwrap();
    assert_eq!(dtype.byte_order(), ByteOrder::NotApplicable);
    assert_eq!(dtype.with_byte_order(ByteOrder::Big).byte_order(), ByteOrder::NotApplicable);
}

#[test]
fn decode_scalar_respects_byte_order() {
    let little = Dtype::from_descr("<i2").unwrap();
    let big = Dtype::from_descr(">i2").unwrap();
    assert_eq!(little.decode_scalar(&[0x01, 0x00]).unwrap(), Element::Int(1));
    assert_eq!(big.decode_scalar(&[0x01, 0x00]).unwrap(), Element::Int(256));
    assert_eq!(little.decode_scalar(&[0xff, 0xff]).unwrap(), Element::Int(-1));
}

#[test]
fn decode_scalar_wrong_length_fails() {
    let dtype = Dtype::from_descr("<f8").unwrap();
    assert!(dtype.decode_scalar(&[0; 4]).is_err());
}

#[test]
fn float16_decodes_through_half() {
    let dtype = Dtype::from_descr("<f2").unwrap();
    // 0x3c00 is 1.0 in IEEE half precision.
    assert_eq!(dtype.decode_scalar(&[0x00, 0x3c]).unwrap(), Element::Float(1.0));
}

// =============================================================================
// Array Construction
// =============================================================================

#[test]
fn from_raw_row_major() {
    let dtype = Dtype::from_descr("<i4").unwrap();
    let array = NumericArray::from_raw(dtype, vec![2, 3], &i4_bytes(&[1, 2, 3, 4, 5, 6]), false).unwrap();
    assert_eq!(array.shape(), &[2, 3]);
    assert_eq!(array.len(), 6);
    let elements: Vec<_> = array.buffer().iter().collect();
    assert_eq!(elements[3], Element::Int(4));
}

#[test]
fn from_raw_fortran_is_reordered() {
    let dtype = Dtype::from_descr("<i4").unwrap();
    let c_order = NumericArray::from_raw(dtype, vec![2, 3], &i4_bytes(&[1, 2, 3, 4, 5, 6]), false).unwrap();
    let f_order = NumericArray::from_raw(dtype, vec![2, 3], &i4_bytes(&[1, 4, 2, 5, 3, 6]), true).unwrap();
    assert_eq!(c_order, f_order);
}

#[test]
fn from_raw_three_dimensional_fortran() {
    let dtype = Dtype::from_descr("<i4").unwrap();
    // Element (i, j, k) = 100i + 10j + k, shape (2, 2, 2).
    let c: Vec<i32> = (0..2)
        .flat_map(|i| (0..2).flat_map(move |j| (0..2).map(move |k| 100 * i + 10 * j + k)))
        .collect();
    let f: Vec<i32> = (0..2)
        .flat_map(|k| (0..2).flat_map(move |j| (0..2).map(move |i| 100 * i + 10 * j + k)))
        .collect();
    let from_c = NumericArray::from_raw(dtype, vec![2, 2, 2], &i4_bytes(&c), false).unwrap();
    let from_f = NumericArray::from_raw(dtype, vec![2, 2, 2], &i4_bytes(&f), true).unwrap();
    assert_eq!(from_c, from_f);
}

#[test]
fn zero_dimensional_array_has_one_element() {
    let dtype = Dtype::from_descr("<f8").unwrap();
    let array = NumericArray::from_raw(dtype, vec![], &2.5f64.to_le_bytes(), false).unwrap();
    assert_eq!(array.len(), 1);
    assert_eq!(array.buffer().get(0), Some(Element::Float(2.5)));
}

#[test]
fn empty_axis_gives_empty_array() {
    let dtype = Dtype::from_descr("<f8").unwrap();
    let array = NumericArray::from_raw(dtype, vec![3, 0], &[], false).unwrap();
    assert!(array.is_empty());
}

#[test]
fn shape_mismatch_reports_sizes() {
    let dtype = Dtype::from_descr("<f8").unwrap();
    let err = NumericArray::from_raw(dtype, vec![3], &[0; 16], false).unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::ShapeMismatch {
            shape: vec![3],
            expected_bytes: Some(24),
            actual_bytes: 16,
        }
    );
}

#[test]
fn overflowing_shape_is_rejected_before_allocation() {
    let dtype = Dtype::from_descr("<f8").unwrap();
    let err = NumericArray::from_raw(dtype, vec![usize::MAX, usize::MAX], &[0; 8], false).unwrap_err();
    match err.kind {
        ErrorKind::ShapeMismatch { expected_bytes, actual_bytes, .. } => {
            assert_eq!(expected_bytes, None);
            assert_eq!(actual_bytes, 8);
        }
        other => panic!("expected ShapeMismatch, got {other:?}"),
    }
}

#[test]
fn nan_arrays_equal_themselves() {
    let dtype = Dtype::from_descr("<f8").unwrap();
    let raw: Vec<u8> = [f64::NAN, 1.0].iter().flat_map(|v| v.to_le_bytes()).collect();
    let a = NumericArray::from_raw(dtype, vec![2], &raw, false).unwrap();
    let b = NumericArray::from_raw(dtype, vec![2], &raw, false).unwrap();
    assert_eq!(a, b);
}
