//! Allow-list table tests
//!
//! The table is the complete set of resolvable names; these tests pin it.

use picklejar_machine::gate::allow_list;
use picklejar_machine::{CallShape, permit, permitted_call_shape};

#[test]
fn table_is_exactly_the_documented_set() {
    let mut names: Vec<String> = allow_list()
        .entries()
        .map(|e| format!("{}.{}", e.namespace, e.symbol))
        .collect();
    names.sort();
    let mut expected = vec![
        "_codecs.encode",
        "collections.OrderedDict",
        "numpy._core.multiarray._reconstruct",
        "numpy._core.multiarray.scalar",
        "numpy._core.numeric._frombuffer",
        "numpy.core.multiarray._reconstruct",
        "numpy.core.multiarray.scalar",
        "numpy.core.numeric._frombuffer",
        "numpy.dtype",
        "numpy.ndarray",
    ];
    for module in ["builtins", "__builtin__"] {
        for symbol in ["set", "frozenset", "list", "tuple", "dict", "bytearray"] {
            expected.push(Box::leak(format!("{module}.{symbol}").into_boxed_str()));
        }
    }
    expected.sort_unstable();
    assert_eq!(names, expected);
}

#[test]
fn entries_are_unique() {
    let entries: Vec<_> = allow_list().entries().collect();
    for (i, a) in entries.iter().enumerate() {
        for b in &entries[i + 1..] {
            assert!(
                a.namespace != b.namespace || a.symbol != b.symbol,
                "duplicate entry {}.{}",
                a.namespace,
                a.symbol
            );
        }
    }
}

#[test]
fn well_known_gadgets_are_denied() {
    let gadgets = [
        ("os", "system"),
        ("posix", "system"),
        ("nt", "system"),
        ("subprocess", "Popen"),
        ("subprocess", "check_output"),
        ("builtins", "eval"),
        ("builtins", "exec"),
        ("builtins", "getattr"),
        ("builtins", "__import__"),
        ("builtins", "open"),
        ("__builtin__", "eval"),
        ("pickle", "loads"),
        ("numpy", "load"),
        ("numpy.testing._private.utils", "runstring"),
        ("torch", "load"),
    ];
    for (namespace, symbol) in gadgets {
        assert!(!permit(namespace, symbol), "{namespace}.{symbol} must be denied");
    }
}

#[test]
fn shapes_for_permitted_names() {
    assert_eq!(permitted_call_shape("collections", "OrderedDict"), Some(CallShape::OrderedDict));
    assert_eq!(permitted_call_shape("numpy", "dtype"), Some(CallShape::Dtype));
    assert_eq!(permitted_call_shape("numpy._core.numeric", "_frombuffer"), Some(CallShape::ArrayFromBuffer));
    assert_eq!(permitted_call_shape("numpy.core.multiarray", "scalar"), Some(CallShape::NumericScalar));
    assert_eq!(permitted_call_shape("_codecs", "encode"), Some(CallShape::CodecsEncode));
}
