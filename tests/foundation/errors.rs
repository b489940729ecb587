//! Integration tests for Error types
//!
//! Tests error construction, display, context, and stable kind names.

use picklejar_foundation::{Error, ErrorContext, ErrorKind, ResourceLimit};

// =============================================================================
// Error Construction
// =============================================================================

#[test]
fn error_truncated() {
    let err = Error::truncated(8, 3);
    assert!(matches!(err.kind, ErrorKind::TruncatedInput { needed: 8, available: 3 }));
    let msg = format!("{err}");
    assert!(msg.contains('8'));
    assert!(msg.contains('3'));
}

#[test]
fn error_unsupported_opcode() {
    let err = Error::unsupported_opcode(0x50, Some("PERSID"));
    assert!(matches!(err.kind, ErrorKind::UnsupportedOpcode { byte: 0x50, .. }));
    assert!(format!("{err}").contains("0x50"));
    assert!(format!("{err}").contains("PERSID"));

    let unknown = Error::unsupported_opcode(0xff, None);
    assert!(!format!("{unknown}").contains('('));
}

#[test]
fn error_blocked_symbol() {
    let err = Error::blocked_symbol("os", "system");
    assert_eq!(
        err.kind,
        ErrorKind::BlockedSymbol {
            namespace: "os".to_string(),
            symbol: "system".to_string(),
        }
    );
    assert!(format!("{err}").contains("os.system"));
}

#[test]
fn error_invalid_backreference() {
    let err = Error::invalid_backreference(42);
    assert!(matches!(err.kind, ErrorKind::InvalidBackreference(42)));
    assert!(format!("{err}").contains("42"));
}

#[test]
fn error_limit_exceeded() {
    let err = Error::limit_exceeded(ResourceLimit::MaxStackDepth { limit: 16 });
    assert!(format!("{err}").contains("16"));
    match &err.kind {
        ErrorKind::ResourceLimitExceeded(limit) => assert_eq!(limit.key(), "max_stack_depth"),
        other => panic!("unexpected kind {other:?}"),
    }
}

#[test]
fn error_shape_mismatch_overflow_display() {
    let err = Error::shape_mismatch(vec![usize::MAX, 2], None, 8);
    assert!(format!("{err}").contains("more than"));
}

// =============================================================================
// Kind Names
// =============================================================================

#[test]
fn kind_names_are_stable() {
    let cases = [
        (Error::truncated(1, 0), "TruncatedInput"),
        (Error::unsupported_opcode(0x50, None), "UnsupportedOpcode"),
        (Error::blocked_symbol("a", "b"), "BlockedSymbol"),
        (Error::invalid_backreference(0), "InvalidBackreference"),
        (Error::malformed("x"), "MalformedStream"),
        (Error::unsupported_build("x"), "UnsupportedBuild"),
        (Error::limit_exceeded(ResourceLimit::MaxOpcodes { limit: 1 }), "ResourceLimitExceeded"),
        (Error::shape_mismatch(vec![1], Some(8), 0), "ShapeMismatch"),
        (Error::cancelled(), "Cancelled"),
    ];
    for (err, name) in cases {
        assert_eq!(err.kind.name(), name);
    }
}

#[test]
fn limit_keys_match_config_fields() {
    let cases = [
        (ResourceLimit::MaxInputBytes { limit: 1, actual: 2 }, "max_input_bytes"),
        (ResourceLimit::MaxOpcodes { limit: 1 }, "max_opcodes"),
        (ResourceLimit::MaxStackDepth { limit: 1 }, "max_stack_depth"),
        (ResourceLimit::MaxNestingDepth { limit: 1 }, "max_nesting_depth"),
        (ResourceLimit::MaxOutputNodes { limit: 1 }, "max_output_nodes"),
        (ResourceLimit::MaxAllocatedItems { limit: 1 }, "max_allocated_items"),
    ];
    for (limit, key) in cases {
        assert_eq!(limit.key(), key);
    }
}

// =============================================================================
// Error Context
// =============================================================================

#[test]
fn error_without_context_has_no_offset() {
    assert_eq!(Error::malformed("bad").offset(), None);
}

#[test]
fn error_with_context() {
    let err = Error::malformed("mark not found")
        .with_context(ErrorContext::new().with_offset(17).with_opcode("APPENDS"));
    assert_eq!(err.offset(), Some(17));
    let context = err.context.as_ref().unwrap();
    assert_eq!(context.opcode, Some("APPENDS"));
}

#[test]
fn error_is_std_error() {
    fn takes_error(_: &dyn std::error::Error) {}
    takes_error(&Error::cancelled());
}
