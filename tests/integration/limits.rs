//! Resource ceilings enforced end to end

use picklejar::machine::opcode::Opcode;
use picklejar::machine::assemble;
use picklejar::{CancelToken, ParseConfig, parse_bytes};

fn limit_of(data: &[u8], config: &ParseConfig) -> Option<&'static str> {
    let outcome = parse_bytes(data, config, &CancelToken::new());
    let report = outcome.error()?;
    assert_eq!(report.kind, "ResourceLimitExceeded");
    report.limit
}

/// Each level is a list holding the previous level twice.
fn doubling(levels: usize) -> Vec<u8> {
    let mut ops = vec![Opcode::Proto(2), Opcode::EmptyList, Opcode::BinPut(0)];
    for level in 0..levels {
        let prev = u8::try_from(level % 256).unwrap_or(0);
        let next = u8::try_from((level + 1) % 256).unwrap_or(0);
        ops.extend([
            Opcode::Pop,
            Opcode::BinGet(prev),
            Opcode::BinGet(prev),
            Opcode::Tuple2,
            Opcode::BinPut(next),
        ]);
    }
    ops.push(Opcode::Stop);
    assemble(&ops)
}

#[test]
fn exponential_sharing_hits_output_nodes() {
    let data = doubling(64);
    assert_eq!(limit_of(&data, &ParseConfig::default()), Some("max_output_nodes"));
}

#[test]
fn modest_sharing_is_fine() {
    let data = doubling(5);
    let outcome = parse_bytes(&data, &ParseConfig::default(), &CancelToken::new());
    assert!(outcome.is_ok(), "{}", outcome.to_json());
}

#[test]
fn nesting_limit() {
    let mut ops = vec![Opcode::Proto(2)];
    ops.extend(std::iter::repeat_n(Opcode::Mark, 40));
    ops.extend(std::iter::repeat_n(Opcode::List, 40));
    ops.push(Opcode::Stop);
    let data = assemble(&ops);
    assert_eq!(limit_of(&data, &ParseConfig::new().with_max_nesting_depth(10)), Some("max_nesting_depth"));
    assert!(parse_bytes(&data, &ParseConfig::default(), &CancelToken::new()).is_ok());
}

#[test]
fn stack_limit() {
    let mut ops = vec![Opcode::Proto(2)];
    ops.extend(std::iter::repeat_n(Opcode::None, 100));
    ops.push(Opcode::Stop);
    let data = assemble(&ops);
    assert_eq!(limit_of(&data, &ParseConfig::new().with_max_stack_depth(50)), Some("max_stack_depth"));
}

#[test]
fn input_limit() {
    let data = assemble(&[Opcode::Proto(2), Opcode::None, Opcode::Stop]);
    assert_eq!(limit_of(&data, &ParseConfig::new().with_max_input_bytes(2)), Some("max_input_bytes"));
}

#[test]
fn cancellation_is_reported() {
    let cancel = CancelToken::new();
    cancel.cancel();
    let data = assemble(&[Opcode::Proto(2), Opcode::None, Opcode::Stop]);
    let outcome = parse_bytes(&data, &ParseConfig::default(), &cancel);
    assert_eq!(outcome.error().map(|r| r.kind), Some("Cancelled"));
}
