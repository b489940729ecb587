//! Property tests over the whole pipeline

use picklejar::{CancelToken, ParseConfig, parse_bytes};
use proptest::prelude::*;

const SAMPLE_P2: &[u8] = include_bytes!("../fixtures/sample_p2.pkl");
const ARRAY_F8_P2: &[u8] = include_bytes!("../fixtures/array_f8_p2.pkl");

fn small_limits() -> ParseConfig {
    ParseConfig::new()
        .with_max_opcodes(10_000)
        .with_max_stack_depth(1_000)
        .with_max_nesting_depth(64)
        .with_max_output_nodes(100_000)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn arbitrary_bytes_always_give_an_envelope(data in prop::collection::vec(any::<u8>(), 0..512)) {
        let outcome = parse_bytes(&data, &small_limits(), &CancelToken::new());
        let doc: serde_json::Value = serde_json::from_str(&outcome.to_json()).unwrap();
        prop_assert_eq!(doc["ok"].as_bool(), Some(outcome.is_ok()));
    }

    #[test]
    fn mutated_fixtures_never_panic(index in 0usize..SAMPLE_P2.len(), byte in any::<u8>()) {
        let mut data = SAMPLE_P2.to_vec();
        data[index] = byte;
        let _ = parse_bytes(&data, &small_limits(), &CancelToken::new());
    }

    #[test]
    fn mutated_arrays_never_panic(index in 0usize..ARRAY_F8_P2.len(), byte in any::<u8>()) {
        let mut data = ARRAY_F8_P2.to_vec();
        data[index] = byte;
        let _ = parse_bytes(&data, &small_limits(), &CancelToken::new());
    }

    #[test]
    fn every_prefix_of_a_fixture_fails_cleanly(len in 0usize..SAMPLE_P2.len()) {
        let outcome = parse_bytes(&SAMPLE_P2[..len], &small_limits(), &CancelToken::new());
        prop_assert!(!outcome.is_ok());
    }

    #[test]
    fn results_do_not_depend_on_the_threshold_for_plain_data(threshold in 0usize..100) {
        let config = ParseConfig::new().with_element_threshold(threshold);
        let outcome = parse_bytes(SAMPLE_P2, &config, &CancelToken::new());
        let baseline = parse_bytes(SAMPLE_P2, &ParseConfig::default(), &CancelToken::new());
        prop_assert_eq!(outcome, baseline);
    }
}
