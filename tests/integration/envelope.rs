//! Envelope output for CPython-generated fixtures

use picklejar::{CancelToken, ParseConfig, parse_bytes};

const SAMPLE_P4: &[u8] = include_bytes!("../fixtures/sample_p4.pkl");
const MIXED_P5: &[u8] = include_bytes!("../fixtures/mixed_p5.pkl");
const EXPLOIT_P2: &[u8] = include_bytes!("../fixtures/exploit_p2.pkl");
const RECURSIVE_P2: &[u8] = include_bytes!("../fixtures/recursive_p2.pkl");
const ARRAY_F8_P5: &[u8] = include_bytes!("../fixtures/array_f8_p5.pkl");

fn envelope(data: &[u8]) -> serde_json::Value {
    let outcome = parse_bytes(data, &ParseConfig::default(), &CancelToken::new());
    serde_json::from_str(&outcome.to_json()).unwrap()
}

#[test]
fn success_envelope_wraps_value() {
    let doc = envelope(SAMPLE_P4);
    assert_eq!(doc["ok"], true);
    assert_eq!(doc["value"]["name"], "示例数据");
    assert_eq!(doc["value"]["details"]["value"], 123.45);
    assert!(doc.get("error").is_none());
}

#[test]
fn blocked_symbol_envelope() {
    let doc = envelope(EXPLOIT_P2);
    assert_eq!(
        doc,
        serde_json::json!({
            "ok": false,
            "error": {
                "kind": "BlockedSymbol",
                "detail": "blocked symbol: posix.system",
                "offset": 2,
                "opcode": "GLOBAL",
                "namespace": "posix",
                "symbol": "system",
            }
        })
    );
}

#[test]
fn cycle_envelope_is_located_at_stop() {
    let doc = envelope(RECURSIVE_P2);
    assert_eq!(doc["ok"], false);
    assert_eq!(doc["error"]["kind"], "MalformedStream");
    assert_eq!(doc["error"]["offset"], 8);
    assert_eq!(doc["error"]["opcode"], "STOP");
}

#[test]
fn tagged_leaves_survive_the_envelope() {
    let doc = envelope(MIXED_P5);
    assert_eq!(doc["value"]["b"]["__bytes__"], true);
    assert_eq!(doc["value"]["b"]["base64"], "AQI=");
    assert_eq!(doc["value"]["big"]["__bigint__"], true);
}

#[test]
fn array_envelope() {
    let doc = envelope(ARRAY_F8_P5);
    assert_eq!(doc["value"], serde_json::json!([[1.0, null, 3.0], [null, -2.0, 0.5]]));
}

#[test]
fn pretty_and_compact_agree() {
    let outcome = parse_bytes(SAMPLE_P4, &ParseConfig::default(), &CancelToken::new());
    let compact: serde_json::Value = serde_json::from_str(&outcome.to_json()).unwrap();
    let pretty: serde_json::Value = serde_json::from_str(&outcome.to_json_pretty()).unwrap();
    assert_eq!(compact, pretty);
    assert!(outcome.to_json_pretty().contains('\n'));
}

#[test]
fn truncated_fixture_envelope() {
    let doc = envelope(&SAMPLE_P4[..SAMPLE_P4.len() - 1]);
    assert_eq!(doc["error"]["kind"], "TruncatedInput");
    assert_eq!(doc["error"]["offset"], SAMPLE_P4.len() - 1);
}
