//! Normalization of interpreted fixtures into JSON text

use picklejar_foundation::ParseConfig;
use picklejar_machine::interpret;
use picklejar_normalize::{NormalizeOptions, NormalizedValue, normalize};

const SAMPLE_P0: &[u8] = include_bytes!("../fixtures/sample_p0.pkl");
const SAMPLE_P5: &[u8] = include_bytes!("../fixtures/sample_p5.pkl");
const MIXED_P2: &[u8] = include_bytes!("../fixtures/mixed_p2.pkl");
const SHARED_P2: &[u8] = include_bytes!("../fixtures/shared_p2.pkl");

fn json(data: &[u8]) -> String {
    let value = interpret(data, &ParseConfig::default()).unwrap();
    serde_json::to_string(&normalize(&value, &NormalizeOptions::default())).unwrap()
}

#[test]
fn sample_dict_json() {
    assert_eq!(
        json(SAMPLE_P0),
        r#"{"name":"示例数据","version":1.0,"details":{"items":["item1","item2","item3"],"value":123.45,"status":true},"list_of_numbers":[1,2,3,4,5]}"#
    );
    assert_eq!(json(SAMPLE_P5), json(SAMPLE_P0));
}

#[test]
fn mixed_dict_json() {
    assert_eq!(
        json(MIXED_P2),
        concat!(
            r#"{"a":[1,2.0,null],"b":{"__bytes__":true,"base64":"AQI="},"#,
            r#""big":{"__bigint__":true,"decimal":"1267650600228229401496703205376"},"#,
            r#""neg":{"__bigint__":true,"decimal":"-1180591620717411303424"},"#,
            r#""t":[1,"x"],"fs":[],"(1, 'k')":"tuple key","3":"int key"}"#
        )
    );
}

#[test]
fn shared_subgraph_is_expanded_at_each_use() {
    assert_eq!(json(SHARED_P2), r#"{"first":[1,2],"second":[1,2]}"#);
}

#[test]
fn output_parses_back_as_json() {
    for data in [SAMPLE_P0, MIXED_P2, SHARED_P2] {
        let text = json(data);
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert!(parsed.is_object());
    }
}

#[test]
fn accessors_on_the_tree() {
    let value = interpret(SAMPLE_P0, &ParseConfig::default()).unwrap();
    let tree = normalize(&value, &NormalizeOptions::default());
    let details = tree.get("details").unwrap();
    assert_eq!(details.get("status"), Some(&NormalizedValue::Bool(true)));
    assert_eq!(tree.get("list_of_numbers").and_then(NormalizedValue::as_seq).map(<[_]>::len), Some(5));
    assert!(tree.get("missing").is_none());
    assert_eq!(tree.as_map().map(indexmap::IndexMap::len), Some(4));
}
