//! Query-string and form-body encoding.

use serde_json::{Map, Value};
use url::form_urlencoded;

/// String form of a JSON value for query and form fields.
///
/// Composite values (arrays, objects) keep their JSON text so the server
/// can parse them back; scalars use their plain string form.
pub(crate) fn field_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        composite => composite.to_string(),
    }
}

/// Encode a mapping as a `?`-prefixed URL query string.
///
/// Returns an empty string for an empty mapping. Never fails.
pub fn encode_query(params: &Map<String, Value>) -> String {
    if params.is_empty() {
        return String::new();
    }
    format!("?{}", encode_pairs(params))
}

/// Encode a mapping as an `application/x-www-form-urlencoded` body.
pub fn encode_form(params: &Map<String, Value>) -> String {
    encode_pairs(params)
}

fn encode_pairs(params: &Map<String, Value>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        serializer.append_pair(key, &field_value(value));
    }
    serializer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    fn map(entries: &[(&str, Value)]) -> Map<String, Value> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test_case(json!("hello") => "hello"; "string passes through")]
    #[test_case(json!(42) => "42"; "integer")]
    #[test_case(json!(1.5) => "1.5"; "float")]
    #[test_case(json!(true) => "true"; "bool true")]
    #[test_case(json!(false) => "false"; "bool false")]
    #[test_case(json!(null) => "null"; "null")]
    #[test_case(json!([1, 2]) => "[1,2]"; "array is JSON text")]
    #[test_case(json!({"a": 1}) => r#"{"a":1}"#; "object is JSON text")]
    fn test_field_value(value: Value) -> String {
        field_value(&value)
    }

    #[test]
    fn test_empty_map_encodes_to_empty_string() {
        assert_eq!(encode_query(&Map::new()), "");
    }

    #[test]
    fn test_query_has_leading_question_mark() {
        let params = map(&[("name", json!("alice"))]);
        assert_eq!(encode_query(&params), "?name=alice");
    }

    #[test]
    fn test_values_are_percent_encoded() {
        let params = map(&[("q", json!("a b&c"))]);
        assert_eq!(encode_query(&params), "?q=a+b%26c");
    }

    #[test]
    fn test_composite_values_round_trip_through_decoding() {
        let original = json!({"ids": [1, 2, 3], "filter": {"on": true}});
        let params = map(&[
            ("ids", original["ids"].clone()),
            ("filter", original["filter"].clone()),
        ]);
        let encoded = encode_query(&params);

        for (key, value) in form_urlencoded::parse(encoded[1..].as_bytes()) {
            let parsed: Value = serde_json::from_str(&value).unwrap();
            assert_eq!(parsed, original[key.as_ref()]);
        }
    }

    #[test]
    fn test_form_body_has_no_leading_question_mark() {
        let params = map(&[("a", json!(1)), ("b", json!("two"))]);
        assert_eq!(encode_form(&params), "a=1&b=two");
    }
}
