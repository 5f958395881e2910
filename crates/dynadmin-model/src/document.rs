//! Conversion between typed items and plain JSON documents.
//!
//! The admin API exchanges items as ordinary JSON (`{"id": 5, "name": "x"}`)
//! while the store speaks typed `AttributeValue`s (`{"id": {"N": "5"}}`).
//! Numbers become `N`, strings `S`, arrays `L` and objects `M`. On the way
//! out, sets flatten to arrays and binary values to base64 strings, so the
//! conversion is lossy only for those two shapes.

use serde_json::{Map, Number, Value};

use crate::attribute_value::{AttributeValue, Item, encode_binary};
use crate::error::DynamoDBError;

/// Convert a typed item into a plain JSON object.
#[must_use]
pub fn item_to_document(item: &Item) -> Value {
    let map: Map<String, Value> = item
        .iter()
        .map(|(name, value)| (name.clone(), attribute_to_json(value)))
        .collect();
    Value::Object(map)
}

/// Convert a single attribute value into plain JSON.
#[must_use]
pub fn attribute_to_json(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => number_to_json(n),
        AttributeValue::B(b) => Value::String(encode_binary(b)),
        AttributeValue::Ss(v) => Value::Array(v.iter().cloned().map(Value::String).collect()),
        AttributeValue::Ns(v) => Value::Array(v.iter().map(|n| number_to_json(n)).collect()),
        AttributeValue::Bs(v) => Value::Array(
            v.iter()
                .map(|b| Value::String(encode_binary(b)))
                .collect(),
        ),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::L(list) => Value::Array(list.iter().map(attribute_to_json).collect()),
        AttributeValue::M(m) => Value::Object(
            m.iter()
                .map(|(k, v)| (k.clone(), attribute_to_json(v)))
                .collect(),
        ),
    }
}

/// `serde_json` is built with `arbitrary_precision`, so a `Number` keeps the
/// exact decimal text however many digits it has. Text JSON cannot spell as
/// a number (`+5`, `.5`) stays a string.
fn number_to_json(n: &str) -> Value {
    n.parse::<Number>()
        .map_or_else(|_| Value::String(n.to_owned()), Value::Number)
}

/// Convert a plain JSON object into a typed item.
///
/// # Errors
///
/// Returns a `ValidationException` if `document` is not a JSON object.
pub fn document_to_item(document: &Value) -> Result<Item, DynamoDBError> {
    let Value::Object(map) = document else {
        return Err(DynamoDBError::validation(
            "item document must be a JSON object",
        ));
    };
    Ok(map
        .iter()
        .map(|(name, value)| (name.clone(), json_to_attribute(value)))
        .collect())
}

/// Convert a plain JSON value into an attribute value.
#[must_use]
pub fn json_to_attribute(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(list) => AttributeValue::L(list.iter().map(json_to_attribute).collect()),
        Value::Object(map) => AttributeValue::M(
            map.iter()
                .map(|(k, v)| (k.clone(), json_to_attribute(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_should_convert_document_to_typed_item() {
        let item = document_to_item(&json!({
            "id": 7,
            "name": "widget",
            "tags": ["a", "b"],
            "meta": {"active": true, "note": null}
        }))
        .unwrap();

        assert_eq!(item["id"], AttributeValue::N("7".to_owned()));
        assert_eq!(item["name"], AttributeValue::S("widget".to_owned()));
        assert!(matches!(item["tags"], AttributeValue::L(ref l) if l.len() == 2));
        let AttributeValue::M(ref meta) = item["meta"] else {
            panic!("expected map");
        };
        assert_eq!(meta["active"], AttributeValue::Bool(true));
        assert_eq!(meta["note"], AttributeValue::Null(true));
    }

    #[test]
    fn test_should_render_typed_item_as_plain_json() {
        let mut item = Item::new();
        item.insert("id".to_owned(), AttributeValue::N("3.5".to_owned()));
        item.insert(
            "colors".to_owned(),
            AttributeValue::Ss(vec!["red".to_owned(), "blue".to_owned()]),
        );
        item.insert(
            "blob".to_owned(),
            AttributeValue::B(bytes::Bytes::from_static(b"hi")),
        );

        let doc = item_to_document(&item);
        assert_eq!(doc["id"], json!(3.5));
        assert_eq!(doc["colors"], json!(["red", "blue"]));
        assert_eq!(doc["blob"], json!("aGk="));
    }

    #[test]
    fn test_should_keep_document_shape_through_both_conversions() {
        let doc = json!({"pk": "user#1", "n": 12, "nested": {"list": [1, "x", false]}});
        let item = document_to_item(&doc).unwrap();
        assert_eq!(item_to_document(&item), doc);
    }

    #[test]
    fn test_should_keep_large_numbers_exact_both_ways() {
        let mut item = Item::new();
        for (name, text) in [
            ("big", "123456789012345678901234567890"),
            ("negative", "-98765432109876543210987654321.000001"),
            ("tiny", "0.000000000000000000000000000123456789"),
            ("exp", "1E+100"),
        ] {
            item.insert(name.to_owned(), AttributeValue::N(text.to_owned()));
        }

        let doc = item_to_document(&item);
        assert_eq!(
            serde_json::to_string(&doc["big"]).unwrap(),
            "123456789012345678901234567890"
        );
        assert_eq!(document_to_item(&doc).unwrap(), item);
    }

    #[test]
    fn test_should_keep_large_numbers_from_request_body() {
        let doc: Value =
            serde_json::from_str(r#"{"pk": "x", "seq": 12345678901234567890124}"#).unwrap();
        let item = document_to_item(&doc).unwrap();
        assert_eq!(
            item["seq"],
            AttributeValue::N("12345678901234567890124".to_owned())
        );
    }

    #[test]
    fn test_should_reject_non_object_document() {
        let err = document_to_item(&json!([1, 2])).unwrap_err();
        assert_eq!(err.code, crate::error::DynamoDBErrorCode::ValidationException);
    }
}
