//! DynamoDB `AttributeValue` type with custom serialization.
//!
//! `AttributeValue` is a tagged union where exactly one variant is present.
//! The JSON wire format uses single-key objects like `{"S": "hello"}`.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use base64::Engine;
use bigdecimal::BigDecimal;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A stored item: attribute name to attribute value.
pub type Item = HashMap<String, AttributeValue>;

/// DynamoDB attribute value.
///
/// Numbers are always string-encoded to preserve arbitrary precision.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// String value.
    S(String),
    /// Number value (string-encoded for arbitrary precision).
    N(String),
    /// Binary value (base64-encoded in JSON).
    B(bytes::Bytes),
    /// String Set.
    Ss(Vec<String>),
    /// Number Set (string-encoded).
    Ns(Vec<String>),
    /// Binary Set (base64-encoded in JSON).
    Bs(Vec<bytes::Bytes>),
    /// Boolean value.
    Bool(bool),
    /// Null value.
    Null(bool),
    /// List of attribute values.
    L(Vec<AttributeValue>),
    /// Map of attribute values.
    M(HashMap<String, AttributeValue>),
}

impl AttributeValue {
    /// Returns the number string if this is an `N` variant.
    #[must_use]
    pub fn as_n(&self) -> Option<&str> {
        match self {
            Self::N(n) => Some(n),
            _ => None,
        }
    }

    /// Returns `true` for the variants DynamoDB accepts as key attributes.
    #[must_use]
    pub fn is_key_scalar(&self) -> bool {
        matches!(self, Self::S(_) | Self::N(_) | Self::B(_))
    }

    /// Returns the DynamoDB type descriptor string (e.g., "S", "N", "BOOL").
    #[must_use]
    pub fn type_descriptor(&self) -> &'static str {
        match self {
            Self::S(_) => "S",
            Self::N(_) => "N",
            Self::B(_) => "B",
            Self::Ss(_) => "SS",
            Self::Ns(_) => "NS",
            Self::Bs(_) => "BS",
            Self::Bool(_) => "BOOL",
            Self::Null(_) => "NULL",
            Self::L(_) => "L",
            Self::M(_) => "M",
        }
    }

    /// Compare two scalar values with DynamoDB ordering rules.
    ///
    /// Strings compare by UTF-8 bytes, numbers as exact decimals and binary
    /// values byte-wise. Returns `None` when the types differ or either side is not
    /// a scalar, in which case no comparison operator can match.
    #[must_use]
    pub fn compare_scalar(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::S(a), Self::S(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
            (Self::N(a), Self::N(b)) => {
                let da = BigDecimal::from_str(a.trim()).ok()?;
                let db = BigDecimal::from_str(b.trim()).ok()?;
                Some(da.cmp(&db))
            }
            (Self::B(a), Self::B(b)) => Some(a.as_ref().cmp(b.as_ref())),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::S(s) => write!(f, "{{S: {s}}}"),
            Self::N(n) => write!(f, "{{N: {n}}}"),
            Self::B(b) => write!(f, "{{B: {} bytes}}", b.len()),
            Self::Ss(v) => write!(f, "{{SS: {v:?}}}"),
            Self::Ns(v) => write!(f, "{{NS: {v:?}}}"),
            Self::Bs(v) => write!(f, "{{BS: {} items}}", v.len()),
            Self::Bool(b) => write!(f, "{{BOOL: {b}}}"),
            Self::Null(b) => write!(f, "{{NULL: {b}}}"),
            Self::L(v) => write!(f, "{{L: {} items}}", v.len()),
            Self::M(m) => write!(f, "{{M: {} keys}}", m.len()),
        }
    }
}

impl Serialize for AttributeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Self::S(s) => map.serialize_entry("S", s)?,
            Self::N(n) => map.serialize_entry("N", n)?,
            Self::B(b) => map.serialize_entry("B", &encode_binary(b))?,
            Self::Ss(v) => map.serialize_entry("SS", v)?,
            Self::Ns(v) => map.serialize_entry("NS", v)?,
            Self::Bs(v) => {
                let encoded: Vec<String> = v.iter().map(encode_binary).collect();
                map.serialize_entry("BS", &encoded)?;
            }
            Self::Bool(b) => map.serialize_entry("BOOL", b)?,
            Self::Null(b) => map.serialize_entry("NULL", b)?,
            Self::L(list) => map.serialize_entry("L", list)?,
            Self::M(m) => map.serialize_entry("M", m)?,
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AttributeValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(AttributeValueVisitor)
    }
}

/// Base64-encode a binary value the way the wire protocol expects.
#[must_use]
pub fn encode_binary(bytes: &bytes::Bytes) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Decode a base64 wire string into bytes.
///
/// # Errors
///
/// Returns the base64 decode error if `encoded` is not valid standard base64.
pub fn decode_binary(encoded: &str) -> Result<bytes::Bytes, base64::DecodeError> {
    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map(bytes::Bytes::from)
}

struct AttributeValueVisitor;

impl<'de> Visitor<'de> for AttributeValueVisitor {
    type Value = AttributeValue;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a DynamoDB AttributeValue object with exactly one type key")
    }

    fn visit_map<M: MapAccess<'de>>(self, mut map: M) -> Result<Self::Value, M::Error> {
        let Some(key) = map.next_key::<String>()? else {
            return Err(de::Error::custom(
                "AttributeValue must have exactly one key",
            ));
        };

        let value = match key.as_str() {
            "S" => AttributeValue::S(map.next_value()?),
            "N" => AttributeValue::N(map.next_value()?),
            "B" => {
                let encoded: String = map.next_value()?;
                AttributeValue::B(decode_binary(&encoded).map_err(de::Error::custom)?)
            }
            "SS" => AttributeValue::Ss(map.next_value()?),
            "NS" => AttributeValue::Ns(map.next_value()?),
            "BS" => {
                let encoded: Vec<String> = map.next_value()?;
                let decoded: Result<Vec<bytes::Bytes>, _> =
                    encoded.iter().map(|e| decode_binary(e)).collect();
                AttributeValue::Bs(decoded.map_err(de::Error::custom)?)
            }
            "BOOL" => AttributeValue::Bool(map.next_value()?),
            "NULL" => AttributeValue::Null(map.next_value()?),
            "L" => AttributeValue::L(map.next_value()?),
            "M" => AttributeValue::M(map.next_value()?),
            other => {
                return Err(de::Error::unknown_field(
                    other,
                    &["S", "N", "B", "SS", "NS", "BS", "BOOL", "NULL", "L", "M"],
                ));
            }
        };

        if map.next_key::<String>()?.is_some() {
            return Err(de::Error::custom(
                "AttributeValue must have exactly one key",
            ));
        }

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_serialize_string_value() {
        let val = AttributeValue::S("hello".to_owned());
        let json = serde_json::to_string(&val).unwrap();
        assert_eq!(json, r#"{"S":"hello"}"#);
    }

    #[test]
    fn test_should_serialize_number_as_string() {
        let val = AttributeValue::N("42".to_owned());
        let json = serde_json::to_string(&val).unwrap();
        assert_eq!(json, r#"{"N":"42"}"#);
    }

    #[test]
    fn test_should_roundtrip_binary_value() {
        let val = AttributeValue::B(bytes::Bytes::from_static(b"test data"));
        let json = serde_json::to_string(&val).unwrap();
        let deserialized: AttributeValue = serde_json::from_str(&json).unwrap();
        assert_eq!(val, deserialized);
    }

    #[test]
    fn test_should_reject_multiple_type_keys() {
        let result = serde_json::from_str::<AttributeValue>(r#"{"S":"a","N":"1"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_should_compare_numbers_numerically() {
        let nine = AttributeValue::N("9".to_owned());
        let ten = AttributeValue::N("10".to_owned());
        assert_eq!(nine.compare_scalar(&ten), Some(Ordering::Less));
    }

    #[test]
    fn test_should_compare_numbers_beyond_f64_precision() {
        let n = |v: &str| AttributeValue::N(v.to_owned());
        assert_eq!(
            n("12345678901234567890123").compare_scalar(&n("12345678901234567890124")),
            Some(Ordering::Less)
        );
        assert_eq!(
            n("0.10000000000000000000000000001").compare_scalar(&n("0.1")),
            Some(Ordering::Greater)
        );
        assert_eq!(n("1").compare_scalar(&n("1.0")), Some(Ordering::Equal));
        assert_eq!(n("-0.5").compare_scalar(&n("-5e-1")), Some(Ordering::Equal));
        assert_eq!(n("abc").compare_scalar(&n("1")), None);
    }

    #[test]
    fn test_should_compare_strings_bytewise() {
        let a = AttributeValue::S("Zebra".to_owned());
        let b = AttributeValue::S("apple".to_owned());
        assert_eq!(a.compare_scalar(&b), Some(Ordering::Less));
    }

    #[test]
    fn test_should_not_compare_mixed_types() {
        let s = AttributeValue::S("1".to_owned());
        let n = AttributeValue::N("1".to_owned());
        assert_eq!(s.compare_scalar(&n), None);
        assert_eq!(
            AttributeValue::Bool(true).compare_scalar(&AttributeValue::Bool(true)),
            None
        );
    }
}
