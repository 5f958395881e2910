//! Composite primary keys: extraction from items and a compact URL-safe
//! string form used for item paths and page cursors.
//!
//! An encoded key is the percent-encoded text of each key component joined
//! with `,`. Components are escaped individually (everything outside
//! `A-Za-z0-9 - _ . ! ~ * ' ( )`), so a `,` inside a value can never be
//! mistaken for the separator. Numbers keep their decimal text and binary
//! values are base64 before escaping.

use std::collections::HashSet;

use dynadmin_model::attribute_value::{AttributeValue, Item, decode_binary, encode_binary};
use dynadmin_model::types::ScalarAttributeType;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

use crate::error::AdminError;
use crate::schema::KeyAttribute;

/// Characters escaped in a key component.
const COMPONENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

const SEPARATOR: char = ',';

/// Key attribute values in key order (hash first, then range, then any
/// index attributes).
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeKey {
    components: Vec<(String, AttributeValue)>,
}

impl CompositeKey {
    #[must_use]
    pub fn components(&self) -> &[(String, AttributeValue)] {
        &self.components
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.components
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// The key as an attribute map, the shape store calls expect.
    #[must_use]
    pub fn to_item(&self) -> Item {
        self.components.iter().cloned().collect()
    }

    #[must_use]
    pub fn into_item(self) -> Item {
        self.components.into_iter().collect()
    }
}

/// Select exactly the `attributes` from `item`, in attribute order.
pub fn extract_key(item: &Item, attributes: &[KeyAttribute]) -> Result<CompositeKey, AdminError> {
    let components = attributes
        .iter()
        .map(|attribute| {
            let value = item
                .get(&attribute.name)
                .ok_or_else(|| AdminError::MissingKeyAttribute {
                    attribute: attribute.name.clone(),
                })?;
            if !value.is_key_scalar() {
                return Err(AdminError::KeyFormat(format!(
                    "key attribute '{}' holds a {} value",
                    attribute.name,
                    value.type_descriptor()
                )));
            }
            Ok((attribute.name.clone(), value.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(CompositeKey { components })
}

/// Encode a key into its compact string form.
#[must_use]
pub fn encode_key(key: &CompositeKey) -> String {
    let mut encoded = String::new();
    for (i, (_, value)) in key.components.iter().enumerate() {
        if i > 0 {
            encoded.push(SEPARATOR);
        }
        let text = match value {
            AttributeValue::S(s) => escape_component(s),
            AttributeValue::N(n) => escape_component(n),
            AttributeValue::B(b) => escape_component(&encode_binary(b)),
            // extract_key only admits scalars
            other => escape_component(&other.to_string()),
        };
        encoded.push_str(&text);
    }
    encoded
}

/// Decode an encoded key, coercing each component to the declared type of
/// the attribute in the same position.
pub fn parse_key(encoded: &str, attributes: &[KeyAttribute]) -> Result<CompositeKey, AdminError> {
    let parts: Vec<&str> = encoded.split(SEPARATOR).collect();
    if parts.len() != attributes.len() {
        return Err(arity_error(attributes.len(), parts.len()));
    }

    let decoded = parts
        .into_iter()
        .zip(attributes)
        .map(|(part, attribute)| {
            percent_decode_str(part).decode_utf8().map_err(|_| {
                AdminError::KeyFormat(format!(
                    "key component for '{}' is not valid UTF-8",
                    attribute.name
                ))
            })
        })
        .collect::<Result<Vec<_>, AdminError>>()?;
    let texts: Vec<&str> = decoded.iter().map(|text| &**text).collect();
    key_from_components(&texts, attributes)
}

/// Build a key from raw, unescaped component texts (e.g. form input).
pub fn key_from_components(
    components: &[&str],
    attributes: &[KeyAttribute],
) -> Result<CompositeKey, AdminError> {
    if components.len() != attributes.len() {
        return Err(arity_error(attributes.len(), components.len()));
    }
    let components = components
        .iter()
        .zip(attributes)
        .map(|(text, attribute)| Ok((attribute.name.clone(), coerce_component(text, attribute)?)))
        .collect::<Result<Vec<_>, AdminError>>()?;
    Ok(CompositeKey { components })
}

/// Percent-escape arbitrary text the way key components are escaped.
#[must_use]
pub fn escape_component(text: &str) -> String {
    utf8_percent_encode(text, COMPONENT_ENCODE_SET).to_string()
}

fn arity_error(expected: usize, got: usize) -> AdminError {
    AdminError::KeyFormat(format!("expected {expected} key component(s), got {got}"))
}

fn coerce_component(text: &str, attribute: &KeyAttribute) -> Result<AttributeValue, AdminError> {
    match &attribute.attribute_type {
        ScalarAttributeType::S => Ok(AttributeValue::S(text.to_owned())),
        ScalarAttributeType::N => {
            if is_number(text) {
                Ok(AttributeValue::N(text.to_owned()))
            } else {
                Err(AdminError::KeyType {
                    attribute: attribute.name.clone(),
                    value: text.to_owned(),
                })
            }
        }
        ScalarAttributeType::B => decode_binary(text).map(AttributeValue::B).map_err(|e| {
            AdminError::KeyFormat(format!(
                "key component for '{}' is not valid base64: {e}",
                attribute.name
            ))
        }),
        ScalarAttributeType::Unknown(t) => Err(AdminError::InvalidSchema(format!(
            "key attribute '{}' has unsupported type {t}",
            attribute.name
        ))),
    }
}

/// Whether `text` is a finite decimal number DynamoDB would accept.
pub(crate) fn is_number(text: &str) -> bool {
    !text.is_empty() && text == text.trim() && text.parse::<f64>().is_ok_and(f64::is_finite)
}

/// Union of attribute names across `items` in first-seen order.
///
/// Names within one item are visited in lexicographic order since an item
/// carries no order of its own.
#[must_use]
pub fn extract_keys_for_items(items: &[Item]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for item in items {
        let mut item_names: Vec<&String> = item.keys().collect();
        item_names.sort();
        for name in item_names {
            if seen.insert(name.as_str()) {
                names.push(name.clone());
            }
        }
    }
    names
}
