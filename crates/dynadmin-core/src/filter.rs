//! User filters and their translation into DynamoDB expressions.
//!
//! A filter names an attribute, a comparison operator and a value. Each one
//! becomes a `#alias <op> :alias` clause. Clauses on attributes of the
//! active index's key schema go to the key condition, all others to the
//! filter expression.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use dynadmin_model::AttributeValue;
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::error::AdminError;
use crate::key_codec::is_number;
use crate::schema::IndexDescriptor;

// ---------------------------------------------------------------------------
// Operators and values
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Ge,
    Le,
    Gt,
    Lt,
}

impl Operator {
    pub const ALL: [Self; 6] = [Self::Eq, Self::Ne, Self::Ge, Self::Le, Self::Gt, Self::Lt];

    /// Expression syntax of the operator.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Lt => "<",
        }
    }

    /// Symbol shown to users.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ne => "\u{2260}",
            other => other.as_str(),
        }
    }

    /// Whether the operator holds given how the left operand orders
    /// against the right one.
    #[must_use]
    pub fn matches(&self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::{Equal, Greater, Less};
        match self {
            Self::Eq => ordering == Equal,
            Self::Ne => ordering != Equal,
            Self::Ge => ordering != Less,
            Self::Le => ordering != Greater,
            Self::Gt => ordering == Greater,
            Self::Lt => ordering == Less,
        }
    }
}

impl FromStr for Operator {
    type Err = AdminError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| AdminError::InvalidFilter(format!("unsupported operator '{s}'")))
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A filter value already resolved to its declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    String(String),
    /// Validated decimal text.
    Number(String),
}

impl FilterValue {
    /// Resolve a raw JSON value against a declared type (`S` or `N`).
    pub fn resolve(
        attribute: &str,
        value: &serde_json::Value,
        declared_type: &str,
    ) -> Result<Self, AdminError> {
        let text = match value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            other => {
                return Err(AdminError::InvalidFilter(format!(
                    "value for '{attribute}' must be a string or number, got {other}"
                )));
            }
        };
        match declared_type {
            "S" => Ok(Self::String(text)),
            "N" => {
                let trimmed = text.trim();
                if is_number(trimmed) {
                    Ok(Self::Number(trimmed.to_owned()))
                } else {
                    Err(AdminError::InvalidFilter(format!(
                        "value for '{attribute}' is not a number: '{text}'"
                    )))
                }
            }
            other => Err(AdminError::InvalidFilter(format!(
                "unsupported type '{other}' for '{attribute}'"
            ))),
        }
    }

    #[must_use]
    pub fn to_attribute_value(&self) -> AttributeValue {
        match self {
            Self::String(s) => AttributeValue::S(s.clone()),
            Self::Number(n) => AttributeValue::N(n.clone()),
        }
    }
}

/// One filter entry: `attribute <operator> value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCondition {
    pub attribute: String,
    pub operator: Operator,
    pub value: FilterValue,
}

// ---------------------------------------------------------------------------
// FilterSpec
// ---------------------------------------------------------------------------

/// Filters in the order the caller wrote them.
///
/// Deserializes from a JSON object
/// `{"attr": {"operator": "=", "value": ..., "type": "S"}}`; `type`
/// defaults to `S`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    conditions: Vec<FilterCondition>,
}

impl FilterSpec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the JSON wire form.
    pub fn from_json(json: &str) -> Result<Self, AdminError> {
        serde_json::from_str(json).map_err(|e| AdminError::InvalidFilter(e.to_string()))
    }

    #[must_use]
    pub fn with(mut self, attribute: impl Into<String>, operator: Operator, value: FilterValue) -> Self {
        self.conditions.push(FilterCondition {
            attribute: attribute.into(),
            operator,
            value,
        });
        self
    }

    #[must_use]
    pub fn conditions(&self) -> &[FilterCondition] {
        &self.conditions
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

#[derive(Deserialize)]
struct RawCondition {
    operator: String,
    value: serde_json::Value,
    #[serde(rename = "type", default)]
    declared_type: Option<String>,
}

impl<'de> Deserialize<'de> for FilterSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(FilterSpecVisitor)
    }
}

struct FilterSpecVisitor;

impl<'de> Visitor<'de> for FilterSpecVisitor {
    type Value = FilterSpec;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("an object of attribute filters")
    }

    fn visit_map<M: MapAccess<'de>>(self, mut map: M) -> Result<Self::Value, M::Error> {
        let mut conditions = Vec::new();
        while let Some((attribute, raw)) = map.next_entry::<String, RawCondition>()? {
            let operator = raw.operator.parse::<Operator>().map_err(invalid)?;
            let declared_type = raw.declared_type.as_deref().unwrap_or("S");
            let value =
                FilterValue::resolve(&attribute, &raw.value, declared_type).map_err(invalid)?;
            conditions.push(FilterCondition {
                attribute,
                operator,
                value,
            });
        }
        Ok(FilterSpec { conditions })
    }
}

#[allow(clippy::needless_pass_by_value)]
fn invalid<E: de::Error>(e: AdminError) -> E {
    match e {
        AdminError::InvalidFilter(message) => E::custom(message),
        other => E::custom(other),
    }
}

// ---------------------------------------------------------------------------
// Expression builder
// ---------------------------------------------------------------------------

/// Expression parts for one read request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpressionParts {
    pub names: HashMap<String, String>,
    pub values: HashMap<String, AttributeValue>,
    pub filter_expression: Option<String>,
    pub key_condition_expression: Option<String>,
}

/// Translate `spec` into expressions. With no `active_index` (a scan) every
/// condition lands in the filter expression.
#[must_use]
pub fn build_expressions(spec: &FilterSpec, active_index: Option<&IndexDescriptor>) -> ExpressionParts {
    let mut parts = ExpressionParts::default();
    let mut key_fragments = Vec::new();
    let mut filter_fragments = Vec::new();

    for (index, condition) in spec.conditions.iter().enumerate() {
        let stem = alias_stem(&condition.attribute, index, &parts.names);
        let name_alias = format!("#{stem}");
        let value_alias = format!(":{stem}");
        let fragment = format!("{name_alias} {} {value_alias}", condition.operator);

        parts.names.insert(name_alias, condition.attribute.clone());
        parts
            .values
            .insert(value_alias, condition.value.to_attribute_value());

        let is_key = active_index.is_some_and(|idx| idx.key_schema().contains(&condition.attribute));
        if is_key {
            key_fragments.push(fragment);
        } else {
            filter_fragments.push(fragment);
        }
    }

    parts.key_condition_expression = join_fragments(&key_fragments);
    parts.filter_expression = join_fragments(&filter_fragments);
    parts
}

/// Alias stem for an attribute: the name itself when it is a valid
/// expression token, otherwise positional `f<i>`. Stems never repeat.
fn alias_stem(attribute: &str, index: usize, taken: &HashMap<String, String>) -> String {
    let is_token = !attribute.is_empty()
        && attribute
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if is_token && !taken.contains_key(&format!("#{attribute}")) {
        return attribute.to_owned();
    }
    (index..)
        .map(|i| format!("f{i}"))
        .find(|stem| !taken.contains_key(&format!("#{stem}")))
        .unwrap_or_else(|| format!("f{index}"))
}

fn join_fragments(fragments: &[String]) -> Option<String> {
    if fragments.is_empty() {
        None
    } else {
        Some(fragments.join(" AND "))
    }
}
