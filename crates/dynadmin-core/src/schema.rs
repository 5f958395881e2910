//! Key schemas and index selection resolved from `DescribeTable` metadata.

use std::collections::HashMap;

use dynadmin_model::types::{
    AttributeDefinition, KeySchemaElement, KeyType, Projection, ScalarAttributeType,
    TableDescription,
};
use serde::Serialize;

use crate::error::AdminError;
use crate::key_codec::{self, CompositeKey};

/// Selection value that addresses the table itself rather than an index.
pub const TABLE_SELECTION: &str = "table";

// ---------------------------------------------------------------------------
// Key schema
// ---------------------------------------------------------------------------

/// A key attribute name with its declared scalar type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyAttribute {
    pub name: String,
    #[serde(rename = "type")]
    pub attribute_type: ScalarAttributeType,
}

impl KeyAttribute {
    #[must_use]
    pub fn new(name: impl Into<String>, attribute_type: ScalarAttributeType) -> Self {
        Self {
            name: name.into(),
            attribute_type,
        }
    }
}

/// Ordered key schema: the hash attribute, then the range attribute if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchema {
    attributes: Vec<KeyAttribute>,
}

impl KeySchema {
    #[must_use]
    pub fn new(hash: KeyAttribute, range: Option<KeyAttribute>) -> Self {
        let mut attributes = vec![hash];
        attributes.extend(range);
        Self { attributes }
    }

    /// Build a key schema from wire elements, typing each attribute from
    /// `definitions`.
    pub fn from_elements(
        elements: &[KeySchemaElement],
        definitions: &HashMap<String, ScalarAttributeType>,
    ) -> Result<Self, AdminError> {
        let mut hash = None;
        let mut range = None;
        for element in elements {
            let slot = match element.key_type {
                KeyType::Hash => &mut hash,
                KeyType::Range => &mut range,
            };
            if slot.is_some() {
                return Err(AdminError::InvalidSchema(format!(
                    "duplicate {} key in key schema",
                    element.key_type
                )));
            }
            let attribute_type = definitions
                .get(&element.attribute_name)
                .cloned()
                .ok_or_else(|| {
                    AdminError::InvalidSchema(format!(
                        "no attribute definition for key attribute '{}'",
                        element.attribute_name
                    ))
                })?;
            if !attribute_type.is_valid_key_type() {
                return Err(AdminError::InvalidSchema(format!(
                    "key attribute '{}' has unsupported type {attribute_type}",
                    element.attribute_name
                )));
            }
            *slot = Some(KeyAttribute::new(&element.attribute_name, attribute_type));
        }

        let hash = hash
            .ok_or_else(|| AdminError::InvalidSchema("key schema has no HASH key".to_owned()))?;
        Ok(Self::new(hash, range))
    }

    #[must_use]
    pub fn hash_key(&self) -> &KeyAttribute {
        &self.attributes[0]
    }

    #[must_use]
    pub fn range_key(&self) -> Option<&KeyAttribute> {
        self.attributes.get(1)
    }

    /// All key attributes, hash first.
    #[must_use]
    pub fn attributes(&self) -> &[KeyAttribute] {
        &self.attributes
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name)
    }
}

// ---------------------------------------------------------------------------
// Index descriptors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum IndexKind {
    Table,
    Global,
    Local,
}

/// The table itself or one of its secondary indexes.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDescriptor {
    name: Option<String>,
    kind: IndexKind,
    key_schema: KeySchema,
    projection: Option<Projection>,
}

impl IndexDescriptor {
    /// Index name, `None` for the table itself.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    #[must_use]
    pub fn key_schema(&self) -> &KeySchema {
        &self.key_schema
    }

    #[must_use]
    pub fn projection(&self) -> Option<&Projection> {
        self.projection.as_ref()
    }

    #[must_use]
    pub fn is_table(&self) -> bool {
        self.kind == IndexKind::Table
    }
}

// ---------------------------------------------------------------------------
// Table schema
// ---------------------------------------------------------------------------

/// Validated view of a table's metadata.
#[derive(Debug, Clone)]
pub struct TableSchema {
    name: String,
    table: IndexDescriptor,
    indexes: Vec<IndexDescriptor>,
    description: TableDescription,
}

impl TableSchema {
    pub fn from_description(description: TableDescription) -> Result<Self, AdminError> {
        let name = description
            .table_name
            .clone()
            .ok_or_else(|| AdminError::InvalidSchema("table description has no name".to_owned()))?;
        let definitions: HashMap<String, ScalarAttributeType> = description
            .attribute_definitions
            .iter()
            .map(|AttributeDefinition { attribute_name, attribute_type }| {
                (attribute_name.clone(), attribute_type.clone())
            })
            .collect();

        let table = IndexDescriptor {
            name: None,
            kind: IndexKind::Table,
            key_schema: KeySchema::from_elements(&description.key_schema, &definitions)?,
            projection: None,
        };

        let globals = description.global_secondary_indexes.iter().map(|gsi| {
            (IndexKind::Global, &gsi.index_name, &gsi.key_schema, &gsi.projection)
        });
        let locals = description.local_secondary_indexes.iter().map(|lsi| {
            (IndexKind::Local, &lsi.index_name, &lsi.key_schema, &lsi.projection)
        });
        let indexes = globals
            .chain(locals)
            .map(|(kind, index_name, elements, projection)| {
                let index_name = index_name.clone().ok_or_else(|| {
                    AdminError::InvalidSchema("secondary index has no name".to_owned())
                })?;
                Ok(IndexDescriptor {
                    name: Some(index_name),
                    kind,
                    key_schema: KeySchema::from_elements(elements, &definitions)?,
                    projection: projection.clone(),
                })
            })
            .collect::<Result<Vec<_>, AdminError>>()?;

        Ok(Self {
            name,
            table,
            indexes,
            description,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> &TableDescription {
        &self.description
    }

    #[must_use]
    pub fn key_schema(&self) -> &KeySchema {
        &self.table.key_schema
    }

    #[must_use]
    pub fn hash_key(&self) -> &KeyAttribute {
        self.table.key_schema.hash_key()
    }

    #[must_use]
    pub fn range_key(&self) -> Option<&KeyAttribute> {
        self.table.key_schema.range_key()
    }

    #[must_use]
    pub fn table_index(&self) -> &IndexDescriptor {
        &self.table
    }

    /// Secondary indexes, globals first.
    #[must_use]
    pub fn indexes(&self) -> &[IndexDescriptor] {
        &self.indexes
    }

    /// Resolve a queryable selection: `"table"` (or nothing) picks the
    /// table, anything else must name a secondary index.
    pub fn select_index(&self, selection: Option<&str>) -> Result<&IndexDescriptor, AdminError> {
        match selection {
            None | Some(TABLE_SELECTION) => Ok(&self.table),
            Some(name) => self
                .indexes
                .iter()
                .find(|idx| idx.name() == Some(name))
                .ok_or_else(|| AdminError::IndexNotFound(name.to_owned())),
        }
    }

    /// Attributes a page cursor is built from when reading `index`: the
    /// table key followed by the index key attributes not already present.
    #[must_use]
    pub fn cursor_key_attributes(&self, index: &IndexDescriptor) -> Vec<KeyAttribute> {
        let mut attributes = self.table.key_schema.attributes().to_vec();
        for attribute in index.key_schema.attributes() {
            if !attributes.iter().any(|a| a.name == attribute.name) {
                attributes.push(attribute.clone());
            }
        }
        attributes
    }

    /// Decode an item key produced by [`key_codec::encode_key`] over the
    /// table key.
    pub fn parse_item_key(&self, encoded: &str) -> Result<CompositeKey, AdminError> {
        key_codec::parse_key(encoded, self.table.key_schema.attributes())
    }
}
