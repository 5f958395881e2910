//! In-memory [`TableStore`] for tests and local development.
//!
//! Tables live in a [`DashMap`] keyed by name. Each table keeps its items in
//! a `Vec` sorted by the table key with DynamoDB comparison rules (strings
//! by UTF-8 bytes, numbers numerically, binary byte-wise), so reads are
//! deterministic. Index reads order by the index key, then the table key.
//!
//! Like the real service, a single read call evaluates at most
//! `max_page_items` items before filtering and hands back the key of the
//! last evaluated item when more remain.

use std::cmp::Ordering;

use dashmap::DashMap;
use dynadmin_model::attribute_value::{AttributeValue, Item};
use dynadmin_model::error::{DynamoDBError, DynamoDBErrorCode};
use dynadmin_model::types::{ScalarAttributeType, TableDescription, TableStatus};
use parking_lot::RwLock;
use tracing::debug;

use crate::filter::Operator;
use crate::schema::{IndexDescriptor, KeyAttribute, TableSchema};
use crate::store::{ReadMode, ReadRequest, StorePage, TableNamesPage, TableStore};

/// Items evaluated per read call unless configured.
pub const DEFAULT_MAX_PAGE_ITEMS: usize = 100;

#[derive(Debug)]
struct MemoryTable {
    schema: TableSchema,
    items: RwLock<Vec<Item>>,
}

#[derive(Debug)]
pub struct MemoryStore {
    tables: DashMap<String, MemoryTable>,
    max_page_items: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_page_items(DEFAULT_MAX_PAGE_ITEMS)
    }

    /// A store whose read calls evaluate at most `max_page_items` items.
    #[must_use]
    pub fn with_max_page_items(max_page_items: usize) -> Self {
        Self {
            tables: DashMap::new(),
            max_page_items: max_page_items.max(1),
        }
    }

    /// Register a table from its description.
    pub fn create_table(&self, mut description: TableDescription) -> Result<(), DynamoDBError> {
        description.table_status = Some(TableStatus::Active);
        let schema = TableSchema::from_description(description)
            .map_err(|e| DynamoDBError::validation(e.to_string()))?;
        let name = schema.name().to_owned();
        if self.tables.contains_key(&name) {
            return Err(DynamoDBError::with_message(
                DynamoDBErrorCode::ResourceInUseException,
                format!("Table already exists: {name}"),
            ));
        }
        debug!(table = %name, "Created in-memory table");
        self.tables.insert(
            name,
            MemoryTable {
                schema,
                items: RwLock::new(Vec::new()),
            },
        );
        Ok(())
    }

    fn table(
        &self,
        table_name: &str,
    ) -> Result<dashmap::mapref::one::Ref<'_, String, MemoryTable>, DynamoDBError> {
        self.tables.get(table_name).ok_or_else(|| {
            DynamoDBError::resource_not_found(format!(
                "Cannot do operations on a non-existent table: {table_name}"
            ))
        })
    }
}

#[async_trait::async_trait]
impl TableStore for MemoryStore {
    async fn describe_table(&self, table_name: &str) -> Result<TableDescription, DynamoDBError> {
        let table = self.table(table_name)?;
        let mut description = table.schema.description().clone();
        description.item_count = i64::try_from(table.items.read().len()).ok();
        Ok(description)
    }

    async fn list_tables(
        &self,
        exclusive_start_table_name: Option<String>,
    ) -> Result<TableNamesPage, DynamoDBError> {
        let mut names: Vec<String> = self.tables.iter().map(|t| t.key().clone()).collect();
        names.sort();
        if let Some(start) = exclusive_start_table_name {
            names.retain(|n| *n > start);
        }
        let last_evaluated = if names.len() > self.max_page_items {
            names.truncate(self.max_page_items);
            names.last().cloned()
        } else {
            None
        };
        Ok(TableNamesPage {
            names,
            last_evaluated,
        })
    }

    async fn read(
        &self,
        request: &ReadRequest,
        mode: ReadMode,
    ) -> Result<StorePage, DynamoDBError> {
        let table = self.table(&request.table_name)?;
        let schema = &table.schema;
        let index = schema
            .select_index(request.index_name.as_deref())
            .map_err(|_| {
                DynamoDBError::validation("The table does not have the specified index")
            })?;

        let mut order = index.key_schema().attributes().to_vec();
        for attribute in schema.key_schema().attributes() {
            if !order.iter().any(|a| a.name == attribute.name) {
                order.push(attribute.clone());
            }
        }

        let key_condition = match mode {
            ReadMode::Query => {
                let clauses = parse_clauses(request.key_condition_expression.as_deref(), request)?;
                validate_key_condition(&clauses, index)?;
                clauses
            }
            ReadMode::Scan => Vec::new(),
        };
        let filter = parse_clauses(request.filter_expression.as_deref(), request)?;

        let items = table.items.read();
        let mut candidates: Vec<&Item> = items
            .iter()
            .filter(|item| index.key_schema().attributes().iter().all(|a| item.contains_key(&a.name)))
            .filter(|item| matches_all(item, &key_condition))
            .collect();
        if !index.is_table() {
            candidates.sort_by(|a, b| compare_by(a, b, &order));
        }

        let start = match &request.exclusive_start_key {
            Some(start_key) => candidates
                .iter()
                .position(|item| compare_by(item, start_key, &order) == Ordering::Greater)
                .unwrap_or(candidates.len()),
            None => 0,
        };
        let end = (start + self.max_page_items).min(candidates.len());
        let evaluated = &candidates[start..end];

        let next_start_key = if end < candidates.len() {
            evaluated.last().map(|last| {
                order
                    .iter()
                    .filter_map(|a| last.get(&a.name).map(|v| (a.name.clone(), v.clone())))
                    .collect::<Item>()
            })
        } else {
            None
        };
        let matched: Vec<Item> = evaluated
            .iter()
            .filter(|item| matches_all(item, &filter))
            .map(|item| (*item).clone())
            .collect();

        debug!(
            table = %request.table_name,
            index = ?request.index_name,
            %mode,
            evaluated = evaluated.len(),
            returned = matched.len(),
            more = next_start_key.is_some(),
            "In-memory read"
        );
        Ok(StorePage {
            items: matched,
            next_start_key,
        })
    }

    async fn get_item(&self, table_name: &str, key: Item) -> Result<Option<Item>, DynamoDBError> {
        let table = self.table(table_name)?;
        let attributes = table.schema.key_schema().attributes();
        validate_key(&key, attributes, true)?;
        let items = table.items.read();
        Ok(items
            .iter()
            .find(|item| compare_by(item, &key, attributes) == Ordering::Equal)
            .cloned())
    }

    async fn put_item(&self, table_name: &str, item: Item) -> Result<(), DynamoDBError> {
        let table = self.table(table_name)?;
        let attributes = table.schema.key_schema().attributes();
        validate_key(&item, attributes, false)?;
        let mut items = table.items.write();
        match items.binary_search_by(|probe| compare_by(probe, &item, attributes)) {
            Ok(pos) => items[pos] = item,
            Err(pos) => items.insert(pos, item),
        }
        Ok(())
    }

    async fn delete_item(&self, table_name: &str, key: Item) -> Result<(), DynamoDBError> {
        let table = self.table(table_name)?;
        let attributes = table.schema.key_schema().attributes();
        validate_key(&key, attributes, true)?;
        let mut items = table.items.write();
        if let Ok(pos) = items.binary_search_by(|probe| compare_by(probe, &key, attributes)) {
            items.remove(pos);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Keys and ordering
// ---------------------------------------------------------------------------

/// Order two items by the values of `attributes`, in turn.
fn compare_by(a: &Item, b: &Item, attributes: &[KeyAttribute]) -> Ordering {
    for attribute in attributes {
        let ord = match (a.get(&attribute.name), b.get(&attribute.name)) {
            (Some(x), Some(y)) => x.compare_scalar(y).unwrap_or(Ordering::Equal),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Check that `item` carries every key attribute with its declared type.
/// With `exact`, no other attributes are allowed.
fn validate_key(item: &Item, attributes: &[KeyAttribute], exact: bool) -> Result<(), DynamoDBError> {
    for attribute in attributes {
        let Some(value) = item.get(&attribute.name) else {
            return Err(DynamoDBError::validation(format!(
                "One of the required keys was not given a value: {}",
                attribute.name
            )));
        };
        let type_ok = matches!(
            (&attribute.attribute_type, value),
            (ScalarAttributeType::S, AttributeValue::S(_))
                | (ScalarAttributeType::N, AttributeValue::N(_))
                | (ScalarAttributeType::B, AttributeValue::B(_))
        );
        if !type_ok {
            return Err(DynamoDBError::validation(format!(
                "Type mismatch for key {}: expected {}, got {}",
                attribute.name,
                attribute.attribute_type,
                value.type_descriptor()
            )));
        }
    }
    if exact && item.len() != attributes.len() {
        return Err(DynamoDBError::validation(
            "The provided key element does not match the schema",
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

/// One `#name <op> :value` clause, resolved against the alias maps.
#[derive(Debug)]
struct Clause {
    attribute: String,
    operator: Operator,
    value: AttributeValue,
}

/// Parse clauses joined by `AND`. Only the shape the expression builder
/// emits is understood.
fn parse_clauses(expression: Option<&str>, request: &ReadRequest) -> Result<Vec<Clause>, DynamoDBError> {
    let Some(expression) = expression.map(str::trim).filter(|e| !e.is_empty()) else {
        return Ok(Vec::new());
    };
    expression
        .split(" AND ")
        .map(|clause| {
            let tokens: Vec<&str> = clause.split_whitespace().collect();
            let [name, op, value] = tokens.as_slice() else {
                return Err(DynamoDBError::validation(format!(
                    "Unsupported expression clause: {clause}"
                )));
            };
            let attribute = if let Some(alias) = name.strip_prefix('#') {
                request
                    .expression_attribute_names
                    .get(*name)
                    .cloned()
                    .ok_or_else(|| {
                        DynamoDBError::validation(format!(
                            "An expression attribute name used in the document path is not defined; attribute name: #{alias}"
                        ))
                    })?
            } else {
                (*name).to_owned()
            };
            let operator = op.parse::<Operator>().map_err(|_| {
                DynamoDBError::validation(format!("Unsupported operator in expression: {op}"))
            })?;
            let value = request
                .expression_attribute_values
                .get(*value)
                .cloned()
                .ok_or_else(|| {
                    DynamoDBError::validation(format!(
                        "An expression attribute value used in expression is not defined; attribute value: {value}"
                    ))
                })?;
            Ok(Clause {
                attribute,
                operator,
                value,
            })
        })
        .collect()
}

fn validate_key_condition(clauses: &[Clause], index: &IndexDescriptor) -> Result<(), DynamoDBError> {
    let hash = &index.key_schema().hash_key().name;
    let has_hash_equality = clauses
        .iter()
        .any(|c| &c.attribute == hash && c.operator == Operator::Eq);
    if !has_hash_equality {
        return Err(DynamoDBError::validation(format!(
            "Query condition missed key schema element: {hash}"
        )));
    }
    if let Some(other) = clauses
        .iter()
        .find(|c| !index.key_schema().contains(&c.attribute))
    {
        return Err(DynamoDBError::validation(format!(
            "Query key condition not supported on non-key attribute: {}",
            other.attribute
        )));
    }
    Ok(())
}

fn matches_all(item: &Item, clauses: &[Clause]) -> bool {
    clauses.iter().all(|clause| {
        let Some(actual) = item.get(&clause.attribute) else {
            return false;
        };
        match actual.compare_scalar(&clause.value) {
            Some(ordering) => clause.operator.matches(ordering),
            None => match clause.operator {
                Operator::Eq => *actual == clause.value,
                Operator::Ne => *actual != clause.value,
                _ => false,
            },
        }
    })
}
