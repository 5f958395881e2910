//! The table store capability the browser is written against.
//!
//! The trait uses `#[async_trait]` because the provider holds the store as
//! `Arc<dyn TableStore>`, so it must be object-safe.

use std::collections::HashMap;
use std::fmt;

use dynadmin_model::attribute_value::{AttributeValue, Item};
use dynadmin_model::error::DynamoDBError;
use dynadmin_model::input::{QueryInput, ScanInput};
use dynadmin_model::output::ReadOutput;
use dynadmin_model::types::TableDescription;

use crate::filter::ExpressionParts;

/// Which read operation a [`ReadRequest`] is sent as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadMode {
    Scan,
    Query,
}

impl ReadMode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scan => "scan",
            Self::Query => "query",
        }
    }
}

impl fmt::Display for ReadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of one `Scan` or `Query` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadRequest {
    pub table_name: String,
    pub index_name: Option<String>,
    pub key_condition_expression: Option<String>,
    pub filter_expression: Option<String>,
    pub expression_attribute_names: HashMap<String, String>,
    pub expression_attribute_values: HashMap<String, AttributeValue>,
    pub exclusive_start_key: Option<Item>,
}

impl ReadRequest {
    #[must_use]
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_index(mut self, index_name: Option<String>) -> Self {
        self.index_name = index_name;
        self
    }

    #[must_use]
    pub fn with_expressions(mut self, parts: ExpressionParts) -> Self {
        self.key_condition_expression = parts.key_condition_expression;
        self.filter_expression = parts.filter_expression;
        self.expression_attribute_names = parts.names;
        self.expression_attribute_values = parts.values;
        self
    }

    /// The request as a `Scan` payload. Any key condition is dropped.
    #[must_use]
    pub fn to_scan_input(&self) -> ScanInput {
        ScanInput {
            table_name: self.table_name.clone(),
            index_name: self.index_name.clone(),
            filter_expression: self.filter_expression.clone(),
            expression_attribute_names: self.expression_attribute_names.clone(),
            expression_attribute_values: self.expression_attribute_values.clone(),
            exclusive_start_key: self.exclusive_start_key.clone().unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn to_query_input(&self) -> QueryInput {
        QueryInput {
            table_name: self.table_name.clone(),
            index_name: self.index_name.clone(),
            key_condition_expression: self.key_condition_expression.clone(),
            filter_expression: self.filter_expression.clone(),
            expression_attribute_names: self.expression_attribute_names.clone(),
            expression_attribute_values: self.expression_attribute_values.clone(),
            exclusive_start_key: self.exclusive_start_key.clone().unwrap_or_default(),
        }
    }
}

/// Items returned by one read call plus the continuation token, if the
/// store has more.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StorePage {
    pub items: Vec<Item>,
    pub next_start_key: Option<Item>,
}

impl From<ReadOutput> for StorePage {
    fn from(output: ReadOutput) -> Self {
        let next_start_key = if output.last_evaluated_key.is_empty() {
            None
        } else {
            Some(output.last_evaluated_key)
        };
        Self {
            items: output.items,
            next_start_key,
        }
    }
}

/// One `ListTables` page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableNamesPage {
    pub names: Vec<String>,
    pub last_evaluated: Option<String>,
}

/// Operations the browser needs from a DynamoDB-compatible store.
#[async_trait::async_trait]
pub trait TableStore: Send + Sync + fmt::Debug {
    async fn describe_table(&self, table_name: &str) -> Result<TableDescription, DynamoDBError>;

    async fn list_tables(
        &self,
        exclusive_start_table_name: Option<String>,
    ) -> Result<TableNamesPage, DynamoDBError>;

    async fn read(&self, request: &ReadRequest, mode: ReadMode)
    -> Result<StorePage, DynamoDBError>;

    async fn get_item(&self, table_name: &str, key: Item) -> Result<Option<Item>, DynamoDBError>;

    /// Write `item` in full, replacing any item with the same key.
    async fn put_item(&self, table_name: &str, item: Item) -> Result<(), DynamoDBError>;

    async fn delete_item(&self, table_name: &str, key: Item) -> Result<(), DynamoDBError>;
}
