//! Response payloads for the operations the browser issues.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::attribute_value::Item;
use crate::types::TableDescription;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeTableOutput {
    #[serde(rename = "Table", skip_serializing_if = "Option::is_none")]
    pub table: Option<TableDescription>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListTablesOutput {
    #[serde(default)]
    pub table_names: Vec<String>,
    /// Present when more table names remain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_evaluated_table_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetItemOutput {
    /// Absent when no item has the requested key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<Item>,
}

/// Shared shape of `Query` and `Scan` responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReadOutput {
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub count: i32,
    #[serde(default)]
    pub scanned_count: i32,
    /// Key of the last evaluated item; empty once the read is exhausted.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub last_evaluated_key: Item,
}

pub type QueryOutput = ReadOutput;
pub type ScanOutput = ReadOutput;
