//! Browser operations over a [`TableStore`].
//!
//! Each operation resolves the table's schema from `DescribeTable` first, so
//! key parsing, index selection and expression routing always follow the
//! live metadata.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use dynadmin_model::attribute_value::{AttributeValue, Item};
use dynadmin_model::types::ScalarAttributeType;
use tracing::{debug, info, warn};

use crate::config::AdminConfig;
use crate::error::AdminError;
use crate::filter::{FilterSpec, Operator, build_expressions};
use crate::key_codec::{
    CompositeKey, encode_key, escape_component, extract_key, extract_keys_for_items,
    key_from_components, parse_key,
};
use crate::page::PageAssembler;
use crate::paginator::{CallResult, Paginator};
use crate::schema::{KeyAttribute, TABLE_SELECTION, TableSchema};
use crate::store::{ReadMode, ReadRequest, StorePage, TableStore};

/// `ListTables` calls allowed while listing every table.
const LIST_TABLES_MAX_CALLS: usize = 100;

// ---------------------------------------------------------------------------
// Request and response shapes
// ---------------------------------------------------------------------------

/// Raw browse parameters as the caller sent them. Empty strings count as
/// absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowseRequest {
    /// JSON filter object.
    pub filters: Option<String>,
    /// Encoded cursor to resume after.
    pub start_key: Option<String>,
    /// Cursor of the previous page, echoed back for navigation.
    pub prev_key: Option<String>,
    pub page_num: Option<String>,
    /// `scan` (default) or `query`.
    pub operation_type: Option<String>,
    /// `table` (default) or an index name.
    pub queryable_selection: Option<String>,
}

/// An item together with its encoded table key.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedItem {
    pub key: String,
    pub item: Item,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BrowsePage {
    pub items: Vec<KeyedItem>,
    /// Display columns: table key attributes, then every other attribute in
    /// first-seen order.
    pub unique_keys: Vec<String>,
    pub next_key: Option<String>,
    pub start_key: Option<String>,
    pub prev_key: Option<String>,
    pub page_num: u64,
    pub operation_type: ReadMode,
    pub queryable_selection: String,
    pub filters: Option<String>,
    /// The store call cap ended the walk early; `next_key` continues it.
    pub truncated: bool,
}

/// Table description plus the choices a filter form offers.
#[derive(Debug, Clone)]
pub struct TableOverview {
    pub schema: TableSchema,
    pub operators: Vec<Operator>,
    pub attribute_types: Vec<ScalarAttributeType>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum KeyLookup {
    /// Path of the item addressed by the supplied key.
    Redirect(String),
    /// No key supplied: the key attributes a lookup form needs.
    Form {
        table: String,
        hash_key: KeyAttribute,
        range_key: Option<KeyAttribute>,
    },
}

#[derive(Debug, Clone)]
pub struct TableMeta {
    pub schema: TableSchema,
    /// First page of an unfiltered scan, as the store returned it.
    pub first_page: StorePage,
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// The browser operations. Cheap to share: configuration and store are
/// fixed at construction.
#[derive(Clone)]
pub struct AdminProvider {
    config: AdminConfig,
    store: Arc<dyn TableStore>,
}

impl fmt::Debug for AdminProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminProvider")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AdminProvider {
    #[must_use]
    pub fn new(config: AdminConfig, store: Arc<dyn TableStore>) -> Self {
        info!(
            page_size = config.page_size,
            max_calls = config.max_calls,
            "Admin provider ready"
        );
        Self { config, store }
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.config
    }

    /// Every table name, following `ListTables` pagination.
    pub async fn list_tables(&self) -> Result<Vec<String>, AdminError> {
        let store = &*self.store;
        let result = Paginator::new(LIST_TABLES_MAX_CALLS)
            .paginate(
                |start: Option<String>| async move {
                    let page = store.list_tables(start).await?;
                    Ok::<_, AdminError>(CallResult {
                        items: page.names,
                        next_start_key: page.last_evaluated,
                    })
                },
                None,
                |_: &[String], _: Option<&String>| false,
            )
            .await?;
        if result.capped {
            warn!(
                tables = result.items.len(),
                "Stopped listing tables at the call cap"
            );
        }
        Ok(result.items)
    }

    pub async fn describe_table(&self, table_name: &str) -> Result<TableSchema, AdminError> {
        let description = self
            .store
            .describe_table(table_name)
            .await
            .map_err(|e| AdminError::from_table_call(table_name, e))?;
        TableSchema::from_description(description)
    }

    pub async fn table_overview(&self, table_name: &str) -> Result<TableOverview, AdminError> {
        Ok(TableOverview {
            schema: self.describe_table(table_name).await?,
            operators: Operator::ALL.to_vec(),
            attribute_types: vec![ScalarAttributeType::S, ScalarAttributeType::N],
        })
    }

    /// Resolve the "get item by key" form. With a hash value this yields
    /// the item path; without one, the key attributes to ask for.
    pub async fn key_lookup(
        &self,
        table_name: &str,
        hash: Option<&str>,
        range: Option<&str>,
    ) -> Result<KeyLookup, AdminError> {
        let schema = self.describe_table(table_name).await?;
        let Some(hash) = hash else {
            return Ok(KeyLookup::Form {
                table: schema.name().to_owned(),
                hash_key: schema.hash_key().clone(),
                range_key: schema.range_key().cloned(),
            });
        };

        let mut components = vec![hash];
        components.extend(range);
        let key = key_from_components(&components, schema.key_schema().attributes())?;
        Ok(KeyLookup::Redirect(item_path(schema.name(), &key)))
    }

    /// One page of a scan or query with the caller's filters applied.
    pub async fn browse(
        &self,
        table_name: &str,
        request: &BrowseRequest,
    ) -> Result<BrowsePage, AdminError> {
        let schema = self.describe_table(table_name).await?;

        let mode = match non_empty(request.operation_type.as_deref()) {
            None | Some("scan") => ReadMode::Scan,
            Some("query") => ReadMode::Query,
            Some(other) => {
                return Err(AdminError::Validation(format!(
                    "unknown operation type '{other}', expected scan or query"
                )));
            }
        };
        let page_num = match non_empty(request.page_num.as_deref()) {
            None => 1,
            Some(text) => text
                .parse::<u64>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| AdminError::Validation(format!("invalid page number '{text}'")))?,
        };
        let selection = non_empty(request.queryable_selection.as_deref()).unwrap_or(TABLE_SELECTION);
        let index = schema.select_index(Some(selection))?;

        let spec = match non_empty(request.filters.as_deref()) {
            Some(json) => FilterSpec::from_json(json)?,
            None => FilterSpec::new(),
        };
        let active_index = (mode == ReadMode::Query).then_some(index);
        let parts = build_expressions(&spec, active_index);
        if mode == ReadMode::Query && parts.key_condition_expression.is_none() {
            return Err(AdminError::Validation(format!(
                "a query needs a condition on '{}', the hash key of the selected index",
                index.key_schema().hash_key().name
            )));
        }

        let cursor_attributes = schema.cursor_key_attributes(index);
        let start_key = non_empty(request.start_key.as_deref())
            .map(|encoded| parse_key(encoded, &cursor_attributes))
            .transpose()?
            .map(CompositeKey::into_item);

        let read = ReadRequest::new(schema.name())
            .with_index(index.name().map(str::to_owned))
            .with_expressions(parts);
        debug!(
            table = %schema.name(),
            index = ?index.name(),
            %mode,
            filters = spec.conditions().len(),
            resumed = start_key.is_some(),
            "Browsing table"
        );
        let page = PageAssembler::new(&*self.store, Paginator::new(self.config.max_calls))
            .get_page(
                &cursor_attributes,
                &read,
                mode,
                self.config.page_size,
                start_key,
            )
            .await
            .map_err(|e| match e {
                AdminError::Store(e) => AdminError::from_table_call(table_name, e),
                other => other,
            })?;

        let table_key = schema.key_schema().attributes();
        let mut unique_keys: Vec<String> = table_key.iter().map(|a| a.name.clone()).collect();
        let raw_items: Vec<Item> = page.items;
        for name in extract_keys_for_items(&raw_items) {
            if !unique_keys.contains(&name) {
                unique_keys.push(name);
            }
        }
        let items = raw_items
            .into_iter()
            .map(|item| {
                let key = encode_key(&extract_key(&item, table_key)?);
                Ok(KeyedItem { key, item })
            })
            .collect::<Result<Vec<_>, AdminError>>()?;

        Ok(BrowsePage {
            items,
            unique_keys,
            next_key: page.next_cursor.as_ref().map(encode_key),
            start_key: non_empty(request.start_key.as_deref()).map(str::to_owned),
            prev_key: non_empty(request.prev_key.as_deref()).map(str::to_owned),
            page_num,
            operation_type: mode,
            queryable_selection: selection.to_owned(),
            filters: non_empty(request.filters.as_deref()).map(str::to_owned),
            truncated: page.truncated,
        })
    }

    /// Description plus the first raw scan page.
    pub async fn table_meta(&self, table_name: &str) -> Result<TableMeta, AdminError> {
        let schema = self.describe_table(table_name).await?;
        let first_page = self
            .store
            .read(&ReadRequest::new(schema.name()), ReadMode::Scan)
            .await
            .map_err(|e| AdminError::from_table_call(table_name, e))?;
        Ok(TableMeta { schema, first_page })
    }

    /// An item holding only the key attributes, each set to an empty value
    /// of its type.
    pub async fn new_item_template(&self, table_name: &str) -> Result<Item, AdminError> {
        let schema = self.describe_table(table_name).await?;
        Ok(schema
            .key_schema()
            .attributes()
            .iter()
            .map(|attribute| {
                let value = match attribute.attribute_type {
                    ScalarAttributeType::N => AttributeValue::N("0".to_owned()),
                    ScalarAttributeType::B => AttributeValue::B(Bytes::new()),
                    _ => AttributeValue::S(String::new()),
                };
                (attribute.name.clone(), value)
            })
            .collect())
    }

    pub async fn get_item(
        &self,
        table_name: &str,
        encoded_key: &str,
    ) -> Result<Option<Item>, AdminError> {
        let schema = self.describe_table(table_name).await?;
        let key = schema.parse_item_key(encoded_key)?;
        self.store
            .get_item(schema.name(), key.into_item())
            .await
            .map_err(|e| AdminError::from_table_call(table_name, e))
    }

    /// Store a new item and read it back by its key.
    pub async fn create_item(
        &self,
        table_name: &str,
        item: Item,
    ) -> Result<CompositeKey, AdminError> {
        let schema = self.describe_table(table_name).await?;
        let key = extract_key(&item, schema.key_schema().attributes())?;
        self.store
            .put_item(schema.name(), item)
            .await
            .map_err(|e| AdminError::from_table_call(table_name, e))?;
        let stored = self
            .store
            .get_item(schema.name(), key.to_item())
            .await
            .map_err(|e| AdminError::from_table_call(table_name, e))?;
        if stored.is_none() {
            return Err(AdminError::ItemNotFound);
        }
        info!(table = %schema.name(), key = %encode_key(&key), "Created item");
        Ok(key)
    }

    /// Replace the item at `encoded_key` in full and return what was stored.
    ///
    /// The body must carry the same key as the path.
    pub async fn replace_item(
        &self,
        table_name: &str,
        encoded_key: &str,
        item: Item,
    ) -> Result<Item, AdminError> {
        let schema = self.describe_table(table_name).await?;
        let key = schema.parse_item_key(encoded_key)?;
        let body_key = extract_key(&item, schema.key_schema().attributes())?;
        if !same_key(&key, &body_key) {
            return Err(AdminError::Validation(format!(
                "item key {} does not match the key in the path {encoded_key}",
                encode_key(&body_key)
            )));
        }
        self.store
            .put_item(schema.name(), item)
            .await
            .map_err(|e| AdminError::from_table_call(table_name, e))?;
        let stored = self
            .store
            .get_item(schema.name(), key.into_item())
            .await
            .map_err(|e| AdminError::from_table_call(table_name, e))?;
        stored.ok_or(AdminError::ItemNotFound)
    }

    pub async fn delete_item(&self, table_name: &str, encoded_key: &str) -> Result<(), AdminError> {
        let schema = self.describe_table(table_name).await?;
        let key = schema.parse_item_key(encoded_key)?;
        self.store
            .delete_item(schema.name(), key.into_item())
            .await
            .map_err(|e| AdminError::from_table_call(table_name, e))?;
        info!(table = %schema.name(), key = %encoded_key, "Deleted item");
        Ok(())
    }
}

/// Path of an item in the admin API.
#[must_use]
pub fn item_path(table_name: &str, key: &CompositeKey) -> String {
    format!(
        "/tables/{}/items/{}",
        escape_component(table_name),
        encode_key(key)
    )
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Keys are equal when every component compares equal, so `1` and `1.0`
/// address the same item.
fn same_key(a: &CompositeKey, b: &CompositeKey) -> bool {
    a.len() == b.len()
        && a.components()
            .iter()
            .zip(b.components())
            .all(|((na, va), (nb, vb))| na == nb && va.compare_scalar(vb) == Some(Ordering::Equal))
}
