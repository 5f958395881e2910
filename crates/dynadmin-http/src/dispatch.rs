//! Handler trait and the provider-backed implementation.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use dynadmin_core::AdminError;
use dynadmin_core::AdminProvider;
use dynadmin_core::key_codec::encode_key;
use dynadmin_core::provider::{BrowsePage, BrowseRequest, KeyLookup, TableMeta, TableOverview, item_path};
use dynadmin_core::schema::TABLE_SELECTION;
use dynadmin_model::attribute_value::Item;
use dynadmin_model::document::{document_to_item, item_to_document};
use http::StatusCode;
use serde_json::{Value, json};

use crate::body::AdminResponseBody;
use crate::error::ApiError;
use crate::response::{json_response, no_content, redirect};
use crate::router::{AdminRoute, QueryParams};

/// Field carrying an item's encoded key in browse results.
pub const KEY_FIELD: &str = "__key";

pub type RouteFuture =
    Pin<Box<dyn Future<Output = Result<http::Response<AdminResponseBody>, ApiError>> + Send>>;

/// The boundary between HTTP transport and the browser operations.
pub trait AdminHandler: Send + Sync + 'static {
    fn handle_route(&self, route: AdminRoute, query: QueryParams, body: Bytes) -> RouteFuture;
}

pub async fn dispatch_route<H: AdminHandler>(
    handler: &H,
    route: AdminRoute,
    query: QueryParams,
    body: Bytes,
) -> Result<http::Response<AdminResponseBody>, ApiError> {
    tracing::debug!(route = %route, table = ?route.table(), "dispatching admin route");
    handler.handle_route(route, query, body).await
}

/// Serves every route from an [`AdminProvider`].
#[derive(Debug, Clone)]
pub struct ProviderHandler {
    provider: AdminProvider,
}

impl ProviderHandler {
    #[must_use]
    pub fn new(provider: AdminProvider) -> Self {
        Self { provider }
    }
}

impl AdminHandler for ProviderHandler {
    fn handle_route(&self, route: AdminRoute, query: QueryParams, body: Bytes) -> RouteFuture {
        let provider = self.provider.clone();
        Box::pin(async move { handle(&provider, route, &query, &body).await })
    }
}

async fn handle(
    provider: &AdminProvider,
    route: AdminRoute,
    query: &QueryParams,
    body: &[u8],
) -> Result<http::Response<AdminResponseBody>, ApiError> {
    match route {
        AdminRoute::Health => json_response(StatusCode::OK, &json!({ "status": "ok" })),
        AdminRoute::ListTables => {
            let tables = provider.list_tables().await?;
            json_response(StatusCode::OK, &json!({ "tables": tables }))
        }
        AdminRoute::TableOverview { table } => {
            let overview = provider.table_overview(&table).await?;
            json_response(StatusCode::OK, &overview_json(&overview))
        }
        AdminRoute::KeyLookup { table } => {
            let hash = query.get("hash").map(String::as_str);
            let range = query.get("range").map(String::as_str);
            match provider.key_lookup(&table, hash, range).await? {
                KeyLookup::Redirect(location) => redirect(&location),
                KeyLookup::Form {
                    table,
                    hash_key,
                    range_key,
                } => json_response(
                    StatusCode::OK,
                    &json!({ "table": table, "hashKey": hash_key, "rangeKey": range_key }),
                ),
            }
        }
        AdminRoute::Browse { table } => {
            let request = browse_request(query);
            let page = provider.browse(&table, &request).await?;
            json_response(StatusCode::OK, &browse_json(&page))
        }
        AdminRoute::TableMeta { table } => {
            let meta = provider.table_meta(&table).await?;
            json_response(StatusCode::OK, &meta_json(&meta))
        }
        AdminRoute::NewItemTemplate { table } => {
            let template = provider.new_item_template(&table).await?;
            json_response(StatusCode::OK, &item_to_document(&template))
        }
        AdminRoute::CreateItem { table } => {
            let item = parse_item(body)?;
            let key = provider.create_item(&table, item).await?;
            json_response(
                StatusCode::OK,
                &json!({ "key": encode_key(&key), "location": item_path(&table, &key) }),
            )
        }
        AdminRoute::GetItem { table, key } => match provider.get_item(&table, &key).await? {
            Some(item) => json_response(StatusCode::OK, &item_to_document(&item)),
            None => Err(AdminError::ItemNotFound.into()),
        },
        AdminRoute::ReplaceItem { table, key } => {
            let item = parse_item(body)?;
            let stored = provider.replace_item(&table, &key, item).await?;
            json_response(StatusCode::OK, &item_to_document(&stored))
        }
        AdminRoute::DeleteItem { table, key } => {
            provider.delete_item(&table, &key).await?;
            Ok(no_content())
        }
    }
}

fn browse_request(query: &QueryParams) -> BrowseRequest {
    let param = |name: &str| query.get(name).cloned();
    BrowseRequest {
        filters: param("filters"),
        start_key: param("startKey"),
        prev_key: param("prevKey"),
        page_num: param("pageNum"),
        operation_type: param("operationType"),
        queryable_selection: param("queryableSelection"),
    }
}

/// Decode a plain JSON document body into an item.
fn parse_item(body: &[u8]) -> Result<Item, ApiError> {
    let document: Value =
        serde_json::from_slice(body).map_err(|e| ApiError::InvalidBody(e.to_string()))?;
    document_to_item(&document).map_err(|e| ApiError::InvalidBody(e.message))
}

fn overview_json(overview: &TableOverview) -> Value {
    let schema = &overview.schema;
    let indexes: Vec<Value> = schema
        .indexes()
        .iter()
        .map(|index| {
            json!({
                "name": index.name(),
                "kind": index.kind(),
                "keySchema": index.key_schema().attributes(),
                "projection": index.projection(),
            })
        })
        .collect();
    let mut selections = vec![TABLE_SELECTION.to_owned()];
    selections.extend(
        schema
            .indexes()
            .iter()
            .filter_map(|index| index.name().map(str::to_owned)),
    );
    let operators: Vec<Value> = overview
        .operators
        .iter()
        .map(|op| json!({ "value": op.as_str(), "label": op.label() }))
        .collect();
    let attribute_types: Vec<Value> = overview
        .attribute_types
        .iter()
        .map(|t| json!({ "value": t.as_str(), "label": t.label() }))
        .collect();

    json!({
        "table": schema.description(),
        "keySchema": schema.key_schema().attributes(),
        "indexes": indexes,
        "queryableSelections": selections,
        "operators": operators,
        "attributeTypes": attribute_types,
    })
}

fn browse_json(page: &BrowsePage) -> Value {
    let items: Vec<Value> = page
        .items
        .iter()
        .map(|keyed| {
            let mut document = item_to_document(&keyed.item);
            if let Value::Object(fields) = &mut document {
                fields.insert(KEY_FIELD.to_owned(), Value::String(keyed.key.clone()));
            }
            document
        })
        .collect();
    json!({
        "items": items,
        "uniqueKeys": page.unique_keys,
        "nextKey": page.next_key,
        "startKey": page.start_key,
        "prevKey": page.prev_key,
        "pageNum": page.page_num,
        "operationType": page.operation_type.as_str(),
        "queryableSelection": page.queryable_selection,
        "filters": page.filters,
        "truncated": page.truncated,
    })
}

/// Items stay in DynamoDB JSON here, exactly as the store returned them.
fn meta_json(meta: &TableMeta) -> Value {
    json!({
        "table": meta.schema.description(),
        "items": meta.first_page.items,
        "lastEvaluatedKey": meta.first_page.next_start_key,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use dynadmin_core::AdminConfig;
    use dynadmin_core::memory::MemoryStore;
    use dynadmin_core::store::TableStore;
    use dynadmin_model::attribute_value::AttributeValue;
    use dynadmin_model::types::{
        AttributeDefinition, KeySchemaElement, KeyType, ScalarAttributeType, TableDescription,
    };
    use http_body_util::BodyExt;

    use super::*;
    use crate::router::parse_query;

    async fn handler(count: i64) -> ProviderHandler {
        let store = MemoryStore::with_max_page_items(4);
        store
            .create_table(TableDescription {
                table_name: Some("events".to_owned()),
                key_schema: vec![
                    KeySchemaElement::new("pk", KeyType::Hash),
                    KeySchemaElement::new("seq", KeyType::Range),
                ],
                attribute_definitions: vec![
                    AttributeDefinition::new("pk", ScalarAttributeType::S),
                    AttributeDefinition::new("seq", ScalarAttributeType::N),
                ],
                ..TableDescription::default()
            })
            .unwrap();
        for seq in 0..count {
            let item = Item::from([
                ("pk".to_owned(), AttributeValue::S("p".to_owned())),
                ("seq".to_owned(), AttributeValue::N(seq.to_string())),
            ]);
            store.put_item("events", item).await.unwrap();
        }
        let config = AdminConfig {
            page_size: 3,
            max_calls: 10,
        };
        ProviderHandler::new(AdminProvider::new(config, Arc::new(store)))
    }

    async fn call(
        handler: &ProviderHandler,
        route: AdminRoute,
        query: &str,
        body: &str,
    ) -> Result<(StatusCode, Value), ApiError> {
        let response = dispatch_route(
            handler,
            route,
            parse_query(Some(query)),
            Bytes::from(body.to_owned()),
        )
        .await?;
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        Ok((status, json))
    }

    fn events() -> String {
        "events".to_owned()
    }

    #[tokio::test]
    async fn test_should_browse_with_keys_and_cursor() {
        let handler = handler(5).await;
        let (status, json) = call(&handler, AdminRoute::Browse { table: events() }, "", "")
            .await
            .unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["items"].as_array().unwrap().len(), 3);
        assert_eq!(json["items"][0]["__key"], "p,0");
        assert_eq!(json["items"][0]["seq"], 0);
        assert_eq!(json["nextKey"], "p,2");
        assert_eq!(json["pageNum"], 1);
        assert_eq!(json["operationType"], "scan");
        assert_eq!(json["uniqueKeys"], json!(["pk", "seq"]));

        let (_, next) = call(
            &handler,
            AdminRoute::Browse { table: events() },
            "startKey=p%2C2&pageNum=2&prevKey=",
            "",
        )
        .await
        .unwrap();
        assert_eq!(next["items"][0]["__key"], "p,3");
        assert_eq!(next["nextKey"], Value::Null);
        assert_eq!(next["prevKey"], Value::Null);
    }

    #[tokio::test]
    async fn test_should_describe_overview_choices() {
        let handler = handler(0).await;
        let (_, json) = call(&handler, AdminRoute::TableOverview { table: events() }, "", "")
            .await
            .unwrap();
        assert_eq!(json["table"]["TableName"], "events");
        assert_eq!(json["keySchema"][1], json!({ "name": "seq", "type": "N" }));
        assert_eq!(json["queryableSelections"], json!(["table"]));
        assert_eq!(json["operators"][1], json!({ "value": "<>", "label": "\u{2260}" }));
        assert_eq!(json["attributeTypes"][1], json!({ "value": "N", "label": "Number" }));
    }

    #[tokio::test]
    async fn test_should_redirect_key_lookup_or_describe_form() {
        let handler = handler(0).await;
        let response = dispatch_route(
            &handler,
            AdminRoute::KeyLookup { table: events() },
            parse_query(Some("hash=p&range=4")),
            Bytes::new(),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[http::header::LOCATION], "/tables/events/items/p,4");

        let (_, form) = call(&handler, AdminRoute::KeyLookup { table: events() }, "hash=", "")
            .await
            .unwrap();
        assert_eq!(form["hashKey"]["name"], "pk");
        assert_eq!(form["rangeKey"]["type"], "N");
    }

    #[tokio::test]
    async fn test_should_round_trip_item_lifecycle() {
        let handler = handler(0).await;
        let (_, created) = call(
            &handler,
            AdminRoute::CreateItem { table: events() },
            "",
            r#"{"pk": "a/b", "seq": 7, "note": "hi"}"#,
        )
        .await
        .unwrap();
        assert_eq!(created["key"], "a%2Fb,7");
        assert_eq!(created["location"], "/tables/events/items/a%2Fb,7");

        let item_route = |key: &str| AdminRoute::GetItem {
            table: events(),
            key: key.to_owned(),
        };
        let (_, item) = call(&handler, item_route("a%2Fb,7"), "", "").await.unwrap();
        assert_eq!(item["note"], "hi");

        let (_, replaced) = call(
            &handler,
            AdminRoute::ReplaceItem {
                table: events(),
                key: "a%2Fb,7".to_owned(),
            },
            "",
            r#"{"pk": "a/b", "seq": 7, "note": "bye"}"#,
        )
        .await
        .unwrap();
        assert_eq!(replaced["note"], "bye");

        let (status, _) = call(
            &handler,
            AdminRoute::DeleteItem {
                table: events(),
                key: "a%2Fb,7".to_owned(),
            },
            "",
            "",
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let err = call(&handler, item_route("a%2Fb,7"), "", "").await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_should_return_large_numbers_unchanged() {
        let handler = handler(0).await;
        call(
            &handler,
            AdminRoute::CreateItem { table: events() },
            "",
            r#"{"pk": "big", "seq": 1, "total": 123456789012345678901234567890}"#,
        )
        .await
        .unwrap();

        let response = dispatch_route(
            &handler,
            AdminRoute::GetItem {
                table: events(),
                key: "big,1".to_owned(),
            },
            QueryParams::new(),
            Bytes::new(),
        )
        .await
        .unwrap();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("\"total\":123456789012345678901234567890"), "{text}");
    }

    #[tokio::test]
    async fn test_should_reject_unparsable_item_body() {
        let handler = handler(0).await;
        for body in ["not json", "[1, 2]"] {
            let err = call(&handler, AdminRoute::CreateItem { table: events() }, "", body)
                .await
                .unwrap_err();
            assert!(matches!(err, ApiError::InvalidBody(_)), "body {body}");
        }
    }

    #[tokio::test]
    async fn test_should_serve_template_and_meta() {
        let handler = handler(6).await;
        let (_, template) = call(&handler, AdminRoute::NewItemTemplate { table: events() }, "", "")
            .await
            .unwrap();
        assert_eq!(template, json!({ "pk": "", "seq": 0 }));

        let (_, meta) = call(&handler, AdminRoute::TableMeta { table: events() }, "", "")
            .await
            .unwrap();
        assert_eq!(meta["items"].as_array().unwrap().len(), 4);
        assert_eq!(meta["items"][0]["seq"], json!({ "N": "0" }));
        assert_eq!(meta["lastEvaluatedKey"]["seq"], json!({ "N": "3" }));
    }

    #[tokio::test]
    async fn test_should_report_missing_table() {
        let handler = handler(0).await;
        let err = call(&handler, AdminRoute::TableMeta { table: "ghost".to_owned() }, "", "")
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "TableNotFound");
    }
}
