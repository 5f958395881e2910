//! Browse and pagination tests against a running dynadmin server.

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use crate::{admin_client, admin_url, create_events_table, delete_table, dynamodb_client, test_table_name};

    fn items_url(table: &str, query: &[(&str, &str)]) -> reqwest::Url {
        reqwest::Url::parse_with_params(&format!("{}/tables/{table}/items", admin_url()), query)
            .unwrap()
    }

    async fn browse(table: &str, query: &[(&str, &str)]) -> Value {
        let response = admin_client()
            .get(items_url(table, query))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        response.json().await.unwrap()
    }

    fn seqs(page: &Value) -> Vec<i64> {
        page["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item["seq"].as_i64().unwrap())
            .collect()
    }

    /// Follow `nextKey` until the last page, returning each page's items.
    async fn walk(table: &str, extra: &[(&str, &str)]) -> Vec<Vec<i64>> {
        let mut pages = Vec::new();
        let mut start: Option<String> = None;
        loop {
            let mut query = extra.to_vec();
            if let Some(start) = &start {
                query.push(("startKey", start.as_str()));
            }
            let page = browse(table, &query).await;
            pages.push(seqs(&page));
            match page["nextKey"].as_str() {
                Some(next) => start = Some(next.to_owned()),
                None => return pages,
            }
        }
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_list_created_table() {
        let client = dynamodb_client();
        let table = test_table_name("list");
        create_events_table(&client, &table, 0).await;

        let response = admin_client()
            .get(format!("{}/tables", admin_url()))
            .send()
            .await
            .unwrap();
        let json: Value = response.json().await.unwrap();
        let tables: Vec<&str> = json["tables"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert!(tables.contains(&table.as_str()));

        delete_table(&client, &table).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_walk_every_item_exactly_once() {
        let client = dynamodb_client();
        let table = test_table_name("walk");
        create_events_table(&client, &table, 60).await;

        let pages = walk(&table, &[]).await;
        let mut all: Vec<i64> = pages.iter().flatten().copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..60).collect::<Vec<_>>());

        delete_table(&client, &table).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_query_with_key_condition_and_filter() {
        let client = dynamodb_client();
        let table = test_table_name("query");
        create_events_table(&client, &table, 40).await;

        let filters = r#"{"pk": {"operator": "=", "value": "p"},
                          "seq": {"operator": ">=", "value": "10", "type": "N"},
                          "kind": {"operator": "=", "value": "odd"}}"#;
        let pages = walk(&table, &[("operationType", "query"), ("filters", filters)]).await;
        let all: Vec<i64> = pages.iter().flatten().copied().collect();
        assert_eq!(all, (11..40).step_by(2).collect::<Vec<_>>());

        delete_table(&client, &table).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_query_secondary_index() {
        let client = dynamodb_client();
        let table = test_table_name("gsi");
        create_events_table(&client, &table, 30).await;

        let filters = r#"{"kind": {"operator": "=", "value": "even"}}"#;
        let pages = walk(
            &table,
            &[
                ("operationType", "query"),
                ("queryableSelection", "by-kind"),
                ("filters", filters),
            ],
        )
        .await;
        let mut all: Vec<i64> = pages.iter().flatten().copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..30).step_by(2).collect::<Vec<_>>());

        delete_table(&client, &table).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_query_without_hash_condition() {
        let client = dynamodb_client();
        let table = test_table_name("nokey");
        create_events_table(&client, &table, 1).await;

        let response = admin_client()
            .get(items_url(&table, &[("operationType", "query")]))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
        let json: Value = response.json().await.unwrap();
        assert_eq!(json["code"], "ValidationError");

        delete_table(&client, &table).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_return_404_for_unknown_table() {
        let response = admin_client()
            .get(format!("{}/tables/{}/items", admin_url(), test_table_name("ghost")))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 404);
        assert!(response.headers().contains_key("x-request-id"));
    }
}
