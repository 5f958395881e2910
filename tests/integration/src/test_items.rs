//! Item create/read/replace/delete tests against a running dynadmin server.

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use crate::{admin_client, admin_url, create_events_table, delete_table, dynamodb_client, test_table_name};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_manage_item_lifecycle() {
        let client = dynamodb_client();
        let table = test_table_name("items");
        create_events_table(&client, &table, 0).await;
        let http = admin_client();
        let base = format!("{}/tables/{table}", admin_url());

        let template: Value = http
            .get(format!("{base}/add-item"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(template, json!({ "pk": "", "seq": 0 }));

        let created: Value = http
            .put(format!("{base}/add-item"))
            .json(&json!({ "pk": "a,b", "seq": 5, "kind": "odd", "tags": ["x"] }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(created["key"], "a%2Cb,5");
        let location = format!("{}{}", admin_url(), created["location"].as_str().unwrap());

        let item: Value = http.get(&location).send().await.unwrap().json().await.unwrap();
        assert_eq!(item["tags"], json!(["x"]));

        let replaced: Value = http
            .put(&location)
            .json(&json!({ "pk": "a,b", "seq": 5, "kind": "changed" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(replaced["kind"], "changed");
        assert!(replaced.get("tags").is_none());

        let deleted = http.delete(&location).send().await.unwrap();
        assert_eq!(deleted.status(), 204);
        let missing = http.get(&location).send().await.unwrap();
        assert_eq!(missing.status(), 404);

        delete_table(&client, &table).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_redirect_key_lookup_to_item() {
        let client = dynamodb_client();
        let table = test_table_name("lookup");
        create_events_table(&client, &table, 3).await;

        let url = reqwest::Url::parse_with_params(
            &format!("{}/tables/{table}/get", admin_url()),
            &[("hash", "p"), ("range", "2")],
        )
        .unwrap();
        let response = admin_client()
            .get(url)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 302);
        assert_eq!(
            response.headers()["location"],
            format!("/tables/{table}/items/p,2").as_str()
        );

        delete_table(&client, &table).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_malformed_item_key() {
        let client = dynamodb_client();
        let table = test_table_name("badkey");
        create_events_table(&client, &table, 0).await;

        let response = admin_client()
            .get(format!("{}/tables/{table}/items/p,notanumber", admin_url()))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
        let json: Value = response.json().await.unwrap();
        assert_eq!(json["code"], "KeyTypeError");

        delete_table(&client, &table).await;
    }
}
