//! Integration tests for the dynadmin server.
//!
//! These tests need a DynamoDB-compatible endpoint (e.g. DynamoDB Local at
//! `localhost:8000`) and a dynadmin server pointed at it (`localhost:8001`).
//! They are marked `#[ignore]` so they don't run during normal `cargo test`.
//!
//! Run them with:
//! ```text
//! cargo test -p dynadmin-integration -- --ignored
//! ```

use std::sync::Once;

use aws_sdk_dynamodb::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue, BillingMode, KeySchemaElement, KeyType,
    ScalarAttributeType,
};

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Base URL of the dynadmin server under test.
#[must_use]
pub fn admin_url() -> String {
    env_or("DYNADMIN_URL", "http://localhost:8001")
}

/// HTTP client for the admin API. Redirects are not followed so tests can
/// inspect them.
#[must_use]
pub fn admin_client() -> reqwest::Client {
    init_tracing();
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("reqwest client")
}

/// DynamoDB client used to seed fixtures, pointed at the same store the
/// server reads.
#[must_use]
pub fn dynamodb_client() -> aws_sdk_dynamodb::Client {
    init_tracing();

    let creds = Credentials::new("key", "secret", None, None, "integration-test");
    let config = aws_sdk_dynamodb::config::Builder::new()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(creds)
        .endpoint_url(env_or("DYNAMO_ENDPOINT", "http://localhost:8000"))
        .build();

    aws_sdk_dynamodb::Client::from_conf(config)
}

#[must_use]
pub fn test_table_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string()[..8].to_owned();
    format!("test-{prefix}-{id}")
}

/// Create `pk` (S, hash) + `seq` (N, range) table with a `by-kind` GSI on
/// `kind`, and put `count` items under `pk = "p"`. Even items get
/// `kind = "even"`, odd ones `kind = "odd"`.
pub async fn create_events_table(client: &aws_sdk_dynamodb::Client, name: &str, count: usize) {
    let key = |attribute: &str, key_type: KeyType| {
        KeySchemaElement::builder()
            .attribute_name(attribute)
            .key_type(key_type)
            .build()
            .unwrap()
    };
    let definition = |attribute: &str, kind: ScalarAttributeType| {
        AttributeDefinition::builder()
            .attribute_name(attribute)
            .attribute_type(kind)
            .build()
            .unwrap()
    };
    let index = aws_sdk_dynamodb::types::GlobalSecondaryIndex::builder()
        .index_name("by-kind")
        .key_schema(key("kind", KeyType::Hash))
        .projection(
            aws_sdk_dynamodb::types::Projection::builder()
                .projection_type(aws_sdk_dynamodb::types::ProjectionType::All)
                .build(),
        )
        .build()
        .unwrap();

    client
        .create_table()
        .table_name(name)
        .key_schema(key("pk", KeyType::Hash))
        .key_schema(key("seq", KeyType::Range))
        .attribute_definitions(definition("pk", ScalarAttributeType::S))
        .attribute_definitions(definition("seq", ScalarAttributeType::N))
        .attribute_definitions(definition("kind", ScalarAttributeType::S))
        .global_secondary_indexes(index)
        .billing_mode(BillingMode::PayPerRequest)
        .send()
        .await
        .unwrap_or_else(|e| panic!("failed to create table {name}: {e}"));

    for seq in 0..count {
        let kind = if seq % 2 == 0 { "even" } else { "odd" };
        client
            .put_item()
            .table_name(name)
            .item("pk", AttributeValue::S("p".to_owned()))
            .item("seq", AttributeValue::N(seq.to_string()))
            .item("kind", AttributeValue::S(kind.to_owned()))
            .send()
            .await
            .unwrap_or_else(|e| panic!("failed to seed {name}: {e}"));
    }
}

pub async fn delete_table(client: &aws_sdk_dynamodb::Client, name: &str) {
    let _ = client.delete_table().table_name(name).send().await;
}

mod test_browse;
mod test_items;
