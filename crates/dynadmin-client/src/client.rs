//! [`TableStore`] over the DynamoDB JSON 1.0 protocol.
//!
//! Every operation is a signed `POST /` whose `X-Amz-Target` header names
//! the operation. Failed responses carry `{"__type", "message"}` and are
//! decoded into [`DynamoDBError`].

use std::time::Instant;

use chrono::Utc;
use dynadmin_core::store::{ReadMode, ReadRequest, StorePage, TableNamesPage, TableStore};
use dynadmin_model::attribute_value::Item;
use dynadmin_model::error::DynamoDBError;
use dynadmin_model::input::{
    DeleteItemInput, DescribeTableInput, GetItemInput, ListTablesInput, PutItemInput,
};
use dynadmin_model::operations::DynamoDBOperation;
use dynadmin_model::output::{DescribeTableOutput, GetItemOutput, ListTablesOutput, ReadOutput};
use dynadmin_model::types::TableDescription;
use serde::Serialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::sigv4::{self, SigningParams};

pub const CONTENT_TYPE: &str = "application/x-amz-json-1.0";
const SERVICE: &str = "dynamodb";
const CRC32_HEADER: &str = "x-amz-crc32";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// DynamoDB client holding one connection pool for the process.
#[derive(Debug, Clone)]
pub struct DynamoDbClient {
    http: reqwest::Client,
    url: reqwest::Url,
    /// `host[:port]` as signed.
    host: String,
    config: ClientConfig,
}

impl DynamoDbClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let invalid = |reason: String| ClientError::InvalidEndpoint {
            endpoint: config.endpoint.clone(),
            reason,
        };
        let url = reqwest::Url::parse(&config.endpoint).map_err(|e| invalid(e.to_string()))?;
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_owned(),
            (None, _) => return Err(invalid("missing host".to_owned())),
        };
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            url,
            host,
            config,
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.url.as_str()
    }

    async fn call<I, O>(&self, operation: DynamoDBOperation, input: &I) -> Result<O, DynamoDBError>
    where
        I: Serialize + Sync,
        O: DeserializeOwned,
    {
        let body = serde_json::to_vec(input)
            .map_err(|e| DynamoDBError::serialization_exception(e.to_string()))?;
        let target = operation.target();
        let params = SigningParams {
            credentials: &self.config.credentials,
            region: &self.config.region,
            service: SERVICE,
            time: Utc::now(),
        };
        let amz_date = params.amz_date();

        let mut headers = vec![
            ("content-type", CONTENT_TYPE),
            ("host", self.host.as_str()),
            ("x-amz-date", amz_date.as_str()),
            ("x-amz-target", target.as_str()),
        ];
        if let Some(token) = &self.config.credentials.session_token {
            headers.push(("x-amz-security-token", token.as_str()));
        }
        let authorization = sigv4::sign(
            &params,
            "POST",
            self.url.path(),
            self.url.query().unwrap_or(""),
            &headers,
            &body,
        );

        // reqwest derives Host from the URL, which matches `self.host`.
        let mut request = self.http.post(self.url.clone());
        for (name, value) in headers.iter().filter(|(name, _)| *name != "host") {
            request = request.header(*name, *value);
        }
        let request = request
            .header(http::header::AUTHORIZATION, authorization)
            .body(body);

        let started = Instant::now();
        let response = request
            .send()
            .await
            .map_err(|e| transport_error(operation, e))?;
        let status = response.status();
        let crc = response
            .headers()
            .get(CRC32_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(operation, e))?;
        debug!(
            %operation,
            status = status.as_u16(),
            bytes = bytes.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "DynamoDB call"
        );
        let result = decode_response(status, crc.as_deref(), &bytes);
        if let Err(e) = &result {
            if e.code.is_transient() {
                warn!(%operation, error = %e, "transient DynamoDB error, not retried");
            }
        }
        result
    }
}

#[async_trait::async_trait]
impl TableStore for DynamoDbClient {
    async fn describe_table(&self, table_name: &str) -> Result<TableDescription, DynamoDBError> {
        let input = DescribeTableInput {
            table_name: table_name.to_owned(),
        };
        let output: DescribeTableOutput = self.call(DynamoDBOperation::DescribeTable, &input).await?;
        output.table.ok_or_else(|| {
            DynamoDBError::serialization_exception("DescribeTable response has no Table")
        })
    }

    async fn list_tables(
        &self,
        exclusive_start_table_name: Option<String>,
    ) -> Result<TableNamesPage, DynamoDBError> {
        let input = ListTablesInput {
            exclusive_start_table_name,
        };
        let output: ListTablesOutput = self.call(DynamoDBOperation::ListTables, &input).await?;
        Ok(TableNamesPage {
            names: output.table_names,
            last_evaluated: output.last_evaluated_table_name,
        })
    }

    async fn read(&self, request: &ReadRequest, mode: ReadMode) -> Result<StorePage, DynamoDBError> {
        let output: ReadOutput = match mode {
            ReadMode::Scan => {
                self.call(DynamoDBOperation::Scan, &request.to_scan_input())
                    .await?
            }
            ReadMode::Query => {
                self.call(DynamoDBOperation::Query, &request.to_query_input())
                    .await?
            }
        };
        Ok(StorePage::from(output))
    }

    async fn get_item(&self, table_name: &str, key: Item) -> Result<Option<Item>, DynamoDBError> {
        let input = GetItemInput {
            table_name: table_name.to_owned(),
            key,
            consistent_read: None,
        };
        let output: GetItemOutput = self.call(DynamoDBOperation::GetItem, &input).await?;
        Ok(output.item)
    }

    async fn put_item(&self, table_name: &str, item: Item) -> Result<(), DynamoDBError> {
        let input = PutItemInput {
            table_name: table_name.to_owned(),
            item,
        };
        let _: IgnoredAny = self.call(DynamoDBOperation::PutItem, &input).await?;
        Ok(())
    }

    async fn delete_item(&self, table_name: &str, key: Item) -> Result<(), DynamoDBError> {
        let input = DeleteItemInput {
            table_name: table_name.to_owned(),
            key,
        };
        let _: IgnoredAny = self.call(DynamoDBOperation::DeleteItem, &input).await?;
        Ok(())
    }
}

/// Check the body checksum, then decode either the output or the wire
/// error.
fn decode_response<O: DeserializeOwned>(
    status: http::StatusCode,
    crc: Option<&str>,
    body: &[u8],
) -> Result<O, DynamoDBError> {
    if let Some(expected) = crc {
        let computed = crc32fast::hash(body);
        if expected.trim().parse::<u32>().ok() != Some(computed) {
            return Err(DynamoDBError::internal_error(format!(
                "response CRC32 mismatch: header {expected}, body {computed}"
            )));
        }
    }
    if !status.is_success() {
        return Err(DynamoDBError::from_response(status, body));
    }
    serde_json::from_slice(body)
        .map_err(|e| DynamoDBError::serialization_exception(format!("invalid response body: {e}")))
}

fn transport_error(operation: DynamoDBOperation, e: reqwest::Error) -> DynamoDBError {
    let message = if e.is_timeout() {
        format!("{operation} timed out")
    } else {
        format!("{operation} request failed: {e}")
    };
    DynamoDBError::internal_error(message).with_source(e)
}
