//! Operations the browser sends to a DynamoDB endpoint.

use std::fmt;

/// Prefix of the `X-Amz-Target` header value.
pub const TARGET_PREFIX: &str = "DynamoDB_20120810";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DynamoDBOperation {
    DescribeTable,
    ListTables,
    GetItem,
    PutItem,
    DeleteItem,
    Query,
    Scan,
}

impl DynamoDBOperation {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DescribeTable => "DescribeTable",
            Self::ListTables => "ListTables",
            Self::GetItem => "GetItem",
            Self::PutItem => "PutItem",
            Self::DeleteItem => "DeleteItem",
            Self::Query => "Query",
            Self::Scan => "Scan",
        }
    }

    /// Value for the `X-Amz-Target` header, e.g. `DynamoDB_20120810.Scan`.
    #[must_use]
    pub fn target(&self) -> String {
        format!("{TARGET_PREFIX}.{}", self.as_str())
    }
}

impl fmt::Display for DynamoDBOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
