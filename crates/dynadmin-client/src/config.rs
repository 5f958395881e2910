//! Connection settings for the DynamoDB endpoint.

use std::env;
use std::time::Duration;

use crate::sigv4::Credentials;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL requests are posted to.
    pub endpoint: String,
    /// Region used in the signing scope.
    pub region: String,
    pub credentials: Credentials,
    /// Applies to each store call separately.
    pub timeout: Duration,
}

impl ClientConfig {
    /// Create configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `DYNAMO_ENDPOINT` | `http://localhost:8000` |
    /// | `AWS_REGION`, then `DEFAULT_REGION` | `us-east-1` |
    /// | `AWS_ACCESS_KEY_ID` | `key` |
    /// | `AWS_SECRET_ACCESS_KEY` | `secret` |
    /// | `AWS_SESSION_TOKEN` | unset |
    /// | `DYNADMIN_REQUEST_TIMEOUT_SECS` | `30` |
    ///
    /// The dummy credentials suit DynamoDB Local, which accepts any.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());
        Self {
            endpoint: var("DYNAMO_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_owned()),
            region: var("AWS_REGION")
                .or_else(|| var("DEFAULT_REGION"))
                .unwrap_or_else(|| DEFAULT_REGION.to_owned()),
            credentials: Credentials {
                access_key_id: var("AWS_ACCESS_KEY_ID").unwrap_or_else(|| "key".to_owned()),
                secret_access_key: var("AWS_SECRET_ACCESS_KEY")
                    .unwrap_or_else(|| "secret".to_owned()),
                session_token: var("AWS_SESSION_TOKEN"),
            },
            timeout: var("DYNADMIN_REQUEST_TIMEOUT_SECS")
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map_or(DEFAULT_TIMEOUT, Duration::from_secs),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
