//! DynamoDB error types.
//!
//! DynamoDB errors use JSON format with a `__type` field containing the
//! fully-qualified error type name, e.g.
//! `com.amazonaws.dynamodb.v20120810#ResourceNotFoundException`.

use std::fmt;

use serde::Deserialize;

/// Well-known DynamoDB error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum DynamoDBErrorCode {
    /// Table is being created or deleted.
    ResourceInUseException,
    /// Table or index not found.
    ResourceNotFoundException,
    /// Condition check failed.
    ConditionalCheckFailedException,
    /// Provisioned throughput exceeded.
    ProvisionedThroughputExceededException,
    /// Account-level request limit exceeded.
    RequestLimitExceeded,
    /// Request rate too high.
    ThrottlingException,
    /// Validation error.
    #[default]
    ValidationException,
    /// Request or response body could not be (de)serialized.
    SerializationException,
    /// Internal server error, also used for transport failures.
    InternalServerError,
    /// Credentials rejected.
    AccessDeniedException,
    /// Unknown access key or operation.
    UnrecognizedClientException,
    /// Request signature rejected.
    InvalidSignatureException,
    /// An error type this crate does not recognise.
    Unknown,
}

impl DynamoDBErrorCode {
    /// Returns the short error code string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResourceInUseException => "ResourceInUseException",
            Self::ResourceNotFoundException => "ResourceNotFoundException",
            Self::ConditionalCheckFailedException => "ConditionalCheckFailedException",
            Self::ProvisionedThroughputExceededException => {
                "ProvisionedThroughputExceededException"
            }
            Self::RequestLimitExceeded => "RequestLimitExceeded",
            Self::ThrottlingException => "ThrottlingException",
            Self::ValidationException => "ValidationException",
            Self::SerializationException => "SerializationException",
            Self::InternalServerError => "InternalServerError",
            Self::AccessDeniedException => "AccessDeniedException",
            Self::UnrecognizedClientException => "UnrecognizedClientException",
            Self::InvalidSignatureException => "InvalidSignatureException",
            Self::Unknown => "UnknownError",
        }
    }

    /// Map a `__type` value, qualified or not, to a known code.
    #[must_use]
    pub fn from_type_name(type_name: &str) -> Self {
        let short = type_name.rsplit('#').next().unwrap_or(type_name);
        match short {
            "ResourceInUseException" => Self::ResourceInUseException,
            "ResourceNotFoundException" => Self::ResourceNotFoundException,
            "ConditionalCheckFailedException" => Self::ConditionalCheckFailedException,
            "ProvisionedThroughputExceededException" => {
                Self::ProvisionedThroughputExceededException
            }
            "RequestLimitExceeded" => Self::RequestLimitExceeded,
            "ThrottlingException" => Self::ThrottlingException,
            "ValidationException" => Self::ValidationException,
            "SerializationException" => Self::SerializationException,
            "InternalServerError" | "InternalFailure" => Self::InternalServerError,
            "AccessDeniedException" => Self::AccessDeniedException,
            "UnrecognizedClientException" => Self::UnrecognizedClientException,
            "InvalidSignatureException" => Self::InvalidSignatureException,
            _ => Self::Unknown,
        }
    }

    /// Whether the store may succeed if the same call is issued again later.
    ///
    /// The browser never retries on its own; this only feeds log fields.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ProvisionedThroughputExceededException
                | Self::RequestLimitExceeded
                | Self::ThrottlingException
                | Self::InternalServerError
        )
    }

    /// Returns the default HTTP status code for this error.
    #[must_use]
    pub fn default_status_code(&self) -> http::StatusCode {
        match self {
            Self::InternalServerError | Self::Unknown => http::StatusCode::INTERNAL_SERVER_ERROR,
            _ => http::StatusCode::BAD_REQUEST,
        }
    }
}

impl fmt::Display for DynamoDBErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A DynamoDB error response, or a failure to obtain one.
#[derive(Debug)]
pub struct DynamoDBError {
    pub code: DynamoDBErrorCode,
    /// Short wire `__type` name when it maps to no known code.
    pub error_type: Option<String>,
    pub message: String,
    pub status_code: http::StatusCode,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for DynamoDBError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.type_name(), self.message)
    }
}

impl std::error::Error for DynamoDBError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error body sent by the service. Some implementations spell the message
/// field `Message`.
#[derive(Deserialize)]
struct WireError {
    #[serde(rename = "__type", default)]
    error_type: Option<String>,
    #[serde(alias = "Message", default)]
    message: Option<String>,
}

impl DynamoDBError {
    #[must_use]
    pub fn new(code: DynamoDBErrorCode) -> Self {
        Self {
            status_code: code.default_status_code(),
            message: code.as_str().to_owned(),
            code,
            error_type: None,
            source: None,
        }
    }

    #[must_use]
    pub fn with_message(code: DynamoDBErrorCode, message: impl Into<String>) -> Self {
        Self {
            status_code: code.default_status_code(),
            message: message.into(),
            code,
            error_type: None,
            source: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    #[must_use]
    pub fn with_status(mut self, status_code: http::StatusCode) -> Self {
        self.status_code = status_code;
        self
    }

    /// The error code as the service named it. Unrecognised `__type`
    /// values are echoed verbatim instead of `UnknownError`.
    #[must_use]
    pub fn type_name(&self) -> &str {
        self.error_type.as_deref().unwrap_or(self.code.as_str())
    }

    /// Decode an error response body.
    #[must_use]
    pub fn from_response(status_code: http::StatusCode, body: &[u8]) -> Self {
        let Ok(wire) = serde_json::from_slice::<WireError>(body) else {
            let text = String::from_utf8_lossy(body);
            return Self::with_message(
                DynamoDBErrorCode::Unknown,
                format!("HTTP {status_code}: {text}"),
            )
            .with_status(status_code);
        };

        let type_name = wire.error_type.unwrap_or_default();
        let code = DynamoDBErrorCode::from_type_name(&type_name);
        let short = type_name.rsplit('#').next().unwrap_or_default();
        let error_type =
            (code == DynamoDBErrorCode::Unknown && !short.is_empty()).then(|| short.to_owned());
        let message = wire
            .message
            .unwrap_or_else(|| error_type.clone().unwrap_or_else(|| code.as_str().to_owned()));
        let mut error = Self::with_message(code, message).with_status(status_code);
        error.error_type = error_type;
        error
    }

    // -- Convenience constructors --

    #[must_use]
    pub fn resource_not_found(message: impl Into<String>) -> Self {
        Self::with_message(DynamoDBErrorCode::ResourceNotFoundException, message)
    }

    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::with_message(DynamoDBErrorCode::ValidationException, message)
    }

    #[must_use]
    pub fn serialization_exception(message: impl Into<String>) -> Self {
        Self::with_message(DynamoDBErrorCode::SerializationException, message)
    }

    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::with_message(DynamoDBErrorCode::InternalServerError, message)
    }
}

/// Create a `DynamoDBError` from an error code.
///
/// # Examples
///
/// ```
/// use dynadmin_model::dynamodb_error;
/// use dynadmin_model::error::DynamoDBErrorCode;
///
/// let err = dynamodb_error!(ValidationException);
/// assert_eq!(err.code, DynamoDBErrorCode::ValidationException);
///
/// let err = dynamodb_error!(ResourceNotFoundException, "Table not found");
/// assert_eq!(err.message, "Table not found");
/// ```
#[macro_export]
macro_rules! dynamodb_error {
    ($code:ident) => {
        $crate::error::DynamoDBError::new($crate::error::DynamoDBErrorCode::$code)
    };
    ($code:ident, $msg:expr) => {
        $crate::error::DynamoDBError::with_message($crate::error::DynamoDBErrorCode::$code, $msg)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_decode_qualified_error_type() {
        let body = br#"{"__type":"com.amazonaws.dynamodb.v20120810#ResourceNotFoundException","message":"Requested resource not found"}"#;
        let err = DynamoDBError::from_response(http::StatusCode::BAD_REQUEST, body);
        assert_eq!(err.code, DynamoDBErrorCode::ResourceNotFoundException);
        assert_eq!(err.message, "Requested resource not found");
        assert_eq!(
            err.to_string(),
            "[ResourceNotFoundException] Requested resource not found"
        );
    }

    #[test]
    fn test_should_accept_capitalised_message_field() {
        let body = br#"{"__type":"com.amazon.coral.validate#ValidationException","Message":"bad"}"#;
        let err = DynamoDBError::from_response(http::StatusCode::BAD_REQUEST, body);
        assert_eq!(err.code, DynamoDBErrorCode::ValidationException);
        assert_eq!(err.message, "bad");
    }

    #[test]
    fn test_should_echo_unrecognised_type_name() {
        let body = br#"{"__type":"x#TableArchivedException","message":"gone"}"#;
        let err = DynamoDBError::from_response(http::StatusCode::BAD_REQUEST, body);
        assert_eq!(err.code, DynamoDBErrorCode::Unknown);
        assert_eq!(err.type_name(), "TableArchivedException");
        assert_eq!(err.message, "gone");
        assert_eq!(err.to_string(), "[TableArchivedException] gone");
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_should_handle_non_json_error_body() {
        let err = DynamoDBError::from_response(http::StatusCode::BAD_GATEWAY, b"upstream down");
        assert_eq!(err.code, DynamoDBErrorCode::Unknown);
        assert_eq!(err.type_name(), "UnknownError");
        assert!(err.message.contains("upstream down"));
        assert_eq!(err.status_code, http::StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_should_classify_transient_codes() {
        assert!(DynamoDBErrorCode::ThrottlingException.is_transient());
        assert!(!DynamoDBErrorCode::ValidationException.is_transient());
    }
}
