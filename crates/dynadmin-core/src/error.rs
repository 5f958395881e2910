//! Error type for browser operations.

use dynadmin_model::error::{DynamoDBError, DynamoDBErrorCode};
use thiserror::Error;

/// Errors raised by the key codec, the expression builder, page assembly
/// and the provider operations built on them.
#[derive(Debug, Error)]
pub enum AdminError {
    /// An item lacks one of the attributes a key is built from.
    #[error("missing required key attribute: {attribute}")]
    MissingKeyAttribute { attribute: String },

    /// An encoded key has the wrong number of components or an undecodable
    /// component.
    #[error("malformed key: {0}")]
    KeyFormat(String),

    /// A key component could not be coerced to its declared number type.
    #[error("key attribute '{attribute}' expects a number, got '{value}'")]
    KeyType { attribute: String, value: String },

    /// A store call failed or timed out. Never retried here.
    #[error(transparent)]
    Store(#[from] DynamoDBError),

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("{0}")]
    Validation(String),

    #[error("table not found: {0}")]
    TableNotFound(String),

    #[error("index not found: {0}")]
    IndexNotFound(String),

    #[error("item not found")]
    ItemNotFound,

    /// The table metadata does not describe a usable key schema.
    #[error("invalid table schema: {0}")]
    InvalidSchema(String),
}

impl AdminError {
    /// Stable machine-readable code for API responses. Store errors carry
    /// the service's own type name.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::MissingKeyAttribute { .. } => "MissingKeyAttribute",
            Self::KeyFormat(_) => "KeyFormatError",
            Self::KeyType { .. } => "KeyTypeError",
            Self::Store(e) => e.type_name(),
            Self::InvalidFilter(_) => "InvalidFilter",
            Self::Validation(_) => "ValidationError",
            Self::TableNotFound(_) => "TableNotFound",
            Self::IndexNotFound(_) => "IndexNotFound",
            Self::ItemNotFound => "ItemNotFound",
            Self::InvalidSchema(_) => "InvalidSchema",
        }
    }

    /// HTTP status the admin API answers with.
    ///
    /// Store failures of any kind surface as 400 carrying the store's text.
    #[must_use]
    pub fn status_code(&self) -> http::StatusCode {
        match self {
            Self::TableNotFound(_) | Self::IndexNotFound(_) | Self::ItemNotFound => {
                http::StatusCode::NOT_FOUND
            }
            Self::InvalidSchema(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
            _ => http::StatusCode::BAD_REQUEST,
        }
    }

    /// Map a store error from a table-scoped call, turning a missing
    /// resource into [`AdminError::TableNotFound`].
    ///
    /// Takes `e` by value because this is used as a closure argument to `.map_err()`.
    #[must_use]
    #[allow(clippy::needless_pass_by_value)]
    pub fn from_table_call(table: &str, e: DynamoDBError) -> Self {
        if e.code == DynamoDBErrorCode::ResourceNotFoundException {
            Self::TableNotFound(table.to_owned())
        } else {
            Self::Store(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_map_client_errors_to_bad_request() {
        let err = AdminError::KeyType {
            attribute: "id".to_owned(),
            value: "abc".to_owned(),
        };
        assert_eq!(err.status_code(), http::StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "KeyTypeError");
    }

    #[test]
    fn test_should_surface_store_error_text_verbatim() {
        let err = AdminError::from(DynamoDBError::validation("One or more parameter values were invalid"));
        assert_eq!(
            err.to_string(),
            "[ValidationException] One or more parameter values were invalid"
        );
        assert_eq!(err.status_code(), http::StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "ValidationException");
    }

    #[test]
    fn test_should_pass_through_unrecognised_store_type() {
        let err = AdminError::from(DynamoDBError::from_response(
            http::StatusCode::BAD_REQUEST,
            br#"{"__type":"com.amazonaws.dynamodb.v20120810#ReplicatedWriteConflictException","message":"conflict"}"#,
        ));
        assert_eq!(err.code(), "ReplicatedWriteConflictException");
        assert_eq!(err.to_string(), "[ReplicatedWriteConflictException] conflict");
        assert_eq!(err.status_code(), http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_should_translate_missing_table() {
        let err = AdminError::from_table_call(
            "orders",
            DynamoDBError::resource_not_found("Cannot do operations on a non-existent table"),
        );
        assert!(matches!(err, AdminError::TableNotFound(ref t) if t == "orders"));
        assert_eq!(err.status_code(), http::StatusCode::NOT_FOUND);
    }
}
