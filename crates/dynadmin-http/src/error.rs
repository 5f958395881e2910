//! Errors surfaced by the admin API.

use dynadmin_core::AdminError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Admin(#[from] AdminError),

    #[error("no route for {method} {path}")]
    NotFound { method: http::Method, path: String },

    #[error("method {method} is not allowed on {path}")]
    MethodNotAllowed { method: http::Method, path: String },

    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Stable error code string for the JSON error body.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::Admin(e) => e.code(),
            Self::NotFound { .. } => "RouteNotFound",
            Self::MethodNotAllowed { .. } => "MethodNotAllowed",
            Self::PayloadTooLarge { .. } => "PayloadTooLarge",
            Self::InvalidBody(_) => "InvalidBody",
            Self::Internal(_) => "InternalError",
        }
    }

    #[must_use]
    pub fn status_code(&self) -> http::StatusCode {
        match self {
            Self::Admin(e) => e.status_code(),
            Self::NotFound { .. } => http::StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => http::StatusCode::METHOD_NOT_ALLOWED,
            Self::PayloadTooLarge { .. } => http::StatusCode::PAYLOAD_TOO_LARGE,
            Self::InvalidBody(_) => http::StatusCode::BAD_REQUEST,
            Self::Internal(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use dynadmin_model::error::DynamoDBError;

    use super::*;

    #[test]
    fn test_should_pass_through_admin_status_and_code() {
        let err = ApiError::from(AdminError::ItemNotFound);
        assert_eq!(err.status_code(), http::StatusCode::NOT_FOUND);
        assert_eq!(err.code(), AdminError::ItemNotFound.code());

        let err = ApiError::from(AdminError::Store(DynamoDBError::internal_error("boom")));
        assert_eq!(err.status_code(), http::StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "[InternalServerError] boom");
    }

    #[test]
    fn test_should_map_transport_errors() {
        assert_eq!(
            ApiError::PayloadTooLarge { limit: 10 }.status_code(),
            http::StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ApiError::MethodNotAllowed {
                method: http::Method::POST,
                path: "/tables".to_owned()
            }
            .status_code(),
            http::StatusCode::METHOD_NOT_ALLOWED
        );
    }
}
