//! JSON, redirect and error responses.

use serde::Serialize;

use crate::body::AdminResponseBody;
use crate::error::ApiError;

pub const CONTENT_TYPE: &str = "application/json";

/// The error body:
///
/// ```json
/// {"code": "KeyFormatError", "message": "malformed key: expected 2 components, got 1"}
/// ```
#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: String,
}

/// Serialize `value` into a JSON response with `status`.
pub fn json_response<T: Serialize + ?Sized>(
    status: http::StatusCode,
    value: &T,
) -> Result<http::Response<AdminResponseBody>, ApiError> {
    let body = AdminResponseBody::json(value)
        .map_err(|e| ApiError::Internal(format!("failed to encode response: {e}")))?;
    Ok(http::Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, CONTENT_TYPE)
        .body(body)
        .expect("valid JSON response"))
}

/// `302 Found` pointing at `location`.
pub fn redirect(location: &str) -> Result<http::Response<AdminResponseBody>, ApiError> {
    let location = http::HeaderValue::from_str(location)
        .map_err(|_| ApiError::Internal(format!("invalid redirect location: {location}")))?;
    let mut response = http::Response::new(AdminResponseBody::empty());
    *response.status_mut() = http::StatusCode::FOUND;
    response
        .headers_mut()
        .insert(http::header::LOCATION, location);
    Ok(response)
}

#[must_use]
pub fn no_content() -> http::Response<AdminResponseBody> {
    let mut response = http::Response::new(AdminResponseBody::empty());
    *response.status_mut() = http::StatusCode::NO_CONTENT;
    response
}

/// Convert an error into its JSON response.
#[must_use]
pub fn error_to_response(error: &ApiError, request_id: &str) -> http::Response<AdminResponseBody> {
    let body = ErrorBody {
        code: error.code(),
        message: error.to_string(),
    };
    let body = AdminResponseBody::json(&body).expect("JSON serialization of error cannot fail");
    let mut response = http::Response::builder()
        .status(error.status_code())
        .header(http::header::CONTENT_TYPE, CONTENT_TYPE)
        .body(body)
        .expect("valid error response");
    if let Ok(hv) = http::HeaderValue::from_str(request_id) {
        response.headers_mut().insert("x-request-id", hv);
    }
    response
}

#[cfg(test)]
mod tests {
    use dynadmin_core::AdminError;
    use http_body_util::BodyExt;

    use super::*;

    async fn body_json(response: http::Response<AdminResponseBody>) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_should_format_error_body() {
        let err = ApiError::from(AdminError::KeyFormat("expected 2 components, got 1".to_owned()));
        let response = error_to_response(&err, "req-1");
        assert_eq!(response.status(), http::StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()["x-request-id"], "req-1");
        let json = body_json(response).await;
        assert_eq!(json["code"], "KeyFormatError");
        assert_eq!(json["message"], "malformed key: expected 2 components, got 1");
    }

    #[tokio::test]
    async fn test_should_echo_store_type_name_in_error_body() {
        let store = dynadmin_model::error::DynamoDBError::from_response(
            http::StatusCode::BAD_REQUEST,
            br#"{"__type":"x#TableArchivedException","message":"archived"}"#,
        );
        let response = error_to_response(&ApiError::from(AdminError::Store(store)), "req-9");
        let json = body_json(response).await;
        assert_eq!(json["code"], "TableArchivedException");
        assert_eq!(json["message"], "[TableArchivedException] archived");
    }

    #[tokio::test]
    async fn test_should_build_json_response() {
        let response = json_response(http::StatusCode::OK, &serde_json::json!({"tables": ["a"]})).unwrap();
        assert_eq!(response.headers()[http::header::CONTENT_TYPE], CONTENT_TYPE);
        assert_eq!(body_json(response).await["tables"][0], "a");
    }

    #[test]
    fn test_should_redirect_with_location() {
        let response = redirect("/tables/t/items/a%2Fb,1").unwrap();
        assert_eq!(response.status(), http::StatusCode::FOUND);
        assert_eq!(response.headers()[http::header::LOCATION], "/tables/t/items/a%2Fb,1");
        assert!(redirect("/bad\nlocation").is_err());
    }

    #[test]
    fn test_should_answer_no_content() {
        assert_eq!(no_content().status(), http::StatusCode::NO_CONTENT);
    }
}
