//! Hyper `Service` for the admin API.

use std::convert::Infallible;
use std::env;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Incoming;
use tracing::{debug, error};

use crate::body::AdminResponseBody;
use crate::dispatch::{AdminHandler, dispatch_route};
use crate::error::ApiError;
use crate::response::error_to_response;
use crate::router::{parse_query, resolve_route};

/// Largest accepted request body unless configured.
pub const DEFAULT_MAX_BODY_BYTES: usize = 512_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminHttpConfig {
    pub max_body_bytes: usize,
}

impl AdminHttpConfig {
    /// Reads `DYNADMIN_MAX_BODY_BYTES`, falling back to 500 KiB.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            max_body_bytes: env::var("DYNADMIN_MAX_BODY_BYTES")
                .ok()
                .and_then(|v| v.trim().parse::<usize>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(DEFAULT_MAX_BODY_BYTES),
        }
    }
}

impl Default for AdminHttpConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Routes requests to an [`AdminHandler`]. Cloned per connection.
#[derive(Debug)]
pub struct AdminHttpService<H: AdminHandler> {
    handler: Arc<H>,
    config: Arc<AdminHttpConfig>,
}

impl<H: AdminHandler> AdminHttpService<H> {
    pub fn new(handler: Arc<H>, config: AdminHttpConfig) -> Self {
        Self {
            handler,
            config: Arc::new(config),
        }
    }
}

impl<H: AdminHandler> Clone for AdminHttpService<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            config: Arc::clone(&self.config),
        }
    }
}

impl<H: AdminHandler> hyper::service::Service<http::Request<Incoming>> for AdminHttpService<H> {
    type Response = http::Response<AdminResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let handler = Arc::clone(&self.handler);
        let config = Arc::clone(&self.config);
        let request_id = uuid::Uuid::new_v4().to_string();

        Box::pin(async move {
            let response = process_request(req, handler.as_ref(), &config, &request_id).await;
            Ok(add_common_headers(response, &request_id))
        })
    }
}

/// Route, read the body, dispatch, and turn any failure into an error
/// response.
pub async fn process_request<B, H>(
    req: http::Request<B>,
    handler: &H,
    config: &AdminHttpConfig,
    request_id: &str,
) -> http::Response<AdminResponseBody>
where
    B: http_body::Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    H: AdminHandler,
{
    let (parts, body) = req.into_parts();
    let result = async {
        let route = resolve_route(&parts.method, parts.uri.path())?;
        let query = parse_query(parts.uri.query());
        let body = collect_body(body, config.max_body_bytes).await?;
        dispatch_route(handler, route, query, body).await
    }
    .await;

    match result {
        Ok(response) => response,
        Err(err) => {
            let status = err.status_code();
            if status.is_server_error() {
                error!(%request_id, method = %parts.method, path = %parts.uri.path(), error = %err, "Request failed");
            } else {
                debug!(%request_id, method = %parts.method, path = %parts.uri.path(), %status, error = %err, "Request rejected");
            }
            error_to_response(&err, request_id)
        }
    }
}

async fn collect_body<B>(body: B, limit: usize) -> Result<Bytes, ApiError>
where
    B: http_body::Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            Err(ApiError::PayloadTooLarge { limit })
        }
        Err(e) => Err(ApiError::Internal(format!("failed to read request body: {e}"))),
    }
}

fn add_common_headers(
    mut response: http::Response<AdminResponseBody>,
    request_id: &str,
) -> http::Response<AdminResponseBody> {
    let headers = response.headers_mut();
    if let Ok(hv) = http::HeaderValue::from_str(request_id) {
        headers.entry("x-request-id").or_insert(hv);
    }
    headers.insert("server", http::HeaderValue::from_static("dynadmin"));
    headers.insert(
        "access-control-allow-origin",
        http::HeaderValue::from_static("*"),
    );
    response
}
