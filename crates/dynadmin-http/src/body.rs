//! Response body for the admin API.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body_util::Full;
use serde::Serialize;

/// Either a buffered JSON payload or nothing (redirects, `204`).
#[derive(Debug, Default)]
pub enum AdminResponseBody {
    Buffered(Full<Bytes>),
    #[default]
    Empty,
}

impl AdminResponseBody {
    #[must_use]
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self::Buffered(Full::new(data.into()))
    }

    /// Serialize `value` as the payload.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_vec(value).map(Self::from_bytes)
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::Empty
    }

    /// Payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Buffered(full) => {
                usize::try_from(http_body::Body::size_hint(full).lower()).unwrap_or(usize::MAX)
            }
            Self::Empty => 0,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl http_body::Body for AdminResponseBody {
    type Data = Bytes;
    type Error = std::io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<http_body::Frame<Self::Data>, Self::Error>>> {
        match self.get_mut() {
            Self::Buffered(full) => Pin::new(full)
                .poll_frame(cx)
                .map_err(|never| match never {}),
            Self::Empty => Poll::Ready(None),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            Self::Buffered(full) => full.is_end_stream(),
            Self::Empty => true,
        }
    }

    fn size_hint(&self) -> http_body::SizeHint {
        match self {
            Self::Buffered(full) => full.size_hint(),
            Self::Empty => http_body::SizeHint::with_exact(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use http_body::Body;
    use http_body_util::BodyExt;

    use super::*;

    #[tokio::test]
    async fn test_should_yield_buffered_bytes() {
        let body = AdminResponseBody::json(&serde_json::json!({})).unwrap();
        assert_eq!(body.len(), 2);
        assert_eq!(body.size_hint().exact(), Some(2));
        let collected = body.collect().await.unwrap().to_bytes();
        assert_eq!(&collected[..], b"{}");
    }

    #[test]
    fn test_should_report_empty_body_as_ended() {
        let body = AdminResponseBody::empty();
        assert!(body.is_empty());
        assert!(body.is_end_stream());
        assert_eq!(body.size_hint().exact(), Some(0));
    }
}
