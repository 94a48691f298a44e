//! Response recorder: captures status and body of a response for logging.

use std::borrow::Cow;

use axum::{body::Body, response::Response};
use bytes::Bytes;
use http::{StatusCode, header};

/// Maximum number of body bytes kept for a log line.
pub const MAX_LOGGED_BODY: usize = 1024;

/// What the recorder observed.
#[derive(Debug, Clone)]
pub struct RecordedResponse {
    /// Response status.
    pub status: StatusCode,
    /// Full response body.
    pub body: Bytes,
}

impl RecordedResponse {
    /// Buffer `response`, returning an equivalent response and the recording.
    ///
    /// The returned response has the same status, headers and body bytes.
    pub async fn capture(response: Response) -> (Response, Self) {
        Self::capture_within(response, usize::MAX).await
    }

    /// Like [`RecordedResponse::capture`], buffering at most `limit` bytes.
    ///
    /// A body that cannot be read is replaced by an empty one and its
    /// `Content-Length` is dropped.
    pub async fn capture_within(response: Response, limit: usize) -> (Response, Self) {
        let (mut parts, body) = response.into_parts();
        let status = parts.status;

        let body = match axum::body::to_bytes(body, limit).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(error = %e, "cannot read HTTP response body");
                parts.headers.remove(header::CONTENT_LENGTH);
                Bytes::new()
            }
        };

        let response = Response::from_parts(parts, Body::from(body.clone()));
        (response, Self { status, body })
    }

    /// First [`MAX_LOGGED_BODY`] bytes of the body as text.
    pub fn truncated_body(&self) -> Cow<'_, str> {
        let end = self.body.len().min(MAX_LOGGED_BODY);
        String::from_utf8_lossy(&self.body[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[tokio::test]
    async fn test_capture_preserves_response() {
        let original = (
            StatusCode::CREATED,
            [("x-custom", "1")],
            "hello".to_string(),
        )
            .into_response();

        let (response, recorded) = RecordedResponse::capture(original).await;
        assert_eq!(recorded.status, StatusCode::CREATED);
        assert_eq!(recorded.body, Bytes::from_static(b"hello"));

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["x-custom"], "1");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(bytes, Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn test_unreadable_body_drops_content_length() {
        let original = (
            StatusCode::OK,
            [(header::CONTENT_LENGTH, "11")],
            "hello world".to_string(),
        )
            .into_response();

        let (response, recorded) = RecordedResponse::capture_within(original, 4).await;
        assert_eq!(recorded.status, StatusCode::OK);
        assert!(recorded.body.is_empty());

        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key(header::CONTENT_LENGTH));
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(bytes.is_empty());
    }

    #[test]
    fn test_truncated_body() {
        let recorded = RecordedResponse {
            status: StatusCode::OK,
            body: Bytes::from(vec![b'a'; 4096]),
        };
        assert_eq!(recorded.truncated_body().len(), MAX_LOGGED_BODY);

        let short = RecordedResponse {
            status: StatusCode::OK,
            body: Bytes::from_static(b"OK"),
        };
        assert_eq!(short.truncated_body(), "OK");
    }
}
