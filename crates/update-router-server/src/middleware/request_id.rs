//! Correlation ids for API and liveness requests.
//!
//! A caller-supplied `x-request-id` is kept; a request without one is given a
//! fresh UUID v4. The access log reads the id with [`correlation_id`] and the
//! response always echoes it.

use http::{HeaderName, HeaderValue, Request};
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use uuid::Uuid;

/// Correlation header.
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Mints UUID v4 correlation ids.
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::try_from(Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Assigns an id to requests arriving without one.
pub fn assign_layer() -> SetRequestIdLayer<UuidRequestId> {
    SetRequestIdLayer::new(REQUEST_ID_HEADER, UuidRequestId)
}

/// Copies the request's id onto the response.
pub fn echo_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(REQUEST_ID_HEADER)
}

/// Correlation id of `request`, or an empty string before one is assigned.
pub fn correlation_id<B>(request: &Request<B>) -> String {
    request
        .extensions()
        .get::<RequestId>()
        .map(RequestId::header_value)
        .or_else(|| request.headers().get(&REQUEST_ID_HEADER))
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
