//! Structured access logging.
//!
//! One log line per request, emitted after the inner chain has produced its
//! final response. Severity follows the status: 5xx is an error, 4xx a
//! warning, anything else info.

use std::time::{Duration, Instant};

use axum::{
    extract::{OriginalUri, Request},
    middleware::Next,
    response::Response,
};
use http::{StatusCode, header};
use tracing::Level;

use super::recorder::RecordedResponse;
use super::request_id::correlation_id;

/// Request fields captured before the inner chain runs.
#[derive(Debug, Default)]
struct AccessFields {
    ident: String,
    method: String,
    referer: String,
    url: String,
    user_agent: String,
    request_id: String,
}

impl AccessFields {
    fn from_request(request: &Request) -> Self {
        let header_str = |name: header::HeaderName| {
            request
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };
        let url = request
            .extensions()
            .get::<OriginalUri>()
            .map(|uri| uri.0.to_string())
            .unwrap_or_else(|| request.uri().to_string());

        Self {
            ident: header_str(header::HOST),
            method: request.method().to_string(),
            referer: header_str(header::REFERER),
            url,
            user_agent: header_str(header::USER_AGENT),
            request_id: correlation_id(request),
        }
    }
}

/// Log level for a response status.
pub fn level_for(status: StatusCode) -> Level {
    if status.is_server_error() {
        Level::ERROR
    } else if status.is_client_error() {
        Level::WARN
    } else {
        Level::INFO
    }
}

macro_rules! access_event {
    ($level:expr, $fields:expr, $recorded:expr, $duration:expr) => {
        tracing::event!(
            $level,
            ident = %$fields.ident,
            method = %$fields.method,
            referer = %$fields.referer,
            url = %$fields.url,
            user_agent = %$fields.user_agent,
            status = $recorded.status.as_u16(),
            response = %$recorded.truncated_body(),
            duration = ?$duration,
            request_id = %$fields.request_id,
            "request completed"
        )
    };
}

fn emit(fields: &AccessFields, recorded: &RecordedResponse, duration: Duration) {
    let level = level_for(recorded.status);
    if level == Level::ERROR {
        access_event!(Level::ERROR, fields, recorded, duration);
    } else if level == Level::WARN {
        access_event!(Level::WARN, fields, recorded, duration);
    } else {
        access_event!(Level::INFO, fields, recorded, duration);
    }
}

/// Middleware that records the response and logs the request.
pub async fn log_requests(request: Request, next: Next) -> Response {
    let fields = AccessFields::from_request(&request);
    let start = Instant::now();

    let response = next.run(request).await;
    let (response, recorded) = RecordedResponse::capture(response).await;

    emit(&fields, &recorded, start.elapsed());
    response
}
