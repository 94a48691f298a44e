//! Client event endpoint.
//!
//! - POST <root>/event: store an opaque client event
//! - GET <root>/event?limit=&offset=: list stored events (associates only)

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{Method, StatusCode},
    routing::get,
};
use update_router_store::Event;

use crate::error::{ApiError, ApiResult};
use crate::extract::QueryParams;
use crate::identity::Identity;
use crate::state::AppState;

/// Limit meaning "no limit".
pub const NO_LIMIT: i64 = -1;

/// Query parameters for listing events. Values are parsed by the handler so
/// that malformed integers produce the uniform error body.
#[derive(Debug, Default)]
pub struct EventQuery {
    /// Maximum number of events to return.
    pub limit: Option<String>,
    /// Number of events to skip.
    pub offset: Option<String>,
}

impl EventQuery {
    /// First `limit` and `offset` values of the query string.
    pub fn from_params(params: &QueryParams) -> Self {
        Self {
            limit: params.get("limit").map(str::to_string),
            offset: params.get("offset").map(str::to_string),
        }
    }

    /// Parsed `(limit, offset)`, defaulting to `(-1, 0)`.
    pub fn page(&self) -> ApiResult<(i64, i64)> {
        let limit = parse_param("limit", self.limit.as_deref(), NO_LIMIT)?;
        let offset = parse_param("offset", self.offset.as_deref(), 0)?;
        Ok((limit, offset))
    }
}

fn parse_param(name: &str, value: Option<&str>, default: i64) -> ApiResult<i64> {
    match value {
        None | Some("") => Ok(default),
        Some(raw) => raw.parse::<i64>().map_err(|e| {
            ApiError::BadRequest(format!("invalid value for '{}': \"{}\": {}", name, raw, e))
        }),
    }
}

/// POST <root>/event
///
/// - 201 Created: empty body
/// - 500 Internal Server Error: store failure
async fn create_event(State(state): State<AppState>, body: Bytes) -> ApiResult<StatusCode> {
    let event = state.store().append_event(body.clone()).await?;
    tracing::debug!(event_id = event.id, "Stored client event");

    if let Some(relay) = state.events() {
        relay.offer(body);
    }

    Ok(StatusCode::CREATED)
}

/// GET <root>/event
///
/// - 200 OK: JSON array of events
/// - 400 Bad Request: malformed query, or `limit`/`offset` not an integer
/// - 401 Unauthorized: caller is not an associate, whatever the query holds
/// - 500 Internal Server Error: identity unavailable or store failure
async fn list_events(
    State(state): State<AppState>,
    identity: Identity,
    params: Result<QueryParams, ApiError>,
) -> ApiResult<Json<Vec<Event>>> {
    if !identity.is_associate() {
        return Err(ApiError::Unauthorized);
    }

    let (limit, offset) = EventQuery::from_params(&params?).page()?;
    let events = state.store().events(limit, offset).await?;

    Ok(Json(events))
}

/// Any other method.
async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::MethodNotAllowed(method)
}

/// Build event routes.
///
/// HEAD is refused explicitly; axum would otherwise answer it with the GET
/// handler.
pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/event",
        get(list_events)
            .head(method_not_allowed)
            .post(create_event)
            .fallback(method_not_allowed),
    )
}
