//! Channel decision endpoint.
//!
//! Endpoint: GET <root>/channel?module=<name>
//!
//! Callers whose organization is enrolled for the module get the testing
//! channel; everyone else gets release. A failed count lookup falls back to
//! release instead of failing the request.

use axum::{Json, Router, extract::State, routing::get};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::extract::QueryParams;
use crate::identity::Identity;
use crate::state::AppState;

/// URL of the release channel.
pub const RELEASE_URL: &str = "/release";

/// URL of the testing channel.
pub const TESTING_URL: &str = "/testing";

/// Channel decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelResponse {
    /// Target channel URL.
    pub url: String,
}

impl ChannelResponse {
    /// Decide the channel from a prior enrollment count.
    pub fn for_count(count: i64) -> Self {
        let url = if count > 0 { TESTING_URL } else { RELEASE_URL };
        Self {
            url: url.to_string(),
        }
    }
}

/// GET <root>/channel
///
/// # Response
///
/// - 200 OK: `{"url": "/release"}` or `{"url": "/testing"}`
/// - 400 Bad Request: missing `module`, or identity without an org id
/// - 500 Internal Server Error: identity unavailable
async fn channel(
    State(state): State<AppState>,
    params: QueryParams,
    identity: Result<Identity, ApiError>,
) -> ApiResult<Json<ChannelResponse>> {
    let module = params.get("module").unwrap_or_default();
    if module.is_empty() {
        return Err(ApiError::BadRequest(
            "missing required parameter: 'module'".into(),
        ));
    }

    let identity = identity?;
    let org_id = identity.org_id();
    if org_id.is_empty() {
        return Err(ApiError::BadRequest("missing org_id identity field".into()));
    }

    let count = match state.store().count(module, org_id).await {
        Ok(count) => count,
        Err(e) => {
            tracing::error!(error = %e, module = %module, org_id = %org_id, "Count lookup failed, using release channel");
            0
        }
    };

    let response = ChannelResponse::for_count(count);
    state.metrics().record_channel(&response.url);

    Ok(Json(response))
}

/// Build channel routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/channel", get(channel))
}
