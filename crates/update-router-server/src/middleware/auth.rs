//! Identity authentication middleware.

use axum::{extract::Request, middleware::Next, response::Response};

use crate::error::ApiError;
use crate::identity::Identity;

/// Require a decodable identity header and expose it to handlers.
///
/// On failure the inner handler is not run.
pub async fn authenticate(mut request: Request, next: Next) -> Result<Response, ApiError> {
    let identity = Identity::from_headers(request.headers()).map_err(|e| {
        tracing::debug!(error = %e, "Rejecting request without valid identity");
        ApiError::from(e)
    })?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}
