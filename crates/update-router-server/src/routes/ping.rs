//! Liveness endpoint.

use axum::{Router, routing::any};

/// /ping - Liveness probe. Any method, no authentication.
async fn ping() -> &'static str {
    "OK"
}

/// Build ping routes.
pub fn routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/ping", any(ping))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ping() {
        assert_eq!(ping().await, "OK");
    }
}
