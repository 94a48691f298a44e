//! Row types returned by the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A client-reported event.
///
/// The payload is kept exactly as received (lossy UTF-8). Events are never
/// modified after insertion and `id` reflects insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Event {
    /// Monotonically increasing identifier.
    pub id: i64,
    /// When the event was stored.
    pub received_at: DateTime<Utc>,
    /// Raw event body.
    pub payload: String,
}

impl Event {
    /// Decode a raw request body into the stored payload form.
    pub fn payload_from_bytes(raw: &[u8]) -> String {
        String::from_utf8_lossy(raw).into_owned()
    }
}
