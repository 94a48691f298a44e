//! Caller identity extraction from the `x-rh-identity` trust header.
//!
//! The header carries base64-encoded JSON set by the platform gateway:
//!
//! ```text
//! {"identity": {"org_id": "12345", "account_number": "540155", "type": "User",
//!               "internal": {"org_id": "12345"}}}
//! ```
//!
//! The gateway has already verified the caller; this module only decodes.

use axum::{extract::FromRequestParts, http::request::Parts};
use base64::{Engine, engine::general_purpose::STANDARD};
use http::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Header name carrying the caller identity.
pub const IDENTITY_HEADER: &str = "x-rh-identity";

/// Caller type allowed to list events.
pub const ASSOCIATE: &str = "Associate";

/// Errors decoding the identity header.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// Header is absent.
    #[error("missing {IDENTITY_HEADER} header")]
    Missing,

    /// Header contains non-visible-ASCII bytes.
    #[error("{IDENTITY_HEADER} header contains invalid characters")]
    InvalidHeader,

    /// Header is not valid base64.
    #[error("cannot decode {IDENTITY_HEADER} header: {0}")]
    Decode(#[from] base64::DecodeError),

    /// Decoded header is not a valid identity document.
    #[error("cannot parse {IDENTITY_HEADER} header: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Missing => ApiError::Unauthenticated(err.to_string()),
            _ => ApiError::BadRequest(err.to_string()),
        }
    }
}

/// Internal identity fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Internal {
    /// Organization id as seen by internal services.
    #[serde(default)]
    pub org_id: String,
}

/// Authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Organization id. May be empty.
    #[serde(default)]
    pub org_id: String,
    /// Legacy account number.
    #[serde(default)]
    pub account_number: String,
    /// Caller type, e.g. "User", "System" or "Associate".
    #[serde(rename = "type")]
    pub caller_type: String,
    /// Internal fields.
    #[serde(default)]
    pub internal: Internal,
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    identity: Identity,
}

impl Identity {
    /// Decode the identity from request headers.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, IdentityError> {
        let value = headers
            .get(IDENTITY_HEADER)
            .ok_or(IdentityError::Missing)?
            .to_str()
            .map_err(|_| IdentityError::InvalidHeader)?;

        Self::decode(value)
    }

    /// Decode a raw header value.
    pub fn decode(value: &str) -> Result<Self, IdentityError> {
        let raw = STANDARD.decode(value.trim())?;
        let envelope: Envelope = serde_json::from_slice(&raw)?;
        Ok(envelope.identity)
    }

    /// Encode as a header value.
    pub fn encode(&self) -> String {
        let envelope = serde_json::json!({ "identity": self });
        STANDARD.encode(envelope.to_string())
    }

    /// Organization id of the caller. `internal.org_id` is never consulted.
    pub fn org_id(&self) -> &str {
        &self.org_id
    }

    /// Whether the caller is an associate.
    pub fn is_associate(&self) -> bool {
        self.caller_type == ASSOCIATE
    }
}

/// Reads the identity placed in request extensions by the auth middleware.
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or_else(|| ApiError::Internal("identity not found in request context".into()))
    }
}
